//! Per-repository serialized work queue
//!
//! All invocations for a repository run one at a time: a new trigger waits
//! for the in-flight one instead of cancelling it or racing it. The queue is
//! an advisory lock file named for the repository; acquisition blocks with
//! bounded polling and fails only when the wait budget is exhausted.

use crate::core::error::{BotError, BotResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How long a waiting invocation polls before giving up
const DEFAULT_WAIT: Duration = Duration::from_secs(600);

/// Poll interval while waiting for the lock
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Held lock on a repository's work queue; released on drop
pub struct QueueGuard {
  path: PathBuf,
}

impl Drop for QueueGuard {
  fn drop(&mut self) {
    if let Err(e) = fs::remove_file(&self.path) {
      // Lock file cleanup failure only delays the next waiter
      debug!(path = %self.path.display(), error = %e, "failed to remove queue lock");
    }
  }
}

/// Acquire the work queue for a repository, waiting if another invocation
/// holds it.
pub fn acquire(repo_slug: &str) -> BotResult<QueueGuard> {
  acquire_in(&std::env::temp_dir(), repo_slug, DEFAULT_WAIT)
}

/// Acquire with an explicit lock directory and wait budget (tests use this)
pub fn acquire_in(dir: &Path, repo_slug: &str, wait: Duration) -> BotResult<QueueGuard> {
  let path = dir.join(format!("relbot-{}.lock", sanitize(repo_slug)));
  let deadline = Instant::now() + wait;

  loop {
    match OpenOptions::new().write(true).create_new(true).open(&path) {
      Ok(mut file) => {
        let _ = writeln!(file, "{}", std::process::id());
        debug!(path = %path.display(), "queue lock acquired");
        return Ok(QueueGuard { path });
      }
      Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
        if Instant::now() >= deadline {
          return Err(BotError::with_help(
            format!("Another invocation holds the queue for '{}'", repo_slug),
            format!("Remove {} if the holding process is gone.", path.display()),
          ));
        }
        info!(repo = repo_slug, "waiting for in-flight invocation");
        thread::sleep(POLL_INTERVAL);
      }
      Err(e) => return Err(e.into()),
    }
  }
}

/// Keep slug-derived file names safe ("owner/name" → "owner-name")
fn sanitize(slug: &str) -> String {
  slug
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
    .collect()
}

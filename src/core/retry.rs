//! Bounded retry with exponential backoff for transient platform I/O
//!
//! Only errors classified transient by `BotError::is_transient` are retried;
//! permission, state, validation, and configuration errors fail fast. When
//! attempts are exhausted the failure is surfaced as an internal error with
//! a short correlation reference for support.

use crate::core::config::RetryConfig;
use crate::core::error::{BotError, BotResult, PlatformError};
use sha2::{Digest, Sha256};
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Run an operation with bounded retries on transient failures.
pub fn with_backoff<T, F>(retry: &RetryConfig, operation: &str, mut f: F) -> BotResult<T>
where
  F: FnMut() -> BotResult<T>,
{
  let attempts = retry.max_attempts.max(1);

  for attempt in 0..attempts {
    match f() {
      Ok(value) => return Ok(value),
      Err(err) if err.is_transient() => {
        warn!(operation, attempt = attempt + 1, error = %err, "transient platform failure");
        if attempt + 1 < attempts {
          let delay = retry.base_delay_ms.saturating_mul(1 << attempt);
          thread::sleep(Duration::from_millis(delay));
        }
      }
      Err(err) => return Err(err),
    }
  }

  let correlation = correlation_ref(operation);
  warn!(operation, %correlation, "platform operation exhausted retries");
  Err(BotError::Platform(PlatformError::Unreachable {
    operation: operation.to_string(),
    attempts,
    correlation,
  }))
}

/// Short, unique-enough reference tying a surfaced error to its logs.
pub fn correlation_ref(operation: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(operation.as_bytes());
  hasher.update(chrono::Utc::now().to_rfc3339().as_bytes());
  let digest = hasher.finalize();
  let hex: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();
  hex
}

//! create-snapshot handler
//!
//! Cuts a snapshot branch from trunk, writes the generated metadata
//! document, creates the review derivative, and opens the release PR.
//! The operation is atomic-or-rolled-back: any failure after branch
//! creation deletes every branch this invocation created. Stale partial
//! branches from a previously failed attempt are detected and removed
//! before anything new is created.

use crate::core::config::BotConfig;
use crate::core::context::HandlerDelta;
use crate::core::error::{BotError, BotResult};
use crate::platform::{Platform, PullRequestRef};
use crate::release::metadata::ReleaseMetadata;
use crate::release::state::ReleaseFacts;
use crate::release::version;
use std::collections::BTreeMap;
use tracing::{info, warn};

const SHORT_SHA_LENGTH: usize = 7;

/// Result of a successful snapshot creation
#[derive(Debug, Clone)]
pub struct SnapshotOutcome {
  pub snapshot_id: String,
  pub snapshot_branch: String,
  pub review_branch: String,
  pub src_commit_sha: String,
  pub release_pr: PullRequestRef,
  pub api_versions: BTreeMap<String, String>,
  pub warnings: Vec<String>,
}

impl SnapshotOutcome {
  /// Fields this handler contributes to the final context
  pub fn delta(&self) -> HandlerDelta {
    HandlerDelta {
      snapshot_id: Some(self.snapshot_id.clone()),
      snapshot_branch: Some(self.snapshot_branch.clone()),
      release_review_branch: Some(self.review_branch.clone()),
      src_commit_sha: Some(self.src_commit_sha.clone()),
      release_pr_number: Some(self.release_pr.number.to_string()),
      release_pr_url: Some(self.release_pr.html_url.clone()),
      ..HandlerDelta::default()
    }
  }
}

/// Create a snapshot for the currently planned release.
///
/// `history` is the metadata of every published release, feeding the
/// version calculator. The caller has already validated state and
/// permission.
pub fn create_snapshot(
  platform: &dyn Platform,
  config: &BotConfig,
  facts: &ReleaseFacts,
  history: &[ReleaseMetadata],
) -> BotResult<SnapshotOutcome> {
  let release_tag = &facts.release_tag;
  let mut warnings = cleanup_stale_branches(platform, config, release_tag)?;

  let src_commit_sha = platform
    .branch_head(&config.repository.trunk)?
    .ok_or_else(|| BotError::message(format!("Trunk branch '{}' not found", config.repository.trunk)))?;

  // Versions are calculated before any mutation so a history conflict
  // aborts with nothing to clean up
  let api_versions = version::versions_for_plan(&facts.plan, history)?;

  let short_sha: String = src_commit_sha.chars().take(SHORT_SHA_LENGTH).collect();
  let snapshot_id = format!("{}-{}", release_tag, short_sha);
  let snapshot_branch = format!("{}{}", config.branches.snapshot_prefix, snapshot_id);
  let review_branch = format!("{}{}", config.branches.review_prefix, snapshot_id);

  info!(%snapshot_id, %src_commit_sha, "creating snapshot");
  platform.create_branch(&snapshot_branch, &src_commit_sha)?;

  // Everything after this point rolls back the created branches on failure
  let result = (|| -> BotResult<PullRequestRef> {
    let metadata = ReleaseMetadata::generate(
      &config.repository.slug,
      &facts.plan,
      &src_commit_sha,
      &api_versions,
      &BTreeMap::new(),
    );
    platform.put_file(
      &config.documents.metadata_file,
      &metadata.to_yaml()?,
      &format!("chore: generate {} for {}", config.documents.metadata_file, release_tag),
      &snapshot_branch,
    )?;

    platform.create_branch(&review_branch, &src_commit_sha)?;

    platform.open_pull_request(
      &snapshot_branch,
      &review_branch,
      &format!("Release {} review ({})", release_tag, snapshot_id),
      &format!(
        "Review the release snapshot `{}`. Merging this PR creates the draft release for `{}`.",
        snapshot_id, release_tag
      ),
    )
  })();

  match result {
    Ok(release_pr) => Ok(SnapshotOutcome {
      snapshot_id,
      snapshot_branch,
      review_branch,
      src_commit_sha,
      release_pr,
      api_versions,
      warnings,
    }),
    Err(err) => {
      warn!(error = %err, "snapshot creation failed; rolling back created branches");
      for branch in [&snapshot_branch, &review_branch] {
        if let Err(cleanup_err) = platform.delete_branch(branch) {
          warnings.push(format!("Failed to clean up {}: {}", branch, cleanup_err));
        }
      }
      if warnings.is_empty() {
        Err(err)
      } else {
        Err(err.context(format!("Cleanup warnings: {}", warnings.join("; "))))
      }
    }
  }
}

/// Remove leftover snapshot/review branches from a previously failed or
/// interrupted attempt, so a retry never produces two partial snapshots.
fn cleanup_stale_branches(platform: &dyn Platform, config: &BotConfig, release_tag: &str) -> BotResult<Vec<String>> {
  let mut warnings = Vec::new();

  let stale_patterns = [
    config.snapshot_pattern(release_tag),
    format!("{}{}-*", config.branches.review_prefix, release_tag),
  ];

  for pattern in stale_patterns {
    for branch in platform.list_branches(&pattern)? {
      warn!(branch = %branch.name, "removing stale branch from a previous attempt");
      platform.delete_branch(&branch.name)?;
      warnings.push(format!("Removed stale branch {}", branch.name));
    }
  }

  Ok(warnings)
}

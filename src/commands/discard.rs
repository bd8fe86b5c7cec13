//! discard-snapshot handler
//!
//! Deletes the snapshot branch and its review derivative, returning the
//! release to `planned`. The reason is mandatory and flows into the final
//! context for the audit trail.

use crate::core::context::HandlerDelta;
use crate::core::error::BotResult;
use crate::platform::Platform;
use crate::release::state::SnapshotInfo;
use tracing::info;

/// Result of a snapshot discard
#[derive(Debug, Clone)]
pub struct DiscardOutcome {
  pub snapshot_id: String,
  pub reason: String,
  pub deleted_branches: Vec<String>,
  pub warnings: Vec<String>,
}

impl DiscardOutcome {
  pub fn delta(&self) -> HandlerDelta {
    HandlerDelta {
      snapshot_id: Some(self.snapshot_id.clone()),
      reason: Some(self.reason.clone()),
      ..HandlerDelta::default()
    }
  }
}

/// Discard the active snapshot. The caller has already validated state,
/// permission, and the presence of a reason.
pub fn discard_snapshot(platform: &dyn Platform, snapshot: &SnapshotInfo, reason: &str) -> BotResult<DiscardOutcome> {
  info!(snapshot_id = %snapshot.snapshot_id, reason, "discarding snapshot");

  let mut deleted_branches = Vec::new();
  let mut warnings = Vec::new();

  for branch in [&snapshot.snapshot_branch, &snapshot.review_branch] {
    if platform.delete_branch(branch)? {
      deleted_branches.push(branch.clone());
    } else {
      warnings.push(format!("Branch {} was already gone", branch));
    }
  }

  Ok(DiscardOutcome {
    snapshot_id: snapshot.snapshot_id.clone(),
    reason: reason.to_string(),
    deleted_branches,
    warnings,
  })
}

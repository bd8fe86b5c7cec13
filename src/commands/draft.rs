//! Draft release creation and deletion
//!
//! Draft creation is not a slash command: it is triggered by the release
//! PR's merge event and moves the lifecycle from `snapshot-active` to
//! `draft-ready`. Deletion (`/delete-draft`) removes the draft object and
//! the snapshot's branches, returning to `planned`.

use crate::core::context::HandlerDelta;
use crate::core::error::{BotError, BotResult};
use crate::platform::{Platform, ReleaseObject};
use crate::release::state::ReleaseFacts;
use tracing::info;

/// Create the draft release referencing the active snapshot.
///
/// The draft's tag will only materialize at publication; until then the
/// draft is the platform's staging object for release notes and review.
pub fn create_draft(platform: &dyn Platform, facts: &ReleaseFacts) -> BotResult<ReleaseObject> {
  let snapshot = facts.snapshot.as_ref().ok_or_else(|| BotError::State {
    command: "merge-event".to_string(),
    current: facts.state.as_str().to_string(),
    required: "snapshot-active".to_string(),
  })?;

  let title = match facts.release_type.short() {
    "" => facts.release_tag.clone(),
    short => format!("{} ({})", facts.release_tag, short),
  };

  info!(release_tag = %facts.release_tag, snapshot_id = %snapshot.snapshot_id, "creating draft release");
  let draft = platform.create_draft_release(
    &facts.release_tag,
    &title,
    &format!("Release `{}` cut from snapshot `{}`.", facts.release_tag, snapshot.snapshot_id),
    &snapshot.snapshot_branch,
    facts.release_type.is_prerelease(),
  )?;

  Ok(draft)
}

/// Delta for a freshly created draft
pub fn draft_delta(draft: &ReleaseObject) -> HandlerDelta {
  HandlerDelta {
    draft_release_url: Some(draft.html_url.clone()),
    ..HandlerDelta::default()
  }
}

/// Result of a draft deletion
#[derive(Debug, Clone)]
pub struct DeleteDraftOutcome {
  pub reason: String,
  pub warnings: Vec<String>,
}

impl DeleteDraftOutcome {
  pub fn delta(&self) -> HandlerDelta {
    HandlerDelta {
      reason: Some(self.reason.clone()),
      ..HandlerDelta::default()
    }
  }
}

/// Delete the draft release and the snapshot's branches. The caller has
/// already validated state, permission, and the presence of a reason.
pub fn delete_draft(platform: &dyn Platform, facts: &ReleaseFacts, reason: &str) -> BotResult<DeleteDraftOutcome> {
  let draft = facts
    .draft_release
    .as_ref()
    .ok_or_else(|| BotError::message(format!("No draft release found for '{}'", facts.release_tag)))?;

  info!(release_tag = %facts.release_tag, reason, "deleting draft release");
  platform.delete_release(draft.id)?;

  let mut warnings = Vec::new();
  if let Some(snapshot) = &facts.snapshot {
    for branch in [&snapshot.snapshot_branch, &snapshot.review_branch] {
      if !platform.delete_branch(branch)? {
        warnings.push(format!("Branch {} was already gone", branch));
      }
    }
  }

  Ok(DeleteDraftOutcome {
    reason: reason.to_string(),
    warnings,
  })
}

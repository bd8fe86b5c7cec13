//! publish-release handler
//!
//! Publication is a sequence of platform mutations that is not atomic:
//! finalize metadata, flip the draft to published (which creates the tag),
//! optionally mark it latest, create the source-reference tag, clean up
//! branches. A failure mid-sequence reports exactly which steps completed
//! so recovery can resume manually without re-running a step that already
//! mutated state.

use crate::core::config::BotConfig;
use crate::core::context::HandlerDelta;
use crate::core::error::{BotError, BotResult};
use crate::platform::Platform;
use crate::release::metadata::ReleaseMetadata;
use crate::release::state::ReleaseFacts;
use std::fmt;
use tracing::{info, warn};

/// The ordered steps of a publication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
  FindDraft,
  FinalizeMetadata,
  PublishDraft,
  MarkLatest,
  ReferenceTag,
  CleanupBranches,
}

impl PublishStep {
  pub fn as_str(self) -> &'static str {
    match self {
      PublishStep::FindDraft => "find-draft",
      PublishStep::FinalizeMetadata => "finalize-metadata",
      PublishStep::PublishDraft => "publish-draft",
      PublishStep::MarkLatest => "mark-latest",
      PublishStep::ReferenceTag => "reference-tag",
      PublishStep::CleanupBranches => "cleanup-branches",
    }
  }
}

impl fmt::Display for PublishStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Outcome of a publication attempt.
///
/// Partial failures are an outcome, not an error: the caller reports them
/// with the completed-step trail instead of retrying blindly.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
  pub success: bool,
  pub completed: Vec<PublishStep>,
  pub failed_step: Option<PublishStep>,
  pub error_message: String,
  pub release_url: String,
  pub reference_tag: String,
  pub warnings: Vec<String>,
}

impl PublishOutcome {
  fn failure(step: PublishStep, completed: Vec<PublishStep>, err: &BotError, warnings: Vec<String>) -> Self {
    let completed_names: Vec<&str> = completed.iter().map(|s| s.as_str()).collect();
    PublishOutcome {
      success: false,
      completed,
      failed_step: Some(step),
      error_message: format!(
        "Publication failed at step '{}' (completed: [{}]): {}",
        step,
        completed_names.join(", "),
        err
      ),
      release_url: String::new(),
      reference_tag: String::new(),
      warnings,
    }
  }

  pub fn delta(&self) -> HandlerDelta {
    let mut delta = HandlerDelta::default();
    if self.success {
      delta.release_url = Some(self.release_url.clone());
      delta.reference_tag = Some(self.reference_tag.clone());
    } else {
      delta.error_message = Some(self.error_message.clone());
      delta.error_type = Some("publication_failure".to_string());
    }
    delta
  }
}

/// Publish the draft release for the current facts. The caller has already
/// validated state, permission, and the confirm tag.
pub fn publish_release(platform: &dyn Platform, config: &BotConfig, facts: &ReleaseFacts) -> BotResult<PublishOutcome> {
  let release_tag = &facts.release_tag;
  let mut completed = Vec::new();
  let mut warnings = Vec::new();

  // Step 1: the draft must exist (derivation already saw it, but it is the
  // publication's precondition and may have been deleted manually since)
  let Some(draft) = facts.draft_release.clone() else {
    return Ok(PublishOutcome::failure(
      PublishStep::FindDraft,
      completed,
      &BotError::message(format!("No draft release found for '{}'", release_tag)),
      warnings,
    ));
  };
  completed.push(PublishStep::FindDraft);

  let Some(snapshot) = facts.snapshot.clone() else {
    return Ok(PublishOutcome::failure(
      PublishStep::FinalizeMetadata,
      completed,
      &BotError::message("No snapshot branch backs the draft release"),
      warnings,
    ));
  };

  // Step 2: set release_date on the snapshot branch, the single mutation
  // the metadata document ever receives after creation
  if let Err(err) = finalize_metadata(platform, config, &snapshot.snapshot_branch, release_tag) {
    return Ok(PublishOutcome::failure(PublishStep::FinalizeMetadata, completed, &err, warnings));
  }
  completed.push(PublishStep::FinalizeMetadata);

  // Step 3: flip the draft; the platform creates the immutable release tag
  let prerelease = facts.release_type.is_prerelease();
  let published = match platform.publish_release(draft.id, prerelease) {
    Ok(published) => published,
    Err(err) => {
      return Ok(PublishOutcome::failure(PublishStep::PublishDraft, completed, &err, warnings));
    }
  };
  completed.push(PublishStep::PublishDraft);
  info!(%release_tag, url = %published.html_url, "release published");

  // Step 4: only public releases become "latest"; failure is cosmetic
  if !prerelease {
    match platform.mark_release_latest(draft.id) {
      Ok(()) => completed.push(PublishStep::MarkLatest),
      Err(err) => {
        warn!(error = %err, "failed to mark release as latest");
        warnings.push(format!("Could not mark {} as the latest release: {}", release_tag, err));
      }
    }
  }

  // Step 5: immutable source-reference tag at the snapshot's origin commit
  let reference_tag = config.reference_tag(release_tag);
  match platform.tag_exists(&reference_tag) {
    Ok(true) => {
      warnings.push(format!("Reference tag {} already exists", reference_tag));
      completed.push(PublishStep::ReferenceTag);
    }
    Ok(false) => match platform.create_tag(&reference_tag, &snapshot.src_commit_sha) {
      Ok(()) => completed.push(PublishStep::ReferenceTag),
      Err(err) => {
        return Ok(PublishOutcome::failure(PublishStep::ReferenceTag, completed, &err, warnings));
      }
    },
    Err(err) => {
      return Ok(PublishOutcome::failure(PublishStep::ReferenceTag, completed, &err, warnings));
    }
  }

  // Step 6: branch cleanup; each failure is recorded, none aborts
  match platform.delete_branch(&snapshot.snapshot_branch) {
    Ok(true) => {}
    Ok(false) => warnings.push(format!("Snapshot branch {} was already gone", snapshot.snapshot_branch)),
    Err(err) => warnings.push(format!("Failed to delete {}: {}", snapshot.snapshot_branch, err)),
  }
  let published_review = format!("{}-published", snapshot.review_branch);
  match platform.rename_branch(&snapshot.review_branch, &published_review) {
    Ok(true) => {}
    Ok(false) => warnings.push(format!("Review branch {} was already gone", snapshot.review_branch)),
    Err(err) => warnings.push(format!("Failed to rename {}: {}", snapshot.review_branch, err)),
  }
  completed.push(PublishStep::CleanupBranches);

  Ok(PublishOutcome {
    success: true,
    completed,
    failed_step: None,
    error_message: String::new(),
    release_url: published.html_url,
    reference_tag,
    warnings,
  })
}

/// Read, date, and rewrite the metadata document on the snapshot branch
fn finalize_metadata(platform: &dyn Platform, config: &BotConfig, snapshot_branch: &str, release_tag: &str) -> BotResult<()> {
  let path = &config.documents.metadata_file;
  let content = platform
    .file_contents(path, snapshot_branch)?
    .ok_or_else(|| BotError::message(format!("Cannot read {} from {}", path, snapshot_branch)))?;

  let mut metadata = ReleaseMetadata::parse(&content)
    .ok_or_else(|| BotError::message(format!("Unparsable {} on {}", path, snapshot_branch)))?;

  let release_date = metadata.finalize().to_string();
  platform.put_file(
    path,
    &metadata.to_yaml()?,
    &format!("chore: finalize {} for {}", path, release_tag),
    snapshot_branch,
  )?;
  info!(%release_tag, %release_date, "metadata finalized");
  Ok(())
}

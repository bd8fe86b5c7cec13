//! Command handlers driven end to end over the fake platform

use crate::helpers::{FakePlatform, PLAN_RC, TRUNK_SHA, config};
use relay_bot::commands::validate::CommandKind;
use relay_bot::commands::{discard, draft, gating_state, publish, snapshot};
use relay_bot::platform::ArtifactReader;
use relay_bot::release::metadata::ReleaseMetadata;
use relay_bot::release::state::{ReleaseFacts, ReleaseState, StateEngine};

fn derive(platform: &FakePlatform) -> ReleaseFacts {
  let config = config();
  let engine = StateEngine::new(platform, &config);
  engine.derive().unwrap().facts().cloned().expect("valid facts")
}

fn planned_platform() -> FakePlatform {
  FakePlatform::new().with_trunk().with_plan(PLAN_RC)
}

/// Run create-snapshot against a planned release and return the new facts
fn snapshot_platform() -> (FakePlatform, ReleaseFacts) {
  let platform = planned_platform();
  let facts = derive(&platform);
  snapshot::create_snapshot(&platform, &config(), &facts, &[]).unwrap();
  let facts = derive(&platform);
  (platform, facts)
}

#[test]
fn create_snapshot_builds_branches_metadata_and_pr() {
  let platform = planned_platform();
  let facts = derive(&platform);
  assert_eq!(facts.state, ReleaseState::Planned);

  let outcome = snapshot::create_snapshot(&platform, &config(), &facts, &[]).unwrap();
  assert_eq!(outcome.snapshot_id, "r4.1-0123456");
  assert_eq!(outcome.src_commit_sha, TRUNK_SHA);
  assert_eq!(outcome.api_versions.get("location-verification").unwrap(), "3.2.0-rc.1");

  // Generated metadata sits on the snapshot branch with a null release date
  let content = platform
    .file_contents("release-metadata.yaml", "release-snapshot/r4.1-0123456")
    .unwrap()
    .expect("metadata written");
  let metadata = ReleaseMetadata::parse(&content).expect("parsable metadata");
  assert_eq!(metadata.repository.release_date, None);
  assert_eq!(metadata.repository.release_tag, "r4.1");
  assert_eq!(metadata.apis[0].api_version, "3.2.0-rc.1");
  assert_eq!(metadata.dependencies.get("commonalities").unwrap(), "r3.3");

  // The operation moved the lifecycle forward
  let facts = derive(&platform);
  assert_eq!(facts.state, ReleaseState::SnapshotActive);
  let info = facts.snapshot.expect("snapshot facts");
  assert_eq!(info.release_pr.expect("release PR").number, outcome.release_pr.number);
}

#[test]
fn create_snapshot_rolls_back_on_pr_failure() {
  let platform = planned_platform();
  let facts = derive(&platform);

  platform.fail_on("open_pull_request");
  let result = snapshot::create_snapshot(&platform, &config(), &facts, &[]);
  assert!(result.is_err());

  // Atomic-or-rolled-back: neither branch survives the failed attempt
  assert!(platform.branch_head("release-snapshot/r4.1-0123456").unwrap().is_none());
  assert!(platform.branch_head("release-review/r4.1-0123456").unwrap().is_none());
  assert_eq!(derive(&platform).state, ReleaseState::Planned);
}

#[test]
fn create_snapshot_cleans_up_stale_partial_branches() {
  // A crashed attempt left a review branch behind
  let platform = planned_platform().with_branch("release-review/r4.1-aaaaaaa", "aaaaaaa000");
  let facts = derive(&platform);
  assert_eq!(facts.state, ReleaseState::Planned);

  let outcome = snapshot::create_snapshot(&platform, &config(), &facts, &[]).unwrap();
  assert!(outcome.warnings.iter().any(|w| w.contains("release-review/r4.1-aaaaaaa")));
  assert!(platform.branch_head("release-review/r4.1-aaaaaaa").unwrap().is_none());
  assert!(platform.branch_head("release-review/r4.1-0123456").unwrap().is_some());
}

#[test]
fn partial_snapshot_gates_create_snapshot_as_planned() {
  // A crashed attempt left the snapshot branch itself, without metadata
  let platform = planned_platform().with_branch("release-snapshot/r4.1-aaaaaaa", "aaaaaaa000");
  let facts = derive(&platform);
  assert_eq!(facts.state, ReleaseState::SnapshotActive);

  // create-snapshot may retry; everything else gates against the real state
  assert_eq!(gating_state(CommandKind::CreateSnapshot, &facts), ReleaseState::Planned);
  assert_eq!(gating_state(CommandKind::DiscardSnapshot, &facts), ReleaseState::SnapshotActive);

  // The retry removes the leftover and succeeds
  let outcome = snapshot::create_snapshot(&platform, &config(), &facts, &[]).unwrap();
  assert!(outcome.warnings.iter().any(|w| w.contains("r4.1-aaaaaaa")));
  assert!(platform.branch_head("release-snapshot/r4.1-aaaaaaa").unwrap().is_none());
  assert_eq!(derive(&platform).state, ReleaseState::SnapshotActive);
  assert!(derive(&platform).snapshot.unwrap().metadata_present);
}

#[test]
fn version_extension_increments_across_releases() {
  let published_metadata = r#"
repository:
  repository_name: acme/payments-api
  release_tag: r4.0
  release_type: pre-release-rc
  release_date: "2026-01-15T10:00:00Z"
  src_commit_sha: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa
apis:
  - api_name: location-verification
    api_version: 3.2.0-rc.1
"#;
  let platform = planned_platform().with_published("r4.0", published_metadata);
  let config = config();
  let engine = StateEngine::new(&platform, &config);
  let facts = engine.derive().unwrap().facts().cloned().unwrap();

  let history = engine.release_history().unwrap();
  let outcome = snapshot::create_snapshot(&platform, &config, &facts, &history).unwrap();
  assert_eq!(outcome.api_versions.get("location-verification").unwrap(), "3.2.0-rc.2");
}

#[test]
fn discard_snapshot_returns_to_planned() {
  let (platform, facts) = snapshot_platform();
  let info = facts.snapshot.as_ref().unwrap();

  let outcome = discard::discard_snapshot(&platform, info, "rc was cut too early").unwrap();
  assert_eq!(outcome.reason, "rc was cut too early");
  assert_eq!(outcome.deleted_branches.len(), 2);
  assert_eq!(derive(&platform).state, ReleaseState::Planned);
}

#[test]
fn merge_event_creates_draft_and_duplicates_are_inert() {
  let (platform, facts) = snapshot_platform();

  let created = draft::create_draft(&platform, &facts).unwrap();
  assert!(created.draft);
  assert!(created.prerelease);

  let facts = derive(&platform);
  assert_eq!(facts.state, ReleaseState::DraftReady);

  // A duplicate merge event observes draft-ready and must not run the
  // handler again; the guard is the state itself
  assert_ne!(facts.state, ReleaseState::SnapshotActive);
}

#[test]
fn delete_draft_returns_to_planned() {
  let (platform, facts) = snapshot_platform();
  draft::create_draft(&platform, &facts).unwrap();
  let facts = derive(&platform);
  assert_eq!(facts.state, ReleaseState::DraftReady);

  let outcome = draft::delete_draft(&platform, &facts, "wrong release notes").unwrap();
  assert_eq!(outcome.reason, "wrong release notes");

  let facts = derive(&platform);
  assert_eq!(facts.state, ReleaseState::Planned);
  assert!(platform.draft_release("r4.1").unwrap().is_none());
}

#[test]
fn publish_flips_draft_sets_date_and_creates_reference_tag() {
  let (platform, facts) = snapshot_platform();
  draft::create_draft(&platform, &facts).unwrap();
  let facts = derive(&platform);

  let outcome = publish::publish_release(&platform, &config(), &facts).unwrap();
  assert!(outcome.success, "publish failed: {}", outcome.error_message);
  assert_eq!(outcome.reference_tag, "src/r4.1");
  assert!(!outcome.release_url.is_empty());

  // Tag exists, so derivation lands on the terminal state
  assert!(platform.tag_exists("r4.1").unwrap());
  assert!(platform.tag_exists("src/r4.1").unwrap());
  assert_eq!(derive(&platform).state, ReleaseState::Published);

  // The metadata on the published tag carries the finalized date
  let content = platform
    .file_contents("release-metadata.yaml", "r4.1")
    .unwrap()
    .expect("metadata on tag");
  let metadata = ReleaseMetadata::parse(&content).unwrap();
  assert!(metadata.repository.release_date.is_some());

  // Branch cleanup: snapshot gone, review branch renamed
  assert!(platform.branch_head("release-snapshot/r4.1-0123456").unwrap().is_none());
  assert!(platform.branch_head("release-review/r4.1-0123456").unwrap().is_none());
  assert!(
    platform
      .branch_head("release-review/r4.1-0123456-published")
      .unwrap()
      .is_some()
  );
}

#[test]
fn publish_partial_failure_names_the_failed_step() {
  let (platform, facts) = snapshot_platform();
  draft::create_draft(&platform, &facts).unwrap();
  let facts = derive(&platform);

  platform.fail_on("create_tag");
  let outcome = publish::publish_release(&platform, &config(), &facts).unwrap();

  assert!(!outcome.success);
  assert_eq!(outcome.failed_step, Some(publish::PublishStep::ReferenceTag));
  assert!(outcome.completed.contains(&publish::PublishStep::FinalizeMetadata));
  assert!(outcome.completed.contains(&publish::PublishStep::PublishDraft));
  assert!(outcome.error_message.contains("reference-tag"));
  assert!(outcome.error_message.contains("publish-draft"));

  // The draft was already flipped: the release is published even though
  // the sequence did not finish, and recovery must not re-run that step
  assert!(platform.tag_exists("r4.1").unwrap());
  assert!(!platform.tag_exists("src/r4.1").unwrap());
}

#[test]
fn full_lifecycle_walkthrough() {
  let platform = planned_platform();
  let config = config();

  assert_eq!(derive(&platform).state, ReleaseState::Planned);

  let facts = derive(&platform);
  snapshot::create_snapshot(&platform, &config, &facts, &[]).unwrap();
  assert_eq!(derive(&platform).state, ReleaseState::SnapshotActive);

  let facts = derive(&platform);
  draft::create_draft(&platform, &facts).unwrap();
  assert_eq!(derive(&platform).state, ReleaseState::DraftReady);

  let facts = derive(&platform);
  let outcome = publish::publish_release(&platform, &config, &facts).unwrap();
  assert!(outcome.success);
  assert_eq!(derive(&platform).state, ReleaseState::Published);
}

//! State derivation against artifact snapshots

use crate::helpers::{FakePlatform, PLAN_NONE, PLAN_RC, TRUNK_SHA, config};
use relay_bot::core::error::ConfigIssue;
use relay_bot::release::state::{Derived, ReleaseState, StateEngine};

const SNAPSHOT_METADATA: &str = r#"
repository:
  repository_name: acme/payments-api
  release_tag: r4.1
  release_type: pre-release-rc
  release_date: null
  src_commit_sha: 0123456789abcdef0123456789abcdef01234567
  release_notes: ""
apis:
  - api_name: location-verification
    api_version: 3.2.0-rc.1
    api_title: Location Verification
dependencies:
  commonalities: r3.3
"#;

fn snapshot_platform() -> FakePlatform {
  FakePlatform::new()
    .with_trunk()
    .with_plan(PLAN_RC)
    .with_branch("release-snapshot/r4.1-0123456", TRUNK_SHA)
    .with_file("release-snapshot/r4.1-0123456", "release-metadata.yaml", SNAPSHOT_METADATA)
}

#[test]
fn planned_when_only_plan_exists() {
  let platform = FakePlatform::new().with_trunk().with_plan(PLAN_RC);
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  let derived = engine.derive().unwrap();
  let facts = derived.facts().expect("valid facts");
  assert_eq!(facts.state, ReleaseState::Planned);
  assert_eq!(facts.release_tag, "r4.1");
  assert_eq!(facts.meta_release, "Spring26");
  assert!(facts.snapshot.is_none());
  // Declared targets are present, calculated versions are not yet
  assert_eq!(facts.apis.len(), 1);
  assert_eq!(facts.apis[0].target_api_version, "3.2.0");
  assert_eq!(facts.apis[0].api_version, "");
}

#[test]
fn not_planned_when_type_is_none() {
  let platform = FakePlatform::new().with_trunk().with_plan(PLAN_NONE);
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  let facts = engine.derive().unwrap().facts().cloned().expect("valid facts");
  assert_eq!(facts.state, ReleaseState::NotPlanned);
}

#[test]
fn snapshot_active_with_generated_metadata() {
  let platform = snapshot_platform();
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  let derived = engine.derive().unwrap();
  let facts = derived.facts().expect("valid facts");
  assert_eq!(facts.state, ReleaseState::SnapshotActive);

  let snapshot = facts.snapshot.as_ref().expect("snapshot facts");
  assert_eq!(snapshot.snapshot_id, "r4.1-0123456");
  assert_eq!(snapshot.snapshot_branch, "release-snapshot/r4.1-0123456");
  assert_eq!(snapshot.review_branch, "release-review/r4.1-0123456");
  assert_eq!(snapshot.src_commit_sha, TRUNK_SHA);
  assert!(snapshot.metadata_present);

  // Calculated version merged from metadata into the declared target
  assert_eq!(facts.apis[0].api_version, "3.2.0-rc.1");
  assert_eq!(facts.apis[0].target_api_version, "3.2.0");
  assert_eq!(facts.apis[0].api_title, "Location Verification");
}

#[test]
fn draft_ready_when_draft_release_exists() {
  let platform = snapshot_platform().with_draft("r4.1");
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  let derived = engine.derive().unwrap();
  let facts = derived.facts().expect("valid facts");
  assert_eq!(facts.state, ReleaseState::DraftReady);
  assert!(facts.draft_release.is_some());
  assert!(facts.snapshot.is_some());
}

#[test]
fn published_tag_wins_over_snapshot_branch() {
  // Both a published tag and a snapshot branch exist; precedence says
  // published, never snapshot-active
  let platform = snapshot_platform().with_tag("r4.1");
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  let facts = engine.derive().unwrap().facts().cloned().expect("valid facts");
  assert_eq!(facts.state, ReleaseState::Published);
  assert!(facts.snapshot.is_none());
}

#[test]
fn missing_plan_is_a_config_error_not_a_state() {
  let platform = FakePlatform::new().with_trunk();
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  match engine.derive().unwrap() {
    Derived::ConfigError(ConfigIssue::MissingFile { path, reference }) => {
      assert_eq!(path, "release-plan.yaml");
      assert_eq!(reference, "main");
    }
    other => panic!("expected MissingFile, got {:?}", other),
  }
}

#[test]
fn malformed_plan_is_distinct_from_missing() {
  let platform = FakePlatform::new().with_trunk().with_plan("repository: [unclosed");
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  match engine.derive().unwrap() {
    Derived::ConfigError(issue) => assert_eq!(issue.kind(), "malformed"),
    other => panic!("expected config error, got {:?}", other),
  }
}

#[test]
fn missing_required_field_is_distinct_from_malformed() {
  let platform = FakePlatform::new()
    .with_trunk()
    .with_plan("repository:\n  target_release_type: public-release\n");
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  match engine.derive().unwrap() {
    Derived::ConfigError(issue) => {
      assert_eq!(issue.kind(), "missing_field");
      assert!(issue.to_string().contains("target_release_tag"));
    }
    other => panic!("expected config error, got {:?}", other),
  }
}

#[test]
fn derive_is_pure_over_an_unchanged_snapshot() {
  let platform = snapshot_platform().with_draft("r4.1");
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  let first = engine.derive().unwrap();
  let second = engine.derive().unwrap();
  assert_eq!(first, second);
}

#[test]
fn snapshot_branch_without_metadata_is_partial() {
  // Branch exists but the generated document is missing (failed attempt):
  // still snapshot-active per precedence, flagged partial, facts fall back
  // to the branch itself
  let platform = FakePlatform::new()
    .with_trunk()
    .with_plan(PLAN_RC)
    .with_branch("release-snapshot/r4.1-0123456", TRUNK_SHA);
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  let facts = engine.derive().unwrap().facts().cloned().expect("valid facts");
  assert_eq!(facts.state, ReleaseState::SnapshotActive);
  let snapshot = facts.snapshot.expect("snapshot facts");
  assert!(!snapshot.metadata_present);
  assert_eq!(snapshot.src_commit_sha, TRUNK_SHA);
  assert_eq!(facts.release_tag, "r4.1");
}

#[test]
fn release_history_reads_published_metadata() {
  let platform = FakePlatform::new()
    .with_trunk()
    .with_plan(PLAN_RC)
    .with_published("r4.0", SNAPSHOT_METADATA);
  let config = config();
  let engine = StateEngine::new(&platform, &config);

  let history = engine.release_history().unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].apis[0].api_version, "3.2.0-rc.1");
}

//! Tracking-issue reconciliation and the closure policy

use crate::helpers::{FakePlatform, PLAN_NONE, PLAN_RC, TRUNK_SHA, config};
use relay_bot::core::context::{BotContext, HandlerDelta, TriggerInfo};
use relay_bot::issue::sections;
use relay_bot::issue::sync::{IssueSynchronizer, SyncAction};
use relay_bot::platform::ArtifactWriter;
use relay_bot::release::state::{Derived, ReleaseFacts, ReleaseState, StateEngine};

const SNAPSHOT_METADATA: &str = r#"
repository:
  repository_name: acme/payments-api
  release_tag: r4.1
  release_type: pre-release-rc
  release_date: null
  src_commit_sha: 0123456789abcdef0123456789abcdef01234567
apis:
  - api_name: location-verification
    api_version: 3.2.0-rc.1
"#;

fn derive(platform: &FakePlatform) -> ReleaseFacts {
  let config = config();
  StateEngine::new(platform, &config)
    .derive()
    .unwrap()
    .facts()
    .cloned()
    .expect("valid facts")
}

fn context_for(facts: &ReleaseFacts) -> BotContext {
  BotContext::assemble(
    &config(),
    &TriggerInfo::default(),
    Some(&Derived::Facts(facts.clone())),
    &HandlerDelta::default(),
  )
}

fn reconcile(platform: &FakePlatform) -> SyncAction {
  let config = config();
  let facts = derive(platform);
  let ctx = context_for(&facts);
  IssueSynchronizer::new(platform, &config).reconcile(&facts, &ctx).unwrap()
}

#[test]
fn reconcile_creates_issue_when_planned() {
  let platform = FakePlatform::new().with_trunk().with_plan(PLAN_RC);

  let action = reconcile(&platform);
  let SyncAction::Created(number) = action else {
    panic!("expected Created, got {:?}", action);
  };

  let issue = platform.issue(number);
  assert_eq!(issue.title, "Release r4.1 (rc) - Spring26");
  assert!(issue.body.contains(sections::WORKFLOW_MARKER));
  assert!(issue.labels.iter().any(|l| l == "release-issue"));
  assert!(issue.labels.iter().any(|l| l == "release-state:planned"));

  // Required labels were provisioned as a side effect
  assert!(platform.state.borrow().labels.contains("release-state:published"));
}

#[test]
fn reconcile_is_idempotent_when_up_to_date() {
  let platform = FakePlatform::new().with_trunk().with_plan(PLAN_RC);

  let first = reconcile(&platform);
  assert!(matches!(first, SyncAction::Created(_)));

  let second = reconcile(&platform);
  assert_eq!(second, SyncAction::None("up_to_date"));
}

#[test]
fn reconcile_does_nothing_when_not_planned() {
  let platform = FakePlatform::new().with_trunk().with_plan(PLAN_NONE);
  assert_eq!(reconcile(&platform), SyncAction::None("no_planned_release"));
  assert!(platform.state.borrow().issues.is_empty());
}

#[test]
fn reconcile_updates_label_and_sections_on_state_change() {
  let platform = FakePlatform::new().with_trunk().with_plan(PLAN_RC);

  let SyncAction::Created(number) = reconcile(&platform) else {
    panic!("expected Created");
  };

  // The release moves forward: a snapshot appears
  let platform = platform
    .with_branch("release-snapshot/r4.1-0123456", TRUNK_SHA)
    .with_file("release-snapshot/r4.1-0123456", "release-metadata.yaml", SNAPSHOT_METADATA);

  let action = reconcile(&platform);
  assert_eq!(action, SyncAction::Updated(number));

  let issue = platform.issue(number);
  assert!(issue.labels.iter().any(|l| l == "release-state:snapshot-active"));
  assert!(!issue.labels.iter().any(|l| l == "release-state:planned"));

  // Managed sections reflect the new state; human content survives
  let state_section = sections::section_content(&issue.body, sections::SECTION_STATE).unwrap();
  assert!(state_section.contains("snapshot-active"));
  assert!(state_section.contains("r4.1-0123456"));
  let config_section = sections::section_content(&issue.body, sections::SECTION_CONFIG).unwrap();
  assert!(config_section.contains("3.2.0-rc.1"));
  assert!(issue.body.contains("### Release Highlights"));
}

#[test]
fn close_event_reopens_while_snapshot_is_active() {
  let platform = FakePlatform::new().with_trunk().with_plan(PLAN_RC);
  let SyncAction::Created(number) = reconcile(&platform) else {
    panic!("expected Created");
  };

  let platform = platform
    .with_branch("release-snapshot/r4.1-0123456", TRUNK_SHA)
    .with_file("release-snapshot/r4.1-0123456", "release-metadata.yaml", SNAPSHOT_METADATA);
  platform.close_issue(number, "not_planned").unwrap();

  let config = config();
  let facts = derive(&platform);
  let outcome = IssueSynchronizer::new(&platform, &config)
    .handle_close_event(number, &facts)
    .unwrap();

  assert!(outcome.reopened);
  assert!(platform.issue(number).open);
  // The reopen explains itself with a comment
  assert!(platform.state.borrow().comments.iter().any(|(n, _)| *n == number));
}

#[test]
fn close_event_is_respected_in_planned_and_not_planned() {
  for plan in [PLAN_RC, PLAN_NONE] {
    let platform = FakePlatform::new().with_trunk().with_plan(plan);
    let number = platform
      .create_issue(
        "Release r4.1 (rc)",
        &sections::initial_body("r4.1"),
        &["release-issue".to_string()],
      )
      .unwrap()
      .number;
    platform.close_issue(number, "completed").unwrap();

    let config = config();
    let facts = derive(&platform);
    let outcome = IssueSynchronizer::new(&platform, &config)
      .handle_close_event(number, &facts)
      .unwrap();

    assert!(!outcome.reopened);
    assert!(!platform.issue(number).open);
  }
}

#[test]
fn manually_created_issues_are_never_managed() {
  let platform = FakePlatform::new()
    .with_trunk()
    .with_plan(PLAN_RC)
    .with_branch("release-snapshot/r4.1-0123456", TRUNK_SHA)
    .with_file("release-snapshot/r4.1-0123456", "release-metadata.yaml", SNAPSHOT_METADATA);

  // Looks like a release issue, but has no workflow marker
  let number = platform
    .create_issue("Release r4.1 discussion", "let's talk about r4.1", &["release-issue".to_string()])
    .unwrap()
    .number;
  platform.close_issue(number, "completed").unwrap();

  let config = config();
  let facts = derive(&platform);
  let outcome = IssueSynchronizer::new(&platform, &config)
    .handle_close_event(number, &facts)
    .unwrap();

  assert!(!outcome.reopened);
  assert_eq!(outcome.reason, "manual_issue_ignored");
  assert!(!platform.issue(number).open);
}

#[test]
fn close_after_publication_is_terminal() {
  let platform = FakePlatform::new().with_trunk().with_plan(PLAN_RC);
  let SyncAction::Created(number) = reconcile(&platform) else {
    panic!("expected Created");
  };

  // The release publishes
  let platform = platform.with_tag("r4.1");
  let config = config();
  let facts = derive(&platform);
  assert_eq!(facts.state, ReleaseState::Published);

  let mut ctx = context_for(&facts);
  ctx.release_url = "https://example.test/releases/1".to_string();
  ctx.reference_tag = "src/r4.1".to_string();

  IssueSynchronizer::new(&platform, &config)
    .close_after_publication(number, &ctx)
    .unwrap();

  let issue = platform.issue(number);
  assert!(!issue.open);
  assert!(issue.labels.iter().any(|l| l == "release-state:published"));
  let state_section = sections::section_content(&issue.body, sections::SECTION_STATE).unwrap();
  assert!(state_section.contains("src/r4.1"));
}

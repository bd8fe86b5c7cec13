//! Tracking-issue synchronization
//!
//! Reconciles the workflow-owned tracking issue against the derived state:
//! creates it when a release becomes planned, keeps its labels, sections,
//! and title current, and enforces the closure policy. The issue is a
//! projection of derived state, never a source of truth - closing or
//! reopening it changes nothing about the release itself.
//!
//! Manually created issues (no workflow marker in the body) are never
//! touched.

use crate::core::config::BotConfig;
use crate::core::context::BotContext;
use crate::core::error::BotResult;
use crate::issue::sections;
use crate::platform::{IssueFilter, IssueRef, Platform};
use crate::release::state::{ReleaseFacts, ReleaseState};
use tracing::{debug, info};

/// Label carried by every tracking issue
pub const RELEASE_ISSUE_LABEL: &str = "release-issue";

/// Prefix of the per-state labels
pub const STATE_LABEL_PREFIX: &str = "release-state:";

/// Labels the automation requires: (name, color, description)
const REQUIRED_LABELS: [(&str, &str, &str); 6] = [
  ("release-issue", "5319E7", "Release tracking issue managed by automation"),
  ("release-state:planned", "0E8A16", "Release is planned"),
  ("release-state:snapshot-active", "FBCA04", "Release snapshot is active"),
  ("release-state:draft-ready", "1D76DB", "Draft release is ready"),
  ("release-state:published", "0E8A16", "Release has been published"),
  ("release-state:not-planned", "C2C9D1", "No release is currently planned"),
];

/// Reaction to a close event, per state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReaction {
  /// Closing is fine; nothing happens
  None,
  /// Closing is not allowed while work is in flight; reopen
  Reopen,
}

/// Closure policy entry for one state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosurePolicy {
  pub closing_allowed: bool,
  pub reaction: CloseReaction,
}

/// The authoritative closure policy, total over all five states.
///
/// `not_planned` is explicit: closing is fine and nothing reopens; a new
/// issue only appears when the plan later declares a real release again.
pub fn closure_policy(state: ReleaseState) -> ClosurePolicy {
  match state {
    ReleaseState::Planned => ClosurePolicy {
      closing_allowed: true,
      reaction: CloseReaction::None,
    },
    ReleaseState::SnapshotActive => ClosurePolicy {
      closing_allowed: false,
      reaction: CloseReaction::Reopen,
    },
    ReleaseState::DraftReady => ClosurePolicy {
      closing_allowed: false,
      reaction: CloseReaction::Reopen,
    },
    ReleaseState::Published => ClosurePolicy {
      closing_allowed: true,
      reaction: CloseReaction::None,
    },
    ReleaseState::NotPlanned => ClosurePolicy {
      closing_allowed: true,
      reaction: CloseReaction::None,
    },
  }
}

/// What reconciliation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
  Created(u64),
  Updated(u64),
  /// Nothing to do, with the reason ("up_to_date", "no_planned_release", ...)
  None(&'static str),
}

/// Outcome of a close-event evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOutcome {
  pub reopened: bool,
  pub reason: &'static str,
}

/// Tracking-issue synchronizer
pub struct IssueSynchronizer<'a> {
  platform: &'a dyn Platform,
  config: &'a BotConfig,
}

impl<'a> IssueSynchronizer<'a> {
  pub fn new(platform: &'a dyn Platform, config: &'a BotConfig) -> Self {
    Self { platform, config }
  }

  /// Create any missing required labels; idempotent
  pub fn ensure_labels(&self) -> BotResult<Vec<String>> {
    let existing = self.platform.list_labels()?;
    let mut created = Vec::new();
    for (name, color, description) in REQUIRED_LABELS {
      if !existing.iter().any(|l| l == name) {
        self.platform.create_label(name, color, description)?;
        created.push(name.to_string());
      }
    }
    Ok(created)
  }

  /// Find the open workflow-owned issue for a release tag.
  ///
  /// Requires both the marker in the body and the tag in the title, so a
  /// manually created look-alike is never adopted.
  pub fn find_workflow_issue(&self, release_tag: &str) -> BotResult<Option<IssueRef>> {
    let issues = self.platform.list_issues(RELEASE_ISSUE_LABEL, IssueFilter::Open)?;
    Ok(
      issues
        .into_iter()
        .find(|issue| issue.body.contains(sections::WORKFLOW_MARKER) && issue.title.contains(release_tag)),
    )
  }

  /// Ensure the tracking issue exists and reflects the current state
  pub fn reconcile(&self, facts: &ReleaseFacts, ctx: &BotContext) -> BotResult<SyncAction> {
    if facts.release_tag.is_empty() {
      return Ok(SyncAction::None("missing_release_tag"));
    }

    self.ensure_labels()?;

    let existing = self.find_workflow_issue(&facts.release_tag)?;

    let Some(issue) = existing else {
      if facts.state == ReleaseState::Planned {
        let issue = self.create_issue(facts)?;
        self.update_issue(&issue, facts, ctx)?;
        info!(number = issue.number, tag = %facts.release_tag, "tracking issue created");
        return Ok(SyncAction::Created(issue.number));
      }
      debug!(state = %facts.state, "no open issue and state is not planned");
      return Ok(SyncAction::None("no_planned_release"));
    };

    if self.needs_update(&issue, facts) {
      self.update_issue(&issue, facts, ctx)?;
      info!(number = issue.number, state = %facts.state, "tracking issue updated");
      return Ok(SyncAction::Updated(issue.number));
    }

    Ok(SyncAction::None("up_to_date"))
  }

  /// Apply the closure policy to a close event on the given issue.
  ///
  /// Returns what was done; manual issues and allowed closures are left
  /// alone.
  pub fn handle_close_event(&self, issue_number: u64, facts: &ReleaseFacts) -> BotResult<CloseOutcome> {
    let issue = self.platform.issue(issue_number)?;

    if !issue.body.contains(sections::WORKFLOW_MARKER) {
      return Ok(CloseOutcome {
        reopened: false,
        reason: "manual_issue_ignored",
      });
    }

    if issue.open {
      return Ok(CloseOutcome {
        reopened: false,
        reason: "already_open",
      });
    }

    let policy = closure_policy(facts.state);
    match policy.reaction {
      CloseReaction::Reopen => {
        info!(number = issue_number, state = %facts.state, "reopening issue closed mid-release");
        self.platform.reopen_issue(issue_number)?;
        self.platform.comment(
          issue_number,
          &format!(
            "This issue tracks an in-flight release (state `{}`) and was reopened automatically. \
             Use `/discard-snapshot <reason>` or `/delete-draft <reason>` to abandon the release first.",
            facts.state
          ),
        )?;
        Ok(CloseOutcome {
          reopened: true,
          reason: "reopened_active_release",
        })
      }
      CloseReaction::None => Ok(CloseOutcome {
        reopened: false,
        reason: "closure_allowed",
      }),
    }
  }

  /// After a successful publication: final sections, published label,
  /// terminal close
  pub fn close_after_publication(&self, issue_number: u64, ctx: &BotContext) -> BotResult<()> {
    let issue = self.platform.issue(issue_number)?;

    let mut body = sections::update_section(&issue.body, sections::SECTION_STATE, &sections::state_section(ctx));
    body = sections::update_section(&body, sections::SECTION_ACTIONS, &sections::actions_section(ctx));
    if body != issue.body {
      self.platform.update_issue(issue_number, None, Some(&body))?;
    }

    self.swap_state_label(&issue, ReleaseState::Published)?;
    self.platform.close_issue(issue_number, "completed")?;
    info!(number = issue_number, "tracking issue closed after publication");
    Ok(())
  }

  fn create_issue(&self, facts: &ReleaseFacts) -> BotResult<IssueRef> {
    let labels = vec![RELEASE_ISSUE_LABEL.to_string(), ReleaseState::Planned.label()];
    self.platform.create_issue(
      &facts.plan.issue_title(),
      &sections::initial_body(&facts.release_tag),
      &labels,
    )
  }

  fn needs_update(&self, issue: &IssueRef, facts: &ReleaseFacts) -> bool {
    let expected_label = facts.state.label();
    if !issue.labels.iter().any(|l| l == &expected_label) {
      return true;
    }
    issue.title != facts.plan.issue_title()
  }

  fn update_issue(&self, issue: &IssueRef, facts: &ReleaseFacts, ctx: &BotContext) -> BotResult<()> {
    self.swap_state_label(issue, facts.state)?;

    let mut body = sections::update_section(&issue.body, sections::SECTION_STATE, &sections::state_section(ctx));
    body = sections::update_section(&body, sections::SECTION_CONFIG, &sections::config_section(ctx));
    body = sections::update_section(&body, sections::SECTION_ACTIONS, &sections::actions_section(ctx));

    let expected_title = facts.plan.issue_title();
    let new_title = if issue.title != expected_title {
      Some(expected_title.as_str())
    } else {
      None
    };
    let new_body = if body != issue.body { Some(body) } else { None };

    self.platform.update_issue(issue.number, new_title, new_body.as_deref())
  }

  fn swap_state_label(&self, issue: &IssueRef, state: ReleaseState) -> BotResult<()> {
    let expected = state.label();
    let stale: Vec<String> = issue
      .labels
      .iter()
      .filter(|l| l.starts_with(STATE_LABEL_PREFIX) && **l != expected)
      .cloned()
      .collect();
    self.platform.remove_labels(issue.number, &stale)?;
    if !issue.labels.iter().any(|l| l == &expected) {
      self.platform.add_labels(issue.number, &[expected])?;
    }
    Ok(())
  }
}

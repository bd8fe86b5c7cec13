//! Unified bot context - assembled once, consumed by every presentation
//! collaborator
//!
//! # Design
//!
//! Renderers, issue sync, and workflow outputs all read the same structure.
//! Every field is always present with a typed default (empty string, empty
//! list, empty map, or false) so consumers never branch on key presence;
//! "is this meaningful yet" lives in named boolean flags derived from the
//! state field, never set independently of it.
//!
//! Assembly layers, last writer wins:
//! trigger fields < derived state facts < command-handler deltas

use crate::core::config::BotConfig;
use crate::core::error::ConfigIssue;
use crate::release::state::{ApiFacts, Derived, ReleaseFacts};
use serde::Serialize;
use std::collections::BTreeMap;

/// Trigger kinds the workflow reports
pub const TRIGGER_WORKFLOW_DISPATCH: &str = "workflow_dispatch";
pub const TRIGGER_ISSUE_CLOSE: &str = "issue_close";
pub const TRIGGER_RELEASE_PLAN_CHANGE: &str = "release_plan_change";
pub const TRIGGER_MERGE_EVENT: &str = "merge_event";

/// One API entry as rendered in messages and the tracking issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiEntry {
  pub api_name: String,
  pub target_api_version: String,
  pub target_api_status: String,
  pub api_version: String,
  pub api_title: String,
}

impl From<&ApiFacts> for ApiEntry {
  fn from(facts: &ApiFacts) -> Self {
    ApiEntry {
      api_name: facts.api_name.clone(),
      target_api_version: facts.target_api_version.clone(),
      target_api_status: facts.target_api_status.clone(),
      api_version: facts.api_version.clone(),
      api_title: facts.api_title.clone(),
    }
  }
}

/// Metadata about what triggered this invocation
#[derive(Debug, Clone, Default)]
pub struct TriggerInfo {
  pub command: String,
  pub command_args: String,
  pub user: String,
  pub trigger_type: String,
  pub trigger_pr_number: String,
  pub trigger_pr_url: String,
  pub workflow_run_url: String,
}

/// Fields a command handler contributes after executing.
///
/// Only set fields override the base assembly; everything else keeps the
/// derived value.
#[derive(Debug, Clone, Default)]
pub struct HandlerDelta {
  pub snapshot_id: Option<String>,
  pub snapshot_branch: Option<String>,
  pub release_review_branch: Option<String>,
  pub src_commit_sha: Option<String>,
  pub release_pr_number: Option<String>,
  pub release_pr_url: Option<String>,
  pub draft_release_url: Option<String>,
  pub release_url: Option<String>,
  pub reference_tag: Option<String>,
  pub sync_pr_number: Option<String>,
  pub sync_pr_url: Option<String>,
  pub reason: Option<String>,
  pub confirm_tag: Option<String>,
  pub error_message: Option<String>,
  pub error_type: Option<String>,
  pub apis: Option<Vec<ApiEntry>>,
}

/// The complete, default-filled context
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BotContext {
  // Trigger fields
  pub command: String,
  pub command_args: String,
  pub user: String,
  pub trigger_type: String,
  pub trigger_pr_number: String,
  pub trigger_pr_url: String,

  // Issue lifecycle fields
  pub closed_issue_number: String,
  pub closed_issue_url: String,
  pub release_plan_url: String,

  // State fields
  pub release_tag: String,
  pub state: String,
  pub release_type: String,
  pub meta_release: String,
  pub short_type: String,

  // Snapshot fields
  pub snapshot_id: String,
  pub snapshot_branch: String,
  pub snapshot_branch_url: String,
  pub release_review_branch: String,
  pub release_review_branch_url: String,
  pub src_commit_sha: String,
  pub src_commit_sha_short: String,
  pub release_pr_number: String,
  pub release_pr_url: String,

  // API and dependency fields
  pub apis: Vec<ApiEntry>,
  pub dependencies: BTreeMap<String, String>,

  // Error fields
  pub error_message: String,
  pub error_type: String,

  // Derived boolean flags (derive_flags() owns these)
  pub is_missing_file: bool,
  pub is_malformed: bool,
  pub is_missing_field: bool,
  pub state_planned: bool,
  pub state_snapshot_active: bool,
  pub state_draft_ready: bool,
  pub state_published: bool,
  pub state_not_planned: bool,
  pub trigger_workflow_dispatch: bool,
  pub trigger_issue_close: bool,
  pub trigger_release_plan_change: bool,
  pub has_meta_release: bool,
  pub has_reason: bool,

  // Display fields
  pub workflow_run_url: String,
  pub draft_release_url: String,
  pub reason: String,

  // Publication fields
  pub release_url: String,
  pub reference_tag: String,
  pub reference_tag_url: String,
  pub sync_pr_number: String,
  pub sync_pr_url: String,
  pub confirm_tag: String,
}

impl BotContext {
  /// Build the complete context from its three layers.
  ///
  /// Guarantees: every field present with a typed default; boolean flags
  /// consistent with the state/error/trigger fields they derive from.
  pub fn assemble(
    config: &BotConfig,
    trigger: &TriggerInfo,
    derived: Option<&Derived>,
    delta: &HandlerDelta,
  ) -> BotContext {
    let mut ctx = BotContext::default();
    ctx.apply_trigger(trigger);
    if let Some(derived) = derived {
      match derived {
        Derived::Facts(facts) => ctx.apply_facts(config, facts),
        Derived::ConfigError(issue) => ctx.apply_config_error(issue),
      }
    }
    ctx.apply_delta(delta);
    ctx.release_plan_url = repo_file_url(config, &config.documents.plan_file);
    if ctx.reference_tag_url.is_empty() && !ctx.reference_tag.is_empty() {
      ctx.reference_tag_url = repo_tree_url(config, &ctx.reference_tag);
    }
    ctx.derive_flags();
    ctx
  }

  fn apply_trigger(&mut self, trigger: &TriggerInfo) {
    self.command = trigger.command.clone();
    self.command_args = trigger.command_args.clone();
    self.user = trigger.user.clone();
    self.trigger_type = trigger.trigger_type.clone();
    self.trigger_pr_number = trigger.trigger_pr_number.clone();
    self.trigger_pr_url = trigger.trigger_pr_url.clone();
    self.workflow_run_url = trigger.workflow_run_url.clone();
  }

  fn apply_facts(&mut self, config: &BotConfig, facts: &ReleaseFacts) {
    self.release_tag = facts.release_tag.clone();
    self.state = facts.state.as_str().to_string();
    self.release_type = facts.release_type.as_str().to_string();
    self.meta_release = facts.meta_release.clone();
    self.apis = facts.apis.iter().map(ApiEntry::from).collect();
    self.dependencies = facts.dependencies.clone();

    if let Some(snapshot) = &facts.snapshot {
      self.snapshot_id = snapshot.snapshot_id.clone();
      self.snapshot_branch = snapshot.snapshot_branch.clone();
      self.snapshot_branch_url = repo_tree_url(config, &snapshot.snapshot_branch);
      self.release_review_branch = snapshot.review_branch.clone();
      self.release_review_branch_url = repo_tree_url(config, &snapshot.review_branch);
      self.src_commit_sha = snapshot.src_commit_sha.clone();
      if let Some(pr) = &snapshot.release_pr {
        self.release_pr_number = pr.number.to_string();
        self.release_pr_url = pr.html_url.clone();
      }
    }

    if let Some(draft) = &facts.draft_release {
      self.draft_release_url = draft.html_url.clone();
    }
  }

  fn apply_config_error(&mut self, issue: &ConfigIssue) {
    self.error_message = issue.to_string();
    self.error_type = issue.kind().to_string();
  }

  fn apply_delta(&mut self, delta: &HandlerDelta) {
    fn set(target: &mut String, value: &Option<String>) {
      if let Some(value) = value {
        *target = value.clone();
      }
    }

    set(&mut self.snapshot_id, &delta.snapshot_id);
    set(&mut self.snapshot_branch, &delta.snapshot_branch);
    set(&mut self.release_review_branch, &delta.release_review_branch);
    set(&mut self.src_commit_sha, &delta.src_commit_sha);
    set(&mut self.release_pr_number, &delta.release_pr_number);
    set(&mut self.release_pr_url, &delta.release_pr_url);
    set(&mut self.draft_release_url, &delta.draft_release_url);
    set(&mut self.release_url, &delta.release_url);
    set(&mut self.reference_tag, &delta.reference_tag);
    set(&mut self.sync_pr_number, &delta.sync_pr_number);
    set(&mut self.sync_pr_url, &delta.sync_pr_url);
    set(&mut self.reason, &delta.reason);
    set(&mut self.confirm_tag, &delta.confirm_tag);
    set(&mut self.error_message, &delta.error_message);
    set(&mut self.error_type, &delta.error_type);
    if let Some(apis) = &delta.apis {
      self.apis = apis.clone();
    }
  }

  /// Compute boolean flags and derived display fields.
  ///
  /// Flags are a pure function of the string fields; nothing else may set
  /// them, which is what keeps mutually exclusive flags mutually exclusive.
  pub fn derive_flags(&mut self) {
    self.is_missing_file = self.error_type == "missing_file";
    self.is_malformed = self.error_type == "malformed";
    self.is_missing_field = self.error_type == "missing_field";

    self.state_planned = self.state == "planned";
    self.state_snapshot_active = self.state == "snapshot-active";
    self.state_draft_ready = self.state == "draft-ready";
    self.state_published = self.state == "published";
    self.state_not_planned = self.state == "not-planned";

    self.trigger_workflow_dispatch = self.trigger_type == TRIGGER_WORKFLOW_DISPATCH;
    self.trigger_issue_close = self.trigger_type == TRIGGER_ISSUE_CLOSE;
    self.trigger_release_plan_change = self.trigger_type == TRIGGER_RELEASE_PLAN_CHANGE;

    self.has_meta_release = !self.meta_release.is_empty();
    self.has_reason = !self.reason.is_empty();

    if self.short_type.is_empty() {
      self.short_type = short_type(&self.release_type);
    }
    if self.src_commit_sha_short.is_empty() && !self.src_commit_sha.is_empty() {
      self.src_commit_sha_short = self.src_commit_sha.chars().take(7).collect();
    }
  }
}

/// Short display form of a release type string
fn short_type(release_type: &str) -> String {
  match release_type {
    "pre-release-alpha" => "alpha".to_string(),
    "pre-release-rc" => "rc".to_string(),
    "public-release" => "public".to_string(),
    "maintenance-release" => "maintenance".to_string(),
    other => other.to_string(),
  }
}

fn repo_base_url(config: &BotConfig) -> Option<String> {
  let slug = &config.repository.slug;
  if slug.is_empty() {
    None
  } else {
    Some(format!("https://github.com/{}", slug))
  }
}

fn repo_tree_url(config: &BotConfig, branch: &str) -> String {
  repo_base_url(config)
    .map(|base| format!("{}/tree/{}", base, branch))
    .unwrap_or_default()
}

fn repo_file_url(config: &BotConfig, path: &str) -> String {
  repo_base_url(config)
    .map(|base| format!("{}/blob/{}/{}", base, config.repository.trunk, path))
    .unwrap_or_default()
}

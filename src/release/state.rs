//! Release state derivation from repository artifacts
//!
//! The engine examines tags, branches, draft releases, and the release plan
//! document and produces exactly one authoritative state. All reads go
//! through the `ArtifactReader` trait; nothing here mutates anything, and
//! nothing is cached between invocations.
//!
//! Precedence, first match wins:
//! 1. Published tag exists → `Published`
//! 2. Snapshot branch exists → `DraftReady` if a draft release references
//!    it, else `SnapshotActive`
//! 3. Plan document decides: `Planned`, or `NotPlanned` when the declared
//!    type is "none"
//!
//! Configuration problems (missing/malformed/incomplete plan) are returned
//! as a value, not a state: the repository is broken, not unplanned.

use crate::core::config::BotConfig;
use crate::core::error::{BotResult, ConfigIssue};
use crate::platform::{ArtifactReader, PullRequestRef, ReleaseObject};
use crate::release::metadata::ReleaseMetadata;
use crate::release::plan::{ReleasePlan, ReleaseType};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Lifecycle state of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
  Planned,
  SnapshotActive,
  DraftReady,
  Published,
  NotPlanned,
}

impl ReleaseState {
  /// All states, for exhaustive policy tables and tests
  pub const ALL: [ReleaseState; 5] = [
    ReleaseState::Planned,
    ReleaseState::SnapshotActive,
    ReleaseState::DraftReady,
    ReleaseState::Published,
    ReleaseState::NotPlanned,
  ];

  /// Canonical kebab-case form used in labels and context fields
  pub fn as_str(self) -> &'static str {
    match self {
      ReleaseState::Planned => "planned",
      ReleaseState::SnapshotActive => "snapshot-active",
      ReleaseState::DraftReady => "draft-ready",
      ReleaseState::Published => "published",
      ReleaseState::NotPlanned => "not-planned",
    }
  }

  /// Tracking-issue label for this state
  pub fn label(self) -> String {
    format!("release-state:{}", self.as_str())
  }
}

impl fmt::Display for ReleaseState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Facts about the active snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
  /// Unique identifier derived from the branch name ("r4.1-abc1234")
  pub snapshot_id: String,
  /// Full snapshot branch name
  pub snapshot_branch: String,
  /// Review-branch derivative
  pub review_branch: String,
  /// Commit the snapshot was cut from
  pub src_commit_sha: String,
  /// Open release PR for the review branch, when one exists
  pub release_pr: Option<PullRequestRef>,
  /// False when the branch exists but the generated metadata document is
  /// missing: the snapshot is a partial leftover from a failed attempt
  pub metadata_present: bool,
}

/// One API's merged facts: declared targets from the plan overlaid with the
/// calculated results from generated metadata (empty until they exist)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFacts {
  pub api_name: String,
  pub target_api_version: String,
  pub target_api_status: String,
  /// Calculated version; empty string before a snapshot exists
  pub api_version: String,
  pub api_title: String,
}

/// Complete derivation output for one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFacts {
  pub release_tag: String,
  pub state: ReleaseState,
  pub release_type: ReleaseType,
  pub meta_release: String,
  pub snapshot: Option<SnapshotInfo>,
  pub draft_release: Option<ReleaseObject>,
  pub apis: Vec<ApiFacts>,
  pub dependencies: BTreeMap<String, String>,
  /// The plan the facts were derived against, retained for issue sync and
  /// command handlers
  pub plan: ReleasePlan,
}

/// Result of a derivation: valid facts, or a configuration problem that
/// prevents deriving anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derived {
  Facts(ReleaseFacts),
  ConfigError(ConfigIssue),
}

impl Derived {
  pub fn facts(&self) -> Option<&ReleaseFacts> {
    match self {
      Derived::Facts(facts) => Some(facts),
      Derived::ConfigError(_) => None,
    }
  }
}

/// State derivation engine: a pure projection of the artifact snapshot
pub struct StateEngine<'a> {
  reader: &'a dyn ArtifactReader,
  config: &'a BotConfig,
}

impl<'a> StateEngine<'a> {
  pub fn new(reader: &'a dyn ArtifactReader, config: &'a BotConfig) -> Self {
    Self { reader, config }
  }

  /// Derive the current state and its facts.
  ///
  /// Platform failures propagate as errors (the caller's retry layer has
  /// already run); configuration problems come back as
  /// `Derived::ConfigError` for user-facing reporting.
  pub fn derive(&self) -> BotResult<Derived> {
    let plan = match self.read_plan()? {
      Ok(plan) => plan,
      Err(issue) => {
        debug!(kind = issue.kind(), "release plan unusable");
        return Ok(Derived::ConfigError(issue));
      }
    };

    let release_tag = plan.repository.target_release_tag.clone();

    // 1. Published tag wins over everything, including leftover snapshots.
    //    The tag is immutable; its existence is the whole check and the
    //    metadata is not re-read from it.
    if self.reader.tag_exists(&release_tag)? {
      debug!(%release_tag, "published tag exists");
      return Ok(Derived::Facts(self.plan_facts(plan, ReleaseState::Published)));
    }

    // 2. Snapshot branch present: metadata on the branch is authoritative
    //    for the effective tag and calculated versions
    let branches = self.reader.list_branches(&self.config.snapshot_pattern(&release_tag))?;
    if let Some(branch) = branches.first() {
      if branches.len() > 1 {
        warn!(count = branches.len(), %release_tag, "multiple snapshot branches; using the first");
      }
      return self.snapshot_facts(plan, &branch.name, &branch.sha).map(Derived::Facts);
    }

    // 3. No snapshot: the plan decides
    let state = if plan.is_release_planned() {
      ReleaseState::Planned
    } else {
      ReleaseState::NotPlanned
    };
    Ok(Derived::Facts(self.plan_facts(plan, state)))
  }

  /// Metadata documents of every published release, newest first.
  ///
  /// This is the version calculator's history input; releases without a
  /// readable metadata document are skipped.
  pub fn release_history(&self) -> BotResult<Vec<ReleaseMetadata>> {
    let mut history = Vec::new();
    for release in self.reader.published_releases()? {
      match self.read_metadata(&release.tag_name)? {
        Some(metadata) => history.push(metadata),
        None => debug!(tag = %release.tag_name, "published release has no readable metadata"),
      }
    }
    Ok(history)
  }

  /// Facts for states where only the plan contributes (planned,
  /// not-planned, published)
  fn plan_facts(&self, plan: ReleasePlan, state: ReleaseState) -> ReleaseFacts {
    let apis = plan
      .apis
      .iter()
      .map(|api| ApiFacts {
        api_name: api.api_name.clone(),
        target_api_version: api.target_api_version.clone(),
        target_api_status: api.target_api_status.as_str().to_string(),
        api_version: String::new(),
        api_title: String::new(),
      })
      .collect();

    ReleaseFacts {
      release_tag: plan.repository.target_release_tag.clone(),
      state,
      release_type: plan.repository.target_release_type,
      meta_release: plan.repository.meta_release.clone().unwrap_or_default(),
      snapshot: None,
      draft_release: None,
      apis,
      dependencies: plan.dependencies.clone(),
      plan,
    }
  }

  /// Facts for snapshot-active / draft-ready, merging the plan's declared
  /// targets with the generated metadata on the snapshot branch
  fn snapshot_facts(&self, plan: ReleasePlan, branch_name: &str, branch_sha: &str) -> BotResult<ReleaseFacts> {
    let metadata = self.read_metadata(branch_name)?;

    let snapshot_id = branch_name
      .strip_prefix(&self.config.branches.snapshot_prefix)
      .unwrap_or(branch_name)
      .to_string();

    // The metadata's release_tag is authoritative once a snapshot exists;
    // fall back to the tag embedded in the branch name
    let effective_tag = metadata
      .as_ref()
      .map(|m| m.repository.release_tag.clone())
      .filter(|tag| !tag.is_empty())
      .unwrap_or_else(|| {
        snapshot_id
          .split_once('-')
          .map(|(tag, _)| tag.to_string())
          .unwrap_or_else(|| snapshot_id.clone())
      });

    let draft_release = self.reader.draft_release(&effective_tag)?;
    let state = if draft_release.is_some() {
      ReleaseState::DraftReady
    } else {
      ReleaseState::SnapshotActive
    };

    let review_branch = format!("{}{}", self.config.branches.review_prefix, snapshot_id);
    let release_pr = self.reader.pull_request_for_branch(&review_branch)?;

    let src_commit_sha = metadata
      .as_ref()
      .map(|m| m.repository.src_commit_sha.clone())
      .filter(|sha| !sha.is_empty())
      .unwrap_or_else(|| branch_sha.to_string());

    let release_type = metadata
      .as_ref()
      .map(|m| m.repository.release_type)
      .unwrap_or(plan.repository.target_release_type);

    // Declared targets from the plan, calculated results from metadata
    let mut apis: Vec<ApiFacts> = plan
      .apis
      .iter()
      .map(|api| {
        let (api_version, api_title) = metadata
          .as_ref()
          .and_then(|m| m.apis.iter().find(|a| a.api_name == api.api_name))
          .map(|a| (a.api_version.clone(), a.api_title.clone()))
          .unwrap_or_default();
        ApiFacts {
          api_name: api.api_name.clone(),
          target_api_version: api.target_api_version.clone(),
          target_api_status: api.target_api_status.as_str().to_string(),
          api_version,
          api_title,
        }
      })
      .collect();

    // Metadata may carry APIs the plan no longer declares (plan drift
    // after snapshot); surface them rather than dropping them
    if let Some(metadata) = &metadata {
      for api in &metadata.apis {
        if !apis.iter().any(|a| a.api_name == api.api_name) {
          apis.push(ApiFacts {
            api_name: api.api_name.clone(),
            target_api_version: String::new(),
            target_api_status: String::new(),
            api_version: api.api_version.clone(),
            api_title: api.api_title.clone(),
          });
        }
      }
    }

    let mut dependencies = plan.dependencies.clone();
    if let Some(metadata) = &metadata {
      for (name, release) in &metadata.dependencies {
        dependencies.insert(name.clone(), release.clone());
      }
    }

    Ok(ReleaseFacts {
      release_tag: effective_tag,
      state,
      release_type,
      meta_release: plan.repository.meta_release.clone().unwrap_or_default(),
      snapshot: Some(SnapshotInfo {
        snapshot_id,
        snapshot_branch: branch_name.to_string(),
        review_branch,
        src_commit_sha,
        release_pr,
        metadata_present: metadata.is_some(),
      }),
      draft_release,
      apis,
      dependencies,
      plan,
    })
  }

  /// Read and validate the release plan from trunk
  fn read_plan(&self) -> BotResult<Result<ReleasePlan, ConfigIssue>> {
    let path = &self.config.documents.plan_file;
    let trunk = &self.config.repository.trunk;

    let Some(content) = self.reader.file_contents(path, trunk)? else {
      return Ok(Err(ConfigIssue::MissingFile {
        path: path.clone(),
        reference: trunk.clone(),
      }));
    };

    Ok(ReleasePlan::parse(&content, path))
  }

  /// Read the generated metadata document from a branch or tag
  fn read_metadata(&self, reference: &str) -> BotResult<Option<ReleaseMetadata>> {
    let path = &self.config.documents.metadata_file;
    let Some(content) = self.reader.file_contents(path, reference)? else {
      return Ok(None);
    };

    let parsed = ReleaseMetadata::parse(&content);
    if parsed.is_none() {
      warn!(%reference, "unparsable release metadata document");
    }
    Ok(parsed)
  }
}

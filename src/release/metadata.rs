//! Release metadata document (generated facts on the snapshot branch)
//!
//! Written once at snapshot creation; exactly one field (`release_date`)
//! changes afterwards, at publication. Published tags carry the final copy.

use crate::core::error::{BotError, BotResult};
use crate::release::plan::{ReleasePlan, ReleaseType};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The `repository` section of the metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRepository {
  pub repository_name: String,
  pub release_tag: String,
  pub release_type: ReleaseType,
  /// Null until publication; set exactly once
  #[serde(default)]
  pub release_date: Option<String>,
  /// 40-hex commit the snapshot was cut from
  pub src_commit_sha: String,
  #[serde(default)]
  pub release_notes: String,
}

/// One API as released in this snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRelease {
  pub api_name: String,
  /// Calculated version including any pre-release extension
  pub api_version: String,
  #[serde(default)]
  pub api_title: String,
}

/// Parsed release metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
  pub repository: MetadataRepository,
  #[serde(default)]
  pub apis: Vec<ApiRelease>,
  #[serde(default)]
  pub dependencies: BTreeMap<String, String>,
}

impl ReleaseMetadata {
  /// Parse the document; None for unreadable content.
  ///
  /// Unlike the release plan, a broken metadata document is not a
  /// user-reported configuration error: derivation falls back to branch
  /// facts, so the caller only needs presence/absence.
  pub fn parse(content: &str) -> Option<ReleaseMetadata> {
    serde_yaml::from_str(content).ok()
  }

  /// Serialize back to YAML for committing to the snapshot branch
  pub fn to_yaml(&self) -> BotResult<String> {
    serde_yaml::to_string(self).map_err(|e| BotError::message(format!("Failed to serialize metadata: {}", e)))
  }

  /// Generate the document at snapshot-creation time.
  ///
  /// `versions` maps api name to its calculated version; titles come from
  /// the API definitions when the transformer extracted them.
  pub fn generate(
    repository_name: &str,
    plan: &ReleasePlan,
    src_commit_sha: &str,
    versions: &BTreeMap<String, String>,
    titles: &BTreeMap<String, String>,
  ) -> ReleaseMetadata {
    let apis = plan
      .apis
      .iter()
      .map(|api| ApiRelease {
        api_name: api.api_name.clone(),
        api_version: versions.get(&api.api_name).cloned().unwrap_or_default(),
        api_title: titles.get(&api.api_name).cloned().unwrap_or_default(),
      })
      .collect();

    ReleaseMetadata {
      repository: MetadataRepository {
        repository_name: repository_name.to_string(),
        release_tag: plan.repository.target_release_tag.clone(),
        release_type: plan.repository.target_release_type,
        release_date: None,
        src_commit_sha: src_commit_sha.to_string(),
        release_notes: String::new(),
      },
      apis,
      dependencies: plan.dependencies.clone(),
    }
  }

  /// Set the release date (UTC, second precision). An already-set date is
  /// never overwritten.
  pub fn finalize(&mut self) -> &str {
    if self.repository.release_date.is_none() {
      self.repository.release_date = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    self.repository.release_date.as_deref().unwrap_or_default()
  }

  /// Calculated version for an API, if recorded
  pub fn api_version(&self, api_name: &str) -> Option<&str> {
    self
      .apis
      .iter()
      .find(|a| a.api_name == api_name)
      .map(|a| a.api_version.as_str())
  }
}

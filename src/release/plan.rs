//! Release plan document (declared intent, read from trunk)
//!
//! The plan is owned by repository maintainers and only changes through
//! edits on the trunk branch. Parsing distinguishes the three configuration
//! error categories the messaging layer reports: missing file, malformed
//! YAML, missing required field.

use crate::core::error::ConfigIssue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared release type controlling whether and how a release proceeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseType {
  #[serde(rename = "pre-release-alpha")]
  PreReleaseAlpha,
  #[serde(rename = "pre-release-rc")]
  PreReleaseRc,
  #[serde(rename = "public-release")]
  PublicRelease,
  #[serde(rename = "maintenance-release")]
  MaintenanceRelease,
  #[serde(rename = "none")]
  None,
}

impl ReleaseType {
  /// Short display form used in titles and messages
  pub fn short(self) -> &'static str {
    match self {
      ReleaseType::PreReleaseAlpha => "alpha",
      ReleaseType::PreReleaseRc => "rc",
      ReleaseType::PublicRelease => "public",
      ReleaseType::MaintenanceRelease => "maintenance",
      ReleaseType::None => "",
    }
  }

  /// Canonical document form
  pub fn as_str(self) -> &'static str {
    match self {
      ReleaseType::PreReleaseAlpha => "pre-release-alpha",
      ReleaseType::PreReleaseRc => "pre-release-rc",
      ReleaseType::PublicRelease => "public-release",
      ReleaseType::MaintenanceRelease => "maintenance-release",
      ReleaseType::None => "none",
    }
  }

  /// Whether the resulting platform release object is a pre-release
  pub fn is_prerelease(self) -> bool {
    matches!(self, ReleaseType::PreReleaseAlpha | ReleaseType::PreReleaseRc)
  }
}

impl fmt::Display for ReleaseType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Target status for an individual API within a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
  Alpha,
  Rc,
  Public,
}

impl ApiStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      ApiStatus::Alpha => "alpha",
      ApiStatus::Rc => "rc",
      ApiStatus::Public => "public",
    }
  }
}

impl fmt::Display for ApiStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

fn default_api_status() -> ApiStatus {
  ApiStatus::Public
}

/// One API's declared target within the release plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTarget {
  pub api_name: String,
  pub target_api_version: String,
  #[serde(default = "default_api_status")]
  pub target_api_status: ApiStatus,
}

/// The `repository` section of the plan document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRepository {
  pub target_release_tag: String,
  pub target_release_type: ReleaseType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub meta_release: Option<String>,
}

/// Parsed release plan document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasePlan {
  pub repository: PlanRepository,
  #[serde(default)]
  pub apis: Vec<ApiTarget>,
  #[serde(default)]
  pub dependencies: BTreeMap<String, String>,
}

impl ReleasePlan {
  /// Parse and validate the plan document.
  ///
  /// `path` and `reference` only feed the error details; parsing itself is
  /// pure. Absence of the file is the caller's `MissingFile` case — this
  /// function handles the other two categories.
  pub fn parse(content: &str, path: &str) -> Result<ReleasePlan, ConfigIssue> {
    let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| ConfigIssue::Malformed {
      path: path.to_string(),
      detail: e.to_string(),
    })?;

    let mapping = value.as_mapping().ok_or_else(|| ConfigIssue::Malformed {
      path: path.to_string(),
      detail: "document must be a YAML mapping".to_string(),
    })?;

    let repository = mapping
      .get(&serde_yaml::Value::from("repository"))
      .and_then(|v| v.as_mapping())
      .ok_or_else(|| ConfigIssue::MissingField {
        path: path.to_string(),
        field: "repository".to_string(),
      })?;

    for required in ["target_release_tag", "target_release_type"] {
      let present = repository
        .get(&serde_yaml::Value::from(required))
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.is_empty());
      if !present {
        return Err(ConfigIssue::MissingField {
          path: path.to_string(),
          field: format!("repository.{}", required),
        });
      }
    }

    serde_yaml::from_value(value).map_err(|e| ConfigIssue::Malformed {
      path: path.to_string(),
      detail: e.to_string(),
    })
  }

  /// Whether the plan declares a real release (type is not "none")
  pub fn is_release_planned(&self) -> bool {
    self.repository.target_release_type != ReleaseType::None
  }

  /// Standardized tracking-issue title for this plan
  pub fn issue_title(&self) -> String {
    let mut title = format!("Release {}", self.repository.target_release_tag);
    let short = self.repository.target_release_type.short();
    if !short.is_empty() {
      title.push_str(&format!(" ({})", short));
    }
    if let Some(meta) = &self.repository.meta_release {
      if !meta.is_empty() {
        title.push_str(&format!(" - {}", meta));
      }
    }
    title
  }
}

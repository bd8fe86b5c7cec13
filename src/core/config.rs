//! Bot configuration (bot.toml) parsing
//!
//! Every field has a serde default so the bot runs with zero configuration
//! inside a checked-out repository; bot.toml only overrides the defaults.
//! Searched in order: bot.toml, .bot.toml, .config/bot.toml

use crate::core::error::{BotResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for relbot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
  #[serde(default)]
  pub repository: RepositoryConfig,
  #[serde(default)]
  pub documents: DocumentConfig,
  #[serde(default)]
  pub branches: BranchConfig,
  #[serde(default)]
  pub retry: RetryConfig,
}

/// Repository identity and trunk branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
  /// Repository slug ("owner/name"); empty means the gh CLI resolves it
  /// from the working directory
  #[serde(default)]
  pub slug: String,

  /// Trunk branch the release plan is read from
  #[serde(default = "default_trunk")]
  pub trunk: String,
}

fn default_trunk() -> String {
  "main".to_string()
}

impl Default for RepositoryConfig {
  fn default() -> Self {
    Self {
      slug: String::new(),
      trunk: default_trunk(),
    }
  }
}

/// Names of the repository documents the bot reads and writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
  /// Declared release intent, maintained by humans on trunk
  #[serde(default = "default_plan_file")]
  pub plan_file: String,

  /// Generated facts, written to the snapshot branch at snapshot time
  #[serde(default = "default_metadata_file")]
  pub metadata_file: String,
}

fn default_plan_file() -> String {
  "release-plan.yaml".to_string()
}

fn default_metadata_file() -> String {
  "release-metadata.yaml".to_string()
}

impl Default for DocumentConfig {
  fn default() -> Self {
    Self {
      plan_file: default_plan_file(),
      metadata_file: default_metadata_file(),
    }
  }
}

/// Branch and tag naming for snapshots and their derivatives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
  /// Prefix for snapshot branches
  #[serde(default = "default_snapshot_prefix")]
  pub snapshot_prefix: String,

  /// Prefix for release-review branches
  #[serde(default = "default_review_prefix")]
  pub review_prefix: String,

  /// Prefix for the immutable source-reference tag
  #[serde(default = "default_reference_tag_prefix")]
  pub reference_tag_prefix: String,
}

fn default_snapshot_prefix() -> String {
  "release-snapshot/".to_string()
}

fn default_review_prefix() -> String {
  "release-review/".to_string()
}

fn default_reference_tag_prefix() -> String {
  "src/".to_string()
}

impl Default for BranchConfig {
  fn default() -> Self {
    Self {
      snapshot_prefix: default_snapshot_prefix(),
      review_prefix: default_review_prefix(),
      reference_tag_prefix: default_reference_tag_prefix(),
    }
  }
}

/// Retry tuning for transient platform failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
  /// Maximum attempts per platform operation
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,

  /// Base delay in milliseconds, doubled per attempt
  #[serde(default = "default_base_delay_ms")]
  pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
  3
}

fn default_base_delay_ms() -> u64 {
  500
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: default_max_attempts(),
      base_delay_ms: default_base_delay_ms(),
    }
  }
}

impl BotConfig {
  /// Candidate config file locations, relative to the working directory
  const SEARCH_PATHS: [&'static str; 3] = ["bot.toml", ".bot.toml", ".config/bot.toml"];

  /// Load configuration, falling back to defaults when no file exists
  pub fn load(root: &Path) -> BotResult<Self> {
    for candidate in Self::SEARCH_PATHS {
      let path = root.join(candidate);
      if path.is_file() {
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let config: BotConfig =
          toml_edit::de::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
        return Ok(config);
      }
    }
    Ok(BotConfig::default())
  }

  /// Snapshot-branch glob for a release tag (e.g. "release-snapshot/r4.1-*")
  pub fn snapshot_pattern(&self, release_tag: &str) -> String {
    format!("{}{}-*", self.branches.snapshot_prefix, release_tag)
  }

  /// Reference tag name for a release tag (e.g. "src/r4.1")
  pub fn reference_tag(&self, release_tag: &str) -> String {
    format!("{}{}", self.branches.reference_tag_prefix, release_tag)
  }
}

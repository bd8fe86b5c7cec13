//! API version calculation from release history
//!
//! Pre-release versions carry an extension (`3.2.0-rc.2`) distinguishing
//! successive cuts of the same base version and status. The calculator is a
//! pure function over prior release metadata; it never consults the
//! platform itself.

use crate::core::error::{BotError, BotResult, ValidationError};
use crate::release::metadata::ReleaseMetadata;
use crate::release::plan::{ApiStatus, ReleasePlan};
use std::collections::BTreeMap;

/// Calculate the full version string for one API.
///
/// Public targets pass through unchanged. Pre-release targets get the next
/// free extension for their (api, base version, status) tuple. Two history
/// entries claiming the same extension is corrupt data and fails loudly
/// rather than guessing a tie-break.
pub fn calculate(
  api_name: &str,
  target_version: &str,
  target_status: ApiStatus,
  history: &[ReleaseMetadata],
) -> BotResult<String> {
  if target_status == ApiStatus::Public {
    return Ok(target_version.to_string());
  }

  let extensions = existing_extensions(api_name, target_version, target_status, history)?;
  let next = extensions.iter().max().map_or(1, |max| max + 1);
  Ok(format!("{}-{}.{}", target_version, target_status, next))
}

/// Calculate versions for every API declared in the plan
pub fn versions_for_plan(plan: &ReleasePlan, history: &[ReleaseMetadata]) -> BotResult<BTreeMap<String, String>> {
  let mut versions = BTreeMap::new();
  for api in &plan.apis {
    let version = calculate(&api.api_name, &api.target_api_version, api.target_api_status, history)?;
    versions.insert(api.api_name.clone(), version);
  }
  Ok(versions)
}

/// Extensions already used for this (api, base version, status) tuple.
///
/// Fails on duplicates: the sequence must stay strictly increasing and a
/// double entry means the history itself is inconsistent.
fn existing_extensions(
  api_name: &str,
  target_version: &str,
  target_status: ApiStatus,
  history: &[ReleaseMetadata],
) -> BotResult<Vec<u32>> {
  let target = match semver::Version::parse(target_version) {
    Ok(v) => v,
    Err(e) => return Err(BotError::message(format!("Invalid target version '{}': {}", target_version, e))),
  };

  let mut extensions: Vec<u32> = Vec::new();
  for metadata in history {
    for api in &metadata.apis {
      if api.api_name != api_name {
        continue;
      }
      let Some(extension) = parse_extension(&api.api_version, &target, target_status) else {
        continue;
      };
      if extensions.contains(&extension) {
        return Err(BotError::Validation(ValidationError::VersionHistoryConflict {
          api_name: api_name.to_string(),
          version: target_version.to_string(),
          extension,
        }));
      }
      extensions.push(extension);
    }
  }
  Ok(extensions)
}

/// Extension number of `version` when it is a pre-release cut of `target`
/// with the given status; None otherwise. Extension-less entries never
/// match — a pre-release without an extension is malformed history.
fn parse_extension(version: &str, target: &semver::Version, status: ApiStatus) -> Option<u32> {
  let parsed = semver::Version::parse(version).ok()?;
  if (parsed.major, parsed.minor, parsed.patch) != (target.major, target.minor, target.patch) {
    return None;
  }
  let (pre_status, pre_number) = parsed.pre.as_str().split_once('.')?;
  if pre_status != status.as_str() {
    return None;
  }
  pre_number.parse().ok()
}

/// URL version component for an API version.
///
/// Rules: initial versions (major 0) keep the minor (`v0.3`), stable
/// versions use the major alone (`v1`); pre-release status and extension
/// are appended without separators (`v0.3alpha1`, `v1rc3`); anything
/// unparsable, including "wip", maps to `vwip`.
pub fn url_version(api_version: &str) -> String {
  let Ok(parsed) = semver::Version::parse(api_version) else {
    return "vwip".to_string();
  };

  let base = if parsed.major == 0 {
    format!("v0.{}", parsed.minor)
  } else {
    format!("v{}", parsed.major)
  };

  match parsed.pre.as_str().split_once('.') {
    Some((status, extension)) => format!("{}{}{}", base, status, extension),
    None => base,
  }
}

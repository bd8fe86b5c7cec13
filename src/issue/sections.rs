//! Reserved sections in the tracking-issue body
//!
//! The automation only owns content between `<!-- BEGIN:X -->` and
//! `<!-- END:X -->` markers; everything outside them - release highlights,
//! human notes above the managed block - is preserved verbatim. A body
//! without the markers for a section is returned unchanged.

use crate::core::context::BotContext;
use chrono::{SecondsFormat, Utc};

/// Hidden marker identifying automation-managed issues
pub const WORKFLOW_MARKER: &str = "<!-- release-automation:workflow-owned -->";

pub const SECTION_STATE: &str = "STATE";
pub const SECTION_CONFIG: &str = "CONFIG";
pub const SECTION_ACTIONS: &str = "ACTIONS";

fn begin_marker(section: &str) -> String {
  format!("<!-- BEGIN:{} -->", section)
}

fn end_marker(section: &str) -> String {
  format!("<!-- END:{} -->", section)
}

/// Replace the content between a section's markers.
///
/// Returns the body unchanged when the markers are absent or out of order.
pub fn update_section(body: &str, section: &str, content: &str) -> String {
  let begin = begin_marker(section);
  let end = end_marker(section);

  let Some(begin_at) = body.find(&begin) else {
    return body.to_string();
  };
  let after_begin = begin_at + begin.len();
  let Some(end_offset) = body[after_begin..].find(&end) else {
    return body.to_string();
  };
  let end_at = after_begin + end_offset;

  format!("{}\n{}\n{}", &body[..after_begin], content, &body[end_at..])
}

/// Extract a section's current content, if its markers exist
pub fn section_content(body: &str, section: &str) -> Option<String> {
  let begin = begin_marker(section);
  let end = end_marker(section);

  let begin_at = body.find(&begin)?;
  let after_begin = begin_at + begin.len();
  let end_offset = body[after_begin..].find(&end)?;
  Some(body[after_begin..after_begin + end_offset].trim_matches('\n').to_string())
}

fn timestamp() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Scaffold for a brand-new tracking issue: highlights area for humans,
/// then the managed block with all reserved sections
pub fn initial_body(release_tag: &str) -> String {
  format!(
    "{marker}\n<!-- release-automation:release-tag:{tag} -->\n\n\
### Release Highlights\n\n\
_Add release highlights here before creating a snapshot._\n\n\
---\n\
<!-- AUTOMATION MANAGED SECTION - DO NOT EDIT BELOW THIS LINE -->\n\n\
### Release Status\n\
<!-- BEGIN:STATE -->\n\
**State:** `planned` | **Last updated:** {now}\n\
<!-- END:STATE -->\n\n\
<!-- BEGIN:CONFIG -->\n\
_Configuration from the release plan will be shown here._\n\
<!-- END:CONFIG -->\n\n\
<!-- BEGIN:ACTIONS -->\n\
**Valid actions:**<br>-> `/create-snapshot` - begin the release process\n\
<!-- END:ACTIONS -->\n",
    marker = WORKFLOW_MARKER,
    tag = release_tag,
    now = timestamp(),
  )
}

/// STATE section content for the current context
pub fn state_section(ctx: &BotContext) -> String {
  let mut lines = vec![format!("**State:** `{}` | **Last updated:** {}", ctx.state, timestamp())];

  if ctx.state_snapshot_active && !ctx.snapshot_id.is_empty() {
    lines.push(String::new());
    let snapshot = if ctx.snapshot_branch_url.is_empty() {
      format!("`{}`", ctx.snapshot_id)
    } else {
      format!("[{}]({})", ctx.snapshot_id, ctx.snapshot_branch_url)
    };
    lines.push(format!("**Active snapshot:** {}", snapshot));
    if !ctx.release_pr_url.is_empty() {
      lines.push(format!("**Release PR:** {}", ctx.release_pr_url));
    }
  } else if ctx.state_draft_ready && !ctx.draft_release_url.is_empty() {
    lines.push(String::new());
    lines.push(format!("**Draft release:** {}", ctx.draft_release_url));
  } else if ctx.state_published {
    lines.push(String::new());
    if !ctx.release_url.is_empty() {
      lines.push(format!("**Release:** [{}]({})", ctx.release_tag, ctx.release_url));
    }
    if !ctx.reference_tag.is_empty() {
      lines.push(format!("**Reference tag:** `{}`", ctx.reference_tag));
    }
    if !ctx.sync_pr_url.is_empty() {
      lines.push(format!("**Sync PR:** {}", ctx.sync_pr_url));
    }
  }

  lines.join("\n")
}

/// CONFIG section: declared targets, calculated versions, dependencies
pub fn config_section(ctx: &BotContext) -> String {
  let mut lines = Vec::new();

  if !ctx.apis.is_empty() {
    lines.push("| API | Target version | Status | Calculated version |".to_string());
    lines.push("|-----|----------------|--------|--------------------|".to_string());
    for api in &ctx.apis {
      let calculated = if api.api_version.is_empty() { "-" } else { &api.api_version };
      lines.push(format!(
        "| {} | {} | {} | `{}` |",
        api.api_name, api.target_api_version, api.target_api_status, calculated
      ));
    }
  }

  if !ctx.dependencies.is_empty() {
    if !lines.is_empty() {
      lines.push(String::new());
    }
    lines.push("**Dependencies:**".to_string());
    for (name, release) in &ctx.dependencies {
      lines.push(format!("- {}: `{}`", name, release));
    }
  }

  if lines.is_empty() {
    lines.push("_Configuration from the release plan will be shown here._".to_string());
  }

  lines.join("\n")
}

/// ACTIONS section: the commands valid in the current state
pub fn actions_section(ctx: &BotContext) -> String {
  if ctx.state_planned {
    "**Valid actions:**<br>-> `/create-snapshot` - begin the release process".to_string()
  } else if ctx.state_snapshot_active {
    let pr = if ctx.release_pr_url.is_empty() {
      "the release PR".to_string()
    } else {
      format!("[the release PR]({})", ctx.release_pr_url)
    };
    format!(
      "**Valid actions:**<br>-> Merge {} to create the draft release\
       <br>-> `/discard-snapshot <reason>` - discard and return to `planned`",
      pr
    )
  } else if ctx.state_draft_ready {
    format!(
      "**Valid actions:**<br>-> `/publish-release --confirm {}` - publish the release\
       <br>-> `/delete-draft <reason>` - delete the draft and return to `planned`",
      ctx.release_tag
    )
  } else if ctx.state_not_planned {
    "**Valid actions:**<br>-> Update the release plan with a planned release type to resume\
     <br>-> Close this issue - a new one is created when a release is planned again"
      .to_string()
  } else if ctx.state_published {
    "**Valid actions:** No further actions available - the release is published".to_string()
  } else {
    String::new()
  }
}

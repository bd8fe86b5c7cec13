//! `gh` CLI implementation of the platform traits
//!
//! All repository access goes through the authenticated `gh` binary: REST
//! calls via `gh api`, issue and PR operations via the porcelain commands.
//! Transient failures (network, 5xx) are retried with backoff; 404s become
//! `None`/`false` results; other client errors fail fast.

use crate::core::config::{BotConfig, RetryConfig};
use crate::core::error::{BotError, BotResult, PlatformError};
use crate::core::retry;
use base64::Engine;
use serde::Deserialize;
use std::process::Command;
use tracing::debug;

/// Platform client backed by the `gh` CLI
pub struct GhCli {
  /// "owner/name", or empty to let gh resolve from the working directory
  repo: String,
  retry: RetryConfig,
}

/// Outcome of a single gh invocation, before retry classification
enum GhOutcome {
  Ok(String),
  NotFound,
}

impl GhCli {
  pub fn new(config: &BotConfig) -> Self {
    Self {
      repo: config.repository.slug.clone(),
      retry: config.retry.clone(),
    }
  }

  /// REST path prefix; `{owner}/{repo}` placeholders are resolved by gh
  fn repo_path(&self) -> String {
    if self.repo.is_empty() {
      "repos/{owner}/{repo}".to_string()
    } else {
      format!("repos/{}", self.repo)
    }
  }

  /// Extra args selecting the repository for porcelain commands
  fn repo_args(&self) -> Vec<String> {
    if self.repo.is_empty() {
      vec![]
    } else {
      vec!["-R".to_string(), self.repo.clone()]
    }
  }

  /// Run gh once; classify failures into not-found / fail-fast / transient
  fn run_once(&self, args: &[String]) -> BotResult<GhOutcome> {
    debug!(args = ?args, "gh invocation");
    let output = Command::new("gh")
      .args(args)
      .output()
      .map_err(|e| BotError::message(format!("Failed to execute gh: {}", e)))?;

    if output.status.success() {
      return Ok(GhOutcome::Ok(String::from_utf8_lossy(&output.stdout).into_owned()));
    }

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let command = format!("gh {}", args.join(" "));

    if stderr.contains("HTTP 404") || stderr.contains("Not Found") || stderr.contains("no pull requests found") {
      return Ok(GhOutcome::NotFound);
    }

    // Client-side errors will not improve on retry
    let fail_fast = ["HTTP 400", "HTTP 401", "HTTP 403", "HTTP 409", "HTTP 422"];
    if fail_fast.iter().any(|code| stderr.contains(code)) {
      return Err(BotError::Platform(PlatformError::Unexpected {
        operation: command,
        detail: stderr,
      }));
    }

    Err(BotError::Platform(PlatformError::CommandFailed { command, stderr }))
  }

  /// Run gh with retries; Ok(None) means the resource does not exist
  fn run(&self, operation: &str, args: &[String]) -> BotResult<Option<String>> {
    retry::with_backoff(&self.retry, operation, || {
      self.run_once(args).map(|outcome| match outcome {
        GhOutcome::Ok(stdout) => Some(stdout),
        GhOutcome::NotFound => None,
      })
    })
  }

  /// Run gh and require output; a missing resource is an error here
  fn run_required(&self, operation: &str, args: &[String]) -> BotResult<String> {
    self.run(operation, args)?.ok_or_else(|| {
      BotError::Platform(PlatformError::Unexpected {
        operation: operation.to_string(),
        detail: "resource not found".to_string(),
      })
    })
  }

  fn parse<T: for<'de> Deserialize<'de>>(&self, operation: &str, json: &str) -> BotResult<T> {
    serde_json::from_str(json).map_err(|e| {
      BotError::Platform(PlatformError::Unexpected {
        operation: operation.to_string(),
        detail: format!("unparsable response: {}", e),
      })
    })
  }

  fn all_releases(&self) -> BotResult<Vec<GhRelease>> {
    let args = owned(&[
      "api",
      "--paginate",
      &format!("{}/releases?per_page=100", self.repo_path()),
    ]);
    match self.run("list releases", &args)? {
      Some(json) => {
        // --paginate concatenates arrays; gh emits them back to back
        let mut releases = Vec::new();
        let de = serde_json::Deserializer::from_str(&json);
        for page in de.into_iter::<Vec<GhRelease>>() {
          let page = page.map_err(|e| {
            BotError::Platform(PlatformError::Unexpected {
              operation: "list releases".to_string(),
              detail: format!("unparsable page: {}", e),
            })
          })?;
          releases.extend(page);
        }
        Ok(releases)
      }
      None => Ok(vec![]),
    }
  }
}

fn owned(args: &[&str]) -> Vec<String> {
  args.iter().map(|s| s.to_string()).collect()
}

// ── JSON shapes ──

#[derive(Deserialize)]
struct GhBranch {
  name: String,
  commit: GhCommitRef,
}

#[derive(Deserialize)]
struct GhCommitRef {
  sha: String,
}

#[derive(Deserialize)]
struct GhRelease {
  id: u64,
  tag_name: String,
  name: Option<String>,
  html_url: String,
  draft: bool,
  prerelease: bool,
}

impl GhRelease {
  fn into_release(self) -> super::ReleaseObject {
    super::ReleaseObject {
      id: self.id,
      tag_name: self.tag_name,
      name: self.name.unwrap_or_default(),
      html_url: self.html_url,
      draft: self.draft,
      prerelease: self.prerelease,
    }
  }
}

#[derive(Deserialize)]
struct GhIssue {
  number: u64,
  title: String,
  #[serde(default)]
  body: Option<String>,
  #[serde(default)]
  labels: Vec<GhLabel>,
  state: String,
  url: String,
}

#[derive(Deserialize)]
struct GhLabel {
  name: String,
}

impl GhIssue {
  fn into_issue(self) -> super::IssueRef {
    super::IssueRef {
      number: self.number,
      title: self.title,
      body: self.body.unwrap_or_default(),
      labels: self.labels.into_iter().map(|l| l.name).collect(),
      open: self.state.eq_ignore_ascii_case("open"),
      html_url: self.url,
    }
  }
}

#[derive(Deserialize)]
struct GhPr {
  number: u64,
  url: String,
}

#[derive(Deserialize)]
struct GhContentsMeta {
  sha: String,
}

#[derive(Deserialize)]
struct GhPutResponse {
  commit: GhCommitRef,
}

#[derive(Deserialize)]
struct GhLabelName {
  name: String,
}

// ── ArtifactReader ──

impl super::ArtifactReader for GhCli {
  fn tag_exists(&self, tag: &str) -> BotResult<bool> {
    let args = owned(&["api", &format!("{}/git/ref/tags/{}", self.repo_path(), tag)]);
    Ok(self.run("check tag", &args)?.is_some())
  }

  fn list_branches(&self, pattern: &str) -> BotResult<Vec<super::Branch>> {
    let args = owned(&[
      "api",
      "--paginate",
      &format!("{}/branches?per_page=100", self.repo_path()),
    ]);
    let json = match self.run("list branches", &args)? {
      Some(json) => json,
      None => return Ok(vec![]),
    };

    let mut branches = Vec::new();
    let de = serde_json::Deserializer::from_str(&json);
    for page in de.into_iter::<Vec<GhBranch>>() {
      let page = page.map_err(|e| {
        BotError::Platform(PlatformError::Unexpected {
          operation: "list branches".to_string(),
          detail: format!("unparsable page: {}", e),
        })
      })?;
      branches.extend(page.into_iter().filter(|b| super::glob_match(pattern, &b.name)).map(
        |b| super::Branch {
          name: b.name,
          sha: b.commit.sha,
        },
      ));
    }
    Ok(branches)
  }

  fn branch_head(&self, branch: &str) -> BotResult<Option<String>> {
    let args = owned(&["api", &format!("{}/branches/{}", self.repo_path(), branch)]);
    match self.run("branch head", &args)? {
      Some(json) => {
        let parsed: GhBranch = self.parse("branch head", &json)?;
        Ok(Some(parsed.commit.sha))
      }
      None => Ok(None),
    }
  }

  fn draft_release(&self, tag: &str) -> BotResult<Option<super::ReleaseObject>> {
    let found = self
      .all_releases()?
      .into_iter()
      .find(|r| r.draft && r.tag_name == tag);
    Ok(found.map(GhRelease::into_release))
  }

  fn published_releases(&self) -> BotResult<Vec<super::ReleaseObject>> {
    Ok(
      self
        .all_releases()?
        .into_iter()
        .filter(|r| !r.draft)
        .map(GhRelease::into_release)
        .collect(),
    )
  }

  fn file_contents(&self, path: &str, reference: &str) -> BotResult<Option<String>> {
    let args = owned(&[
      "api",
      "-H",
      "Accept: application/vnd.github.raw",
      &format!("{}/contents/{}?ref={}", self.repo_path(), path, reference),
    ]);
    self.run("read file", &args)
  }

  fn pull_request_for_branch(&self, branch: &str) -> BotResult<Option<super::PullRequestRef>> {
    let mut args = self.repo_args();
    args.extend(owned(&[
      "pr",
      "list",
      "--head",
      branch,
      "--state",
      "open",
      "--json",
      "number,url",
    ]));
    match self.run("find pull request", &args)? {
      Some(json) => {
        let prs: Vec<GhPr> = self.parse("find pull request", &json)?;
        Ok(prs.into_iter().next().map(|p| super::PullRequestRef {
          number: p.number,
          html_url: p.url,
        }))
      }
      None => Ok(None),
    }
  }

  fn list_issues(&self, label: &str, filter: super::IssueFilter) -> BotResult<Vec<super::IssueRef>> {
    let mut args = self.repo_args();
    args.extend(owned(&[
      "issue",
      "list",
      "--label",
      label,
      "--state",
      filter.as_str(),
      "--limit",
      "100",
      "--json",
      "number,title,body,labels,state,url",
    ]));
    match self.run("list issues", &args)? {
      Some(json) => {
        let issues: Vec<GhIssue> = self.parse("list issues", &json)?;
        Ok(issues.into_iter().map(GhIssue::into_issue).collect())
      }
      None => Ok(vec![]),
    }
  }

  fn issue(&self, number: u64) -> BotResult<super::IssueRef> {
    let mut args = self.repo_args();
    args.extend(owned(&[
      "issue",
      "view",
      &number.to_string(),
      "--json",
      "number,title,body,labels,state,url",
    ]));
    let json = self.run_required("view issue", &args)?;
    let issue: GhIssue = self.parse("view issue", &json)?;
    Ok(issue.into_issue())
  }

  fn list_labels(&self) -> BotResult<Vec<String>> {
    let mut args = self.repo_args();
    args.extend(owned(&["label", "list", "--limit", "200", "--json", "name"]));
    match self.run("list labels", &args)? {
      Some(json) => {
        let labels: Vec<GhLabelName> = self.parse("list labels", &json)?;
        Ok(labels.into_iter().map(|l| l.name).collect())
      }
      None => Ok(vec![]),
    }
  }
}

// ── ArtifactWriter ──

impl super::ArtifactWriter for GhCli {
  fn create_branch(&self, name: &str, sha: &str) -> BotResult<()> {
    let args = owned(&[
      "api",
      "-X",
      "POST",
      &format!("{}/git/refs", self.repo_path()),
      "-f",
      &format!("ref=refs/heads/{}", name),
      "-f",
      &format!("sha={}", sha),
    ]);
    self.run_required("create branch", &args)?;
    Ok(())
  }

  fn delete_branch(&self, name: &str) -> BotResult<bool> {
    let args = owned(&[
      "api",
      "-X",
      "DELETE",
      &format!("{}/git/refs/heads/{}", self.repo_path(), name),
    ]);
    Ok(self.run("delete branch", &args)?.is_some())
  }

  fn rename_branch(&self, from: &str, to: &str) -> BotResult<bool> {
    let args = owned(&[
      "api",
      "-X",
      "POST",
      &format!("{}/branches/{}/rename", self.repo_path(), from),
      "-f",
      &format!("new_name={}", to),
    ]);
    Ok(self.run("rename branch", &args)?.is_some())
  }

  fn put_file(&self, path: &str, content: &str, message: &str, branch: &str) -> BotResult<String> {
    // The contents API needs the blob sha when replacing an existing file
    let meta_args = owned(&[
      "api",
      &format!("{}/contents/{}?ref={}", self.repo_path(), path, branch),
    ]);
    let existing_sha = match self.run("stat file", &meta_args)? {
      Some(json) => {
        let meta: GhContentsMeta = self.parse("stat file", &json)?;
        Some(meta.sha)
      }
      None => None,
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(content.as_bytes());
    let mut args = owned(&[
      "api",
      "-X",
      "PUT",
      &format!("{}/contents/{}", self.repo_path(), path),
      "-f",
      &format!("message={}", message),
      "-f",
      &format!("content={}", encoded),
      "-f",
      &format!("branch={}", branch),
    ]);
    if let Some(sha) = existing_sha {
      args.push("-f".to_string());
      args.push(format!("sha={}", sha));
    }

    let json = self.run_required("write file", &args)?;
    let response: GhPutResponse = self.parse("write file", &json)?;
    Ok(response.commit.sha)
  }

  fn create_draft_release(
    &self,
    tag: &str,
    name: &str,
    body: &str,
    commitish: &str,
    prerelease: bool,
  ) -> BotResult<super::ReleaseObject> {
    let args = owned(&[
      "api",
      "-X",
      "POST",
      &format!("{}/releases", self.repo_path()),
      "-f",
      &format!("tag_name={}", tag),
      "-f",
      &format!("name={}", name),
      "-f",
      &format!("body={}", body),
      "-f",
      &format!("target_commitish={}", commitish),
      "-F",
      "draft=true",
      "-F",
      &format!("prerelease={}", prerelease),
    ]);
    let json = self.run_required("create draft release", &args)?;
    let release: GhRelease = self.parse("create draft release", &json)?;
    Ok(release.into_release())
  }

  fn publish_release(&self, id: u64, prerelease: bool) -> BotResult<super::ReleaseObject> {
    let args = owned(&[
      "api",
      "-X",
      "PATCH",
      &format!("{}/releases/{}", self.repo_path(), id),
      "-F",
      "draft=false",
      "-F",
      &format!("prerelease={}", prerelease),
    ]);
    let json = self.run_required("publish release", &args)?;
    let release: GhRelease = self.parse("publish release", &json)?;
    Ok(release.into_release())
  }

  fn mark_release_latest(&self, id: u64) -> BotResult<()> {
    // Separate PATCH: the API ignores make_latest while draft=true is being
    // flipped in the same call
    let args = owned(&[
      "api",
      "-X",
      "PATCH",
      &format!("{}/releases/{}", self.repo_path(), id),
      "-f",
      "make_latest=true",
    ]);
    self.run_required("mark latest", &args)?;
    Ok(())
  }

  fn delete_release(&self, id: u64) -> BotResult<()> {
    let args = owned(&["api", "-X", "DELETE", &format!("{}/releases/{}", self.repo_path(), id)]);
    self.run("delete release", &args)?;
    Ok(())
  }

  fn create_tag(&self, tag: &str, sha: &str) -> BotResult<()> {
    let args = owned(&[
      "api",
      "-X",
      "POST",
      &format!("{}/git/refs", self.repo_path()),
      "-f",
      &format!("ref=refs/tags/{}", tag),
      "-f",
      &format!("sha={}", sha),
    ]);
    self.run_required("create tag", &args)?;
    Ok(())
  }

  fn open_pull_request(&self, head: &str, base: &str, title: &str, body: &str) -> BotResult<super::PullRequestRef> {
    let mut args = self.repo_args();
    args.extend(owned(&[
      "pr", "create", "--head", head, "--base", base, "--title", title, "--body", body,
    ]));
    let url = self.run_required("open pull request", &args)?.trim().to_string();
    let number = url
      .rsplit('/')
      .next()
      .and_then(|n| n.parse().ok())
      .ok_or_else(|| {
        BotError::Platform(PlatformError::Unexpected {
          operation: "open pull request".to_string(),
          detail: format!("no PR number in '{}'", url),
        })
      })?;
    Ok(super::PullRequestRef { number, html_url: url })
  }

  fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> BotResult<super::IssueRef> {
    let mut args = self.repo_args();
    args.extend(owned(&["issue", "create", "--title", title, "--body", body]));
    for label in labels {
      args.push("--label".to_string());
      args.push(label.clone());
    }
    let url = self.run_required("create issue", &args)?.trim().to_string();
    let number: u64 = url
      .rsplit('/')
      .next()
      .and_then(|n| n.parse().ok())
      .ok_or_else(|| {
        BotError::Platform(PlatformError::Unexpected {
          operation: "create issue".to_string(),
          detail: format!("no issue number in '{}'", url),
        })
      })?;
    use super::ArtifactReader;
    self.issue(number)
  }

  fn update_issue(&self, number: u64, title: Option<&str>, body: Option<&str>) -> BotResult<()> {
    if title.is_none() && body.is_none() {
      return Ok(());
    }
    let mut args = self.repo_args();
    args.extend(owned(&["issue", "edit", &number.to_string()]));
    if let Some(title) = title {
      args.push("--title".to_string());
      args.push(title.to_string());
    }
    if let Some(body) = body {
      args.push("--body".to_string());
      args.push(body.to_string());
    }
    self.run_required("update issue", &args)?;
    Ok(())
  }

  fn add_labels(&self, number: u64, labels: &[String]) -> BotResult<()> {
    if labels.is_empty() {
      return Ok(());
    }
    let mut args = self.repo_args();
    args.extend(owned(&["issue", "edit", &number.to_string(), "--add-label", &labels.join(",")]));
    self.run_required("add labels", &args)?;
    Ok(())
  }

  fn remove_labels(&self, number: u64, labels: &[String]) -> BotResult<()> {
    if labels.is_empty() {
      return Ok(());
    }
    let mut args = self.repo_args();
    args.extend(owned(&[
      "issue",
      "edit",
      &number.to_string(),
      "--remove-label",
      &labels.join(","),
    ]));
    self.run_required("remove labels", &args)?;
    Ok(())
  }

  fn create_label(&self, name: &str, color: &str, description: &str) -> BotResult<()> {
    let mut args = self.repo_args();
    args.extend(owned(&[
      "label",
      "create",
      name,
      "--color",
      color,
      "--description",
      description,
      "--force",
    ]));
    self.run_required("create label", &args)?;
    Ok(())
  }

  fn close_issue(&self, number: u64, reason: &str) -> BotResult<()> {
    let mut args = self.repo_args();
    args.extend(owned(&["issue", "close", &number.to_string(), "--reason", reason]));
    self.run_required("close issue", &args)?;
    Ok(())
  }

  fn reopen_issue(&self, number: u64) -> BotResult<()> {
    let mut args = self.repo_args();
    args.extend(owned(&["issue", "reopen", &number.to_string()]));
    self.run_required("reopen issue", &args)?;
    Ok(())
  }

  fn comment(&self, number: u64, body: &str) -> BotResult<()> {
    let mut args = self.repo_args();
    args.extend(owned(&["issue", "comment", &number.to_string(), "--body", body]));
    self.run_required("comment", &args)?;
    Ok(())
  }
}

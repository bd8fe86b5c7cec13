//! Hosting-platform abstraction
//!
//! The core never talks to the platform directly; it consumes two traits:
//!
//! - **ArtifactReader**: read-only queries over tags, branches, releases,
//!   documents, and issues. State derivation depends on nothing else.
//! - **ArtifactWriter**: the mutating collaborator surface used by command
//!   handlers and the issue synchronizer.
//!
//! The production implementation shells out to the `gh` CLI (see `gh.rs`);
//! tests substitute an in-memory fake.

pub mod gh;

use crate::core::error::BotResult;

/// A branch with its head commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
  pub name: String,
  pub sha: String,
}

/// A release object (draft or published)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseObject {
  pub id: u64,
  pub tag_name: String,
  pub name: String,
  pub html_url: String,
  pub draft: bool,
  pub prerelease: bool,
}

/// A tracking-issue snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
  pub number: u64,
  pub title: String,
  pub body: String,
  pub labels: Vec<String>,
  pub open: bool,
  pub html_url: String,
}

/// A pull request reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
  pub number: u64,
  pub html_url: String,
}

/// Issue filter for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueFilter {
  Open,
  Closed,
  All,
}

impl IssueFilter {
  pub fn as_str(self) -> &'static str {
    match self {
      IssueFilter::Open => "open",
      IssueFilter::Closed => "closed",
      IssueFilter::All => "all",
    }
  }
}

/// Read-only queries over repository artifacts
///
/// Everything state derivation needs, and nothing more. Implementations
/// must not cache across calls; the engine re-derives from ground truth on
/// every invocation.
pub trait ArtifactReader {
  /// Whether a tag exists
  fn tag_exists(&self, tag: &str) -> BotResult<bool>;

  /// Branches whose name matches a glob with a single trailing `*`
  fn list_branches(&self, pattern: &str) -> BotResult<Vec<Branch>>;

  /// Head commit of a branch, or None if the branch does not exist
  fn branch_head(&self, branch: &str) -> BotResult<Option<String>>;

  /// The draft release for a tag, if one exists
  fn draft_release(&self, tag: &str) -> BotResult<Option<ReleaseObject>>;

  /// All published (non-draft) releases, newest first
  fn published_releases(&self) -> BotResult<Vec<ReleaseObject>>;

  /// Raw contents of a file at a ref, or None if absent
  fn file_contents(&self, path: &str, reference: &str) -> BotResult<Option<String>>;

  /// The open pull request whose head is the given branch
  fn pull_request_for_branch(&self, branch: &str) -> BotResult<Option<PullRequestRef>>;

  /// Issues carrying a label, filtered by open/closed
  fn list_issues(&self, label: &str, filter: IssueFilter) -> BotResult<Vec<IssueRef>>;

  /// A single issue by number
  fn issue(&self, number: u64) -> BotResult<IssueRef>;

  /// Names of all labels defined in the repository
  fn list_labels(&self) -> BotResult<Vec<String>>;
}

/// Mutating collaborator surface
pub trait ArtifactWriter {
  /// Create a branch at a commit
  fn create_branch(&self, name: &str, sha: &str) -> BotResult<()>;

  /// Delete a branch; Ok(false) when it was already gone
  fn delete_branch(&self, name: &str) -> BotResult<bool>;

  /// Rename a branch; Ok(false) when the source was already gone
  fn rename_branch(&self, from: &str, to: &str) -> BotResult<bool>;

  /// Create or replace a file on a branch; returns the commit sha
  fn put_file(&self, path: &str, content: &str, message: &str, branch: &str) -> BotResult<String>;

  /// Create a draft release whose tag will point at the given commitish
  fn create_draft_release(
    &self,
    tag: &str,
    name: &str,
    body: &str,
    commitish: &str,
    prerelease: bool,
  ) -> BotResult<ReleaseObject>;

  /// Flip a draft release to published (this creates the tag)
  fn publish_release(&self, id: u64, prerelease: bool) -> BotResult<ReleaseObject>;

  /// Mark a published release as the repository's latest
  fn mark_release_latest(&self, id: u64) -> BotResult<()>;

  /// Delete a release object (draft deletion never touches tags)
  fn delete_release(&self, id: u64) -> BotResult<()>;

  /// Create a lightweight tag at a commit
  fn create_tag(&self, tag: &str, sha: &str) -> BotResult<()>;

  /// Open a pull request
  fn open_pull_request(&self, head: &str, base: &str, title: &str, body: &str) -> BotResult<PullRequestRef>;

  /// Create an issue with labels; returns the created issue
  fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> BotResult<IssueRef>;

  /// Update title and/or body of an issue
  fn update_issue(&self, number: u64, title: Option<&str>, body: Option<&str>) -> BotResult<()>;

  /// Add labels to an issue
  fn add_labels(&self, number: u64, labels: &[String]) -> BotResult<()>;

  /// Remove labels from an issue
  fn remove_labels(&self, number: u64, labels: &[String]) -> BotResult<()>;

  /// Create a repository label
  fn create_label(&self, name: &str, color: &str, description: &str) -> BotResult<()>;

  /// Close an issue ("completed" or "not_planned" reason)
  fn close_issue(&self, number: u64, reason: &str) -> BotResult<()>;

  /// Reopen a closed issue
  fn reopen_issue(&self, number: u64) -> BotResult<()>;

  /// Post a comment on an issue or pull request
  fn comment(&self, number: u64, body: &str) -> BotResult<()>;
}

/// Combined platform surface for command handlers
pub trait Platform: ArtifactReader + ArtifactWriter {}

impl<T: ArtifactReader + ArtifactWriter> Platform for T {}

/// Match a branch name against a pattern with a single trailing `*`.
///
/// Only the trailing-wildcard form is supported; anything else is an exact
/// match. Shared by the gh client and the test fake so both agree.
pub fn glob_match(pattern: &str, name: &str) -> bool {
  match pattern.strip_suffix('*') {
    Some(prefix) => name.starts_with(prefix),
    None => name == pattern,
  }
}

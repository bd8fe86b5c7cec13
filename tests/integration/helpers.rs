//! Test helpers: an in-memory platform for exercising the core end to end
//!
//! FakePlatform implements both artifact traits over plain maps, with the
//! platform semantics the core depends on (publishing a draft creates its
//! tag, branch renames carry their files). Individual operations can be
//! made to fail for rollback and partial-failure tests.

use relay_bot::core::config::BotConfig;
use relay_bot::core::error::{BotError, BotResult, PlatformError};
use relay_bot::platform::{
  ArtifactReader, ArtifactWriter, Branch, IssueFilter, IssueRef, PullRequestRef, ReleaseObject, glob_match,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

pub const TRUNK_SHA: &str = "0123456789abcdef0123456789abcdef01234567";

pub const PLAN_RC: &str = r#"
repository:
  target_release_tag: r4.1
  target_release_type: pre-release-rc
  meta_release: Spring26
apis:
  - api_name: location-verification
    target_api_version: 3.2.0
    target_api_status: rc
dependencies:
  commonalities: r3.3
"#;

pub const PLAN_NONE: &str = r#"
repository:
  target_release_tag: r4.1
  target_release_type: none
"#;

#[derive(Default)]
pub struct FakeState {
  pub tags: BTreeSet<String>,
  /// branch name → head sha
  pub branches: BTreeMap<String, String>,
  /// (ref, path) → content
  pub files: BTreeMap<(String, String), String>,
  pub releases: Vec<ReleaseObject>,
  /// release id → target commitish
  pub release_commitish: BTreeMap<u64, String>,
  /// head branch → PR
  pub prs: BTreeMap<String, PullRequestRef>,
  pub issues: BTreeMap<u64, IssueRef>,
  pub comments: Vec<(u64, String)>,
  pub labels: BTreeSet<String>,
  next_release_id: u64,
  next_pr_number: u64,
  next_issue_number: u64,
}

pub struct FakePlatform {
  pub state: RefCell<FakeState>,
  /// Operations that fail with a platform error when invoked
  pub fail_ops: RefCell<BTreeSet<&'static str>>,
}

impl FakePlatform {
  pub fn new() -> Self {
    Self {
      state: RefCell::new(FakeState::default()),
      fail_ops: RefCell::new(BTreeSet::new()),
    }
  }

  pub fn fail_on(&self, op: &'static str) {
    self.fail_ops.borrow_mut().insert(op);
  }

  fn check(&self, op: &'static str) -> BotResult<()> {
    if self.fail_ops.borrow().contains(op) {
      return Err(BotError::Platform(PlatformError::Unexpected {
        operation: op.to_string(),
        detail: "injected failure".to_string(),
      }));
    }
    Ok(())
  }

  // ── Scenario builders ──

  pub fn with_trunk(self) -> Self {
    self.state.borrow_mut().branches.insert("main".to_string(), TRUNK_SHA.to_string());
    self
  }

  pub fn with_plan(self, plan: &str) -> Self {
    self
      .state
      .borrow_mut()
      .files
      .insert(("main".to_string(), "release-plan.yaml".to_string()), plan.to_string());
    self
  }

  pub fn with_branch(self, name: &str, sha: &str) -> Self {
    self.state.borrow_mut().branches.insert(name.to_string(), sha.to_string());
    self
  }

  pub fn with_file(self, reference: &str, path: &str, content: &str) -> Self {
    self
      .state
      .borrow_mut()
      .files
      .insert((reference.to_string(), path.to_string()), content.to_string());
    self
  }

  pub fn with_tag(self, tag: &str) -> Self {
    self.state.borrow_mut().tags.insert(tag.to_string());
    self
  }

  pub fn with_draft(self, tag: &str) -> Self {
    let mut state = self.state.borrow_mut();
    state.next_release_id += 1;
    let id = state.next_release_id;
    state.releases.push(ReleaseObject {
      id,
      tag_name: tag.to_string(),
      name: tag.to_string(),
      html_url: format!("https://example.test/releases/{}", id),
      draft: true,
      prerelease: true,
    });
    drop(state);
    self
  }

  /// A published release whose tag carries a metadata document
  pub fn with_published(self, tag: &str, metadata_yaml: &str) -> Self {
    {
      let mut state = self.state.borrow_mut();
      state.next_release_id += 1;
      let id = state.next_release_id;
      state.releases.push(ReleaseObject {
        id,
        tag_name: tag.to_string(),
        name: tag.to_string(),
        html_url: format!("https://example.test/releases/{}", id),
        draft: false,
        prerelease: false,
      });
      state.tags.insert(tag.to_string());
      state
        .files
        .insert((tag.to_string(), "release-metadata.yaml".to_string()), metadata_yaml.to_string());
    }
    self
  }

  pub fn issue(&self, number: u64) -> IssueRef {
    self.state.borrow().issues.get(&number).cloned().expect("issue exists")
  }
}

pub fn config() -> BotConfig {
  let mut config = BotConfig::default();
  config.repository.slug = "acme/payments-api".to_string();
  config
}

impl ArtifactReader for FakePlatform {
  fn tag_exists(&self, tag: &str) -> BotResult<bool> {
    self.check("tag_exists")?;
    Ok(self.state.borrow().tags.contains(tag))
  }

  fn list_branches(&self, pattern: &str) -> BotResult<Vec<Branch>> {
    self.check("list_branches")?;
    Ok(
      self
        .state
        .borrow()
        .branches
        .iter()
        .filter(|(name, _)| glob_match(pattern, name))
        .map(|(name, sha)| Branch {
          name: name.clone(),
          sha: sha.clone(),
        })
        .collect(),
    )
  }

  fn branch_head(&self, branch: &str) -> BotResult<Option<String>> {
    self.check("branch_head")?;
    Ok(self.state.borrow().branches.get(branch).cloned())
  }

  fn draft_release(&self, tag: &str) -> BotResult<Option<ReleaseObject>> {
    self.check("draft_release")?;
    Ok(
      self
        .state
        .borrow()
        .releases
        .iter()
        .find(|r| r.draft && r.tag_name == tag)
        .cloned(),
    )
  }

  fn published_releases(&self) -> BotResult<Vec<ReleaseObject>> {
    self.check("published_releases")?;
    Ok(self.state.borrow().releases.iter().filter(|r| !r.draft).cloned().collect())
  }

  fn file_contents(&self, path: &str, reference: &str) -> BotResult<Option<String>> {
    self.check("file_contents")?;
    Ok(
      self
        .state
        .borrow()
        .files
        .get(&(reference.to_string(), path.to_string()))
        .cloned(),
    )
  }

  fn pull_request_for_branch(&self, branch: &str) -> BotResult<Option<PullRequestRef>> {
    self.check("pull_request_for_branch")?;
    Ok(self.state.borrow().prs.get(branch).cloned())
  }

  fn list_issues(&self, label: &str, filter: IssueFilter) -> BotResult<Vec<IssueRef>> {
    self.check("list_issues")?;
    Ok(
      self
        .state
        .borrow()
        .issues
        .values()
        .filter(|issue| issue.labels.iter().any(|l| l == label))
        .filter(|issue| match filter {
          IssueFilter::Open => issue.open,
          IssueFilter::Closed => !issue.open,
          IssueFilter::All => true,
        })
        .cloned()
        .collect(),
    )
  }

  fn issue(&self, number: u64) -> BotResult<IssueRef> {
    self.check("issue")?;
    self
      .state
      .borrow()
      .issues
      .get(&number)
      .cloned()
      .ok_or_else(|| BotError::message(format!("issue {} not found", number)))
  }

  fn list_labels(&self) -> BotResult<Vec<String>> {
    self.check("list_labels")?;
    Ok(self.state.borrow().labels.iter().cloned().collect())
  }
}

impl ArtifactWriter for FakePlatform {
  fn create_branch(&self, name: &str, sha: &str) -> BotResult<()> {
    self.check("create_branch")?;
    let mut state = self.state.borrow_mut();
    if state.branches.contains_key(name) {
      return Err(BotError::Platform(PlatformError::Unexpected {
        operation: "create branch".to_string(),
        detail: format!("reference already exists: {}", name),
      }));
    }
    state.branches.insert(name.to_string(), sha.to_string());
    Ok(())
  }

  fn delete_branch(&self, name: &str) -> BotResult<bool> {
    self.check("delete_branch")?;
    let mut state = self.state.borrow_mut();
    let existed = state.branches.remove(name).is_some();
    state.files.retain(|(reference, _), _| reference != name);
    Ok(existed)
  }

  fn rename_branch(&self, from: &str, to: &str) -> BotResult<bool> {
    self.check("rename_branch")?;
    let mut state = self.state.borrow_mut();
    let Some(sha) = state.branches.remove(from) else {
      return Ok(false);
    };
    state.branches.insert(to.to_string(), sha);
    let moved: Vec<(String, String)> = state
      .files
      .iter()
      .filter(|((reference, _), _)| reference == from)
      .map(|((_, path), content)| (path.clone(), content.clone()))
      .collect();
    state.files.retain(|(reference, _), _| reference != from);
    for (path, content) in moved {
      state.files.insert((to.to_string(), path), content);
    }
    Ok(true)
  }

  fn put_file(&self, path: &str, content: &str, _message: &str, branch: &str) -> BotResult<String> {
    self.check("put_file")?;
    let mut state = self.state.borrow_mut();
    if !state.branches.contains_key(branch) {
      return Err(BotError::Platform(PlatformError::Unexpected {
        operation: "write file".to_string(),
        detail: format!("branch not found: {}", branch),
      }));
    }
    state
      .files
      .insert((branch.to_string(), path.to_string()), content.to_string());
    Ok(format!("commit-{}-{}", branch, path))
  }

  fn create_draft_release(
    &self,
    tag: &str,
    name: &str,
    _body: &str,
    commitish: &str,
    prerelease: bool,
  ) -> BotResult<ReleaseObject> {
    self.check("create_draft_release")?;
    let mut state = self.state.borrow_mut();
    state.next_release_id += 1;
    let id = state.next_release_id;
    let release = ReleaseObject {
      id,
      tag_name: tag.to_string(),
      name: name.to_string(),
      html_url: format!("https://example.test/releases/{}", id),
      draft: true,
      prerelease,
    };
    state.releases.push(release.clone());
    state.release_commitish.insert(id, commitish.to_string());
    Ok(release)
  }

  fn publish_release(&self, id: u64, prerelease: bool) -> BotResult<ReleaseObject> {
    self.check("publish_release")?;
    let mut state = self.state.borrow_mut();

    let commitish = state.release_commitish.get(&id).cloned();
    let release = state
      .releases
      .iter_mut()
      .find(|r| r.id == id)
      .ok_or_else(|| BotError::message(format!("release {} not found", id)))?;
    release.draft = false;
    release.prerelease = prerelease;
    let published = release.clone();
    let tag = published.tag_name.clone();

    // Publishing materializes the tag, pointing at the draft's commitish;
    // the tag ref sees the same files as that branch
    state.tags.insert(tag.clone());
    if let Some(commitish) = commitish {
      let copied: Vec<(String, String)> = state
        .files
        .iter()
        .filter(|((reference, _), _)| *reference == commitish)
        .map(|((_, path), content)| (path.clone(), content.clone()))
        .collect();
      for (path, content) in copied {
        state.files.insert((tag.clone(), path), content);
      }
    }
    Ok(published)
  }

  fn mark_release_latest(&self, _id: u64) -> BotResult<()> {
    self.check("mark_release_latest")?;
    Ok(())
  }

  fn delete_release(&self, id: u64) -> BotResult<()> {
    self.check("delete_release")?;
    self.state.borrow_mut().releases.retain(|r| r.id != id);
    Ok(())
  }

  fn create_tag(&self, tag: &str, _sha: &str) -> BotResult<()> {
    self.check("create_tag")?;
    self.state.borrow_mut().tags.insert(tag.to_string());
    Ok(())
  }

  fn open_pull_request(&self, head: &str, _base: &str, _title: &str, _body: &str) -> BotResult<PullRequestRef> {
    self.check("open_pull_request")?;
    let mut state = self.state.borrow_mut();
    state.next_pr_number += 1;
    let pr = PullRequestRef {
      number: state.next_pr_number,
      html_url: format!("https://example.test/pull/{}", state.next_pr_number),
    };
    state.prs.insert(head.to_string(), pr.clone());
    Ok(pr)
  }

  fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> BotResult<IssueRef> {
    self.check("create_issue")?;
    let mut state = self.state.borrow_mut();
    state.next_issue_number += 1;
    let issue = IssueRef {
      number: state.next_issue_number,
      title: title.to_string(),
      body: body.to_string(),
      labels: labels.to_vec(),
      open: true,
      html_url: format!("https://example.test/issues/{}", state.next_issue_number),
    };
    state.issues.insert(issue.number, issue.clone());
    Ok(issue)
  }

  fn update_issue(&self, number: u64, title: Option<&str>, body: Option<&str>) -> BotResult<()> {
    self.check("update_issue")?;
    let mut state = self.state.borrow_mut();
    let issue = state
      .issues
      .get_mut(&number)
      .ok_or_else(|| BotError::message(format!("issue {} not found", number)))?;
    if let Some(title) = title {
      issue.title = title.to_string();
    }
    if let Some(body) = body {
      issue.body = body.to_string();
    }
    Ok(())
  }

  fn add_labels(&self, number: u64, labels: &[String]) -> BotResult<()> {
    self.check("add_labels")?;
    let mut state = self.state.borrow_mut();
    let issue = state
      .issues
      .get_mut(&number)
      .ok_or_else(|| BotError::message(format!("issue {} not found", number)))?;
    for label in labels {
      if !issue.labels.contains(label) {
        issue.labels.push(label.clone());
      }
    }
    Ok(())
  }

  fn remove_labels(&self, number: u64, labels: &[String]) -> BotResult<()> {
    self.check("remove_labels")?;
    let mut state = self.state.borrow_mut();
    let issue = state
      .issues
      .get_mut(&number)
      .ok_or_else(|| BotError::message(format!("issue {} not found", number)))?;
    issue.labels.retain(|l| !labels.contains(l));
    Ok(())
  }

  fn create_label(&self, name: &str, _color: &str, _description: &str) -> BotResult<()> {
    self.check("create_label")?;
    self.state.borrow_mut().labels.insert(name.to_string());
    Ok(())
  }

  fn close_issue(&self, number: u64, _reason: &str) -> BotResult<()> {
    self.check("close_issue")?;
    let mut state = self.state.borrow_mut();
    let issue = state
      .issues
      .get_mut(&number)
      .ok_or_else(|| BotError::message(format!("issue {} not found", number)))?;
    issue.open = false;
    Ok(())
  }

  fn reopen_issue(&self, number: u64) -> BotResult<()> {
    self.check("reopen_issue")?;
    let mut state = self.state.borrow_mut();
    let issue = state
      .issues
      .get_mut(&number)
      .ok_or_else(|| BotError::message(format!("issue {} not found", number)))?;
    issue.open = true;
    Ok(())
  }

  fn comment(&self, number: u64, body: &str) -> BotResult<()> {
    self.check("comment")?;
    self.state.borrow_mut().comments.push((number, body.to_string()));
    Ok(())
  }
}

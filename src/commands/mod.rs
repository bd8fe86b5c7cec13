//! Invocation entry points
//!
//! One function per CLI subcommand. Each invocation follows the same
//! shape: gather artifacts, derive state, gate the directive (if any),
//! execute its handler, reconcile the tracking issue, and hand the final
//! context to the presentation layer as JSON on stdout.
//!
//! Mutating invocations first take the per-repository queue so concurrent
//! triggers serialize instead of racing.

pub mod discard;
pub mod draft;
pub mod publish;
pub mod snapshot;
pub mod validate;

use crate::core::config::BotConfig;
use crate::core::context::{BotContext, HandlerDelta, TriggerInfo};
use crate::core::error::{BotError, BotResult};
use crate::core::queue;
use crate::issue::sync::IssueSynchronizer;
use crate::platform::gh::GhCli;
use crate::release::state::{Derived, ReleaseFacts, ReleaseState, StateEngine};
use tracing::{info, warn};
use validate::{Command, CommandKind, Tier};

/// The state a command is gated against.
///
/// Almost always the derived state, with one recovery exception: a snapshot
/// branch without its metadata document is a partial leftover from a failed
/// create-snapshot, so a create-snapshot retry is gated as if the release
/// were still planned - the handler then cleans the leftover up before
/// starting over.
pub fn gating_state(kind: CommandKind, facts: &ReleaseFacts) -> ReleaseState {
  let partial_snapshot = facts.state == ReleaseState::SnapshotActive
    && facts.snapshot.as_ref().is_some_and(|s| !s.metadata_present);
  if kind == CommandKind::CreateSnapshot && partial_snapshot {
    warn!("partial snapshot detected; gating create-snapshot as planned for retry");
    ReleaseState::Planned
  } else {
    facts.state
  }
}

fn setup() -> BotResult<(BotConfig, GhCli)> {
  let root = std::env::current_dir()?;
  let config = BotConfig::load(&root)?;
  let gh = GhCli::new(&config);
  Ok((config, gh))
}

fn queue_name(config: &BotConfig) -> String {
  if config.repository.slug.is_empty() {
    "repository".to_string()
  } else {
    config.repository.slug.clone()
  }
}

fn print_context(ctx: &BotContext) -> BotResult<()> {
  println!("{}", serde_json::to_string_pretty(ctx)?);
  Ok(())
}

/// `relbot state`: derive and report the current release state
pub fn run_state(json: bool) -> BotResult<()> {
  let (config, gh) = setup()?;
  let engine = StateEngine::new(&gh, &config);
  let derived = engine.derive()?;

  if json {
    let ctx = BotContext::assemble(&config, &TriggerInfo::default(), Some(&derived), &HandlerDelta::default());
    return print_context(&ctx);
  }

  match &derived {
    Derived::Facts(facts) => {
      println!("Release:  {}", facts.release_tag);
      println!("State:    {}", facts.state);
      println!("Type:     {}", facts.release_type);
      if let Some(snapshot) = &facts.snapshot {
        println!("Snapshot: {}", snapshot.snapshot_id);
      }
    }
    Derived::ConfigError(issue) => {
      println!("Configuration error ({}): {}", issue.kind(), issue);
    }
  }
  Ok(())
}

/// `relbot context`: assemble and print the full default-filled context
pub fn run_context(trigger: TriggerInfo) -> BotResult<()> {
  let (config, gh) = setup()?;
  let engine = StateEngine::new(&gh, &config);
  let derived = engine.derive()?;
  let ctx = BotContext::assemble(&config, &trigger, Some(&derived), &HandlerDelta::default());
  print_context(&ctx)
}

/// `relbot exec`: parse, gate, and execute a slash command
pub fn run_exec(text: &str, user: &str, tier: Tier) -> BotResult<()> {
  let (config, gh) = setup()?;
  let _queue = queue::acquire(&queue_name(&config))?;

  let engine = StateEngine::new(&gh, &config);
  let derived = engine.derive()?;

  let command = Command::parse(text);

  let mut trigger = TriggerInfo {
    user: user.to_string(),
    trigger_type: crate::core::context::TRIGGER_WORKFLOW_DISPATCH.to_string(),
    ..TriggerInfo::default()
  };
  if let Some(command) = &command {
    trigger.command = command.kind.verb().to_string();
    trigger.command_args = command.args.clone();
  }

  let Some(command) = command else {
    info!("no recognized command in input; ignoring");
    let ctx = BotContext::assemble(&config, &trigger, Some(&derived), &HandlerDelta::default());
    return print_context(&ctx);
  };

  let Derived::Facts(facts) = &derived else {
    // Commands cannot run against a broken plan; the context carries the
    // configuration error for the responder
    let ctx = BotContext::assemble(&config, &trigger, Some(&derived), &HandlerDelta::default());
    return print_context(&ctx);
  };

  let effective_state = gating_state(command.kind, facts);

  if let Err(rejection) = validate::validate(&command, effective_state, tier, user, &facts.release_tag) {
    info!(reason = rejection.kind(), "command rejected");
    let delta = HandlerDelta {
      error_message: Some(rejection.to_string()),
      error_type: Some(rejection.kind().to_string()),
      confirm_tag: command.confirm_tag().map(str::to_string),
      ..HandlerDelta::default()
    };
    let ctx = BotContext::assemble(&config, &trigger, Some(&derived), &delta);
    return print_context(&ctx);
  }

  let delta = match command.kind {
    CommandKind::CreateSnapshot => {
      let history = engine.release_history()?;
      snapshot::create_snapshot(&gh, &config, facts, &history)?.delta()
    }
    CommandKind::DiscardSnapshot => {
      let info = facts
        .snapshot
        .as_ref()
        .ok_or_else(|| BotError::message("No snapshot to discard"))?;
      let reason = command.reason().unwrap_or_default();
      discard::discard_snapshot(&gh, info, reason)?.delta()
    }
    CommandKind::DeleteDraft => {
      let reason = command.reason().unwrap_or_default();
      draft::delete_draft(&gh, facts, reason)?.delta()
    }
    CommandKind::PublishRelease => {
      let outcome = publish::publish_release(&gh, &config, facts)?;
      let mut delta = outcome.delta();
      delta.confirm_tag = command.confirm_tag().map(str::to_string);
      delta
    }
  };

  // Re-derive after the mutation so the tracking issue reconciles against
  // ground truth, not against what the handler believes it did
  let derived_after = engine.derive()?;
  let ctx = BotContext::assemble(&config, &trigger, Some(&derived_after), &delta);

  if let Derived::Facts(after) = &derived_after {
    let synchronizer = IssueSynchronizer::new(&gh, &config);
    if after.state == ReleaseState::Published {
      if let Some(issue) = synchronizer.find_workflow_issue(&after.release_tag)? {
        synchronizer.close_after_publication(issue.number, &ctx)?;
      }
    } else {
      synchronizer.reconcile(after, &ctx)?;
    }
  }

  print_context(&ctx)
}

/// `relbot merge-event`: the release PR merged; cut the draft release
pub fn run_merge_event() -> BotResult<()> {
  let (config, gh) = setup()?;
  let _queue = queue::acquire(&queue_name(&config))?;

  let engine = StateEngine::new(&gh, &config);
  let derived = engine.derive()?;

  let trigger = TriggerInfo {
    trigger_type: crate::core::context::TRIGGER_MERGE_EVENT.to_string(),
    ..TriggerInfo::default()
  };

  let delta = match &derived {
    Derived::Facts(facts) if facts.state == ReleaseState::SnapshotActive => {
      let created = draft::create_draft(&gh, facts)?;
      draft::draft_delta(&created)
    }
    Derived::Facts(facts) => {
      // Duplicate merge events land here once the draft exists; nothing
      // to do is the correct reaction
      info!(state = %facts.state, "merge event outside snapshot-active; ignoring");
      HandlerDelta::default()
    }
    Derived::ConfigError(_) => HandlerDelta::default(),
  };

  let derived_after = engine.derive()?;
  let ctx = BotContext::assemble(&config, &trigger, Some(&derived_after), &delta);

  if let Derived::Facts(after) = &derived_after {
    IssueSynchronizer::new(&gh, &config).reconcile(after, &ctx)?;
  }

  print_context(&ctx)
}

/// `relbot sync-issue`: reconcile the tracking issue with derived state
pub fn run_sync_issue(trigger_pr: Option<u64>) -> BotResult<()> {
  let (config, gh) = setup()?;
  let _queue = queue::acquire(&queue_name(&config))?;

  let engine = StateEngine::new(&gh, &config);
  let derived = engine.derive()?;

  let mut trigger = TriggerInfo {
    trigger_type: crate::core::context::TRIGGER_RELEASE_PLAN_CHANGE.to_string(),
    ..TriggerInfo::default()
  };
  if let Some(pr) = trigger_pr {
    trigger.trigger_pr_number = pr.to_string();
  }

  let ctx = BotContext::assemble(&config, &trigger, Some(&derived), &HandlerDelta::default());

  if let Derived::Facts(facts) = &derived {
    let action = IssueSynchronizer::new(&gh, &config).reconcile(facts, &ctx)?;
    info!(?action, "issue reconciled");
  }

  print_context(&ctx)
}

/// `relbot issue-closed`: apply the closure policy to a close event
pub fn run_issue_closed(issue_number: u64) -> BotResult<()> {
  let (config, gh) = setup()?;
  let _queue = queue::acquire(&queue_name(&config))?;

  let engine = StateEngine::new(&gh, &config);
  let derived = engine.derive()?;

  let trigger = TriggerInfo {
    trigger_type: crate::core::context::TRIGGER_ISSUE_CLOSE.to_string(),
    ..TriggerInfo::default()
  };

  let mut ctx = BotContext::assemble(&config, &trigger, Some(&derived), &HandlerDelta::default());

  if let Derived::Facts(facts) = &derived {
    let synchronizer = IssueSynchronizer::new(&gh, &config);
    let outcome = synchronizer.handle_close_event(issue_number, facts)?;
    info!(reopened = outcome.reopened, reason = outcome.reason, "close event handled");

    let issue = gh_issue_url(&config, issue_number);
    ctx.closed_issue_number = issue_number.to_string();
    ctx.closed_issue_url = issue;
  }

  print_context(&ctx)
}

fn gh_issue_url(config: &BotConfig, number: u64) -> String {
  if config.repository.slug.is_empty() {
    String::new()
  } else {
    format!("https://github.com/{}/issues/{}", config.repository.slug, number)
  }
}

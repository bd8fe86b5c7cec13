//! Slash-command parsing and gating
//!
//! Commands are tagged variants carrying a descriptor (required state,
//! minimum permission tier). The validator consults the descriptor table
//! instead of branching per command name, so adding a mutating command
//! means adding a variant and a table row, not touching the gating logic.
//!
//! Check order is fixed: permission, then state, then confirmation and
//! arguments. A caller below the tier always sees the permission rejection,
//! even when the state is also wrong.

use crate::release::state::ReleaseState;
use std::fmt;
use std::str::FromStr;

/// Permission tier of the calling identity.
///
/// Ordering matters: a higher tier satisfies any lower requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
  Contributor,
  ReleaseManager,
  Codeowner,
}

impl Tier {
  pub fn as_str(self) -> &'static str {
    match self {
      Tier::Contributor => "contributor",
      Tier::ReleaseManager => "release-manager",
      Tier::Codeowner => "codeowner",
    }
  }
}

impl fmt::Display for Tier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Tier {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "contributor" => Ok(Tier::Contributor),
      "release-manager" => Ok(Tier::ReleaseManager),
      "codeowner" => Ok(Tier::Codeowner),
      other => Err(format!("unknown permission tier '{}'", other)),
    }
  }
}

/// The mutating commands the bot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  CreateSnapshot,
  DiscardSnapshot,
  DeleteDraft,
  PublishRelease,
}

impl CommandKind {
  pub const ALL: [CommandKind; 4] = [
    CommandKind::CreateSnapshot,
    CommandKind::DiscardSnapshot,
    CommandKind::DeleteDraft,
    CommandKind::PublishRelease,
  ];

  pub fn verb(self) -> &'static str {
    match self {
      CommandKind::CreateSnapshot => "create-snapshot",
      CommandKind::DiscardSnapshot => "discard-snapshot",
      CommandKind::DeleteDraft => "delete-draft",
      CommandKind::PublishRelease => "publish-release",
    }
  }

  /// Gating descriptor: the single source of truth the validator consults
  pub fn descriptor(self) -> Descriptor {
    match self {
      CommandKind::CreateSnapshot => Descriptor {
        required_state: ReleaseState::Planned,
        min_tier: Tier::Codeowner,
        requires_reason: false,
      },
      CommandKind::DiscardSnapshot => Descriptor {
        required_state: ReleaseState::SnapshotActive,
        min_tier: Tier::ReleaseManager,
        requires_reason: true,
      },
      CommandKind::DeleteDraft => Descriptor {
        required_state: ReleaseState::DraftReady,
        min_tier: Tier::ReleaseManager,
        requires_reason: true,
      },
      CommandKind::PublishRelease => Descriptor {
        required_state: ReleaseState::DraftReady,
        min_tier: Tier::Codeowner,
        requires_reason: false,
      },
    }
  }
}

impl fmt::Display for CommandKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.verb())
  }
}

/// Per-command gating requirements
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
  pub required_state: ReleaseState,
  pub min_tier: Tier,
  pub requires_reason: bool,
}

/// A parsed user directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub kind: CommandKind,
  /// Everything after the verb, trimmed
  pub args: String,
}

impl Command {
  /// Parse the first slash command out of free text.
  ///
  /// Unrecognized verbs are ignored, not rejected: the bot only reacts to
  /// directives it knows.
  pub fn parse(text: &str) -> Option<Command> {
    for line in text.lines() {
      let line = line.trim();
      let Some(rest) = line.strip_prefix('/') else {
        continue;
      };
      let (verb, args) = match rest.split_once(char::is_whitespace) {
        Some((verb, args)) => (verb, args.trim()),
        None => (rest, ""),
      };
      let kind = CommandKind::ALL.into_iter().find(|k| k.verb() == verb)?;
      return Some(Command {
        kind,
        args: args.to_string(),
      });
    }
    None
  }

  /// Audit reason for discard/delete commands
  pub fn reason(&self) -> Option<&str> {
    if self.args.is_empty() { None } else { Some(&self.args) }
  }

  /// Tag supplied via `--confirm <tag>`, if any
  pub fn confirm_tag(&self) -> Option<&str> {
    let rest = self.args.strip_prefix("--confirm")?;
    let tag = rest.trim();
    if tag.is_empty() { None } else { Some(tag) }
  }
}

/// Why a command was not allowed to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
  /// Caller below the minimum tier (reported before any state problem)
  Permission {
    user: String,
    command: CommandKind,
    required: Tier,
  },

  /// Command issued outside its required state
  StateMismatch {
    command: CommandKind,
    current: ReleaseState,
    required: ReleaseState,
  },

  /// publish-release without `--confirm <tag>`
  ConfirmationRequired { expected: String },

  /// Confirm tag does not match the current release tag
  ConfirmMismatch { submitted: String, expected: String },

  /// Discard/delete without an audit reason
  MissingReason { command: CommandKind },
}

impl Rejection {
  /// Stable category string for the context's error_type field
  pub fn kind(&self) -> &'static str {
    match self {
      Rejection::Permission { .. } => "permission",
      Rejection::StateMismatch { .. } => "state_mismatch",
      Rejection::ConfirmationRequired { .. } => "confirmation_required",
      Rejection::ConfirmMismatch { .. } => "confirm_mismatch",
      Rejection::MissingReason { .. } => "missing_reason",
    }
  }
}

impl fmt::Display for Rejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Rejection::Permission { user, command, required } => {
        write!(f, "@{} is not permitted to run /{} (requires {})", user, command, required)
      }
      Rejection::StateMismatch { command, current, required } => {
        write!(
          f,
          "/{} is only valid in the '{}' state; the release is currently '{}'",
          command, required, current
        )
      }
      Rejection::ConfirmationRequired { expected } => {
        write!(
          f,
          "Publication requires confirmation: run `/publish-release --confirm {}`",
          expected
        )
      }
      Rejection::ConfirmMismatch { submitted, expected } => {
        write!(
          f,
          "Confirm tag '{}' does not match the current release tag '{}'",
          submitted, expected
        )
      }
      Rejection::MissingReason { command } => {
        write!(f, "/{} requires a reason for the audit trail", command)
      }
    }
  }
}

/// Gate a command against the current state and the caller's tier.
///
/// `release_tag` is the currently derived tag, used for the publish
/// confirmation check.
pub fn validate(command: &Command, state: ReleaseState, tier: Tier, user: &str, release_tag: &str) -> Result<(), Rejection> {
  let descriptor = command.kind.descriptor();

  if tier < descriptor.min_tier {
    return Err(Rejection::Permission {
      user: user.to_string(),
      command: command.kind,
      required: descriptor.min_tier,
    });
  }

  if state != descriptor.required_state {
    return Err(Rejection::StateMismatch {
      command: command.kind,
      current: state,
      required: descriptor.required_state,
    });
  }

  if descriptor.requires_reason && command.reason().is_none() {
    return Err(Rejection::MissingReason { command: command.kind });
  }

  if command.kind == CommandKind::PublishRelease {
    match command.confirm_tag() {
      None => {
        return Err(Rejection::ConfirmationRequired {
          expected: release_tag.to_string(),
        });
      }
      Some(submitted) if submitted != release_tag => {
        return Err(Rejection::ConfirmMismatch {
          submitted: submitted.to_string(),
          expected: release_tag.to_string(),
        });
      }
      Some(_) => {}
    }
  }

  Ok(())
}

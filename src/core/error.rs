//! Error types for relbot with contextual messages and exit codes
//!
//! The taxonomy mirrors how failures must be handled downstream:
//! configuration, permission, state, and validation errors are user-facing
//! and never retried; platform errors are transient candidates that get
//! bounded retries before being surfaced with a correlation reference.

use std::fmt;
use std::io;

/// Exit codes for relbot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (configuration documents, invalid args)
  User = 1,
  /// System error (platform unreachable, I/O)
  System = 2,
  /// Validation failure (gating, data integrity)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for relbot
#[derive(Debug)]
pub enum BotError {
  /// Release plan document problems (missing, malformed, incomplete)
  Config(ConfigIssue),

  /// Caller below the required permission tier
  Permission {
    user: String,
    command: String,
    required: String,
  },

  /// Command issued outside its required lifecycle state
  State {
    command: String,
    current: String,
    required: String,
  },

  /// Data-integrity and consistency failures
  Validation(ValidationError),

  /// Hosting-platform failures (retried before surfacing)
  Platform(PlatformError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl BotError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    BotError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    BotError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      BotError::Message { message, context, help } => BotError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      BotError::Config(_) => ExitCode::User,
      BotError::Permission { .. } => ExitCode::Validation,
      BotError::State { .. } => ExitCode::Validation,
      BotError::Validation(_) => ExitCode::Validation,
      BotError::Platform(_) => ExitCode::System,
      BotError::Io(_) => ExitCode::System,
      BotError::Message { .. } => ExitCode::User,
    }
  }

  /// True for errors that may succeed on a later attempt.
  ///
  /// Only platform command failures qualify; everything else requires a
  /// human to change something first.
  pub fn is_transient(&self) -> bool {
    matches!(self, BotError::Platform(PlatformError::CommandFailed { .. }))
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      BotError::Config(e) => e.help_message(),
      BotError::Permission { required, .. } => Some(format!(
        "Ask a {} to run this command, or request the required permission.",
        required
      )),
      BotError::State { required, .. } => {
        Some(format!("This command is only valid in the '{}' state.", required))
      }
      BotError::Validation(e) => e.help_message(),
      BotError::Platform(e) => e.help_message(),
      BotError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for BotError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BotError::Config(e) => write!(f, "{}", e),
      BotError::Permission { user, command, required } => {
        write!(
          f,
          "@{} is not permitted to run /{} (requires {})",
          user, command, required
        )
      }
      BotError::State { command, current, required } => {
        write!(
          f,
          "/{} is not valid in the '{}' state (requires '{}')",
          command, current, required
        )
      }
      BotError::Validation(e) => write!(f, "{}", e),
      BotError::Platform(e) => write!(f, "{}", e),
      BotError::Io(e) => write!(f, "I/O error: {}", e),
      BotError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for BotError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      BotError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for BotError {
  fn from(err: io::Error) -> Self {
    BotError::Io(err)
  }
}

impl From<String> for BotError {
  fn from(msg: String) -> Self {
    BotError::message(msg)
  }
}

impl From<&str> for BotError {
  fn from(msg: &str) -> Self {
    BotError::message(msg)
  }
}

impl From<serde_json::Error> for BotError {
  fn from(err: serde_json::Error) -> Self {
    BotError::message(format!("JSON error: {}", err))
  }
}

impl From<toml_edit::TomlError> for BotError {
  fn from(err: toml_edit::TomlError) -> Self {
    BotError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for BotError {
  fn from(err: toml_edit::de::Error) -> Self {
    BotError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<semver::Error> for BotError {
  fn from(err: semver::Error) -> Self {
    BotError::message(format!("Version parse error: {}", err))
  }
}

impl From<std::str::Utf8Error> for BotError {
  fn from(err: std::str::Utf8Error) -> Self {
    BotError::message(format!("UTF-8 error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for BotError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    BotError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// Release plan document problems
///
/// These are a value-level outcome of state derivation, not only an error:
/// the derivation engine returns them so the configuration problem can be
/// surfaced to the user with the exact category the messaging layer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
  /// Document not found on the given ref
  MissingFile { path: String, reference: String },

  /// Document exists but does not parse as a YAML mapping
  Malformed { path: String, detail: String },

  /// Required field absent
  MissingField { path: String, field: String },
}

impl ConfigIssue {
  /// Stable category string consumed by the messaging layer
  pub fn kind(&self) -> &'static str {
    match self {
      ConfigIssue::MissingFile { .. } => "missing_file",
      ConfigIssue::Malformed { .. } => "malformed",
      ConfigIssue::MissingField { .. } => "missing_field",
    }
  }

  fn help_message(&self) -> Option<String> {
    match self {
      ConfigIssue::MissingFile { path, reference } => Some(format!(
        "Commit a {} to the {} branch to plan a release.",
        path, reference
      )),
      ConfigIssue::Malformed { path, .. } => {
        Some(format!("Fix the YAML syntax in {} and push again.", path))
      }
      ConfigIssue::MissingField { field, .. } => {
        Some(format!("Add the required '{}' field and push again.", field))
      }
    }
  }
}

impl fmt::Display for ConfigIssue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigIssue::MissingFile { path, reference } => {
        write!(f, "No {} found on {}", path, reference)
      }
      ConfigIssue::Malformed { path, detail } => {
        write!(f, "Invalid YAML in {}: {}", path, detail)
      }
      ConfigIssue::MissingField { path, field } => {
        write!(f, "Missing '{}' in {}", field, path)
      }
    }
  }
}

/// Data-integrity and consistency failures
#[derive(Debug)]
pub enum ValidationError {
  /// Two historical releases claim the same version extension
  VersionHistoryConflict {
    api_name: String,
    version: String,
    extension: u32,
  },

  /// Command requires a reason argument for the audit trail
  MissingReason { command: String },

  /// Release plan failed a downstream consistency check
  PlanInconsistent { detail: String },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::VersionHistoryConflict { .. } => Some(
        "Release history is corrupt; inspect the published release metadata before retrying.".to_string(),
      ),
      ValidationError::MissingReason { command } => {
        Some(format!("Provide a reason, e.g. `/{} found a blocking bug`.", command))
      }
      ValidationError::PlanInconsistent { .. } => None,
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::VersionHistoryConflict { api_name, version, extension } => {
        write!(
          f,
          "Release history conflict: multiple releases of {} claim {}-*.{}",
          api_name, version, extension
        )
      }
      ValidationError::MissingReason { command } => {
        write!(f, "/{} requires a reason", command)
      }
      ValidationError::PlanInconsistent { detail } => {
        write!(f, "Release plan inconsistency: {}", detail)
      }
    }
  }
}

/// Hosting-platform failures
#[derive(Debug)]
pub enum PlatformError {
  /// Platform CLI invocation failed
  CommandFailed { command: String, stderr: String },

  /// Transient failure persisted through all retry attempts
  Unreachable {
    operation: String,
    attempts: u32,
    correlation: String,
  },

  /// Platform returned something the client cannot interpret
  Unexpected { operation: String, detail: String },
}

impl PlatformError {
  fn help_message(&self) -> Option<String> {
    match self {
      PlatformError::CommandFailed { stderr, .. } => {
        if stderr.contains("auth") || stderr.contains("401") || stderr.contains("403") {
          Some("Check `gh auth status` and the token's repository scopes.".to_string())
        } else {
          None
        }
      }
      PlatformError::Unreachable { correlation, .. } => Some(format!(
        "Transient platform failure; report correlation reference {} if it persists.",
        correlation
      )),
      PlatformError::Unexpected { .. } => None,
    }
  }
}

impl fmt::Display for PlatformError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PlatformError::CommandFailed { command, stderr } => {
        write!(f, "Platform command failed: {}\n{}", command, stderr)
      }
      PlatformError::Unreachable { operation, attempts, correlation } => {
        write!(
          f,
          "Platform unreachable during {} after {} attempts (ref {})",
          operation, attempts, correlation
        )
      }
      PlatformError::Unexpected { operation, detail } => {
        write!(f, "Unexpected platform response during {}: {}", operation, detail)
      }
    }
  }
}

/// Result type alias for relbot
pub type BotResult<T> = Result<T, BotError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> BotResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> BotResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<BotError>,
{
  fn context(self, ctx: impl Into<String>) -> BotResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> BotResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &BotError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

/// Convert anyhow::Error to BotError (test helpers use anyhow)
impl From<anyhow::Error> for BotError {
  fn from(err: anyhow::Error) -> Self {
    BotError::message(err.to_string())
  }
}

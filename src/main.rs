use clap::{Parser, Subcommand};
use relay_bot::commands;
use relay_bot::core::context::TriggerInfo;
use relay_bot::core::error::{BotError, print_error};

/// Artifact-derived release lifecycle automation for API repositories
#[derive(Parser)]
#[command(name = "relbot")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct BotCli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Derive the current release state from repository artifacts
  State {
    /// Output the full context as JSON
    #[arg(long)]
    json: bool,
  },

  /// Assemble and print the complete bot context
  Context {
    /// Command verb that triggered this invocation
    #[arg(long, default_value = "")]
    command: String,
    /// Command arguments
    #[arg(long, default_value = "")]
    args: String,
    /// Login of the triggering user
    #[arg(long, default_value = "")]
    user: String,
    /// Trigger kind (workflow_dispatch, issue_close, release_plan_change)
    #[arg(long, default_value = "")]
    trigger_type: String,
    /// PR number that triggered the invocation, if any
    #[arg(long, default_value = "")]
    trigger_pr: String,
    /// URL of the triggering PR
    #[arg(long, default_value = "")]
    trigger_pr_url: String,
    /// URL of the workflow run
    #[arg(long, default_value = "")]
    run_url: String,
  },

  /// Parse, validate, and execute a slash command
  Exec {
    /// The raw comment text containing the command
    text: String,
    /// Login of the issuing user
    #[arg(long)]
    user: String,
    /// Permission tier of the issuing user
    #[arg(long)]
    tier: commands::validate::Tier,
  },

  /// React to the release PR being merged (creates the draft release)
  MergeEvent,

  /// Reconcile the tracking issue with derived state
  SyncIssue {
    /// PR number that changed the release plan, if any
    #[arg(long)]
    trigger_pr: Option<u64>,
  },

  /// Apply the closure policy to a tracking-issue close event
  IssueClosed {
    /// Number of the closed issue
    #[arg(long)]
    issue: u64,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Logs go to stderr; stdout is reserved for the machine-readable context
fn init_tracing() {
  use tracing_subscriber::layer::SubscriberExt;
  use tracing_subscriber::util::SubscriberInitExt;

  let filter = tracing_subscriber::EnvFilter::new(
    std::env::var("RUST_LOG").unwrap_or_else(|_| "relay_bot=info".into()),
  );

  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}

fn main() {
  init_tracing();

  let cli = BotCli::parse();

  let result = match cli.command {
    Commands::State { json } => commands::run_state(json),
    Commands::Context {
      command,
      args,
      user,
      trigger_type,
      trigger_pr,
      trigger_pr_url,
      run_url,
    } => commands::run_context(TriggerInfo {
      command,
      command_args: args,
      user,
      trigger_type,
      trigger_pr_number: trigger_pr,
      trigger_pr_url,
      workflow_run_url: run_url,
    }),
    Commands::Exec { text, user, tier } => commands::run_exec(&text, &user, tier),
    Commands::MergeEvent => commands::run_merge_event(),
    Commands::SyncIssue { trigger_pr } => commands::run_sync_issue(trigger_pr),
    Commands::IssueClosed { issue } => commands::run_issue_closed(issue),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: BotError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

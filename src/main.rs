mod commands;
mod core;
mod sql;
mod warehouse;

use clap::{Parser, Subcommand};
use crate::core::context::ReleaseContext;
use crate::core::error::{RampError, print_error};

/// Git ↔ warehouse sync and auditable SQL releases
#[derive(Parser)]
#[command(name = "sqlramp")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Verbose mode. Shows SQL statements.
  #[arg(short = 'v', long, global = true)]
  verbose: bool,

  /// Show SQL to be executed, but don't run it.
  #[arg(short = 't', long, global = true)]
  dry_run: bool,

  /// Force the action without the usual safety checks and questions.
  #[arg(short = 'f', long, global = true)]
  force: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Release lifecycle
  // ============================================================================
  /// Prepare the release candidate file
  Prepare,

  /// Deploy changes from the release candidate file
  Deploy,

  /// Prepare + deploy
  Migrate,

  /// Validate all SQL files in the model directory
  Validate,

  // ============================================================================
  // Ledger & environments
  // ============================================================================
  /// Print release history
  History {
    /// Output history in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Clone (or replace) the branch database from production
  Clone,

  /// Sync unapplied releases into the branch database
  Sync,

  /// Test pending releases on a throwaway clone of production
  TestSync,

  // ============================================================================
  // Inspection
  // ============================================================================
  /// Compare warehouse and current branch DDLs
  Compare {
    /// Single file to compare instead of the whole model tree
    #[arg(long)]
    file: Option<String>,
  },

  /// Print the model diff from the production branch
  Diff,

  /// Compare active branches and development clones
  ListStaleBranches,
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

fn init_logger(verbose: bool) {
  let level = if verbose {
    log::LevelFilter::Debug
  } else {
    log::LevelFilter::Info
  };
  env_logger::Builder::from_default_env()
    .filter_level(level)
    .format_timestamp(None)
    .format_target(false)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logger(cli.verbose);

  let workspace_root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  // Build the context once (repository handle + project config); every
  // command needs both, and the warehouse backend is constructed on demand.
  let ctx = match ReleaseContext::build(&workspace_root) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Prepare => commands::run_prepare(&ctx, cli.force),
    Commands::Deploy => commands::run_deploy(&ctx, cli.dry_run, cli.force),
    Commands::Migrate => {
      commands::run_prepare(&ctx, cli.force).and_then(|_| commands::run_deploy(&ctx, cli.dry_run, cli.force))
    }
    Commands::Validate => commands::run_validate(&ctx),
    Commands::History { json } => commands::run_history(&ctx, json),
    Commands::Clone => commands::run_clone(&ctx, cli.force),
    Commands::Sync => commands::run_sync(&ctx, cli.dry_run),
    Commands::TestSync => commands::run_test_sync(&ctx),
    Commands::Compare { file } => commands::run_compare(&ctx, file),
    Commands::Diff => commands::run_diff(&ctx),
    Commands::ListStaleBranches => commands::run_list_stale_branches(&ctx),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: RampError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

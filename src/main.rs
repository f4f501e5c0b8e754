mod ci;
mod commands;
mod core;
mod publish;
mod state;
mod ui;
mod utils;

use clap::{Parser, Subcommand};
use core::context::PublishContext;
use core::error::{PublishError, print_error};
use core::plan::PlanOverrides;
use std::path::PathBuf;

/// Publish one version across many repositories, resumably
#[derive(Parser)]
#[command(name = "release-rail")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Publish the configured version, resuming an interrupted run
  #[command(disable_version_flag = true)]
  Publish {
    /// Path to release.toml (default: search the current directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the target version from release.toml
    #[arg(long = "version", value_name = "VERSION")]
    target_version: Option<String>,
    /// Skip the clean working tree check
    #[arg(long)]
    allow_dirty: bool,
  },

  /// Show per-repository progress of the current run
  Status {
    /// Path to release.toml (default: search the current directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output status in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Clear progress markers
  Reset {
    /// Path to release.toml (default: search the current directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Only clear this repository's marker
    #[arg(long)]
    repo: Option<String>,
  },

  /// List the release steps in execution order
  Steps,
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

fn main() {
  let cli = Cli::parse();

  let cwd = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  let context = |config: Option<PathBuf>| match PublishContext::build(&cwd, config.as_deref()) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Publish {
      config,
      target_version,
      allow_dirty,
    } => commands::run_publish(
      &context(config),
      PlanOverrides {
        version: target_version,
        allow_dirty,
      },
    ),
    Commands::Status { config, json } => commands::run_status(&context(config), json),
    Commands::Reset { config, repo } => commands::run_reset(&context(config), repo),
    Commands::Steps => {
      commands::run_steps();
      Ok(())
    }
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: PublishError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

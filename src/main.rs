mod commands;
mod core;
mod integrations;
mod remote;
mod targets;
mod telemetry;
mod utils;
mod website;
mod workflow;

use clap::{Parser, Subcommand};
use crate::core::context::ReleaseContext;
use crate::core::error::{PostrelError, ResultExt, print_error};
use std::path::PathBuf;

/// Post-release automation: website, milestones, integrations and distro packages
#[derive(Parser)]
#[command(name = "postrel")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Project root (default: current directory)
  #[arg(short = 'C', long = "root", value_name = "DIR")]
  root: Option<PathBuf>,

  /// Skip the confirmation prompt
  #[arg(short, long)]
  yes: bool,

  /// Debug logging (RUST_LOG takes precedence)
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Update the website only
  Render,
}

fn get_styles() -> clap::builder::Styles {
  let yellow = anstyle::Color::Ansi(anstyle::AnsiColor::Yellow);
  let green = anstyle::Color::Ansi(anstyle::AnsiColor::Green);
  let red = anstyle::Color::Ansi(anstyle::AnsiColor::Red);

  clap::builder::Styles::styled()
    .usage(anstyle::Style::new().bold().underline().fg_color(Some(yellow)))
    .header(anstyle::Style::new().bold().underline().fg_color(Some(yellow)))
    .literal(anstyle::Style::new().fg_color(Some(green)))
    .invalid(anstyle::Style::new().bold().fg_color(Some(red)))
    .error(anstyle::Style::new().bold().fg_color(Some(red)))
    .valid(anstyle::Style::new().bold().underline().fg_color(Some(green)))
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();
  telemetry::init_tracing(cli.verbose);

  let root = match cli.root {
    Some(root) => root,
    None => match std::env::current_dir().context("Failed to get current directory") {
      Ok(dir) => dir,
      Err(e) => handle_error(e),
    },
  };

  let ctx = match ReleaseContext::load(&root) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Some(Commands::Render) => commands::run_render(&ctx),
    None => commands::run_release(&ctx, cli.yes),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: PostrelError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

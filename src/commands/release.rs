//! Full post-release run
//!
//! Order matters: credentials are checked before anything is mutated, the
//! user confirms, then website, milestones, integrations and distribution
//! targets are updated. Only fatal errors stop the run; everything else is
//! collected into the summaries printed at the end.

use crate::core::checksum::HttpChecksums;
use crate::core::config::Credentials;
use crate::core::context::ReleaseContext;
use crate::core::error::{PostrelResult, print_error};
use crate::core::vcs::SystemGit;
use crate::integrations::{IntegrationUpdater, SystemRunner, detect_toolchain};
use crate::remote::{GitHubClient, sync_milestones};
use crate::targets::Dispatcher;
use crate::website;
use chrono::Utc;
use dialoguer::Confirm;
use tracing::info;

pub fn run_release(ctx: &ReleaseContext, yes: bool) -> PostrelResult<()> {
  let creds = ctx.config.credentials()?;
  let next = ctx.next_version()?;

  println!("🌟 Performing post-release cleanup for {} ...", ctx.version.tag());
  println!();
  println!("Current version:         {}", ctx.version);
  println!("Next milestone version:  {}", next);
  println!("Website directory:       {}", ctx.website_dir().display());
  println!();

  if !yes && !confirm()? {
    println!("Aborted");
    return Ok(());
  }

  update_website(ctx);

  let client = GitHubClient::new(&creds.token)?;
  let project = &ctx.config.project;
  match sync_milestones(&client, &project.org, &project.repo, &next, Utc::now()) {
    Ok(created) => info!(count = created.len(), "milestones created"),
    Err(e) => {
      eprintln!("⚠️  Failed to create milestones");
      print_error(&e);
    }
  }

  let integrations = update_integrations(ctx)?;
  let targets = update_targets(ctx, &creds, &client)?;

  println!();
  integrations.print_summary();
  targets.print_summary();
  println!();
  println!("💎🙌 Done 🚀");
  Ok(())
}

fn confirm() -> PostrelResult<bool> {
  Ok(
    Confirm::new()
      .with_prompt("Continue with the post-release run?")
      .default(false)
      .interact()?,
  )
}

/// Render, commit and push the website; failures are reported only
fn update_website(ctx: &ReleaseContext) {
  let dir = ctx.website_dir();
  let site = &ctx.config.website;

  let result = website::render(&dir, &site.template, &site.output, &ctx.version)
    .and_then(|_| SystemGit::open(&dir))
    .and_then(|repo| website::publish(&repo, &site.output, &ctx.version, &ctx.config.project.base_branch));

  match result {
    Ok(()) => println!("✅ Website updated"),
    Err(e) => {
      eprintln!("⚠️  Failed to update website");
      print_error(&e);
    }
  }
}

fn update_integrations(ctx: &ReleaseContext) -> PostrelResult<crate::integrations::IntegrationReport> {
  let config = &ctx.config.integration;
  let dir = ctx.config.integration_dir(&ctx.root);
  let detected = match config.toolchain {
    Some(_) => None,
    None => detect_toolchain(&ctx.root),
  };

  IntegrationUpdater::new(config, &ctx.config.project, &ctx.version, SystemGit::open, &SystemRunner)
    .with_dirs(&ctx.root, dir)
    .with_detected_toolchain(detected)
    .update_all()
}

fn update_targets(
  ctx: &ReleaseContext,
  creds: &Credentials,
  client: &GitHubClient,
) -> PostrelResult<crate::targets::DispatchReport> {
  let checksums = HttpChecksums::new()?;

  Dispatcher::new(
    &ctx.config.project,
    &ctx.version,
    ctx.config.targets.clone(),
    SystemGit::open,
    &checksums,
  )
  .with_root(&ctx.root)
  .with_github(&creds.user, &creds.fork)
  .with_submitter(client)
  .dispatch()
}

//! Website-only mode

use crate::core::context::ReleaseContext;
use crate::core::error::{PostrelResult, print_error};
use crate::website;

/// Render the website for the released version and stop
///
/// A render failure is reported but does not fail the command.
pub fn run_render(ctx: &ReleaseContext) -> PostrelResult<()> {
  let dir = ctx.website_dir();
  println!("🌟 Rendering website in {} ...", dir.display());

  match website::render(&dir, &ctx.config.website.template, &ctx.config.website.output, &ctx.version) {
    Ok(path) => println!("✅ Rendered {}", path.display()),
    Err(e) => {
      eprintln!("⚠️  Failed to update website");
      print_error(&e);
    }
  }

  println!("💎🙌 Done (render website only)");
  Ok(())
}

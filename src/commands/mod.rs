//! CLI commands for postrel
//!
//! - **render**: Render the project website only (no git, no credentials)
//! - **release**: The full post-release run (website, milestones,
//!   integrations, distribution targets)
//!
//! Both accept `&ReleaseContext` so the config and version are loaded once.

pub mod release;
pub mod render;

pub use release::run_release;
pub use render::run_render;

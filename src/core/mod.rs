//! Core engine for postrel
//!
//! - **changelog**: Release entries prepended to integration changelogs
//! - **checksum**: Single-pass SHA-256/SHA-512 of remote artifacts
//! - **config**: postrel.toml parsing, environment overrides and validation
//! - **context**: Config + version loaded once per run
//! - **error**: Error types with step context, help messages and exit codes
//! - **patch**: Atomic line-by-line prefix rewriting of build files
//! - **vcs**: Git operations abstraction (SystemGit)
//! - **version**: Canonical semantic version rendering

pub mod changelog;
pub mod checksum;
pub mod config;
pub mod context;
pub mod error;
pub mod patch;
pub mod vcs;
pub mod version;

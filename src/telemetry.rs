//! Diagnostic logging
//!
//! Step markers go to stdout with `println!`; everything here goes to stderr
//! through `tracing`. `RUST_LOG` wins over `--verbose`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber; later calls are ignored
pub fn init_tracing(verbose: bool) {
  let level = if verbose { Level::DEBUG } else { Level::WARN };
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

  tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
    .try_init()
    .ok();
}

use crate::utils::command_output;
use std::path::Path;
use tracing::debug;

/// `go1.22.5` -> `1.22`; `None` for development toolchains
pub fn parse_goversion(raw: &str) -> Option<String> {
  let rest = raw.trim().strip_prefix("go")?;
  let mut parts = rest.split('.');

  let major = leading_digits(parts.next()?)?;
  let minor = leading_digits(parts.next()?)?;
  Some(format!("{}.{}", major, minor))
}

fn leading_digits(part: &str) -> Option<&str> {
  let end = part.find(|c: char| !c.is_ascii_digit()).unwrap_or(part.len());
  (end > 0).then(|| &part[..end])
}

/// Ask the installed Go toolchain for its `major.minor` version
pub fn detect_toolchain(dir: &Path) -> Option<String> {
  match command_output(dir, &["go", "env", "GOVERSION"]) {
    Ok(raw) => parse_goversion(&raw),
    Err(e) => {
      debug!(error = %e, "could not detect the Go toolchain");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_goversion() {
    assert_eq!(parse_goversion("go1.22.5").as_deref(), Some("1.22"));
    assert_eq!(parse_goversion("go1.23rc1\n").as_deref(), Some("1.23"));
    assert_eq!(parse_goversion("go1.21").as_deref(), Some("1.21"));
    assert_eq!(parse_goversion("devel go1.24-abc"), None);
    assert_eq!(parse_goversion("go"), None);
  }
}

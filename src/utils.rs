//! Small helpers shared by the release steps: placeholder expansion,
//! external commands, file copies

use crate::core::error::{GitError, PostrelError, PostrelResult};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Expand `{key}` placeholders in `template` from `vars`
///
/// `{{` and `}}` produce literal braces so shell-style `${{version}}` can be
/// written. Unknown keys are left untouched.
pub fn expand(template: &str, vars: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;

  while let Some(pos) = rest.find(['{', '}']) {
    out.push_str(&rest[..pos]);
    let tail = &rest[pos..];

    if tail.starts_with("{{") {
      out.push('{');
      rest = &tail[2..];
      continue;
    }
    if tail.starts_with("}}") {
      out.push('}');
      rest = &tail[2..];
      continue;
    }
    if tail.starts_with('{')
      && let Some(end) = tail.find('}')
    {
      let key = &tail[1..end];
      if let Some((_, value)) = vars.iter().find(|(k, _)| *k == key) {
        out.push_str(value);
        rest = &tail[end + 1..];
        continue;
      }
    }

    out.push_str(&tail[..1]);
    rest = &tail[1..];
  }

  out.push_str(rest);
  out
}

/// Run `argv` in `dir` with output streamed to the terminal
pub fn run_command(dir: &Path, argv: &[String]) -> PostrelResult<()> {
  let Some((program, args)) = argv.split_first() else {
    return Err(PostrelError::message("Refusing to run an empty command"));
  };

  let command = argv.join(" ");
  debug!(dir = %dir.display(), "Running command: {}", command);
  println!("Running command: {}", command);

  let status = Command::new(program)
    .args(args)
    .current_dir(dir)
    .status()
    .map_err(|e| GitError::CommandFailed {
      command: command.clone(),
      stderr: e.to_string(),
    })?;

  if !status.success() {
    return Err(PostrelError::Git(GitError::CommandFailed {
      command,
      stderr: format!("exited with {}", status),
    }));
  }
  Ok(())
}

/// Run `argv` in `dir` and return trimmed stdout
pub fn command_output(dir: &Path, argv: &[&str]) -> PostrelResult<String> {
  let Some((program, args)) = argv.split_first() else {
    return Err(PostrelError::message("Refusing to run an empty command"));
  };

  let command = argv.join(" ");
  debug!(dir = %dir.display(), "Running command: {}", command);

  let output = Command::new(program)
    .args(args)
    .current_dir(dir)
    .output()
    .map_err(|e| GitError::CommandFailed {
      command: command.clone(),
      stderr: e.to_string(),
    })?;

  if !output.status.success() {
    return Err(PostrelError::Git(GitError::CommandFailed {
      command,
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }));
  }

  Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Copy `from` to `to`, creating parent directories as needed
pub fn copy_file(from: &Path, to: &Path) -> PostrelResult<()> {
  if let Some(parent) = to.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::copy(from, to)
    .map(|_| ())
    .map_err(|e| PostrelError::message(format!("Failed to copy {} to {}: {}", from.display(), to.display(), e)))
}

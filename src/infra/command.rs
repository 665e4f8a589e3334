//! External process invocation
//!
//! Every build step runs as an opaque subprocess with a bounded timeout.
//! Output is captured; stderr is folded into the error on failure.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::ToolchainError;

/// Run one external command in `dir` and capture its output
///
/// A non-zero exit status or an expired timeout is an error; the child is
/// killed when the timeout fires.
pub async fn run(
    program: &str,
    args: &[&str],
    dir: &Path,
    timeout: Duration,
) -> Result<std::process::Output, ToolchainError> {
    tracing::debug!(program, ?args, dir = %dir.display(), "running external step");

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.output();

    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| ToolchainError::TimedOut {
            program: program.to_string(),
            seconds: timeout.as_secs(),
        })?
        .map_err(|e| ToolchainError::SpawnFailed {
            program: program.to_string(),
            error: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = match output.status.code() {
            Some(code) => format!("exit code {code}: {}", stderr.trim()),
            None => format!("terminated by signal: {}", stderr.trim()),
        };
        return Err(ToolchainError::StepFailed {
            program: program.to_string(),
            dir: dir.to_path_buf(),
            detail,
        });
    }

    Ok(output)
}

//! Child-process runner for the BlueZ command-line tools.

use std::io::ErrorKind;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt as _;
use tokio::process::Command;

use omnihub_app::ports::ToolOutput;

use crate::error::BluezError;

pub(crate) const BLUETOOTHCTL: &str = "bluetoothctl";
pub(crate) const SDPTOOL: &str = "sdptool";

/// Runtime allowed for tool calls without their own `--timeout`.
pub(crate) const DEFAULT_LIMIT: Duration = Duration::from_secs(20);
/// Slack on top of a tool's own `--timeout` before it is killed.
const GRACE: Duration = Duration::from_secs(5);

/// How long a `bluetoothctl` invocation may run.
pub(crate) fn deadline(args: &[String]) -> Duration {
    args.iter()
        .position(|arg| arg == "--timeout")
        .and_then(|index| args.get(index + 1))
        .and_then(|secs| secs.parse::<u64>().ok())
        .map_or(DEFAULT_LIMIT, |secs| Duration::from_secs(secs) + GRACE)
}

fn collect(output: &Output) -> ToolOutput {
    ToolOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

fn spawn_error(tool: &'static str, source: std::io::Error) -> BluezError {
    if source.kind() == ErrorKind::NotFound {
        BluezError::ToolMissing { tool }
    } else {
        BluezError::Spawn { tool, source }
    }
}

/// Run `tool` with `args`, feeding `script` on stdin when given.
///
/// The process is killed when `limit` elapses.
pub(crate) async fn run(
    tool: &'static str,
    args: &[String],
    script: Option<&str>,
    limit: Duration,
) -> Result<ToolOutput, BluezError> {
    let mut command = Command::new(tool);
    command
        .args(args)
        .stdin(if script.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|err| spawn_error(tool, err))?;
    if let (Some(script), Some(mut stdin)) = (script, child.stdin.take()) {
        stdin
            .write_all(script.as_bytes())
            .await
            .map_err(|source| BluezError::Spawn { tool, source })?;
    }

    let output = tokio::time::timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| BluezError::Timeout { tool })?
        .map_err(|source| BluezError::Spawn { tool, source })?;
    let output = collect(&output);
    tracing::debug!(tool, ?args, code = ?output.code, "tool finished");
    Ok(output)
}

//! RB-010: Local execution transport.

use super::ExecOutput;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::trace;

/// Run a shell line locally via `bash`.
/// The line is piped to stdin so quoting reaches bash exactly as written.
pub fn exec_local(line: &str) -> Result<ExecOutput, String> {
    trace!(%line, "exec local");
    let mut child = Command::new("bash")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn bash: {}", e))?;

    if let Some(ref mut stdin) = child.stdin {
        stdin
            .write_all(line.as_bytes())
            .map_err(|e| format!("stdin write error: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("wait error: {}", e))?;

    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

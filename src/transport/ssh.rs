//! RB-011: SSH execution transport.
//!
//! Uses the `ssh` binary directly, so keys, agents and jump hosts come
//! from the user's ssh config. The command line is piped to a remote
//! bash on stdin rather than passed as an argument.

use super::{ExecOutput, HostSpec};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::trace;

/// Build the ssh invocation for a host (without spawning it).
pub fn ssh_command(host: &HostSpec) -> Command {
    let mut cmd = Command::new("ssh");
    cmd.args(["-o", "BatchMode=yes"])
        .args(["-o", "ConnectTimeout=5"])
        .args(["-o", "StrictHostKeyChecking=accept-new"]);

    if let Some(port) = host.port {
        cmd.arg("-p").arg(port.to_string());
    }

    let destination = match host.user {
        Some(ref user) => format!("{}@{}", user, host.host),
        None => host.host.clone(),
    };
    cmd.arg(destination).arg("bash");
    cmd
}

/// Run a shell line on a remote host via SSH.
pub fn exec_ssh(host: &HostSpec, line: &str) -> Result<ExecOutput, String> {
    trace!(%host, %line, "exec ssh");
    let mut child = ssh_command(host)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn ssh to {}: {}", host.host, e))?;

    if let Some(ref mut stdin) = child.stdin {
        stdin
            .write_all(line.as_bytes())
            .map_err(|e| format!("stdin write error: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("ssh wait error: {}", e))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if is_connection_failure(output.status.code(), &stderr) {
        return Err(format!("ssh connection failed: {}", stderr.trim()));
    }

    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: stderr.to_string(),
    })
}

/// Diagnostics ssh itself prints when it never reached the remote shell.
const SSH_FAILURE_MARKERS: &[&str] = &[
    "Permission denied (",
    "Host key verification failed",
    "Connection closed by",
    "Connection timed out during banner exchange",
    "kex_exchange_identification",
];

/// Exit status 255 is ssh's own failure code, but a remote command may
/// exit 255 too. Only treat it as a connection failure when stderr carries
/// one of ssh's diagnostics.
fn is_connection_failure(code: Option<i32>, stderr: &str) -> bool {
    if code != Some(255) {
        return false;
    }
    stderr.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("ssh:") || SSH_FAILURE_MARKERS.iter().any(|m| line.contains(m))
    })
}

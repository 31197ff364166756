//! RB-010/011: Transport, the executor capability and its shell backend.
//!
//! The engine only sees [`Executor`]. [`ShellExecutor`] fans a command out
//! over a target's hosts, running locally via bash or remotely via ssh.

pub mod local;
pub mod parallel;
pub mod ssh;

use crate::core::command;
use crate::core::error::RunbookError;
use crate::core::types::{ExecArgs, ExecutionTarget};
use parallel::Parallelization;
use std::fmt;
use tracing::{debug, warn};

/// Output from running a command on one host.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs commands against an execution target.
pub trait Executor {
    /// Run and report success; a non-zero exit is `Ok(false)`.
    /// Errors are reserved for transport faults.
    fn test(&self, target: &ExecutionTarget, args: &ExecArgs) -> Result<bool, RunbookError>;

    /// Run and fail on non-zero exit or transport fault.
    fn run(&self, target: &ExecutionTarget, args: &ExecArgs) -> Result<(), RunbookError>;
}

/// A parsed host identifier: `host`, `user@host` or `user@host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl HostSpec {
    pub fn parse(spec: &str) -> Result<Self, String> {
        let (user, rest) = match spec.split_once('@') {
            Some((u, r)) if !u.is_empty() => (Some(u.to_string()), r),
            Some(_) => return Err(format!("empty user in host '{}'", spec)),
            None => (None, spec),
        };
        // A single colon separates a port; more than one is an IPv6 address.
        let (host, port) = match rest.split_once(':') {
            Some((h, p)) if !p.contains(':') => {
                let port = p
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port in host '{}'", spec))?;
                (h.to_string(), Some(port))
            }
            _ => (rest.to_string(), None),
        };
        if host.is_empty() {
            return Err(format!("empty host in '{}'", spec));
        }
        Ok(Self { user, host, port })
    }

    /// True if this host is the machine we are running on.
    pub fn is_local(&self) -> bool {
        if self.port.is_some() || self.user.is_some() {
            return false;
        }
        is_local_addr(&self.host)
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref user) = self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

/// Check if an address is this machine.
fn is_local_addr(addr: &str) -> bool {
    if addr == "127.0.0.1" || addr == "localhost" || addr == "::1" {
        return true;
    }
    if let Ok(hostname) = std::fs::read_to_string("/etc/hostname") {
        if addr == hostname.trim() {
            return true;
        }
    }
    false
}

/// Run a shell line on one host, dispatching to local or SSH.
pub fn exec_on_host(host: &HostSpec, line: &str) -> Result<ExecOutput, RunbookError> {
    let result = if host.is_local() {
        local::exec_local(line)
    } else {
        ssh::exec_ssh(host, line)
    };
    result.map_err(|detail| RunbookError::Transport {
        host: host.to_string(),
        detail,
    })
}

/// Executor backed by local bash and the `ssh` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellExecutor;

impl ShellExecutor {
    /// Run `line` on every host of `target`, returning per-host output in host order.
    fn exec_all(
        &self,
        target: &ExecutionTarget,
        line: &str,
    ) -> Result<Vec<(HostSpec, ExecOutput)>, RunbookError> {
        if target.hosts.is_empty() {
            return Err(RunbookError::Validation(vec![
                "target has no hosts".to_string(),
            ]));
        }
        let hosts = target
            .hosts
            .iter()
            .map(|h| HostSpec::parse(h))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RunbookError::Validation(vec![e]))?;
        let strategy = Parallelization::from_config(&target.parallelization)
            .map_err(|e| RunbookError::Validation(vec![e]))?;
        debug!(hosts = hosts.len(), ?strategy, %line, "executing");
        strategy.execute(&hosts, |host| exec_on_host(host, line))
    }
}

impl Executor for ShellExecutor {
    fn test(&self, target: &ExecutionTarget, args: &ExecArgs) -> Result<bool, RunbookError> {
        let outputs = self.exec_all(target, &command::shell_line(args, target))?;
        Ok(outputs.iter().all(|(_, out)| out.success()))
    }

    fn run(&self, target: &ExecutionTarget, args: &ExecArgs) -> Result<(), RunbookError> {
        let line = command::shell_line(args, target);
        for (host, out) in self.exec_all(target, &line)? {
            if !out.success() {
                warn!(%host, exit_code = out.exit_code, "command failed");
                return Err(RunbookError::CommandFailed {
                    host: host.to_string(),
                    command: line,
                    exit_code: out.exit_code,
                    stderr: out.stderr.trim().to_string(),
                });
            }
        }
        Ok(())
    }
}

//! RB-006: Command construction.
//!
//! Turns a statement's command string into executor arguments, and
//! executor arguments into the shell line a transport runs.

use super::types::{ExecArgs, ExecutionTarget};

/// Build executor arguments from a command string.
///
/// Raw commands are kept whole. Otherwise the first whitespace-delimited
/// token is the program and the rest are arguments, with any quote
/// characters left in place for the remote shell to interpret.
pub fn build(cmd: &str, raw: bool) -> ExecArgs {
    if raw {
        return ExecArgs::Raw(cmd.to_string());
    }
    let mut tokens = cmd.split_whitespace().map(str::to_string);
    let program = tokens.next().unwrap_or_default();
    ExecArgs::Structured {
        program,
        args: tokens.collect(),
    }
}

/// Render the shell line for `args` on `target`.
///
/// Structured commands are wrapped with the target's working directory,
/// umask, user and environment. Raw commands are sent exactly as written.
pub fn shell_line(args: &ExecArgs, target: &ExecutionTarget) -> String {
    if let ExecArgs::Raw(line) = args {
        return line.clone();
    }

    let mut line = String::new();
    if let Some(ref path) = target.path {
        line.push_str(&format!("cd {} && ", shell_quote(path)));
    }
    if let Some(ref umask) = target.umask {
        line.push_str(&format!("umask {} && ", umask));
    }
    if let Some(ref user) = target.user {
        line.push_str(&format!("sudo -u {} ", shell_quote(user)));
    }
    if !target.env.is_empty() {
        line.push_str("env ");
        for (key, value) in &target.env {
            line.push_str(&format!("{}={} ", key, shell_quote(value)));
        }
    }
    line.push_str(&args.to_string());
    line
}

/// Single-quote a value for POSIX shells unless it is plainly safe.
fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+=,".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

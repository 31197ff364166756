//! RB-008: Dry-run rendering.
//!
//! Describes what a statement would do without resolving targets or
//! touching an executor. Each returned line is one toolbox output.

use super::types::{format_seconds, Assert, Statement};

/// Describe `statement` as one or more lines of `[NOOP]` text.
pub fn render(statement: &Statement) -> Vec<String> {
    match statement {
        Statement::Command(c) => vec![format!("[NOOP] Run: `{}`", c.cmd)],
        Statement::Assert(a) => render_assert(a),
    }
}

fn render_assert(a: &Assert) -> Vec<String> {
    let mut lines = vec![format!(
        "[NOOP] Assert: `{}` returns 0 (running every {} second(s))",
        a.cmd,
        format_seconds(a.interval)
    )];
    if !a.timeout.is_zero() {
        let bound = format!("after {} seconds", format_seconds(a.timeout));
        lines.push(give_up_line(&bound, a.timeout_cmd.as_deref()));
    }
    if a.attempts > 0 {
        let bound = format!("after {} attempt(s)", a.attempts);
        lines.push(give_up_line(&bound, a.timeout_cmd.as_deref()));
    }
    lines
}

fn give_up_line(bound: &str, timeout_cmd: Option<&str>) -> String {
    match timeout_cmd {
        Some(cmd) => format!("{}, run `{}` and exit", bound, cmd),
        None => format!("{}, exit", bound),
    }
}

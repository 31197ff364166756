//! RB-009: Statement executor: the entry point for running one statement.
//!
//! In noop mode a statement is only rendered. Otherwise commands run once
//! and asserts poll their probe until it succeeds or a bound is reached,
//! optionally running a mitigation command before failing.

use super::clock::Clock;
use super::command;
use super::error::RunbookError;
use super::noop;
use super::poll::{PollLoop, PollOutcome};
use super::target;
use super::types::{Assert, Command, ExecutionContext, Statement};
use crate::transport::Executor;
use tracing::{debug, info, warn};

pub struct StatementExecutor<'a> {
    executor: &'a dyn Executor,
    clock: &'a dyn Clock,
}

impl<'a> StatementExecutor<'a> {
    pub fn new(executor: &'a dyn Executor, clock: &'a dyn Clock) -> Self {
        Self { executor, clock }
    }

    /// Execute one statement in `ctx`.
    pub fn execute(&self, statement: &Statement, ctx: &ExecutionContext) -> Result<(), RunbookError> {
        debug!(
            kind = statement.kind(),
            position = %ctx.position.position,
            dry_run = ctx.dry_run,
            "executing statement"
        );
        if ctx.dry_run {
            for line in noop::render(statement) {
                ctx.toolbox.output(&line);
            }
            return Ok(());
        }
        match statement {
            Statement::Command(c) => self.run_command(c, ctx),
            Statement::Assert(a) => self.run_assert(a, ctx),
        }
    }

    fn run_command(&self, c: &Command, ctx: &ExecutionContext) -> Result<(), RunbookError> {
        let target = target::resolve(c.target_override.as_ref(), ctx);
        let args = command::build(&c.cmd, c.raw);
        info!(cmd = %c.cmd, hosts = ?target.hosts, "run");
        self.executor.run(target, &args)
    }

    fn run_assert(&self, a: &Assert, ctx: &ExecutionContext) -> Result<(), RunbookError> {
        let target = target::resolve(a.cmd_target_override.as_ref(), ctx);
        let args = command::build(&a.cmd, a.cmd_raw);
        info!(cmd = %a.cmd, hosts = ?target.hosts, "assert");

        let poll = PollLoop::new(self.clock, a.interval, a.timeout).with_max_attempts(a.attempts);
        let outcome = poll.run(|| self.executor.test(target, &args))?;
        let PollOutcome::TimedOut { attempts, reason } = outcome else {
            return Ok(());
        };

        warn!(cmd = %a.cmd, attempts, ?reason, "assertion gave up");
        let failure = RunbookError::AssertionFailed { cmd: a.cmd.clone() };
        ctx.toolbox.error(&failure.to_string());

        if let Some(ref timeout_cmd) = a.timeout_cmd {
            let mitigation_target = target::resolve(a.timeout_cmd_target_override.as_ref(), ctx);
            let mitigation_args = command::build(timeout_cmd, a.timeout_cmd_raw);
            info!(cmd = %timeout_cmd, hosts = ?mitigation_target.hosts, "running timeout command");
            // A failing mitigation command surfaces its own error instead.
            self.executor.run(mitigation_target, &mitigation_args)?;
        }

        Err(failure)
    }
}

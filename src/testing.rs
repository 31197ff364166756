//! Recording fakes for the executor, toolbox and clock capabilities.

use crate::core::clock::Clock;
use crate::core::error::RunbookError;
use crate::core::types::{ExecArgs, ExecutionTarget};
use crate::toolbox::Toolbox;
use crate::transport::Executor;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A message sent to the toolbox, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Output(String),
    Error(String),
}

#[derive(Debug, Default)]
pub struct RecordingToolbox {
    pub messages: RefCell<Vec<Message>>,
}

impl RecordingToolbox {
    pub fn outputs(&self) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter_map(|m| match m {
                Message::Output(s) => Some(s.clone()),
                Message::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter_map(|m| match m {
                Message::Error(s) => Some(s.clone()),
                Message::Output(_) => None,
            })
            .collect()
    }
}

impl Toolbox for RecordingToolbox {
    fn output(&self, msg: &str) {
        self.messages.borrow_mut().push(Message::Output(msg.to_string()));
    }

    fn error(&self, msg: &str) {
        self.messages.borrow_mut().push(Message::Error(msg.to_string()));
    }
}

/// An executor call, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Test(ExecutionTarget, ExecArgs),
    Run(ExecutionTarget, ExecArgs),
}

/// Executor that records calls and replays scripted probe results.
///
/// Probes return `false` once the script is exhausted.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    pub calls: RefCell<Vec<Call>>,
    pub test_results: RefCell<VecDeque<bool>>,
    pub fail_runs: Cell<bool>,
    pub fail_tests: Cell<bool>,
}

impl FakeExecutor {
    pub fn with_test_results(results: &[bool]) -> Self {
        Self {
            test_results: RefCell::new(results.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn test_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Test(..)))
            .count()
    }
}

impl Executor for FakeExecutor {
    fn test(&self, target: &ExecutionTarget, args: &ExecArgs) -> Result<bool, RunbookError> {
        self.calls
            .borrow_mut()
            .push(Call::Test(target.clone(), args.clone()));
        if self.fail_tests.get() {
            return Err(RunbookError::Transport {
                host: "fake".to_string(),
                detail: "connection refused".to_string(),
            });
        }
        Ok(self.test_results.borrow_mut().pop_front().unwrap_or(false))
    }

    fn run(&self, target: &ExecutionTarget, args: &ExecArgs) -> Result<(), RunbookError> {
        self.calls
            .borrow_mut()
            .push(Call::Run(target.clone(), args.clone()));
        if self.fail_runs.get() {
            return Err(RunbookError::CommandFailed {
                host: "fake".to_string(),
                command: args.to_string(),
                exit_code: 1,
                stderr: "boom".to_string(),
            });
        }
        Ok(())
    }
}

/// Clock that advances by `tick` on every read and records sleeps.
///
/// Sleeping also advances the clock by the slept duration.
#[derive(Debug)]
pub struct FakeClock {
    base: Instant,
    offset: Cell<Duration>,
    tick: Duration,
    pub sleeps: RefCell<Vec<Duration>>,
    pub reads: Cell<u32>,
}

impl FakeClock {
    pub fn new(tick: Duration) -> Self {
        Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            tick,
            sleeps: RefCell::new(Vec::new()),
            reads: Cell::new(0),
        }
    }

    pub fn frozen() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let now = self.base + self.offset.get();
        self.offset.set(self.offset.get() + self.tick);
        self.reads.set(self.reads.get() + 1);
        now
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.offset.set(self.offset.get() + duration);
    }
}

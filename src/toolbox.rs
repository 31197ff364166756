//! RB-003: Toolbox, user-facing output for a runbook run.
//!
//! Owned by the caller and handed to the engine through the execution
//! context on every call; nothing here is global.

/// Output and error reporting shared across a runbook run.
pub trait Toolbox {
    fn output(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Writes output to stdout and errors to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleToolbox;

impl Toolbox for ConsoleToolbox {
    fn output(&self, msg: &str) {
        println!("{}", msg);
    }

    fn error(&self, msg: &str) {
        eprintln!("{}", msg);
    }
}

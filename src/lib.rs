//! runbook-exec: the statement execution engine of a runbook tool.
//!
//! Runs commands and polls assertions against host groups, or renders
//! what it would do in noop mode.

pub mod cli;
pub mod core;
pub mod toolbox;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

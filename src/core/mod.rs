//! Core engine logic: types, targets, commands, polling, execution.

pub mod clock;
pub mod command;
pub mod error;
pub mod executor;
pub mod noop;
pub mod parser;
pub mod poll;
pub mod runner;
pub mod target;
pub mod types;

//! RB-001: Statement, target and runbook document types.
//!
//! Defines the YAML schema for runbooks and the statements they contain.
//! All document types derive Serialize/Deserialize for YAML roundtripping.

use crate::toolbox::Toolbox;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Execution targets
// ============================================================================

/// The hosts a command runs against and how to fan out across them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTarget {
    /// Host identifiers (`host`, `user@host`, `user@host:port`)
    pub hosts: Vec<String>,

    /// Parallelization policy (`strategy`, `limit`, `wait`)
    #[serde(default)]
    pub parallelization: IndexMap<String, serde_yaml_ng::Value>,

    /// Run as this user (via sudo)
    #[serde(default)]
    pub user: Option<String>,

    /// Working directory on the host
    #[serde(default)]
    pub path: Option<String>,

    /// Environment variables exported to the command
    #[serde(default)]
    pub env: IndexMap<String, String>,

    /// File mode creation mask
    #[serde(default)]
    pub umask: Option<String>,
}

impl ExecutionTarget {
    /// A target over the given hosts with the default (parallel) policy.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            parallelization: IndexMap::new(),
            user: None,
            path: None,
            env: IndexMap::new(),
            umask: None,
        }
    }

    /// The implicit target used when a runbook names none.
    pub fn localhost() -> Self {
        Self::new(["localhost"])
    }
}

// ============================================================================
// Statements
// ============================================================================

/// One operational action within a runbook step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    Command(Command),
    Assert(Assert),
}

impl Statement {
    /// Statement kind, as written in YAML.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command(_) => "command",
            Self::Assert(_) => "assert",
        }
    }
}

/// Run a command once; failure aborts the runbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub cmd: String,

    /// Pass `cmd` to the host verbatim instead of tokenizing it
    #[serde(default)]
    pub raw: bool,

    #[serde(default, rename = "target")]
    pub target_override: Option<ExecutionTarget>,
}

impl Command {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            raw: false,
            target_override: None,
        }
    }
}

/// Poll a probe command until it exits 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assert {
    pub cmd: String,

    #[serde(default)]
    pub cmd_raw: bool,

    /// Delay between failed probes
    #[serde(default = "default_interval", with = "seconds")]
    pub interval: Duration,

    /// Give up after this long (zero = never)
    #[serde(default, with = "seconds")]
    pub timeout: Duration,

    /// Give up after this many failed probes (zero = never)
    #[serde(default)]
    pub attempts: u32,

    /// Mitigation command run once when polling gives up
    #[serde(default)]
    pub timeout_cmd: Option<String>,

    #[serde(default)]
    pub timeout_cmd_raw: bool,

    #[serde(default, rename = "cmd_target")]
    pub cmd_target_override: Option<ExecutionTarget>,

    #[serde(default, rename = "timeout_cmd_target")]
    pub timeout_cmd_target_override: Option<ExecutionTarget>,
}

impl Assert {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            cmd_raw: false,
            interval: default_interval(),
            timeout: Duration::ZERO,
            attempts: 0,
            timeout_cmd: None,
            timeout_cmd_raw: false,
            cmd_target_override: None,
            timeout_cmd_target_override: None,
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(1)
}

/// Serde adapter for durations written as (possibly fractional) seconds.
pub mod seconds {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        if d.subsec_nanos() == 0 {
            s.serialize_u64(d.as_secs())
        } else {
            s.serialize_f64(d.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| de::Error::custom(format!("invalid duration {}: {}", secs, e)))
    }
}

/// Render a duration as seconds, without a fraction when it is whole.
pub fn format_seconds(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        d.as_secs().to_string()
    } else {
        d.as_secs_f64().to_string()
    }
}

// ============================================================================
// Executor arguments
// ============================================================================

/// Command arguments in the form handed to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecArgs {
    /// A complete shell line, passed through untouched
    Raw(String),
    /// Program plus arguments; quoting inside arguments is kept literally
    Structured { program: String, args: Vec<String> },
}

impl fmt::Display for ExecArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(line) => write!(f, "{}", line),
            Self::Structured { program, args } => {
                write!(f, "{}", program)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// Execution context
// ============================================================================

/// Where a statement sits in the runbook tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub depth: usize,
    pub index: usize,
    /// Dotted position of the enclosing step, e.g. "3.3"
    pub position: String,
}

/// Per-call context supplied by the caller of the statement executor.
pub struct ExecutionContext<'a> {
    /// Render statements instead of running them
    pub dry_run: bool,
    pub toolbox: &'a dyn Toolbox,
    /// Target inherited from the enclosing node
    pub ambient_target: &'a ExecutionTarget,
    pub position: Position,
}

// ============================================================================
// Runbook document
// ============================================================================

/// Root of a runbook file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runbook {
    /// Schema version (must be "1.0")
    pub version: String,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Default target for every section
    #[serde(default)]
    pub target: Option<ExecutionTarget>,

    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub title: String,

    #[serde(default)]
    pub target: Option<ExecutionTarget>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub title: String,

    #[serde(default)]
    pub target: Option<ExecutionTarget>,

    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// Result of running a whole runbook.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub title: String,
    pub statements_executed: u32,
    pub total_duration: Duration,
}

// ============================================================================
// YAML helper
// ============================================================================

/// Convert a serde_yaml_ng::Value to a string for messages and lookups.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

// ============================================================================
// Tests
// ============================================================================

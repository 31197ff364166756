//! RB-013: Runbook YAML parsing and validation.
//!
//! Parses runbook files and validates structural constraints:
//! - Version must be "1.0"
//! - Commands must be non-empty
//! - Assert intervals must be positive
//! - Targets must name hosts and a known parallelization strategy

use super::error::RunbookError;
use super::types::*;
use crate::transport::parallel::Parallelization;
use crate::transport::HostSpec;
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a runbook file from disk.
pub fn parse_runbook_file(path: &Path) -> Result<Runbook, RunbookError> {
    let content = std::fs::read_to_string(path).map_err(|source| RunbookError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_runbook(&content)
}

/// Parse a runbook from a string.
pub fn parse_runbook(yaml: &str) -> Result<Runbook, RunbookError> {
    serde_yaml_ng::from_str(yaml).map_err(|e| RunbookError::Parse(e.to_string()))
}

/// Parse and validate, folding validation errors into one error.
pub fn load_runbook(path: &Path) -> Result<Runbook, RunbookError> {
    let runbook = parse_runbook_file(path)?;
    let errors = validate_runbook(&runbook);
    if errors.is_empty() {
        Ok(runbook)
    } else {
        Err(RunbookError::Validation(
            errors.into_iter().map(|e| e.message).collect(),
        ))
    }
}

/// Validate a parsed runbook. Returns a list of errors (empty = valid).
pub fn validate_runbook(runbook: &Runbook) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if runbook.version != "1.0" {
        errors.push(ValidationError {
            message: format!("version must be \"1.0\", got \"{}\"", runbook.version),
        });
    }

    if runbook.title.is_empty() {
        errors.push(ValidationError {
            message: "title must not be empty".to_string(),
        });
    }

    if let Some(ref target) = runbook.target {
        validate_target("runbook", target, &mut errors);
    }

    for (si, section) in runbook.sections.iter().enumerate() {
        let section_pos = format!("{}", si + 1);
        if let Some(ref target) = section.target {
            validate_target(&format!("section {}", section_pos), target, &mut errors);
        }
        for (ti, step) in section.steps.iter().enumerate() {
            let step_pos = format!("{}.{}", section_pos, ti + 1);
            if let Some(ref target) = step.target {
                validate_target(&format!("step {}", step_pos), target, &mut errors);
            }
            for (i, statement) in step.statements.iter().enumerate() {
                let at = format!("step {} statement {}", step_pos, i + 1);
                validate_statement(&at, statement, &mut errors);
            }
        }
    }

    errors
}

fn validate_statement(at: &str, statement: &Statement, errors: &mut Vec<ValidationError>) {
    match statement {
        Statement::Command(c) => {
            if c.cmd.trim().is_empty() {
                errors.push(ValidationError {
                    message: format!("{} (command) has an empty cmd", at),
                });
            }
            if let Some(ref target) = c.target_override {
                validate_target(at, target, errors);
            }
        }
        Statement::Assert(a) => {
            if a.cmd.trim().is_empty() {
                errors.push(ValidationError {
                    message: format!("{} (assert) has an empty cmd", at),
                });
            }
            if a.interval.is_zero() {
                errors.push(ValidationError {
                    message: format!("{} (assert) interval must be greater than 0", at),
                });
            }
            if let Some(ref cmd) = a.timeout_cmd {
                if cmd.trim().is_empty() {
                    errors.push(ValidationError {
                        message: format!("{} (assert) has an empty timeout_cmd", at),
                    });
                }
            }
            if let Some(ref target) = a.cmd_target_override {
                validate_target(at, target, errors);
            }
            if let Some(ref target) = a.timeout_cmd_target_override {
                validate_target(at, target, errors);
            }
        }
    }
}

fn validate_target(at: &str, target: &ExecutionTarget, errors: &mut Vec<ValidationError>) {
    if target.hosts.is_empty() {
        errors.push(ValidationError {
            message: format!("{} target has no hosts", at),
        });
    }
    for host in &target.hosts {
        if let Err(e) = HostSpec::parse(host) {
            errors.push(ValidationError {
                message: format!("{} target: {}", at, e),
            });
        }
    }
    if let Err(e) = Parallelization::from_config(&target.parallelization) {
        errors.push(ValidationError {
            message: format!("{} target: {}", at, e),
        });
    }
}

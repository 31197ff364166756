//! RB-014: Runner: walk a runbook and execute its statements in order.
//!
//! Sections, steps and statements run strictly sequentially. The first
//! failing statement stops the run and its error is returned.

use super::clock::Clock;
use super::error::RunbookError;
use super::executor::StatementExecutor;
use super::target::{DefaultTarget, StepScope};
use super::types::*;
use crate::toolbox::Toolbox;
use crate::transport::Executor;
use std::time::Instant;
use tracing::{error, info};

/// Configuration for a runbook run.
pub struct RunConfig<'a> {
    pub runbook: &'a Runbook,
    pub noop: bool,
    pub toolbox: &'a dyn Toolbox,
    pub executor: &'a dyn Executor,
    pub clock: &'a dyn Clock,
}

/// Execute every statement of the runbook.
pub fn run(cfg: &RunConfig) -> Result<RunSummary, RunbookError> {
    let start = Instant::now();
    let statement_executor = StatementExecutor::new(cfg.executor, cfg.clock);
    let implicit = ExecutionTarget::localhost();
    let book_target = cfg.runbook.target.as_ref().unwrap_or(&implicit);
    let mut executed = 0u32;

    info!(title = %cfg.runbook.title, noop = cfg.noop, "starting runbook");

    for (si, section) in cfg.runbook.sections.iter().enumerate() {
        let section_pos = (si + 1).to_string();
        if cfg.noop {
            cfg.toolbox
                .output(&format!("Section {}: {}", section_pos, section.title));
        }
        let section_target = section.target.as_ref().unwrap_or(book_target);

        for (ti, step) in section.steps.iter().enumerate() {
            let step_pos = format!("{}.{}", section_pos, ti + 1);
            if cfg.noop {
                cfg.toolbox.output(&format!("Step {}: {}", step_pos, step.title));
            }
            let scope = StepScope {
                step,
                inherited: section_target,
            };

            for (index, statement) in step.statements.iter().enumerate() {
                let ctx = ExecutionContext {
                    dry_run: cfg.noop,
                    toolbox: cfg.toolbox,
                    ambient_target: scope.default_target(),
                    position: Position {
                        depth: 3,
                        index,
                        position: step_pos.clone(),
                    },
                };
                if let Err(e) = statement_executor.execute(statement, &ctx) {
                    error!(position = %step_pos, index, error = %e, "statement failed");
                    return Err(e);
                }
                executed += 1;
            }
        }
    }

    Ok(RunSummary {
        title: cfg.runbook.title.clone(),
        statements_executed: executed,
        total_duration: start.elapsed(),
    })
}

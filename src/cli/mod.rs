//! RB-017: CLI subcommands: init, validate, run.

use crate::core::clock::SystemClock;
use crate::core::types::{Runbook, Statement};
use crate::core::{parser, runner};
use crate::toolbox::ConsoleToolbox;
use crate::transport::ShellExecutor;
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter runbook
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a runbook without connecting to any host
    Validate {
        /// Path to the runbook
        #[arg(short, long, default_value = "runbook.yaml")]
        file: PathBuf,
    },

    /// Execute a runbook
    Run {
        /// Path to the runbook
        #[arg(short, long, default_value = "runbook.yaml")]
        file: PathBuf,

        /// Describe each statement instead of running it
        #[arg(long, alias = "dry-run")]
        noop: bool,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Run { file, noop } => cmd_run(&file, noop),
    }
}

const TEMPLATE: &str = r#"version: "1.0"
title: my-runbook
description: "Managed by runbook"

target:
  hosts: [localhost]
  parallelization:
    strategy: parallel

sections:
  - title: Example
    steps:
      - title: Say hello
        statements:
          - type: command
            cmd: echo 'hello'
          - type: assert
            cmd: test -d /tmp
            interval: 1
            timeout: 10
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let runbook_path = path.join("runbook.yaml");
    if runbook_path.exists() {
        return Err(format!("{} already exists", runbook_path.display()));
    }
    std::fs::create_dir_all(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    std::fs::write(&runbook_path, TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", runbook_path.display(), e))?;

    println!("Initialized runbook at {}", runbook_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let runbook = parser::parse_runbook_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_runbook(&runbook);

    if errors.is_empty() {
        let (commands, asserts) = count_statements(&runbook);
        println!(
            "OK: {} ({} sections, {} commands, {} asserts)",
            runbook.title,
            runbook.sections.len(),
            commands,
            asserts
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

fn cmd_run(file: &Path, noop: bool) -> Result<(), String> {
    let runbook = parser::load_runbook(file).map_err(|e| e.to_string())?;
    let toolbox = ConsoleToolbox;
    let cfg = runner::RunConfig {
        runbook: &runbook,
        noop,
        toolbox: &toolbox,
        executor: &ShellExecutor,
        clock: &SystemClock,
    };

    let summary = runner::run(&cfg).map_err(|e| e.to_string())?;

    if noop {
        println!("Noop run, nothing executed.");
    } else {
        println!(
            "{}: {} statement(s) executed ({:.1}s)",
            summary.title,
            summary.statements_executed,
            summary.total_duration.as_secs_f64()
        );
    }
    Ok(())
}

/// Count (commands, asserts) across the whole runbook.
fn count_statements(runbook: &Runbook) -> (usize, usize) {
    runbook
        .sections
        .iter()
        .flat_map(|s| &s.steps)
        .flat_map(|t| &t.statements)
        .fold((0, 0), |(c, a), s| match s {
            Statement::Command(_) => (c + 1, a),
            Statement::Assert(_) => (c, a + 1),
        })
}

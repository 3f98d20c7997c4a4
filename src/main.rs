mod cli;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use cli::Cli;
use groundwork::adapters::FileLockManager;
use groundwork::api::errors::ApiError;
use groundwork::catalog;
use groundwork::constants::LOCK_FILE_NAME;
use groundwork::logging::JsonlReporter;
use groundwork::types::{RunId, RunMode, RunOptions};
use groundwork::Provisioner;

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let code = match real_main(&cli) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err:#}");
            err.downcast_ref::<ApiError>()
                .map_or(2, ApiError::exit_code)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: &Cli) -> anyhow::Result<i32> {
    let reporter = JsonlReporter::open(&cli.log_path)
        .with_context(|| format!("cannot open log at {}", cli.log_path.display()))?;

    let provisioner = Provisioner::new(reporter.clone(), reporter, cli.backup_dir.clone())
        .with_lock_manager(Box::new(FileLockManager::new(
            cli.backup_dir.join(LOCK_FILE_NAME),
        )));

    if let Some(run) = &cli.rollback {
        let report = provisioner.rollback(&RunId::from_name(run.clone()))?;
        println!(
            "rollback {}: {} path(s) restored",
            report.run_id,
            report.restored.len()
        );
        if let Some(step) = &report.halted_at {
            println!("halted at irreversible step {step}; earlier steps were not undone");
        }
        for e in &report.errors {
            println!("error: {e}");
        }
        return Ok(if report.ok() { 0 } else { 1 });
    }

    let registry = catalog::ubuntu_ai_host().map_err(ApiError::Configuration)?;
    let options = RunOptions {
        mode: if cli.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Commit
        },
        stop_on_failure: !cli.keep_going,
        resume_from: cli.resume_from.clone(),
        only: cli.only.clone(),
        require_root: !cli.dry_run,
        step_timeout: cli.step_timeout.map(Duration::from_secs),
    };

    let plan = provisioner.plan(&registry, &options)?;
    let report = provisioner.execute(&plan, &options)?;

    let s = report.summary();
    println!(
        "run {}: {} succeeded, {} skipped, {} would run, {} failed",
        report.run_id, s.succeeded, s.skipped, s.would_run, s.failed
    );
    for r in &report.records {
        if let groundwork::types::StepOutcome::Failed(msg) = &r.outcome {
            println!("failed: {}: {msg}", r.step_id);
        }
    }
    if let Some(step) = &report.halted_on {
        println!("plan halted on {step}; later steps were not attempted");
    }

    Ok(if report.ok() { 0 } else { 1 })
}

//! Preflight stage: precondition checks run before any step executes.
//!
//! Side-effects:
//! - Emits one preflight fact per finding (warn for advisory findings,
//!   failure for stops) and a preflight summary.
//! - Returns a `PreflightReport`; any stop rejects the whole run before
//!   execution begins, so a run is never a silent partial success.

pub mod checks;

use std::collections::BTreeSet;

use crate::types::plan::{RunMode, RunOptions, RunPlan};
use crate::types::report::PreflightReport;
use crate::types::step::{Probe, StepAction};

pub(crate) struct PreflightInput<'a> {
    pub plan: &'a RunPlan,
    pub options: &'a RunOptions,
    pub backup_root: &'a std::path::Path,
}

pub(crate) fn run(input: &PreflightInput<'_>) -> PreflightReport {
    let mut warnings: Vec<String> = Vec::new();
    let mut stops: Vec<String> = Vec::new();

    if input.options.require_root && !checks::running_as_root() {
        stops.push("effective uid is not root; provisioning mutates system state".to_string());
    }

    // The backup area gates every mutating step; probe it up front in
    // commit mode rather than failing the first snapshot.
    if input.options.mode == RunMode::Commit {
        if let Err(e) = checks::ensure_dir_writable(input.backup_root) {
            stops.push(format!(
                "backup area {} not writable: {e}",
                input.backup_root.display()
            ));
        }
    }

    // Advisory: a program a step will invoke that is nowhere on PATH
    // will fail at apply time with ToolMissing.
    let mut missing: BTreeSet<String> = BTreeSet::new();
    for step in &input.plan.steps {
        match &step.action {
            StepAction::Command(spec) => {
                if !checks::tool_on_path(&spec.program) {
                    missing.insert(spec.program.clone());
                }
            }
            StepAction::Service { .. } => {
                if !checks::tool_on_path("systemctl") {
                    missing.insert("systemctl".to_string());
                }
            }
            StepAction::WriteFile { .. } => {}
        }
        collect_missing_probe_tools(&step.satisfied, &mut missing);
    }
    for program in missing {
        warnings.push(format!("{program}: not found on PATH"));
    }

    PreflightReport {
        ok: stops.is_empty(),
        warnings,
        stops,
    }
}

fn collect_missing_probe_tools(probe: &Probe, missing: &mut BTreeSet<String>) {
    match probe {
        Probe::CommandSucceeds(spec) => {
            if !checks::tool_on_path(&spec.program) {
                missing.insert(spec.program.clone());
            }
        }
        Probe::AllOf(inner) => {
            for p in inner {
                collect_missing_probe_tools(p, missing);
            }
        }
        _ => {}
    }
}

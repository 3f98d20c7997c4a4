//! Execute stage: dry-run, idempotency, halt-on-failure, resume, and
//! locking behavior.

use std::path::Path;

use groundwork::adapters::{FileLockManager, LockManager};
use groundwork::api::errors::ApiError;
use groundwork::backup;
use groundwork::registry::StepRegistry;
use groundwork::types::step::{CommandSpec, Probe, ServiceOp, Step, StepAction};
use groundwork::types::{RunId, RunMode, RunOptions, SkipReason, StepOutcome};

use crate::support::{provisioner, with_temp_root, FakeHost, TestEmitter};

const SYSCTL_CONF: &str = "vm.swappiness = 10\nvm.overcommit_memory = 1\n";

/// The three-step scenario: install a package, render a sysctl file,
/// enable a swap service.
fn scenario_registry(root: &Path) -> StepRegistry {
    let conf = root.join("etc/sysctl.d/99-ai-tuning.conf");
    let mut reg = StepRegistry::new();
    reg.register(
        Step::new(
            "install-curl",
            "install curl via apt",
            StepAction::Command(CommandSpec::new("apt-get", &["install", "-y", "curl"])),
        )
        .satisfied_when(Probe::CommandSucceeds(CommandSpec::new("dpkg", &["-s", "curl"])))
        .irreversible(),
    )
    .unwrap();
    reg.register(
        Step::new(
            "sysctl-config",
            "render kernel tuning",
            StepAction::WriteFile {
                path: conf.clone(),
                contents: SYSCTL_CONF.to_string(),
                mode: Some(0o644),
            },
        )
        .satisfied_when(Probe::FileHasContents {
            path: conf.clone(),
            contents: SYSCTL_CONF.to_string(),
        })
        .mutates(conf)
        .depends_on(&["install-curl"]),
    )
    .unwrap();
    reg.register(
        Step::new(
            "zram-swap",
            "enable compressed swap",
            StepAction::Service { unit: "zramswap".into(), op: ServiceOp::Enable },
        )
        .satisfied_when(Probe::CommandSucceeds(CommandSpec::new(
            "systemctl",
            &["is-enabled", "--quiet", "zramswap"],
        )))
        .depends_on(&["sysctl-config"]),
    )
    .unwrap();
    reg
}

/// A plan whose middle step hits a permission error.
fn failing_registry() -> StepRegistry {
    let mut reg = StepRegistry::new();
    reg.register(
        Step::new(
            "install-curl",
            "install curl via apt",
            StepAction::Command(CommandSpec::new("apt-get", &["install", "-y", "curl"])),
        )
        .satisfied_when(Probe::CommandSucceeds(CommandSpec::new("dpkg", &["-s", "curl"])))
        .irreversible(),
    )
    .unwrap();
    reg.register(
        Step::new(
            "firewall-defaults",
            "default-deny inbound traffic",
            StepAction::Command(CommandSpec::new("ufw", &["default", "deny", "incoming"])),
        )
        .depends_on(&["install-curl"]),
    )
    .unwrap();
    reg.register(
        Step::new(
            "zram-swap",
            "enable compressed swap",
            StepAction::Service { unit: "zramswap".into(), op: ServiceOp::Enable },
        )
        .depends_on(&["firewall-defaults"]),
    )
    .unwrap();
    reg
}

fn commit() -> RunOptions {
    RunOptions { mode: RunMode::Commit, ..RunOptions::default() }
}

fn dry() -> RunOptions {
    RunOptions { mode: RunMode::DryRun, ..RunOptions::default() }
}

#[test]
fn dry_run_records_would_run_and_touches_nothing() {
    let td = with_temp_root();
    let host = FakeHost::new();
    let facts = TestEmitter::default();
    let api = provisioner(td.path(), facts.clone(), host.clone());

    let plan = api.plan(&scenario_registry(td.path()), &dry()).unwrap();
    let report = api.execute(&plan, &dry()).unwrap();

    assert_eq!(report.records.len(), 3);
    assert!(report
        .records
        .iter()
        .all(|r| r.outcome == StepOutcome::WouldRun));

    // Zero filesystem changes: no config file, no backup area.
    assert!(!td.path().join("etc/sysctl.d/99-ai-tuning.conf").exists());
    assert!(!crate::support::backup_root(td.path()).exists());

    // Probes ran; mutating invocations did not.
    let invoked = host.invoked();
    assert!(invoked.iter().any(|l| l.starts_with("dpkg -s curl")));
    assert!(!invoked.iter().any(|l| l.starts_with("apt-get install")));
    assert!(!invoked.iter().any(|l| l.starts_with("systemctl enable")));
}

#[test]
fn commit_applies_all_three_steps_and_snapshots_mutated_paths() {
    let td = with_temp_root();
    let host = FakeHost::new();
    let facts = TestEmitter::default();
    let api = provisioner(td.path(), facts.clone(), host.clone());

    let plan = api.plan(&scenario_registry(td.path()), &commit()).unwrap();
    let report = api.execute(&plan, &commit()).unwrap();

    let s = report.summary();
    assert_eq!((s.succeeded, s.skipped, s.failed), (3, 0, 0));

    let conf = td.path().join("etc/sysctl.d/99-ai-tuning.conf");
    assert_eq!(std::fs::read_to_string(&conf).unwrap(), SYSCTL_CONF);
    assert!(host.installed.lock().unwrap().contains("curl"));
    assert!(host.enabled.lock().unwrap().contains("zramswap"));

    // One journal entry per applied step, one snapshot for the one
    // declared mutated path.
    let run_dir = backup::run_dir(&crate::support::backup_root(td.path()), &report.run_id);
    let journal = backup::read_journal(&run_dir).unwrap();
    assert_eq!(journal.len(), 3);
    let snapshots: usize = journal.iter().map(|e| e.snapshots.len()).sum();
    assert_eq!(snapshots, 1);

    // Final summary fact carries the counts.
    let summaries = facts.stage("run.summary");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].get("succeeded").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(summaries[0].get("failed").and_then(|v| v.as_u64()), Some(0));
}

#[test]
fn second_run_skips_every_satisfied_step() {
    let td = with_temp_root();
    let host = FakeHost::new();
    let api = provisioner(td.path(), TestEmitter::default(), host.clone());

    let reg = scenario_registry(td.path());
    let plan = api.plan(&reg, &commit()).unwrap();
    api.execute(&plan, &commit()).unwrap();

    // No intervening system change: every probe now holds.
    let report = api.execute(&plan, &commit()).unwrap();
    assert_eq!(report.records.len(), 3);
    assert!(report
        .records
        .iter()
        .all(|r| r.outcome == StepOutcome::Skipped(SkipReason::Satisfied)));
}

#[test]
fn permission_failure_halts_the_plan_with_a_truthful_record() {
    let td = with_temp_root();
    let host = FakeHost::new();
    host.deny("ufw");
    let facts = TestEmitter::default();
    let api = provisioner(td.path(), facts.clone(), host.clone());

    let plan = api.plan(&failing_registry(), &commit()).unwrap();
    let report = api.execute(&plan, &commit()).unwrap();

    let s = report.summary();
    assert_eq!((s.succeeded, s.skipped, s.failed), (1, 0, 1));
    assert_eq!(report.halted_on.as_deref(), Some("firewall-defaults"));
    assert_eq!(report.records.len(), 2, "third step never attempted");
    assert!(!host.invoked_program("systemctl"));

    let failures: Vec<_> = facts
        .stage("apply.result")
        .into_iter()
        .filter(|f| f.get("outcome").and_then(|v| v.as_str()) == Some("failed"))
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].get("error_id").and_then(|v| v.as_str()),
        Some("E_PERMISSION")
    );
}

#[test]
fn keep_going_attempts_later_steps_past_a_failure() {
    let td = with_temp_root();
    let host = FakeHost::new();
    host.deny("ufw");
    let api = provisioner(td.path(), TestEmitter::default(), host.clone());

    let options = RunOptions {
        mode: RunMode::Commit,
        stop_on_failure: false,
        ..RunOptions::default()
    };
    let plan = api.plan(&failing_registry(), &options).unwrap();
    let report = api.execute(&plan, &options).unwrap();

    assert_eq!(report.records.len(), 3);
    assert!(report.halted_on.is_none());
    assert!(host.enabled.lock().unwrap().contains("zramswap"));
    let s = report.summary();
    assert_eq!((s.succeeded, s.failed), (2, 1));
}

#[test]
fn resume_skips_earlier_steps_without_probing_them() {
    let td = with_temp_root();
    let host = FakeHost::new();
    let api = provisioner(td.path(), TestEmitter::default(), host.clone());

    let options = RunOptions {
        mode: RunMode::Commit,
        resume_from: Some("zram-swap".to_string()),
        ..RunOptions::default()
    };
    let plan = api.plan(&scenario_registry(td.path()), &options).unwrap();
    let report = api.execute(&plan, &options).unwrap();

    assert_eq!(
        report.records[0].outcome,
        StepOutcome::Skipped(SkipReason::Resume)
    );
    assert_eq!(
        report.records[1].outcome,
        StepOutcome::Skipped(SkipReason::Resume)
    );
    assert_eq!(report.records[2].outcome, StepOutcome::Succeeded);

    // Skipped-for-resume steps are not even probed.
    assert!(!host
        .invoked()
        .iter()
        .any(|l| l.starts_with("dpkg -s curl")));
}

#[test]
fn dry_run_and_commit_list_the_same_steps_in_the_same_order() {
    let td = with_temp_root();

    let dry_facts = TestEmitter::default();
    let api = provisioner(td.path(), dry_facts.clone(), FakeHost::new());
    let plan = api.plan(&scenario_registry(td.path()), &dry()).unwrap();
    api.execute(&plan, &dry()).unwrap();

    let commit_facts = TestEmitter::default();
    let api = provisioner(td.path(), commit_facts.clone(), FakeHost::new());
    let plan = api.plan(&scenario_registry(td.path()), &commit()).unwrap();
    api.execute(&plan, &commit()).unwrap();

    let ids = |facts: &TestEmitter| -> Vec<String> {
        facts
            .stage("apply.result")
            .iter()
            .map(|f| f.get("step_id").unwrap().as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(ids(&dry_facts), ids(&commit_facts));
}

#[test]
fn held_lock_times_out_commit_but_not_dry_run() {
    let td = with_temp_root();
    let lock_path = td.path().join(".groundwork.lock");
    let holder = FileLockManager::new(lock_path.clone());
    let _held = holder.acquire_process_lock(1_000).unwrap();

    let api = provisioner(td.path(), TestEmitter::default(), FakeHost::new())
        .with_lock_manager(Box::new(FileLockManager::new(lock_path)))
        .with_lock_timeout_ms(100);

    let plan = api.plan(&scenario_registry(td.path()), &commit()).unwrap();
    let err = api.execute(&plan, &commit()).unwrap_err();
    assert!(matches!(err, ApiError::LockingTimeout(_)));
    assert_eq!(err.exit_code(), 1);

    // Dry-run takes no lock and proceeds.
    let report = api.execute(&plan, &dry()).unwrap();
    assert_eq!(report.records.len(), 3);
}

#[test]
fn preflight_reports_missing_tools_as_warnings_not_stops() {
    let td = with_temp_root();
    let api = provisioner(td.path(), TestEmitter::default(), FakeHost::new());

    let mut reg = StepRegistry::new();
    reg.register(Step::new(
        "exotic-tool",
        "invoke a tool nobody has",
        StepAction::Command(CommandSpec::new("definitely-not-a-real-tool-9f2c", &[])),
    ))
    .unwrap();

    let options = RunOptions::default();
    let plan = api.plan(&reg, &options).unwrap();
    let pf = api.preflight(&plan, &options);
    assert!(pf.ok, "missing tools warn; they do not reject the run");
    assert!(pf
        .warnings
        .iter()
        .any(|w| w.contains("definitely-not-a-real-tool-9f2c")));
    assert!(pf.stops.is_empty());
}

#[test]
fn dry_run_report_uses_the_zero_run_id() {
    let td = with_temp_root();
    let api = provisioner(td.path(), TestEmitter::default(), FakeHost::new());
    let plan = api.plan(&scenario_registry(td.path()), &dry()).unwrap();
    let report = api.execute(&plan, &dry()).unwrap();
    assert_eq!(
        report.run_id,
        RunId::from_name(groundwork::logging::RUN_ID_ZERO)
    );
}

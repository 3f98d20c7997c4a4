//! Plan stage: selection, validation, and deterministic output.

use groundwork::api::errors::ApiError;
use groundwork::logging::redact_event;
use groundwork::registry::StepRegistry;
use groundwork::types::step::{CommandSpec, Step, StepAction};
use groundwork::types::RunOptions;

use crate::support::{provisioner, with_temp_root, FakeHost, TestEmitter};

fn step(id: &str, deps: &[&str]) -> Step {
    Step::new(id, "test step", StepAction::Command(CommandSpec::new("true", &[]))).depends_on(deps)
}

fn chain_registry() -> StepRegistry {
    // base <- docker <- service, plus an unrelated straggler.
    let mut reg = StepRegistry::new();
    reg.register(step("base", &[])).unwrap();
    reg.register(step("docker", &["base"])).unwrap();
    reg.register(step("service", &["docker"])).unwrap();
    reg.register(step("unrelated", &[])).unwrap();
    reg
}

#[test]
fn only_selection_keeps_transitive_dependencies() {
    let td = with_temp_root();
    let api = provisioner(td.path(), TestEmitter::default(), FakeHost::new());
    let options = RunOptions {
        only: Some(vec!["service".to_string()]),
        ..RunOptions::default()
    };
    let plan = api.plan(&chain_registry(), &options).unwrap();
    let ids: Vec<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["base", "docker", "service"]);
}

#[test]
fn unknown_only_id_is_a_configuration_error() {
    let td = with_temp_root();
    let api = provisioner(td.path(), TestEmitter::default(), FakeHost::new());
    let options = RunOptions {
        only: Some(vec!["ghost".to_string()]),
        ..RunOptions::default()
    };
    let err = api.plan(&chain_registry(), &options).unwrap_err();
    assert!(matches!(err, ApiError::Configuration(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn resume_target_outside_the_plan_is_rejected() {
    let td = with_temp_root();
    let api = provisioner(td.path(), TestEmitter::default(), FakeHost::new());
    let options = RunOptions {
        only: Some(vec!["base".to_string()]),
        resume_from: Some("service".to_string()),
        ..RunOptions::default()
    };
    let err = api.plan(&chain_registry(), &options).unwrap_err();
    assert!(matches!(err, ApiError::Configuration(_)));
}

#[test]
fn plan_facts_are_deterministic_across_invocations() {
    let td = with_temp_root();
    let facts1 = TestEmitter::default();
    let api1 = provisioner(td.path(), facts1.clone(), FakeHost::new());
    api1.plan(&chain_registry(), &RunOptions::default()).unwrap();

    let facts2 = TestEmitter::default();
    let api2 = provisioner(td.path(), facts2.clone(), FakeHost::new());
    api2.plan(&chain_registry(), &RunOptions::default()).unwrap();

    let a: Vec<_> = facts1.stage("plan").into_iter().map(redact_event).collect();
    let b: Vec<_> = facts2.stage("plan").into_iter().map(redact_event).collect();
    assert_eq!(a, b, "plan facts must not vary run to run");
    assert_eq!(a.len(), 4, "one plan fact per selected step");
}

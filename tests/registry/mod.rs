//! Registry-level configuration errors surface before any execution.

use groundwork::api::errors::ApiError;
use groundwork::registry::{RegistryError, StepRegistry};
use groundwork::types::step::{CommandSpec, Step, StepAction};

fn step(id: &str, deps: &[&str]) -> Step {
    Step::new(id, "test step", StepAction::Command(CommandSpec::new("true", &[]))).depends_on(deps)
}

#[test]
fn duplicate_step_names_the_offender() {
    let mut reg = StepRegistry::new();
    reg.register(step("docker-engine", &[])).unwrap();
    let err = reg.register(step("docker-engine", &[])).unwrap_err();
    assert_eq!(err.to_string(), "duplicate step id: docker-engine");
}

#[test]
fn cycle_error_message_names_the_cycle() {
    let mut reg = StepRegistry::new();
    reg.register(step("a", &["b"])).unwrap();
    reg.register(step("b", &["a"])).unwrap();
    let err = reg.resolve_order().unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("dependency cycle:"), "{msg}");
    assert!(msg.contains("a") && msg.contains("b"), "{msg}");
}

#[test]
fn configuration_errors_map_to_exit_code_two() {
    let err = ApiError::Configuration(RegistryError::DuplicateStep("x".into()));
    assert_eq!(err.exit_code(), 2);
    let err = ApiError::Precondition("not root".into());
    assert_eq!(err.exit_code(), 2);
    let err = ApiError::LockingTimeout("busy".into());
    assert_eq!(err.exit_code(), 1);
}

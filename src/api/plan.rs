//! Plan stage: turn the registry into the dependency-ordered, filtered,
//! validated step sequence for one run, and emit one `plan` fact per
//! selected step.

use std::collections::HashSet;

use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{AuditSink, FactsEmitter, StageLogger, TS_ZERO};
use crate::registry::{RegistryError, StepRegistry};
use crate::types::ids::{action_id, plan_id};
use crate::types::plan::{RunOptions, RunPlan};

use super::errors::ApiError;
use super::Provisioner;

pub(crate) fn build<E: FactsEmitter, A: AuditSink>(
    api: &Provisioner<E, A>,
    registry: &StepRegistry,
    options: &RunOptions,
) -> Result<RunPlan, ApiError> {
    let ordered = registry.resolve_order()?;

    let plan = match &options.only {
        None => ordered,
        Some(ids) => {
            // Selection keeps the named steps plus their transitive
            // dependencies; anything already satisfied skips via its
            // probe at run time.
            let mut wanted: HashSet<String> = HashSet::new();
            let mut stack: Vec<String> = Vec::new();
            for id in ids {
                if !registry.contains(id) {
                    return Err(ApiError::Configuration(RegistryError::UnknownStep(
                        id.clone(),
                    )));
                }
                stack.push(id.clone());
            }
            while let Some(id) = stack.pop() {
                if !wanted.insert(id.clone()) {
                    continue;
                }
                if let Some(step) = registry.get(&id) {
                    stack.extend(step.depends_on.iter().cloned());
                }
            }
            RunPlan {
                steps: ordered
                    .steps
                    .into_iter()
                    .filter(|s| wanted.contains(&s.id))
                    .collect(),
            }
        }
    };

    if let Some(resume) = &options.resume_from {
        if !plan.steps.iter().any(|s| &s.id == resume) {
            return Err(ApiError::Configuration(RegistryError::UnknownStep(
                resume.clone(),
            )));
        }
    }

    // Plan facts are deterministic: zero timestamp, redacted context.
    let pid = plan_id(&plan);
    let ctx = AuditCtx::new(
        api.facts(),
        pid.to_string(),
        "plan".to_string(),
        TS_ZERO.to_string(),
        AuditMode { dry_run: true, redact: true },
    );
    let slog = StageLogger::new(&ctx);
    for (idx, step) in plan.steps.iter().enumerate() {
        slog.plan()
            .step(step.id.clone())
            .action(action_id(&pid, step, idx).to_string())
            .emit_success();
    }

    Ok(plan)
}

//! Deterministic UUIDv5 identifiers for plans and steps, and the
//! timestamp-shaped run identifier that names backup directories.
//!
//! The UUID namespace is derived from a stable tag (`NS_TAG`) so that
//! `plan_id` and `action_id` are reproducible across runs for the same
//! ordered step sequence.

use std::fmt;
use std::fmt::Write as _;

use time::macros::format_description;
use time::OffsetDateTime;
use uuid::Uuid;

use super::plan::RunPlan;
use super::step::{Step, StepAction};
use crate::constants::NS_TAG;

/// Internal: return the UUID namespace used for deterministic IDs.
fn namespace() -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, NS_TAG.as_bytes())
}

/// Serialize a step into a stable, human-readable string used for UUIDv5
/// input. Only identity-bearing fields participate.
fn serialize_step(s: &Step) -> String {
    let act = match &s.action {
        StepAction::Command(spec) => format!("C:{spec}"),
        StepAction::WriteFile { path, .. } => format!("F:{}", path.display()),
        StepAction::Service { unit, op } => format!("S:{}:{}", op.as_str(), unit),
    };
    format!("{}|{act}", s.id)
}

/// Compute a deterministic UUIDv5 for a plan by serializing steps in order.
///
/// Two plans with identical step sequences (including ordering) have the
/// same `plan_id`.
#[must_use]
pub fn plan_id(plan: &RunPlan) -> Uuid {
    let ns = namespace();
    let mut s = String::new();
    for step in &plan.steps {
        s.push_str(&serialize_step(step));
        s.push('\n');
    }
    Uuid::new_v5(&ns, s.as_bytes())
}

/// Compute a deterministic UUIDv5 for a step attempt as a function of the
/// plan ID, the step's serialized form, and its stable position index.
#[must_use]
pub fn action_id(plan_id: &Uuid, step: &Step, idx: usize) -> Uuid {
    let mut s = serialize_step(step);
    let _ = write!(s, "#{idx}");
    Uuid::new_v5(plan_id, s.as_bytes())
}

/// Identifier of one run: a filesystem-safe UTC timestamp that names the
/// run's backup directory and tags every fact in the log.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Current instant, millisecond precision: `20260805T101530.123Z`.
    #[must_use]
    pub fn now() -> Self {
        let fmt = format_description!(
            "[year][month][day]T[hour][minute][second].[subsecond digits:3]Z"
        );
        let s = OffsetDateTime::now_utc()
            .format(&fmt)
            .unwrap_or_else(|_| "19700101T000000.000Z".to_string());
        Self(s)
    }

    /// Wrap an operator-supplied run id (e.g. from `--rollback`).
    pub fn from_name<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

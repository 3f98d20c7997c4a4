use super::step::Step;

/// Whether a run mutates the host or only records what it would do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    DryRun,
    Commit,
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::DryRun
    }
}

/// Explicit options for one invocation of the runner.
///
/// Replaces the implicit environment coupling of provisioning shell
/// scripts (`DRY_RUN=1`, `SUDO_USER`, ...) with a value passed into
/// `Provisioner::execute`.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Halt the plan at the first failed step. Defaults to true,
    /// mirroring `set -e` but with an explicit record instead of an
    /// abrupt process exit.
    pub stop_on_failure: bool,
    /// Skip every step before this id without probing it.
    pub resume_from: Option<String>,
    /// Restrict the plan to these step ids plus their transitive
    /// dependencies.
    pub only: Option<Vec<String>>,
    /// Refuse to execute unless running with effective uid 0.
    pub require_root: bool,
    /// Per-step wall-clock budget; `None` matches the unbounded blocking
    /// behavior of the tools themselves.
    pub step_timeout: Option<std::time::Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            stop_on_failure: true,
            resume_from: None,
            only: None,
            require_root: false,
            step_timeout: None,
        }
    }
}

/// The dependency-ordered sequence of steps selected for one run.
/// Computed once from the registry; immutable once execution starts.
#[derive(Clone, Debug, Default)]
pub struct RunPlan {
    pub steps: Vec<Step>,
}

impl RunPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

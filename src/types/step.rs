//! Step model: one provisioning action with its idempotency probe,
//! dependencies, mutated paths, and reversibility classification.

use std::fmt;
use std::path::PathBuf;

/// An external command invocation: program plus arguments, no shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<P: Into<String>>(program: P, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

/// Service manager operation rendered to a `systemctl` invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceOp {
    /// `systemctl enable --now <unit>`
    Enable,
    /// `systemctl restart <unit>`
    Restart,
}

impl ServiceOp {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ServiceOp::Enable => "enable",
            ServiceOp::Restart => "restart",
        }
    }
}

/// Side-effect-free satisfaction predicate over current system state.
/// If the probe holds, the step is skipped; this is what makes re-running
/// a whole plan cheap and safe.
#[derive(Clone, Debug)]
pub enum Probe {
    /// The step always runs (e.g. refreshing package indexes).
    Never,
    /// A path exists (file, directory, or symlink).
    PathExists(PathBuf),
    /// A file exists and its contents equal the desired contents exactly.
    FileHasContents { path: PathBuf, contents: String },
    /// A probe command exits zero. A missing probe tool counts as
    /// unsatisfied, not as an error.
    CommandSucceeds(CommandSpec),
    /// Every inner probe holds.
    AllOf(Vec<Probe>),
}

/// The mutating action a step performs when its probe does not hold.
#[derive(Clone, Debug)]
pub enum StepAction {
    /// Invoke an opaque external tool (package manager, driver installer).
    Command(CommandSpec),
    /// Render a configuration file atomically (staged write + rename).
    WriteFile {
        path: PathBuf,
        contents: String,
        mode: Option<u32>,
    },
    /// Toggle a service-manager unit.
    Service { unit: String, op: ServiceOp },
}

/// One provisioning action.
///
/// `depends_on` must form a DAG across the registry; cycles are a
/// configuration error detected before any execution.
#[derive(Clone, Debug)]
pub struct Step {
    pub id: String,
    pub description: String,
    pub depends_on: Vec<String>,
    pub satisfied: Probe,
    pub action: StepAction,
    /// Paths the apply may alter, snapshotted before mutation.
    pub mutates_paths: Vec<PathBuf>,
    /// `false` marks actions rollback cannot undo (package installs,
    /// driver installs); rollback stops and reports when it reaches one.
    pub reversible: bool,
}

impl Step {
    pub fn new<I: Into<String>, D: Into<String>>(id: I, description: D, action: StepAction) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            depends_on: Vec::new(),
            satisfied: Probe::Never,
            action,
            mutates_paths: Vec::new(),
            reversible: true,
        }
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.depends_on = ids.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn satisfied_when(mut self, probe: Probe) -> Self {
        self.satisfied = probe;
        self
    }

    pub fn mutates<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.mutates_paths.push(path.into());
        self
    }

    pub fn irreversible(mut self) -> Self {
        self.reversible = false;
        self
    }
}

//! Shared test helpers for the groundwork crate integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::Level;
use serde_json::Value;

use groundwork::exec::{CommandOutput, CommandRunner, StepError};
use groundwork::logging::{AuditSink, FactsEmitter};
use groundwork::types::step::CommandSpec;
use groundwork::Provisioner;

/// A simple in-memory emitter to capture facts during tests.
#[derive(Clone, Default)]
pub struct TestEmitter {
    pub events: Arc<Mutex<Vec<(String, String, String, Value)>>>,
}

impl FactsEmitter for TestEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        self.events
            .lock()
            .unwrap()
            .push((subsystem.into(), event.into(), decision.into(), fields));
    }
}

impl TestEmitter {
    /// Facts for one stage, in emission order.
    pub fn stage(&self, stage: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, event, _, _)| event == stage)
            .map(|(_, _, _, fields)| fields.clone())
            .collect()
    }
}

/// A no-op audit sink for tests.
#[derive(Clone, Default)]
pub struct TestAudit;

impl AuditSink for TestAudit {
    fn log(&self, _level: Level, _msg: &str) {}
}

/// A scripted stand-in for the host: interprets the same package-manager
/// and service-manager invocations the catalog steps use, against
/// in-memory state, and records every invocation.
#[derive(Clone, Default)]
pub struct FakeHost {
    pub installed: Arc<Mutex<HashSet<String>>>,
    pub enabled: Arc<Mutex<HashSet<String>>>,
    /// Programs that behave as absent from PATH.
    pub missing: Arc<Mutex<HashSet<String>>>,
    /// Programs that fail with a permission error.
    pub denied: Arc<Mutex<HashSet<String>>>,
    /// Programs that exit non-zero.
    pub failing: Arc<Mutex<HashSet<String>>>,
    pub invocations: Arc<Mutex<Vec<String>>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_missing(&self, program: &str) {
        self.missing.lock().unwrap().insert(program.to_string());
    }

    pub fn deny(&self, program: &str) {
        self.denied.lock().unwrap().insert(program.to_string());
    }

    pub fn fail(&self, program: &str) {
        self.failing.lock().unwrap().insert(program.to_string());
    }

    pub fn invoked(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invoked_program(&self, program: &str) -> bool {
        self.invoked()
            .iter()
            .any(|line| line.split_whitespace().next() == Some(program))
    }

    fn ok() -> Result<CommandOutput, StepError> {
        Ok(CommandOutput { status: 0, ..Default::default() })
    }

    fn status(code: i32) -> Result<CommandOutput, StepError> {
        Ok(CommandOutput { status: code, ..Default::default() })
    }
}

impl CommandRunner for FakeHost {
    fn run(
        &self,
        spec: &CommandSpec,
        _timeout: Option<Duration>,
    ) -> Result<CommandOutput, StepError> {
        self.invocations.lock().unwrap().push(spec.to_string());

        if self.missing.lock().unwrap().contains(&spec.program) {
            return Err(StepError::ToolMissing(spec.program.clone()));
        }
        if self.denied.lock().unwrap().contains(&spec.program) {
            return Err(StepError::PermissionDenied(spec.program.clone()));
        }
        if self.failing.lock().unwrap().contains(&spec.program) {
            return Self::status(1);
        }

        let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
        match (spec.program.as_str(), args.as_slice()) {
            ("apt-get", ["install", "-y", packages @ ..]) => {
                let mut installed = self.installed.lock().unwrap();
                for p in packages {
                    installed.insert((*p).to_string());
                }
                Self::ok()
            }
            ("apt-get", _) => Self::ok(),
            ("dpkg", ["-s", package]) => {
                if self.installed.lock().unwrap().contains(*package) {
                    Self::ok()
                } else {
                    Self::status(1)
                }
            }
            ("systemctl", ["enable", "--now", unit]) => {
                self.enabled.lock().unwrap().insert((*unit).to_string());
                Self::ok()
            }
            ("systemctl", ["is-enabled", "--quiet", unit]) => {
                if self.enabled.lock().unwrap().contains(*unit) {
                    Self::ok()
                } else {
                    Self::status(1)
                }
            }
            _ => Self::ok(),
        }
    }
}

/// Provisioner wired to in-memory sinks, a scripted host, and a temp
/// backup area rooted inside `root`.
pub fn provisioner(
    root: &std::path::Path,
    facts: TestEmitter,
    host: FakeHost,
) -> Provisioner<TestEmitter, TestAudit> {
    Provisioner::new(facts, TestAudit, backup_root(root))
        .with_command_runner(Box::new(host))
        .with_host_root(root.to_path_buf())
}

pub fn backup_root(root: &std::path::Path) -> PathBuf {
    root.join("backups")
}

/// Create a temporary root directory for a fake host filesystem.
pub fn with_temp_root() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

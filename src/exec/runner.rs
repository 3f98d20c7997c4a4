//! The `CommandRunner` seam and its real implementation over
//! `std::process`. Tests substitute a scripted runner; the engine itself
//! never interprets what a tool does.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::constants::EXEC_POLL_MS;
use crate::types::step::CommandSpec;

use super::{CommandOutput, StepError};

pub trait CommandRunner {
    /// Run one external command to completion, or until `timeout` elapses.
    fn run(&self, spec: &CommandSpec, timeout: Option<Duration>)
        -> Result<CommandOutput, StepError>;
}

/// Runs commands against the real host.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        spec: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, StepError> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StepError::ToolMissing(spec.program.clone()),
                std::io::ErrorKind::PermissionDenied => {
                    StepError::PermissionDenied(spec.program.clone())
                }
                _ => StepError::Io(e),
            })?;

        // Drain pipes on threads so a chatty tool cannot deadlock against
        // a full pipe buffer while we poll for exit.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_handle = thread::spawn(move || read_all(stdout));
        let err_handle = thread::spawn(move || read_all(stderr));

        let t0 = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if let Some(limit) = timeout {
                        if t0.elapsed() >= limit {
                            // External tools are not guaranteed to die
                            // cleanly; kill is best-effort.
                            let _ = child.kill();
                            let _ = child.wait();
                            let _ = out_handle.join();
                            let _ = err_handle.join();
                            return Err(StepError::Timeout {
                                spec: spec.to_string(),
                                timeout_ms: limit.as_millis() as u64,
                            });
                        }
                    }
                    thread::sleep(Duration::from_millis(EXEC_POLL_MS));
                }
                Err(e) => return Err(StepError::Io(e)),
            }
        };

        let stdout = out_handle.join().unwrap_or_default();
        let stderr = err_handle.join().unwrap_or_default();
        Ok(CommandOutput {
            status: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

fn read_all<R: Read>(src: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut r) = src {
        let mut bytes = Vec::new();
        if r.read_to_end(&mut bytes).is_ok() {
            buf = String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    buf
}

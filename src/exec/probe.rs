//! Idempotency probe evaluation. Probes are side-effect-free by
//! contract; a probe that cannot be evaluated safely is an error, not a
//! guess, and the runner records the step as failed rather than running
//! it against unknown state.

use std::fs;
use std::io;

use crate::types::step::Probe;

use super::{CommandRunner, StepError};

pub fn evaluate_probe(probe: &Probe, runner: &dyn CommandRunner) -> Result<bool, StepError> {
    match probe {
        Probe::Never => Ok(false),
        Probe::PathExists(path) => Ok(fs::symlink_metadata(path).is_ok()),
        Probe::FileHasContents { path, contents } => match fs::read_to_string(path) {
            Ok(current) => Ok(current == *contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StepError::Io(e)),
        },
        Probe::CommandSucceeds(spec) => match runner.run(spec, None) {
            Ok(out) => Ok(out.success()),
            // A missing probe tool means the state it would report on
            // cannot already hold (e.g. `docker --version` without docker).
            Err(StepError::ToolMissing(_)) => Ok(false),
            Err(e) => Err(e),
        },
        Probe::AllOf(probes) => {
            for p in probes {
                if !evaluate_probe(p, runner)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}

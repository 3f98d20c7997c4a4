#![forbid(unsafe_code)]
//! groundwork: declarative, idempotent provisioning for a single host.
//!
//! Design highlights:
//! - Steps declare dependencies, a side-effect-free satisfaction probe,
//!   the paths they mutate, and whether they can be undone; the runner
//!   walks them in dependency order and records every decision.
//! - Mutated paths are snapshotted into a run-scoped backup area before
//!   each apply; rollback replays a run in reverse and stops at the
//!   first irreversible step.
//! - External tools are opaque binaries behind the `CommandRunner` seam;
//!   their failures are typed outcomes, never suppressed.

pub mod adapters;
pub mod api;
pub mod backup;
pub mod catalog;
pub mod constants;
pub mod exec;
pub mod logging;
pub mod preflight;
pub mod registry;
pub mod types;

pub use api::*;

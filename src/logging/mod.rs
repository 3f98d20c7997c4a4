pub mod audit;
pub mod facts;
pub mod redact;
pub mod reporter;

pub use audit::{Decision, EventBuilder, Stage, StageLogger};
pub use facts::{AuditSink, FactsEmitter, NullSink};
pub use redact::{redact_event, ts_for_mode, RUN_ID_ZERO, TS_ZERO};
pub use reporter::JsonlReporter;

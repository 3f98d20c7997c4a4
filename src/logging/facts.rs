use log::Level;
use serde_json::Value;

/// Structured fact stream: one emission per decision the engine makes.
/// The durable implementation is [`super::JsonlReporter`]; embedders can
/// supply their own to route facts elsewhere.
pub trait FactsEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value);
}

/// Free-form human/tool output stream, kept separate from facts so
/// captured package-manager chatter never corrupts the structured log.
pub trait AuditSink {
    fn log(&self, level: Level, msg: &str);
}

/// Discards everything; for embedding the engine without a log.
#[derive(Default)]
pub struct NullSink;

impl FactsEmitter for NullSink {
    fn emit(&self, _subsystem: &str, _event: &str, _decision: &str, _fields: Value) {}
}

impl AuditSink for NullSink {
    fn log(&self, _level: Level, _msg: &str) {}
}

use crate::types::plan::RunMode;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const TS_ZERO: &str = "1970-01-01T00:00:00Z";

/// Zeroed run id substituted into dry-run facts for determinism.
pub const RUN_ID_ZERO: &str = "19700101T000000.000Z";

pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| TS_ZERO.to_string())
}

/// Return a timestamp for facts emission based on mode.
/// - DryRun: constant zero timestamp for determinism.
/// - Commit: real, current timestamp in RFC3339.
pub fn ts_for_mode(mode: RunMode) -> String {
    match mode {
        RunMode::DryRun => TS_ZERO.to_string(),
        RunMode::Commit => now_iso(),
    }
}

/// Apply redactions to a fact event for comparison and safe logging.
/// Zeroes timestamps and the run id and removes volatile fields so a
/// dry-run fact stream is byte-comparable across invocations.
pub fn redact_event(mut v: Value) -> Value {
    if let Some(obj) = v.as_object_mut() {
        obj.insert("ts".into(), Value::String(TS_ZERO.to_string()));
        if obj.contains_key("run_id") {
            obj.insert("run_id".into(), Value::String(RUN_ID_ZERO.to_string()));
        }
        // Remove or normalize volatile timings
        obj.remove("duration_ms");
        obj.remove("lock_wait_ms");
        // External tool output varies between hosts
        obj.remove("stdout_tail");
        obj.remove("stderr_tail");
        // Content hashes vary with payload bytes
        obj.remove("payload_hash");
    }
    v
}

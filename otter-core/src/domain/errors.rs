//! Structured error types for otter-core.
//!
//! Only resource errors and warnings are representable as `OtterError`
//! values. Contract violations (nesting violations, a null parallel region
//! at parallel-end) are never returned; they are logged via `error!` and
//! the process aborts at the point of detection, since a Rust `Result`
//! crossing back through the `extern "C"` callback boundary into the host
//! runtime has nowhere meaningful to go.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OtterError {
    #[error("failed to open trace archive at {path}: {reason}")]
    ArchiveOpenFailed { path: String, reason: String },

    #[error("trace writer call {call} failed with status {status}")]
    TraceWriterFailed { call: &'static str, status: i32 },

    #[error("failed to allocate {0}")]
    AllocationFailed(&'static str),

    #[error("invalid configuration for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    #[error("failed to write task graph to {path}: {reason}")]
    TaskGraphWriteFailed { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_writer_failure_formats_call_and_status() {
        let err = OtterError::TraceWriterFailed { call: "OTF2_EvtWriter_Enter", status: 3 };
        let msg = err.to_string();
        assert!(msg.contains("OTF2_EvtWriter_Enter"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn invalid_config_formats_key() {
        let err = OtterError::InvalidConfig {
            key: "OTTER_TASK_GRAPH_FORMAT",
            reason: "unsupported value".into(),
        };
        assert!(err.to_string().contains("OTTER_TASK_GRAPH_FORMAT"));
    }
}

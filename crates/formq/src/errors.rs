//! 🏷️ Errors — the typed taxonomy of "what went wrong", for when anyhow's shrug isn't enough.
//!
//! 🧠 Knowledge graph:
//! - `PipelineError::Configuration` → a required knob is missing. Fatal. Raised before any I/O.
//! - `PipelineError::Transport` → the network, the disk, or the remote API said no.
//!   Fatal on the retrieval path. Retried-then-tallied on the enqueue path.
//! - `ParseError` → a literal or timestamp didn't parse. Never leaves the transforms module
//!   as an error; it always degrades into a fallback value or a `None`.
//!
//! Everything else rides on `anyhow::Result` with a `.context(...)` string, same as the rest
//! of the crate. These types exist so callers (and tests) can `downcast_ref` and tell
//! "no data" apart from "the data source is on fire". 🔥🦆

use thiserror::Error;

/// 💀 Failures that cross a backend boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 🔒 A required connection parameter (URL, token, queue id...) is absent.
    #[error("💀 Configuration error: {0}")]
    Configuration(String),

    /// 📡 A remote call or file read did not succeed.
    #[error("💀 Transport error while trying to {operation}: {detail}")]
    Transport { operation: String, detail: String },
}

impl PipelineError {
    pub(crate) fn transport(operation: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Transport {
            operation: operation.into(),
            detail: detail.to_string(),
        }
    }
}

/// 🐛 Internal parse failures. Swallowed on purpose, one layer up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("literal is malformed at byte {position}: {reason}")]
    Literal { position: usize, reason: &'static str },

    #[error("not an ISO-8601 timestamp: {0:?}")]
    Timestamp(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_errors_survive_the_anyhow_round_trip() {
        let err: anyhow::Error = PipelineError::Configuration("ATS_URL is not set".into()).into();
        let err = err.context("💀 could not list existing references");

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn the_one_where_transport_errors_name_the_operation() {
        let err = PipelineError::transport("add item to workqueue 7", "503 Service Unavailable");
        assert_eq!(
            err.to_string(),
            "💀 Transport error while trying to add item to workqueue 7: 503 Service Unavailable"
        );
    }
}

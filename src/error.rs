//! Error types for Stagehand operations.
//!
//! This module defines [`StagehandError`], the primary error type used
//! throughout the application, [`TransportError`] for failed network calls,
//! and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Configuration problems are detected before any entity is touched and
//!   abort the whole run (see [`StagehandError::is_config_error`])
//! - Transport failures are kept structured so the retry classifier can
//!   inspect them instead of parsing messages
//! - Use `anyhow::Error` (via `StagehandError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Stagehand operations.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// One or more stages have no workflow identifier configured.
    #[error("Missing workflow ids for stages: {}", stages.join(", "))]
    MissingStageTargets { stages: Vec<String> },

    /// A single stage could not be resolved to a workflow identifier.
    #[error("Stage '{stage}' has no workflow id configured")]
    MissingStageTarget { stage: String },

    /// The tracking platform returned an entity we cannot interpret.
    #[error("Entity {id} is malformed: {message}")]
    InvalidEntity { id: u64, message: String },

    /// Another writer changed the persisted state since we last read it.
    #[error("Pipeline state of entity {id} was modified concurrently")]
    StateConflict { id: u64 },

    /// Pipeline state could not be serialized.
    #[error("Failed to encode pipeline state: {0}")]
    StateEncode(#[from] serde_json::Error),

    /// Network call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StagehandError {
    /// Whether this error means the run must not start at all.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StagehandError::ConfigValidationError { .. }
                | StagehandError::ConfigParseError { .. }
                | StagehandError::MissingStageTargets { .. }
                | StagehandError::MissingStageTarget { .. }
        )
    }

    /// Stable machine-readable code used in JSON reports.
    pub fn code(&self) -> &'static str {
        match self {
            StagehandError::ConfigValidationError { .. } => "invalid_config",
            StagehandError::ConfigParseError { .. } => "config_parse_error",
            StagehandError::MissingStageTargets { .. } => "missing_workflow_ids",
            StagehandError::MissingStageTarget { .. } => "workflow_id_not_set",
            StagehandError::InvalidEntity { .. } => "invalid_entity",
            StagehandError::StateConflict { .. } => "state_conflict",
            StagehandError::StateEncode(_) => "state_encode_error",
            StagehandError::Transport(_) => "transport_error",
            StagehandError::Io(_) => "io_error",
            StagehandError::Other(_) => "runtime_error",
        }
    }
}

/// A failed call to one of the external platforms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete within the per-call timeout.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// The connection could not be established.
    #[error("connection failed: {message}")]
    Connect { message: String },

    /// The response body ended early or could not be read.
    #[error("response truncated: {message}")]
    Truncated { message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected shape.
    #[error("invalid response body: {message}")]
    Decode { message: String },

    /// Anything else reqwest can report (builder errors, redirects).
    #[error("request failed: {message}")]
    Other { message: String },
}

impl TransportError {
    /// Short name of the failure class, recorded in error descriptors.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout { .. } => "timeout",
            TransportError::Connect { .. } => "connection",
            TransportError::Truncated { .. } => "truncated",
            TransportError::Status { .. } => "status",
            TransportError::Decode { .. } => "decode",
            TransportError::Other { .. } => "other",
        }
    }

    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            TransportError::Timeout { message }
        } else if err.is_connect() {
            TransportError::Connect { message }
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                body: message,
            }
        } else if err.is_body() {
            TransportError::Truncated { message }
        } else if err.is_decode() {
            TransportError::Decode { message }
        } else if let Some(kind) = io_error_kind(&err) {
            match kind {
                std::io::ErrorKind::UnexpectedEof => TransportError::Truncated { message },
                _ => TransportError::Connect { message },
            }
        } else if err.is_request() {
            // Sent but no response: the peer closed or reset the connection.
            TransportError::Connect { message }
        } else {
            TransportError::Other { message }
        }
    }
}

/// Kind of the first IO error in the source chain of `err`.
fn io_error_kind(err: &(dyn std::error::Error + 'static)) -> Option<std::io::ErrorKind> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = cause.source();
    }
    None
}

/// Result type alias for Stagehand operations.
pub type Result<T, E = StagehandError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parse_error_displays_path_and_message() {
        let err = StagehandError::ConfigParseError {
            path: PathBuf::from("/stagehand.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/stagehand.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn missing_stage_targets_lists_every_stage() {
        let err = StagehandError::MissingStageTargets {
            stages: vec!["WF_B".into(), "WF_D".into()],
        };
        assert_eq!(err.to_string(), "Missing workflow ids for stages: WF_B, WF_D");
        assert_eq!(err.code(), "missing_workflow_ids");
    }

    #[test]
    fn config_errors_are_flagged() {
        assert!(StagehandError::MissingStageTarget { stage: "WF_A".into() }.is_config_error());
        assert!(StagehandError::ConfigValidationError {
            message: "no stages".into()
        }
        .is_config_error());
        assert!(!StagehandError::StateConflict { id: 7 }.is_config_error());
    }

    #[test]
    fn transport_error_wraps_transparently() {
        let err: StagehandError = TransportError::Status {
            status: 503,
            body: "unavailable".into(),
        }
        .into();
        assert_eq!(err.to_string(), "HTTP 503: unavailable");
        assert_eq!(err.code(), "transport_error");
    }

    #[test]
    fn transport_error_kind_and_status() {
        let timeout = TransportError::Timeout {
            message: "deadline".into(),
        };
        assert_eq!(timeout.kind(), "timeout");
        assert_eq!(timeout.status(), None);

        let forbidden = TransportError::Status {
            status: 403,
            body: String::new(),
        };
        assert_eq!(forbidden.kind(), "status");
        assert_eq!(forbidden.status(), Some(403));
    }

    #[test]
    fn unexpected_errors_keep_their_context() {
        use anyhow::Context;

        fn build() -> Result<()> {
            Err(std::io::Error::other("tls backend unavailable"))
                .context("failed to build HTTP client")?;
            Ok(())
        }

        let err = build().unwrap_err();
        assert!(matches!(err, StagehandError::Other(_)));
        assert_eq!(err.code(), "runtime_error");
        assert!(!err.is_config_error());
        assert_eq!(err.to_string(), "failed to build HTTP client");
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: StagehandError = io_err.into();
        assert!(matches!(err, StagehandError::Io(_)));
    }
}

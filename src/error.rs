//! Error taxonomy shared by the canvas backends, the renderer and the bridge.
//!
//! Errors never cross the worker boundary as native values. They are turned
//! into an [`ErrorEnvelope`] at the point where they are reported.

use serde::{Deserialize, Serialize};

/// Convenience result type used across scorecanvas.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by [`Error::RenderFailure`].
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Drawing-state or protocol misuse (path op before `begin_path`,
    /// unmatched group/rotate scope, drawing outside a render session).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A command other than `initialize` arrived before `initialize`.
    #[error("renderer is not initialized")]
    NotInitialized,

    /// Failure while laying out or drawing a pass.
    #[error("render failed during {stage}")]
    RenderFailure {
        stage: &'static str,
        #[source]
        source: BoxedCause,
    },

    /// Malformed or unexpected message shape.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl Error {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    /// Wrap `cause` as a [`Error::RenderFailure`] for the given pass stage.
    pub fn render_failure(stage: &'static str, cause: impl Into<BoxedCause>) -> Self {
        Self::RenderFailure {
            stage,
            source: cause.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::RenderFailure { .. } => ErrorKind::RenderFailure,
            Self::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ProtocolViolation(err.to_string())
    }
}

/// Closed set of error kinds reported across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidState,
    NotInitialized,
    RenderFailure,
    ProtocolViolation,
}

/// Transport-neutral `{kind, message, stack?}` error report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorEnvelope {
    /// Build the envelope from an error; `stack` holds the `source()` chain,
    /// one cause per line.
    pub fn from_error(err: &Error) -> Self {
        let mut causes = Vec::new();
        let mut current = std::error::Error::source(err);
        while let Some(cause) = current {
            causes.push(cause.to_string());
            current = cause.source();
        }

        Self {
            kind: err.kind(),
            message: err.to_string(),
            stack: if causes.is_empty() {
                None
            } else {
                Some(causes.join("\n"))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_cause_chain() {
        let err = Error::render_failure("draw", Error::invalid_state("move_to before begin_path"));
        let envelope = ErrorEnvelope::from_error(&err);

        assert_eq!(envelope.kind, ErrorKind::RenderFailure);
        assert_eq!(envelope.message, "render failed during draw");
        assert_eq!(
            envelope.stack.as_deref(),
            Some("invalid state: move_to before begin_path")
        );
    }

    #[test]
    fn envelope_without_cause_has_no_stack() {
        let envelope = ErrorEnvelope::from_error(&Error::NotInitialized);
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["kind"], "NotInitialized");
        assert!(json.get("stack").is_none());
    }

    #[test]
    fn json_errors_are_protocol_violations() {
        let err: Error = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }
}

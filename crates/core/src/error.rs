//! Error taxonomy for the tutoring engine.
//!
//! Every stage of the progression reports failures through [`TutorError`].
//! Parsing problems never escape as raw `serde_json` errors: they are folded
//! into [`ExtractionError`] or a `Validation` variant at the point where the
//! model's text is turned into data.

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, TutorError>;

/// The generation call itself failed (network, auth, quota, empty reply).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("generation backend failed: {message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The shape of payload a caller asked the extractor for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Array,
    Object,
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// No usable structured payload could be pulled out of a model response.
///
/// Each variant keeps the raw response so callers can log what the model
/// actually said.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no JSON {expected} found in response")]
    NoPayload { expected: PayloadKind, raw: String },

    #[error("JSON {expected} in response could not be parsed: {message}")]
    Malformed {
        expected: PayloadKind,
        message: String,
        raw: String,
    },

    #[error("expected a JSON {expected} but the response held a JSON {found}")]
    UnexpectedShape {
        expected: PayloadKind,
        found: PayloadKind,
        raw: String,
    },
}

impl ExtractionError {
    /// The response text that failed extraction.
    pub fn raw(&self) -> &str {
        match self {
            Self::NoPayload { raw, .. }
            | Self::Malformed { raw, .. }
            | Self::UnexpectedShape { raw, .. } => raw,
        }
    }
}

/// Errors surfaced by the assessment, curriculum and lesson stages.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The payload parsed but does not have the shape the engine needs.
    #[error("invalid {what}: {reason}")]
    Validation { what: String, reason: String },

    /// A valid but empty topic or question list blocks progression.
    #[error("no content: {0}")]
    NoContent(String),

    /// An entry point was called in a state that does not accept it.
    #[error("invalid state transition: cannot {action} while {state}")]
    InvalidTransition { state: String, action: String },
}

impl TutorError {
    pub fn validation(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn no_content(message: impl Into<String>) -> Self {
        Self::NoContent(message.into())
    }

    pub fn invalid_transition(state: impl std::fmt::Display, action: impl Into<String>) -> Self {
        Self::InvalidTransition {
            state: state.to_string(),
            action: action.into(),
        }
    }

    /// `true` for failures of a generation step: the backend call, or the
    /// extraction/validation of what it returned.
    pub const fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            Self::Backend(_) | Self::Extraction(_) | Self::Validation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failure_classification() {
        assert!(TutorError::from(BackendError::new("quota")).is_generation_failure());
        assert!(TutorError::validation("quiz", "too short").is_generation_failure());
        assert!(
            TutorError::from(ExtractionError::NoPayload {
                expected: PayloadKind::Array,
                raw: "hello".into(),
            })
            .is_generation_failure()
        );
        assert!(!TutorError::no_content("no topics").is_generation_failure());
        assert!(!TutorError::invalid_transition("idle", "advance").is_generation_failure());
    }

    #[test]
    fn test_extraction_error_keeps_raw_text() {
        let err = ExtractionError::UnexpectedShape {
            expected: PayloadKind::Array,
            found: PayloadKind::Object,
            raw: "{\"a\": 1}".into(),
        };
        assert_eq!(err.raw(), "{\"a\": 1}");
        assert_eq!(
            err.to_string(),
            "expected a JSON array but the response held a JSON object"
        );
    }

    #[test]
    fn test_backend_error_display() {
        let err = TutorError::from(BackendError::new("401 unauthorized"));
        assert_eq!(err.to_string(), "generation backend failed: 401 unauthorized");
    }
}

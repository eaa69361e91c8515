use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the BlindSpot description pipeline.
#[derive(Debug, Error)]
pub enum BlindSpotError {
    /// The model answered, but not in the expected structure.
    #[error("invalid model output: {0}")]
    Validation(#[from] ValidationError),

    #[error("vision model call failed ({provider}): {message}")]
    Call { provider: String, message: String },

    #[error("vision model call timed out after {after:?}")]
    Timeout { after: Duration },

    /// Missing credentials, unknown provider, invalid settings. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BlindSpotError {
    pub fn call(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Call {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Reasons a raw model reply fails the output schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("output is not valid JSON: {0}")]
    Malformed(String),

    #[error("output must be a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `description` must not be empty")]
    EmptyDescription,

    #[error("importance {value} is outside [{min}, {max}]")]
    OutOfRange { value: i64, min: u8, max: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_convert_and_are_flagged() {
        let err: BlindSpotError = ValidationError::MissingField("importance").into();
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "invalid model output: missing required field `importance`"
        );
    }

    #[test]
    fn call_errors_are_not_validation() {
        let err = BlindSpotError::call("gemini", "503 Service Unavailable");
        assert!(!err.is_validation());
        assert!(err.to_string().contains("gemini"));
        assert!(!BlindSpotError::Timeout {
            after: Duration::from_secs(30)
        }
        .is_validation());
    }

    #[test]
    fn timeout_message_keeps_sub_second_precision() {
        let err = BlindSpotError::Timeout {
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "vision model call timed out after 250ms");
    }
}

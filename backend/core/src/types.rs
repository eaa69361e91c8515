use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text returned to the user whenever every attempt failed.
pub const FALLBACK_DESCRIPTION: &str = "I couldn't process this image. Please try again.";

/// Inclusive bounds of the importance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportanceRange {
    pub min: u8,
    pub max: u8,
}

impl ImportanceRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= i64::from(self.min) && value <= i64::from(self.max)
    }
}

impl Default for ImportanceRange {
    fn default() -> Self {
        Self { min: 1, max: 10 }
    }
}

impl fmt::Display for ImportanceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// A validated description of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionResult {
    pub description: String,
    pub importance: u8,
}

impl DescriptionResult {
    /// The safe result reported when the pipeline gives up.
    pub fn fallback(range: ImportanceRange) -> Self {
        Self {
            description: FALLBACK_DESCRIPTION.to_string(),
            importance: range.min,
        }
    }
}

/// One past description kept as context for later frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub description: String,
    pub importance: u8,
    pub source_id: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(result: &DescriptionResult, source_id: impl Into<String>) -> Self {
        Self {
            description: result.description.clone(),
            importance: result.importance,
            source_id: source_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Which class of error ended a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The model kept answering outside the schema.
    ParseError,
    /// Network, transport, or timeout failure talking to the model.
    CallError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError => f.write_str("parse_error"),
            Self::CallError => f.write_str("call_error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub attempts: u32,
    /// The well-formed result handed to the user in place of a description.
    pub fallback: DescriptionResult,
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Success(DescriptionResult),
    Failure(FailureRecord),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The description to show the user: the real one, or the fallback.
    pub fn result(&self) -> &DescriptionResult {
        match self {
            Self::Success(result) => result,
            Self::Failure(failure) => &failure.fallback,
        }
    }

    pub fn failure(&self) -> Option<&FailureRecord> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    pub fn to_response(&self) -> DescribeResponse {
        let result = self.result();
        DescribeResponse {
            description: result.description.clone(),
            importance: result.importance,
            success: self.is_success(),
            error: self.failure().map(|f| f.message.clone()),
            error_kind: self.failure().map(|f| f.kind),
        }
    }
}

/// The response shape handed to downstream consumers (HTTP layer, CLI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeResponse {
    pub description: String,
    pub importance: u8,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

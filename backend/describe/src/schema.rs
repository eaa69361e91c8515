//! Output schema for model replies and the validator that enforces it.

use blindspot_core::{DescriptionResult, ImportanceRange, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

/// A fenced block such as ```` ```json {...} ``` ````.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").unwrap());

/// The structure every model reply must have: a description and a score.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputSchema {
    range: ImportanceRange,
}

impl OutputSchema {
    pub fn new(range: ImportanceRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> ImportanceRange {
        self.range
    }

    /// JSON schema of the expected reply.
    pub fn json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "Detailed description of the image for a blind person."
                },
                "importance": {
                    "type": "integer",
                    "description": format!("Importance level from {}", self.range),
                    "minimum": self.range.min,
                    "maximum": self.range.max
                }
            },
            "required": ["description", "importance"]
        })
    }

    /// Stable instructions telling the model the exact reply shape.
    pub fn format_instructions(&self) -> String {
        format!(
            "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\
             Reply with the JSON object only, without any surrounding text.\n\n\
             Here is the output schema:\n```\n{}\n```",
            self.json_schema()
        )
    }

    /// Validate a raw reply and turn it into a [`DescriptionResult`].
    ///
    /// Unknown extra fields are ignored; missing or mistyped required fields
    /// and out-of-range scores are rejected.
    pub fn parse(&self, raw: &str) -> Result<DescriptionResult, ValidationError> {
        let value = parse_json_payload(raw)?;
        let Value::Object(object) = value else {
            return Err(ValidationError::NotAnObject);
        };

        let description = required(&object, "description")?
            .as_str()
            .ok_or(ValidationError::WrongType {
                field: "description",
                expected: "a string",
            })?
            .trim();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }

        let importance = required(&object, "importance")?
            .as_i64()
            .ok_or(ValidationError::WrongType {
                field: "importance",
                expected: "an integer",
            })?;
        if !self.range.contains(importance) {
            return Err(ValidationError::OutOfRange {
                value: importance,
                min: self.range.min,
                max: self.range.max,
            });
        }

        Ok(DescriptionResult {
            description: description.to_string(),
            // In range, so it fits.
            importance: importance as u8,
        })
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

/// Pull the JSON payload out of a reply: bare, fenced, or embedded in prose.
fn parse_json_payload(raw: &str) -> Result<Value, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Malformed("empty reply".to_string()));
    }

    let first_error = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    if let Some(block) = FENCED_BLOCK.captures(trimmed).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str::<Value>(block.as_str()) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(ValidationError::Malformed(first_error))
}

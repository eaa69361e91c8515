//! Caller-supplied images and their history identifiers.

use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").unwrap());

/// Turn an uploaded file name into a safe identifier.
///
/// Path separators and whitespace become `_`, anything outside
/// `[A-Za-z0-9_.-]` is dropped, and leading/trailing dots and underscores are
/// trimmed. Names that end up empty get a random `image-<uuid>` id.
pub fn sanitize_source_id(file_name: &str) -> String {
    let joined = file_name
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        format!("image-{}", uuid::Uuid::new_v4())
    } else {
        trimmed.to_string()
    }
}

/// One image handed to the pipeline.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    /// Identifier recorded in history on success.
    pub source_id: String,
    /// Original file name, used as a MIME hint.
    pub file_name: Option<String>,
}

impl ImageInput {
    /// Build from an uploaded file; the source id is the sanitized name.
    pub fn from_upload(bytes: Vec<u8>, file_name: &str) -> Self {
        Self {
            bytes,
            source_id: sanitize_source_id(file_name),
            file_name: Some(file_name.to_string()),
        }
    }

    /// Build with an explicit, already-safe identifier.
    pub fn new(bytes: Vec<u8>, source_id: impl Into<String>) -> Self {
        Self {
            bytes,
            source_id: source_id.into(),
            file_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_names() {
        assert_eq!(sanitize_source_id("frame_001.jpg"), "frame_001.jpg");
    }

    #[test]
    fn strips_paths_and_spaces() {
        assert_eq!(sanitize_source_id("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_source_id("my street photo.png"), "my_street_photo.png");
        assert_eq!(sanitize_source_id(r"C:\Users\me\cam.jpeg"), "C_Users_me_cam.jpeg");
    }

    #[test]
    fn drops_unsafe_characters() {
        assert_eq!(sanitize_source_id("caf\u{e9}<1>.jpg"), "caf1.jpg");
    }

    #[test]
    fn empty_names_get_generated_ids() {
        let id = sanitize_source_id("...");
        assert!(id.starts_with("image-"));
        assert_ne!(sanitize_source_id(""), sanitize_source_id(""));
    }

    #[test]
    fn upload_keeps_original_name_as_hint() {
        let input = ImageInput::from_upload(vec![1, 2, 3], "a b.png");
        assert_eq!(input.source_id, "a_b.png");
        assert_eq!(input.file_name.as_deref(), Some("a b.png"));
    }
}

//! Image framing for vision requests: MIME detection and base64 encoding.
//!
//! The bytes themselves are never decoded or re-encoded as pixels.

use base64::{Engine, engine::general_purpose::STANDARD};
use blindspot_core::InlineImage;

/// MIME type assumed when neither the bytes nor the file name say otherwise.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Detect an image MIME type from its leading magic bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        _ => None,
    }
}

/// Detect an image MIME type from a file name's extension.
pub fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Frame raw image bytes for transport.
///
/// Content sniffing wins over the name hint; both missing falls back to JPEG.
pub fn frame_image(bytes: &[u8], name_hint: Option<&str>) -> InlineImage {
    let mime_type = sniff_image_mime(bytes)
        .or_else(|| name_hint.and_then(mime_from_extension))
        .unwrap_or(DEFAULT_IMAGE_MIME);

    InlineImage {
        mime_type: mime_type.to_string(),
        data_base64: STANDARD.encode(bytes),
    }
}

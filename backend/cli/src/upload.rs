//! Reading local image files under the upload rules.

use std::path::Path;

use anyhow::{bail, Context, Result};
use blindspot_config::UploadConfig;
use blindspot_describe::ImageInput;

/// Read `path` as an upload, enforcing the extension allow-list and size cap.
pub async fn read_image(path: &Path, rules: &UploadConfig) -> Result<ImageInput> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("'{}' has no usable file name", path.display()))?;

    if !rules.is_allowed(file_name) {
        bail!(
            "'{file_name}' is not an allowed image type (allowed: {})",
            rules.allowed_extensions.join(", ")
        );
    }

    let size = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    if size > rules.max_bytes {
        bail!("'{file_name}' is {size} bytes, over the {} byte limit", rules.max_bytes);
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ImageInput::from_upload(bytes, file_name))
}

//! Reading local files as inline attachments.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::message::{Attachment, Disposition};

/// Guesses an image MIME type from a file extension.
#[must_use]
pub fn image_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Generates a fresh `Content-ID`.
#[must_use]
pub fn new_content_id() -> String {
    format!("{}@richmail", Uuid::new_v4().simple())
}

/// Reads an image file into an inline attachment with a fresh content id.
///
/// # Errors
///
/// Returns [`Error::NotAnImage`] for non-image files and [`Error::Io`] if
/// the file cannot be read.
pub async fn read_inline_attachment(path: impl AsRef<Path>) -> Result<Attachment> {
    let path = path.as_ref();
    let content_type = image_content_type(path)
        .ok_or_else(|| Error::NotAnImage(path.display().to_string()))?;
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::debug!(%filename, size = bytes.len(), "read inline attachment");

    Ok(Attachment {
        content_id: Some(new_content_id()),
        filename,
        content_type: content_type.to_string(),
        content_disposition: Disposition::Inline,
        url: None,
        base64: Some(STANDARD.encode(&bytes)),
    })
}

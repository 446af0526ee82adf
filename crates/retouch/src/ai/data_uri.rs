//! `data:<mime>;base64,<payload>` strings and persisting them as files.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::ImageFormat;
use tracing::info;
use uuid::Uuid;

/// Encode `bytes` as a base64 data URI with the given MIME type.
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

/// Split a base64 data URI into its MIME type and decoded bytes.
pub fn decode(data_uri: &str) -> Result<(String, Vec<u8>), String> {
    let (header, payload) = data_uri
        .split_once("base64,")
        .ok_or_else(|| "Invalid image data URL.".to_string())?;
    let mime_type = header
        .strip_prefix("data:")
        .unwrap_or(header)
        .trim_end_matches(';')
        .to_string();
    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .map_err(|e| format!("Invalid image data URL: {e}"))?;
    Ok((mime_type, bytes))
}

/// MIME type of an image, sniffed from its leading bytes.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}

/// Decode a data URI and write it into `dir` as `edited_<uuid>.<ext>`.
///
/// The payload must decode as an image. The extension is `png` when the MIME
/// type mentions png and `jpg` otherwise. `dir` is created when absent.
pub fn save_data_uri(dir: &Path, data_uri: &str) -> Result<PathBuf, String> {
    let (mime_type, bytes) = decode(data_uri)?;
    image::load_from_memory(&bytes).map_err(|e| format!("Decoded data is not an image: {e}"))?;

    let ext = if mime_type.contains("png") { "png" } else { "jpg" };
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("failed to create {}: {e}", dir.display()))?;
    let path = dir.join(format!("edited_{}.{ext}", Uuid::new_v4()));
    std::fs::write(&path, &bytes)
        .map_err(|e| format!("failed to write {}: {e}", path.display()))?;

    info!("Edited image saved to {}", path.display());
    Ok(path)
}

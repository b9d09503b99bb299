use crate::error::AppError;
use crate::models::session_types::{ImageCandidate, UploadedImage};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png"];

const PREVIEW_SIZE: u32 = 512;
const PREVIEW_QUALITY: u8 = 80;

/// Checks type and size, then builds the preview. Nothing here touches the network.
pub fn validate(candidate: ImageCandidate) -> Result<UploadedImage, AppError> {
    let mime_type = candidate.mime_type.trim().to_ascii_lowercase();
    if !ACCEPTED_MIME_TYPES.contains(&mime_type.as_str()) {
        return Err(AppError::Validation(
            "Please upload an image file (JPEG, PNG)".to_string(),
        ));
    }

    check_size(candidate.size_bytes())?;

    let preview = build_preview(&candidate.bytes, &mime_type);
    Ok(UploadedImage {
        filename: candidate.filename,
        size_bytes: candidate.bytes.len() as u64,
        mime_type,
        raw_bytes: candidate.bytes,
        preview,
    })
}

fn check_size(size: u64) -> Result<(), AppError> {
    if size > MAX_FILE_SIZE {
        return Err(AppError::Validation(
            "File size should be less than 5MB".to_string(),
        ));
    }
    Ok(())
}

/// Reads a file picked in the browse dialog. Oversized files are rejected
/// from their metadata without reading them.
pub async fn candidate_from_path(path: &Path) -> Result<ImageCandidate, AppError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| AppError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(AppError::Validation(format!("{} is not a file", path.display())));
    }
    check_size(metadata.len())?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let mime_type = sniff_mime_type(&bytes, path);

    Ok(ImageCandidate::new(filename, mime_type, bytes))
}

/// File header first, extension as a fallback.
pub fn sniff_mime_type(bytes: &[u8], path: &Path) -> String {
    image::guess_format(bytes)
        .or_else(|_| ImageFormat::from_path(path))
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// Downscaled JPEG data URL, or the original bytes when they do not decode.
fn build_preview(bytes: &[u8], mime_type: &str) -> String {
    match encode_preview(bytes) {
        Ok(jpeg) => data_url("image/jpeg", &jpeg),
        Err(e) => {
            log::debug!("Preview decode failed, embedding original bytes: {}", e);
            data_url(mime_type, bytes)
        }
    }
}

fn encode_preview(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    let small = img.thumbnail(PREVIEW_SIZE, PREVIEW_SIZE).to_rgb8();

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, PREVIEW_QUALITY);
    small.write_with_encoder(encoder)?;
    Ok(buffer.into_inner())
}

fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{}", mime_type, b64)
}

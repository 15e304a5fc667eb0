//! Payload codec: data-URI decoding and JPEG/base64 encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("empty image payload")]
    EmptyPayload,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode a `data:image/...;base64,<body>` string into an RGB frame.
///
/// Everything up to the first comma is treated as the header and dropped.
/// A payload with no comma is decoded as bare base64.
pub fn decode_data_uri(payload: &str) -> Result<RgbImage, MediaError> {
    let body = match payload.split_once(',') {
        Some((_header, body)) => body,
        None => payload,
    };
    let body = body.trim();
    if body.is_empty() {
        return Err(MediaError::EmptyPayload);
    }

    let bytes = STANDARD.decode(body)?;
    let image = image::load_from_memory(&bytes)?;
    Ok(image.to_rgb8())
}

/// Encode an RGB frame as baseline JPEG.
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, MediaError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(frame)?;
    Ok(buffer)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

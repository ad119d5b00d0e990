//! Image references and the bitmap codec.
//!
//! Pixel data crosses every persistence boundary as an [`ImageRef`]: either an
//! inline `data:` URL or a path the resolver can read. Decoded bitmaps are
//! always straight-alpha RGBA8.

mod resolver;

pub use resolver::{DataUrlResolver, DefaultResolver, FileResolver, ImageResolver};

use base64::{Engine, engine::general_purpose::STANDARD};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Prefix of the canonical inline reference format.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Failure to turn an image reference into a bitmap.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Unsupported image reference: {0}")]
    Unsupported(String),
    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Decode error: {0}")]
    Decode(#[from] image::ImageError),
}

/// Failure to encode a bitmap.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
    #[error("Bitmap has no pixels ({0}x{1})")]
    Empty(u32, u32),
}

/// Reference to pixel data: a data URL, `file://` URL or filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_url(&self) -> bool {
        self.0.starts_with("data:")
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Inline payloads can be megabytes long
        match self.0.char_indices().nth(48) {
            Some((end, _)) if self.is_data_url() => write!(f, "{}…", &self.0[..end]),
            _ => f.write_str(&self.0),
        }
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Encode RGBA pixel data to PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::Empty(width, height));
    }

    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.as_raw())?;
    }
    Ok(png_data)
}

/// Decode PNG/JPEG/WebP bytes into an RGBA bitmap.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ResolveError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Encode a bitmap as an inline PNG data URL.
pub fn to_data_url(image: &RgbaImage) -> Result<ImageRef, EncodeError> {
    let png_data = encode_png(image)?;
    Ok(ImageRef(format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png_data))))
}

/// Extract the raw bytes carried by a base64 `data:` URL.
pub fn parse_data_url(url: &str) -> Result<Vec<u8>, ResolveError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| ResolveError::MalformedDataUrl("missing data: scheme".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ResolveError::MalformedDataUrl("missing ',' separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(ResolveError::MalformedDataUrl(format!(
            "only base64 payloads are supported, got '{}'",
            header
        )));
    }
    Ok(STANDARD.decode(payload.trim())?)
}

/// Whether any pixel is not fully opaque.
pub fn has_transparency(image: &RgbaImage) -> bool {
    image.pixels().any(|p| p[3] < u8::MAX)
}

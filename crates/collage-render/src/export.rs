//! Flattened PNG export of the visible layers.

use crate::raster;
use collage_core::imaging::encode_png;
use collage_core::{ExportError, LayerStore, SerializableColor, Viewport};
use image::RgbaImage;
use kurbo::Vec2;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What shows through where no layer covers the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportBackground {
    #[default]
    Transparent,
    Solid(SerializableColor),
}

#[derive(Debug, Error)]
#[error("Invalid background '{0}': expected 'transparent' or a hex color")]
pub struct InvalidBackground(pub String);

impl FromStr for ExportBackground {
    type Err = InvalidBackground;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("transparent") {
            return Ok(Self::Transparent);
        }
        SerializableColor::from_hex(s)
            .map(Self::Solid)
            .ok_or_else(|| InvalidBackground(s.to_string()))
    }
}

impl fmt::Display for ExportBackground {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transparent => f.write_str("transparent"),
            Self::Solid(color) => f.write_str(&color.to_hex()),
        }
    }
}

impl ExportBackground {
    fn color(self) -> SerializableColor {
        match self {
            Self::Transparent => SerializableColor::transparent(),
            Self::Solid(color) => color,
        }
    }
}

/// Composite the visible layers at one pixel per canvas unit, cropped to
/// their union plus `padding` on every side.
pub fn flatten_visible(
    layers: &LayerStore,
    padding: f64,
    background: ExportBackground,
) -> Result<RgbaImage, ExportError> {
    let bounds = layers.visible_bounds().ok_or(ExportError::NothingVisible)?;
    let padding = padding.max(0.0);
    let area = bounds.inflate(padding, padding);
    let width = area.width().ceil() as u32;
    let height = area.height().ceil() as u32;

    let viewport = Viewport::with_offset_and_scale(Vec2::new(-area.x0, -area.y0), 1.0);
    let mut frame = RgbaImage::from_pixel(width, height, background.color().to_rgba());
    for layer in layers.iter().filter(|layer| layer.visible()) {
        raster::draw_layer(&mut frame, layer, &viewport);
    }
    log::debug!("Flattened {}x{} export ({} background)", width, height, background);
    Ok(frame)
}

/// [`flatten_visible`] encoded as PNG.
pub fn export_png(
    layers: &LayerStore,
    padding: f64,
    background: ExportBackground,
) -> Result<Vec<u8>, ExportError> {
    let image = flatten_visible(layers, padding, background)?;
    Ok(encode_png(&image)?)
}

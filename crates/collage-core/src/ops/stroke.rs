//! Marker strokes rasterized into new layers.

use super::EditError;
use crate::color::SerializableColor;
use crate::layer::Layer;
use image::{Rgba, RgbaImage};
use kurbo::{Line, ParamCurveNearest, Point, Rect};
use serde::{Deserialize, Serialize};

/// Marker appearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: SerializableColor,
    pub width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: SerializableColor::new(0xef, 0x44, 0x44, 0xff),
            width: 4.0,
        }
    }
}

/// Largest stroke bitmap edge, in pixels.
pub const MAX_STROKE_EDGE: u32 = 16_384;

/// Largest stroke bitmap area, in pixels.
pub const MAX_STROKE_PIXELS: usize = 1 << 26;

/// Tight bounds of the points, grown by half the stroke width on each side.
pub fn stroke_bounds(points: &[Point], width: f64) -> Option<Rect> {
    let first = points.first()?;
    let bounds = points
        .iter()
        .skip(1)
        .fold(Rect::from_origin_size(*first, (0.0, 0.0)), |acc, p| acc.union_pt(*p));
    Some(bounds.inflate(width / 2.0, width / 2.0))
}

/// Distance from `p` to the segment `a..b`.
fn segment_distance(a: Point, b: Point, p: Point) -> f64 {
    if a == b {
        return a.distance(p);
    }
    Line::new(a, b).nearest(p, 1e-6).distance_sq.sqrt()
}

/// Rasterize a round-capped, round-joined polyline.
///
/// Returns the bitmap and the canvas position of its top-left corner. The
/// bitmap covers exactly [`stroke_bounds`], rounded up to whole pixels.
pub fn rasterize_stroke(
    points: &[Point],
    style: &StrokeStyle,
) -> Result<(RgbaImage, Point), EditError> {
    if points.len() < 2 {
        return Err(EditError::TooFewPoints(points.len()));
    }
    if !style.width.is_finite() || points.iter().any(|p| !p.is_finite()) {
        return Err(EditError::NonFinite);
    }
    let half = (style.width / 2.0).max(0.5);
    let bounds = stroke_bounds(points, half * 2.0).ok_or(EditError::TooFewPoints(0))?;
    let (width, height) = (bounds.width().ceil().max(1.0), bounds.height().ceil().max(1.0));
    if width > MAX_STROKE_EDGE as f64 || height > MAX_STROKE_EDGE as f64 {
        return Err(EditError::TooLarge { width, height });
    }
    let (width, height) = (width as u32, height as u32);
    let area = (width as usize)
        .checked_mul(height as usize)
        .filter(|area| *area <= MAX_STROKE_PIXELS)
        .ok_or(EditError::TooLarge {
            width: width as f64,
            height: height as f64,
        })?;
    let origin = bounds.origin();
    let stride = width as usize;

    // Max coverage over all segments gives a union of capsules, so joins
    // and caps come out round without double-blending overlaps
    let mut coverage = vec![0f32; area];
    for segment in points.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let reach = Rect::from_points(a, b).inflate(half + 1.0, half + 1.0) - origin.to_vec2();
        let x0 = reach.x0.floor().max(0.0) as u32;
        let y0 = reach.y0.floor().max(0.0) as u32;
        let x1 = (reach.x1.ceil().max(0.0) as u32).min(width);
        let y1 = (reach.y1.ceil().max(0.0) as u32).min(height);

        for py in y0..y1 {
            for px in x0..x1 {
                let center = origin + (px as f64 + 0.5, py as f64 + 0.5);
                let distance = segment_distance(a, b, center);
                let cover = (half - distance + 0.5).clamp(0.0, 1.0) as f32;
                let slot = &mut coverage[py as usize * stride + px as usize];
                if cover > *slot {
                    *slot = cover;
                }
            }
        }
    }

    let color = style.color;
    let image = RgbaImage::from_fn(width, height, |x, y| {
        let cover = coverage[y as usize * stride + x as usize];
        if cover <= 0.0 {
            Rgba([0, 0, 0, 0])
        } else {
            let alpha = (color.a as f32 * cover).round() as u8;
            Rgba([color.r, color.g, color.b, alpha])
        }
    });
    Ok((image, origin))
}

/// Build the layer for a finished stroke.
pub fn stroke_layer(points: &[Point], style: &StrokeStyle) -> Result<Layer, EditError> {
    let (image, origin) = rasterize_stroke(points, style)?;
    Ok(Layer::new(image, origin, "Marker"))
}

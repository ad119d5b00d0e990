//! Pixel primitives on an RGBA frame. Coordinates are screen pixels unless
//! stated otherwise; a pixel is painted when its centre falls inside the
//! shape.

use collage_core::{Layer, SerializableColor, Viewport};
use image::{Rgba, RgbaImage};
use kurbo::{Point, Rect};
use std::ops::Range;

/// Straight-alpha source-over compositing of `src` onto `dst`.
pub(crate) fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src[3] as u32;
    if sa == 0 {
        return;
    }
    if sa == 255 {
        *dst = src;
        return;
    }
    let da = dst[3] as u32;
    // Output alpha scaled by 255
    let out = sa * 255 + da * (255 - sa);
    for c in 0..3 {
        let num = src[c] as u32 * sa * 255 + dst[c] as u32 * da * (255 - sa);
        dst[c] = ((num + out / 2) / out) as u8;
    }
    dst[3] = ((out + 127) / 255) as u8;
}

/// Indices of pixels whose centres lie in `[lo, hi)`, clipped to `0..limit`.
fn pixel_span(lo: f64, hi: f64, limit: u32) -> Range<u32> {
    let clip = |edge: f64| (edge - 0.5).ceil().max(0.0).min(limit as f64) as u32;
    clip(lo)..clip(hi)
}

pub(crate) fn fill_rect(frame: &mut RgbaImage, rect: Rect, color: SerializableColor) {
    let color = color.to_rgba();
    let xs = pixel_span(rect.x0, rect.x1, frame.width());
    for y in pixel_span(rect.y0, rect.y1, frame.height()) {
        for x in xs.clone() {
            blend(frame.get_pixel_mut(x, y), color);
        }
    }
}

/// Outline centred on the rectangle's edges.
pub(crate) fn stroke_rect(frame: &mut RgbaImage, rect: Rect, width: f64, color: SerializableColor) {
    let h = width / 2.0;
    let outer = rect.inflate(h, h);
    fill_rect(frame, Rect::new(outer.x0, outer.y0, outer.x1, rect.y0 + h), color);
    fill_rect(frame, Rect::new(outer.x0, rect.y1 - h, outer.x1, outer.y1), color);
    let (top, bottom) = (rect.y0 + h, (rect.y1 - h).max(rect.y0 + h));
    fill_rect(frame, Rect::new(outer.x0, top, rect.x0 + h, bottom), color);
    fill_rect(frame, Rect::new(rect.x1 - h, top, outer.x1, bottom), color);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LineStyle {
    pub width: f64,
    /// Equal on/off dash length; solid when `None`.
    pub dash: Option<f64>,
    pub color: SerializableColor,
}

/// Axis-aligned line at `at` spanning `from..to` along `axis`.
pub(crate) fn line(frame: &mut RgbaImage, axis: Axis, at: f64, (from, to): (f64, f64), style: LineStyle) {
    let h = style.width / 2.0;
    let segment = |a: f64, b: f64| match axis {
        Axis::Horizontal => Rect::new(a, at - h, b, at + h),
        Axis::Vertical => Rect::new(at - h, a, at + h, b),
    };
    match style.dash {
        Some(dash) if dash > 0.0 => {
            let mut start = from;
            while start < to {
                fill_rect(frame, segment(start, (start + dash).min(to)), style.color);
                start += dash * 2.0;
            }
        }
        _ => fill_rect(frame, segment(from, to), style.color),
    }
}

/// Draw `image` stretched over the canvas rectangle `dest`, nearest
/// neighbour, through `viewport`.
pub(crate) fn draw_image(frame: &mut RgbaImage, image: &RgbaImage, dest: Rect, viewport: &Viewport) {
    let (iw, ih) = image.dimensions();
    if iw == 0 || ih == 0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
        return;
    }
    let screen = viewport.rect_to_screen(dest);
    let sx = iw as f64 / dest.width();
    let sy = ih as f64 / dest.height();
    let xs = pixel_span(screen.x0, screen.x1, frame.width());
    for py in pixel_span(screen.y0, screen.y1, frame.height()) {
        for px in xs.clone() {
            let p = viewport.screen_to_canvas(Point::new(px as f64 + 0.5, py as f64 + 0.5));
            let u = (((p.x - dest.x0) * sx).floor().max(0.0) as u32).min(iw - 1);
            let v = (((p.y - dest.y0) * sy).floor().max(0.0) as u32).min(ih - 1);
            blend(frame.get_pixel_mut(px, py), *image.get_pixel(u, v));
        }
    }
}

pub(crate) fn draw_layer(frame: &mut RgbaImage, layer: &Layer, viewport: &Viewport) {
    draw_image(frame, layer.pixels(), layer.bounds(), viewport);
}

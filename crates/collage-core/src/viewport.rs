//! Viewport module for pan/zoom transforms.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 5.0;

/// Viewport maps canvas space to screen space: `screen = canvas * scale + offset`.
///
/// The scale is kept within `[MIN_ZOOM, MAX_ZOOM]` by every mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current translation offset (pan), in screen pixels.
    pub offset: Vec2,
    /// Current zoom factor.
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl Viewport {
    /// Identity viewport: no pan, 100% zoom.
    pub fn new() -> Self {
        Self::default()
    }

    /// Viewport with the given offset and scale (scale is clamped).
    pub fn with_offset_and_scale(offset: Vec2, scale: f64) -> Self {
        Self {
            offset,
            scale: clamp_scale(scale),
        }
    }

    /// Affine transform from canvas to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Affine transform from screen to canvas coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to canvas coordinates.
    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        self.transform() * canvas_point
    }

    /// Map a canvas rectangle to screen space.
    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        let p0 = self.canvas_to_screen(Point::new(rect.x0, rect.y0));
        let p1 = self.canvas_to_screen(Point::new(rect.x1, rect.y1));
        Rect::from_points(p0, p1)
    }

    /// Canvas-space rectangle currently visible in a screen area of `size`.
    pub fn visible_rect(&self, size: Size) -> Rect {
        let p0 = self.screen_to_canvas(Point::ZERO);
        let p1 = self.screen_to_canvas(Point::new(size.width, size.height));
        Rect::from_points(p0, p1)
    }

    /// Pan by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping the canvas point under `screen_point` fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_scale = clamp_scale(self.scale * factor);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        let canvas_point = self.screen_to_canvas(screen_point);
        self.scale = new_scale;

        // Shift so canvas_point lands back under screen_point
        let moved = self.canvas_to_screen(canvas_point);
        self.offset += screen_point - moved;
    }

    /// Reset to identity.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.scale = 1.0;
    }

    /// Fit the viewport so `bounds` is centered inside a screen area of `size`.
    pub fn fit_to_bounds(&mut self, bounds: Rect, size: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }

        let available = Size::new(
            (size.width - padding * 2.0).max(1.0),
            (size.height - padding * 2.0).max(1.0),
        );
        let scale_x = available.width / bounds.width();
        let scale_y = available.height / bounds.height();
        self.scale = clamp_scale(scale_x.min(scale_y));

        let center = bounds.center();
        self.offset = Vec2::new(
            size.width / 2.0 - center.x * self.scale,
            size.height / 2.0 - center.y * self.scale,
        );
    }
}

/// Clamp a zoom factor to the supported range.
pub fn clamp_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_ZOOM, MAX_ZOOM)
}

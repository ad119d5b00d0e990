//! CPU compositor producing an RGBA frame.

use crate::raster::{self, Axis, LineStyle};
use crate::renderer::{GridStyle, RenderContext, RenderResult, Renderer};
use collage_core::ops::rasterize_stroke;
use collage_core::{SerializableColor, SnapGuide, StrokePreview, Viewport};
use image::RgbaImage;
use kurbo::{Point, Rect};

const CHECKER_LIGHT: SerializableColor = SerializableColor::new(0xf0, 0xf0, 0xf0, 0xff);
const CHECKER_DARK: SerializableColor = SerializableColor::new(0xe0, 0xe0, 0xe0, 0xff);
const GRID_COLOR: SerializableColor = SerializableColor::new(0xd0, 0xd0, 0xd0, 0xff);
const GUIDE_COLOR: SerializableColor = SerializableColor::new(0xff, 0x00, 0xff, 0xff);
const CROP_COLOR: SerializableColor = SerializableColor::new(0xef, 0x44, 0x44, 0xff);
/// Crop stroke color at 10% opacity.
const CROP_FILL: SerializableColor = CROP_COLOR.with_alpha(26);

/// Screen-space sizes of overlay decorations, in pixels.
const SELECTION_WIDTH: f64 = 2.0;
const HANDLE_SIZE: f64 = 8.0;
const GUIDE_DASH: f64 = 5.0;
const CROP_WIDTH: f64 = 2.0;

/// Software renderer. Holds the last composited frame.
#[derive(Debug, Default)]
pub struct SoftwareRenderer {
    frame: RgbaImage,
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last composited frame.
    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    pub fn take_frame(&mut self) -> RgbaImage {
        std::mem::take(&mut self.frame)
    }

    /// Composite one frame and hand it out.
    pub fn render(&mut self, ctx: &RenderContext) -> RenderResult<RgbaImage> {
        self.build_frame(ctx)?;
        Ok(self.take_frame())
    }
}

impl Renderer for SoftwareRenderer {
    fn build_frame(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let (width, height) = ctx.frame_size()?;
        self.frame = RgbaImage::from_pixel(width, height, self.background_color(ctx).to_rgba());
        let viewport = ctx.viewport;

        match ctx.grid_style {
            GridStyle::None => {}
            GridStyle::Checkerboard => {
                self.render_checkerboard(&viewport, ctx.checker_size);
                self.render_grid_lines(&viewport, ctx.grid_size);
            }
        }

        for layer in ctx.layers.iter().filter(|layer| layer.visible()) {
            raster::draw_layer(&mut self.frame, layer, &viewport);
        }

        if let Some(selected) = ctx.layers.selected().filter(|layer| layer.visible()) {
            self.render_selection_handles(viewport.rect_to_screen(selected.bounds()), ctx.selection_color);
        }

        for guide in &ctx.overlay.guides {
            self.render_snap_guide(*guide, &viewport);
        }

        if let Some(preview) = &ctx.overlay.stroke_preview {
            self.render_stroke_preview(preview, &viewport);
        }

        if let Some(rect) = ctx.overlay.crop_rect {
            self.render_crop_rect(viewport.rect_to_screen(rect));
        }
        Ok(())
    }
}

impl SoftwareRenderer {
    /// Alternate two greys in `cell`-unit squares anchored at the canvas origin.
    fn render_checkerboard(&mut self, viewport: &Viewport, cell: f64) {
        if cell <= 0.0 {
            return;
        }
        let (light, dark) = (CHECKER_LIGHT.to_rgba(), CHECKER_DARK.to_rgba());
        let cell_of = |screen: f64, offset: f64| ((screen + 0.5 - offset) / viewport.scale / cell).floor() as i64;
        for (x, y, pixel) in self.frame.enumerate_pixels_mut() {
            let parity = (cell_of(x as f64, viewport.offset.x) + cell_of(y as f64, viewport.offset.y)).rem_euclid(2);
            *pixel = if parity == 0 { light } else { dark };
        }
    }

    /// One-pixel lines at every multiple of `grid_size` in view.
    fn render_grid_lines(&mut self, viewport: &Viewport, grid_size: f64) {
        if grid_size <= 0.0 {
            return;
        }
        let (width, height) = (self.frame.width() as f64, self.frame.height() as f64);
        let visible = viewport.visible_rect(kurbo::Size::new(width, height));
        let style = LineStyle { width: 1.0, dash: None, color: GRID_COLOR };

        let mut x = (visible.x0 / grid_size).floor() * grid_size;
        while x <= visible.x1 {
            let at = viewport.canvas_to_screen(Point::new(x, 0.0)).x;
            raster::line(&mut self.frame, Axis::Vertical, at, (0.0, height), style);
            x += grid_size;
        }

        let mut y = (visible.y0 / grid_size).floor() * grid_size;
        while y <= visible.y1 {
            let at = viewport.canvas_to_screen(Point::new(0.0, y)).y;
            raster::line(&mut self.frame, Axis::Horizontal, at, (0.0, width), style);
            y += grid_size;
        }
    }

    /// Outline plus four filled corner squares, constant screen size.
    fn render_selection_handles(&mut self, bounds: Rect, color: SerializableColor) {
        raster::stroke_rect(&mut self.frame, bounds, SELECTION_WIDTH, color);

        let corners = [
            Point::new(bounds.x0, bounds.y0),
            Point::new(bounds.x1, bounds.y0),
            Point::new(bounds.x1, bounds.y1),
            Point::new(bounds.x0, bounds.y1),
        ];
        for corner in corners {
            let half = HANDLE_SIZE / 2.0;
            let handle = Rect::new(corner.x - half, corner.y - half, corner.x + half, corner.y + half);
            raster::fill_rect(&mut self.frame, handle, color);
        }
    }

    /// Dashed line across the whole frame.
    fn render_snap_guide(&mut self, guide: SnapGuide, viewport: &Viewport) {
        let style = LineStyle { width: 1.0, dash: Some(GUIDE_DASH), color: GUIDE_COLOR };
        let (width, height) = (self.frame.width() as f64, self.frame.height() as f64);
        match guide {
            SnapGuide::Vertical(x) => {
                let at = viewport.canvas_to_screen(Point::new(x, 0.0)).x;
                raster::line(&mut self.frame, Axis::Vertical, at, (0.0, height), style);
            }
            SnapGuide::Horizontal(y) => {
                let at = viewport.canvas_to_screen(Point::new(0.0, y)).y;
                raster::line(&mut self.frame, Axis::Horizontal, at, (0.0, width), style);
            }
        }
    }

    /// The stroke as it would be committed, drawn through the viewport.
    fn render_stroke_preview(&mut self, preview: &StrokePreview, viewport: &Viewport) {
        // A single point has nothing to show yet
        let Ok((bitmap, origin)) = rasterize_stroke(&preview.points, &preview.style) else {
            return;
        };
        let dest = Rect::from_origin_size(origin, (bitmap.width() as f64, bitmap.height() as f64));
        raster::draw_image(&mut self.frame, &bitmap, dest, viewport);
    }

    fn render_crop_rect(&mut self, rect: Rect) {
        raster::fill_rect(&mut self.frame, rect, CROP_FILL);
        raster::stroke_rect(&mut self.frame, rect, CROP_WIDTH, CROP_COLOR);
    }
}

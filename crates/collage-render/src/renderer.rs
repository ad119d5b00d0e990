//! Renderer trait abstraction.

use collage_core::{Canvas, LayerStore, SerializableColor, TransientOverlay, Viewport};
use kurbo::Size;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid frame size: {width}x{height}")]
    InvalidSize { width: f64, height: f64 },
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Largest frame edge, in pixels.
pub const MAX_FRAME_EDGE: u32 = 16_384;

/// Background grid style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridStyle {
    /// Plain background.
    None,
    /// Transparency checkerboard under the grid lines.
    #[default]
    Checkerboard,
}

impl GridStyle {
    /// Style for the `show_grid` toggle.
    pub fn from_toggle(show_grid: bool) -> Self {
        if show_grid {
            GridStyle::Checkerboard
        } else {
            GridStyle::None
        }
    }
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// Layers to composite, bottom to top.
    pub layers: &'a LayerStore,
    pub viewport: Viewport,
    /// Frame size in pixels.
    pub viewport_size: Size,
    pub overlay: TransientOverlay,
    pub background_color: SerializableColor,
    pub grid_style: GridStyle,
    /// Grid line spacing in canvas units.
    pub grid_size: f64,
    /// Checkerboard cell size in canvas units.
    pub checker_size: f64,
    pub selection_color: SerializableColor,
}

impl<'a> RenderContext<'a> {
    /// Create a render context for the canvas as it stands.
    pub fn new(canvas: &'a Canvas, viewport_size: Size) -> Self {
        Self {
            layers: canvas.layers(),
            viewport: canvas.viewport(),
            viewport_size,
            overlay: TransientOverlay::default(),
            background_color: SerializableColor::white(),
            grid_style: GridStyle::default(),
            grid_size: collage_core::GRID_SIZE,
            checker_size: 20.0,
            selection_color: SerializableColor::new(0x25, 0x63, 0xeb, 0xff), // Blue
        }
    }

    /// Set the in-progress gesture overlay.
    pub fn with_overlay(mut self, overlay: TransientOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: SerializableColor) -> Self {
        self.background_color = color;
        self
    }

    /// Set the grid style.
    pub fn with_grid(mut self, style: GridStyle) -> Self {
        self.grid_style = style;
        self
    }

    pub fn with_grid_size(mut self, grid_size: f64) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_selection_color(mut self, color: SerializableColor) -> Self {
        self.selection_color = color;
        self
    }

    /// Frame dimensions in whole pixels.
    pub fn frame_size(&self) -> RenderResult<(u32, u32)> {
        let Size { width, height } = self.viewport_size;
        let valid = |edge: f64| edge.is_finite() && edge >= 0.0 && edge <= MAX_FRAME_EDGE as f64;
        if !valid(width) || !valid(height) {
            return Err(RendererError::InvalidSize { width, height });
        }
        Ok((width.round() as u32, height.round() as u32))
    }
}

/// Trait for rendering backends.
///
/// Rendering is a pure function of the context: implementations never
/// touch model state.
pub trait Renderer: Send + Sync {
    /// Composite one frame.
    fn build_frame(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> SerializableColor {
        ctx.background_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_toggle() {
        assert_eq!(GridStyle::from_toggle(true), GridStyle::Checkerboard);
        assert_eq!(GridStyle::from_toggle(false), GridStyle::None);
    }

    #[test]
    fn test_frame_size_validation() {
        let canvas = Canvas::default();
        assert_eq!(
            RenderContext::new(&canvas, Size::new(640.4, 480.0)).frame_size().unwrap(),
            (640, 480)
        );
        assert!(RenderContext::new(&canvas, Size::new(-1.0, 10.0)).frame_size().is_err());
        assert!(RenderContext::new(&canvas, Size::new(f64::NAN, 10.0)).frame_size().is_err());
        assert!(RenderContext::new(&canvas, Size::new(1e9, 10.0)).frame_size().is_err());
    }
}

//! Destructive edit operators.
//!
//! Operators validate everything up front and only then touch the layer
//! store, so a failed edit leaves no trace.

mod crop;
mod stroke;

pub use crop::{CropPlan, apply_crop, crop_excise, local_crop_rect, plan_crop};
pub use stroke::{MAX_STROKE_EDGE, MAX_STROKE_PIXELS, StrokeStyle, rasterize_stroke, stroke_bounds, stroke_layer};

use crate::layer::LayerId;
use thiserror::Error;

/// Invalid edit geometry or target.
#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("No layer is selected")]
    NoSelection,
    #[error("Layer not found: {0}")]
    LayerNotFound(LayerId),
    #[error("Rectangle has no area")]
    DegenerateRect,
    #[error("Rectangle extends outside the layer")]
    OutOfBounds,
    #[error("A stroke needs at least two points, got {0}")]
    TooFewPoints(usize),
    #[error("Stroke of {width}x{height} pixels is too large")]
    TooLarge { width: f64, height: f64 },
    #[error("Stroke has a non-finite point or width")]
    NonFinite,
}

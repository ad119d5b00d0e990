//! Collage Render Library
//!
//! Software compositing of the layer stack, viewport and interaction
//! overlays into an RGBA frame, plus the flattened PNG export.

pub mod export;
mod raster;
mod renderer;
mod software;

pub use export::{ExportBackground, InvalidBackground, export_png, flatten_visible};
pub use renderer::{GridStyle, MAX_FRAME_EDGE, RenderContext, RenderResult, Renderer, RendererError};
pub use software::SoftwareRenderer;

//! The layer: one positioned, sized bitmap with identity and visibility.

use crate::imaging::{ImageRef, has_transparency};
use image::RgbaImage;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Shared, immutable pixel buffer. Edits replace the buffer, never mutate it.
pub type Pixels = Arc<RgbaImage>;

/// Opaque, stable layer identifier.
///
/// Ids minted here are UUIDs; ids adopted from the external collection keep
/// whatever value that collection uses (numeric ids are stored as their
/// decimal text).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Mint a fresh unique id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for LayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => LayerId(text),
            Raw::Number(number) => LayerId(number.to_string()),
        })
    }
}

/// A raster layer on the canvas.
///
/// `pixels` is the current bitmap; `original` is the bitmap before any
/// destructive edit. `size` is the display size in canvas units and may differ
/// from the pixel dimensions.
#[derive(Clone)]
pub struct Layer {
    id: LayerId,
    pixels: Pixels,
    original: Pixels,
    position: Point,
    size: Size,
    visible: bool,
    name: String,
    has_alpha: bool,
    /// Reference the current pixels were loaded from (or last encoded to).
    current_ref: Option<ImageRef>,
    /// Reference the original pixels were loaded from (or last encoded to).
    original_ref: Option<ImageRef>,
}

impl Layer {
    /// Create a visible layer whose display size matches its pixel size.
    pub fn new(pixels: RgbaImage, position: Point, name: impl Into<String>) -> Self {
        Self::from_shared(Arc::new(pixels), position, name)
    }

    /// Create a layer over an already shared pixel buffer.
    pub fn from_shared(pixels: Pixels, position: Point, name: impl Into<String>) -> Self {
        let size = Size::new(pixels.width() as f64, pixels.height() as f64);
        let has_alpha = has_transparency(&pixels);
        Self {
            id: LayerId::new(),
            original: Arc::clone(&pixels),
            pixels,
            position,
            size,
            visible: true,
            name: name.into(),
            has_alpha,
            current_ref: None,
            original_ref: None,
        }
    }

    pub fn with_id(mut self, id: LayerId) -> Self {
        self.id = id;
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Size::new(size.width.max(0.0), size.height.max(0.0));
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Use a separate pre-edit bitmap.
    pub fn with_original(mut self, original: RgbaImage) -> Self {
        self.original = Arc::new(original);
        self
    }

    /// Record where the current and original pixels came from.
    pub fn with_refs(mut self, current: Option<ImageRef>, original: Option<ImageRef>) -> Self {
        self.current_ref = current;
        self.original_ref = original;
        self
    }

    /// Record a single source reference for both current and original pixels.
    pub fn with_source(self, source: ImageRef) -> Self {
        self.with_refs(Some(source.clone()), Some(source))
    }

    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    pub fn original_pixels(&self) -> &Pixels {
        &self.original
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn current_ref(&self) -> Option<&ImageRef> {
        self.current_ref.as_ref()
    }

    pub fn original_ref(&self) -> Option<&ImageRef> {
        self.original_ref.as_ref()
    }

    /// Axis-aligned bounds in canvas space.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Whether a canvas point lies inside the bounds (edges inclusive).
    pub fn contains(&self, point: Point) -> bool {
        let b = self.bounds();
        point.x >= b.x0 && point.x <= b.x1 && point.y >= b.y0 && point.y <= b.y1
    }

    /// Pixels per canvas unit along each axis.
    pub fn pixel_scale(&self) -> (f64, f64) {
        let sx = if self.size.width > 0.0 {
            self.pixels.width() as f64 / self.size.width
        } else {
            1.0
        };
        let sy = if self.size.height > 0.0 {
            self.pixels.height() as f64 / self.size.height
        } else {
            1.0
        };
        (sx, sy)
    }

    /// Copy of this layer with a fresh id, offset by `stride` on both axes.
    ///
    /// The copy's original bitmap is this layer's current bitmap.
    pub fn duplicate(&self, stride: f64) -> Self {
        Self {
            id: LayerId::new(),
            original: Arc::clone(&self.pixels),
            pixels: Arc::clone(&self.pixels),
            position: self.position + kurbo::Vec2::new(stride, stride),
            size: self.size,
            visible: true,
            name: self.name.clone(),
            has_alpha: self.has_alpha,
            current_ref: self.current_ref.clone(),
            original_ref: self.current_ref.clone(),
        }
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Swap in new pixel data, keeping position, size and name.
    pub(crate) fn replace_pixels(&mut self, pixels: RgbaImage) {
        self.has_alpha = has_transparency(&pixels);
        self.pixels = Arc::new(pixels);
        self.current_ref = None;
    }

    pub(crate) fn set_current_ref(&mut self, reference: ImageRef) {
        self.current_ref = Some(reference);
    }

    pub(crate) fn set_original_ref(&mut self, reference: ImageRef) {
        self.original_ref = Some(reference);
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("position", &self.position)
            .field("size", &self.size)
            .field("pixels", &self.pixels.dimensions())
            .field("visible", &self.visible)
            .field("has_alpha", &self.has_alpha)
            .finish()
    }
}

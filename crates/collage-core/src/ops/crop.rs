//! Crop-excise: lift a rectangle out of a layer into its own layer.

use super::EditError;
use crate::layer::{Layer, LayerId};
use crate::layers::LayerStore;
use image::{Rgba, RgbaImage, imageops};
use kurbo::{Point, Rect, Size};

/// A validated crop, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct CropPlan {
    pub source: LayerId,
    /// Rectangle in the layer's local canvas units.
    pub local: Rect,
    /// Same rectangle in source pixels: x, y, width, height.
    pub pixels: (u32, u32, u32, u32),
}

/// Normalize a drag from `start` to `end` (canvas space) into the layer's
/// local space.
pub fn local_crop_rect(layer: &Layer, start: Point, end: Point) -> Rect {
    let origin = layer.position().to_vec2();
    Rect::from_points(start - origin, end - origin)
}

/// Validate a local rectangle against a layer.
pub fn plan_crop(layer: &Layer, local: Rect) -> Result<CropPlan, EditError> {
    let local = local.abs();
    if local.width() <= 0.0 || local.height() <= 0.0 {
        return Err(EditError::DegenerateRect);
    }
    let size = layer.size();
    if local.x0 < 0.0 || local.y0 < 0.0 || local.x1 > size.width || local.y1 > size.height {
        return Err(EditError::OutOfBounds);
    }

    let (sx, sy) = layer.pixel_scale();
    let (pw, ph) = layer.pixels().dimensions();
    let x0 = ((local.x0 * sx).floor().max(0.0) as u32).min(pw);
    let y0 = ((local.y0 * sy).floor().max(0.0) as u32).min(ph);
    let x1 = ((local.x1 * sx).ceil().max(0.0) as u32).min(pw);
    let y1 = ((local.y1 * sy).ceil().max(0.0) as u32).min(ph);
    if x1 <= x0 || y1 <= y0 {
        return Err(EditError::DegenerateRect);
    }

    Ok(CropPlan {
        source: layer.id().clone(),
        local,
        pixels: (x0, y0, x1 - x0, y1 - y0),
    })
}

/// Apply a crop: the excised region becomes a new selected layer and the
/// source gets a transparent hole. Returns the new layer's id.
pub fn apply_crop(store: &mut LayerStore, plan: &CropPlan) -> Result<LayerId, EditError> {
    let source = store
        .get(&plan.source)
        .ok_or_else(|| EditError::LayerNotFound(plan.source.clone()))?;

    let (x, y, w, h) = plan.pixels;
    let extracted = imageops::crop_imm(source.pixels().as_ref(), x, y, w, h).to_image();

    let mut punched: RgbaImage = source.pixels().as_ref().clone();
    for py in y..y + h {
        for px in x..x + w {
            punched.put_pixel(px, py, Rgba([0, 0, 0, 0]));
        }
    }

    let origin = source.position() + plan.local.origin().to_vec2();
    let excised = Layer::new(extracted, origin, format!("{} (Crop)", source.name()))
        .with_size(Size::new(plan.local.width(), plan.local.height()));
    let renamed = format!("{} (Cropped)", source.name());

    store.replace_pixels(&plan.source, punched);
    store.rename(&plan.source, renamed);
    let id = excised.id().clone();
    store.append(excised);
    Ok(id)
}

/// Validate and apply a crop of layer `id` in one step.
pub fn crop_excise(store: &mut LayerStore, id: &LayerId, local: Rect) -> Result<LayerId, EditError> {
    let layer = store
        .get(id)
        .ok_or_else(|| EditError::LayerNotFound(id.clone()))?;
    let plan = plan_crop(layer, local)?;
    apply_crop(store, &plan)
}

//! Full-fidelity project files: every layer's current and original pixels
//! inline, plus the viewport and a format version.

use crate::canvas::Canvas;
use crate::imaging::{EncodeError, ImageRef, ImageResolver, to_data_url};
use crate::layer::{Layer, LayerId};
use crate::storage::ViewportRecord;
use crate::viewport::Viewport;
use futures::future::join_all;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Version tag written into exported projects.
pub const PROJECT_FORMAT_VERSION: &str = "1.0";

/// Failure to produce an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing visible to export")]
    NothingVisible,
    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A project file whose overall structure is unusable. Nothing is imported.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Project must be a JSON object")]
    NotAnObject,
    #[error("Project has no 'layers' array")]
    MissingLayers,
    #[error("Unsupported project version: {0}")]
    UnsupportedVersion(String),
}

/// One layer in a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLayer {
    #[serde(default)]
    pub id: Option<LayerId>,
    #[serde(default)]
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub has_alpha: bool,
    pub image_data: ImageRef,
    #[serde(default)]
    pub original_image_data: Option<ImageRef>,
}

fn default_true() -> bool {
    true
}

/// Top-level project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: String,
    #[serde(default)]
    pub viewport: Option<ViewportRecord>,
    pub layers: Vec<ProjectLayer>,
}

/// Result of a project import.
#[derive(Debug, Clone)]
pub struct ImportedProject {
    pub layers: Vec<Layer>,
    pub viewport: Option<Viewport>,
    /// Layers skipped because their entry or pixel data was unusable.
    pub dropped: usize,
}

fn inline_ref(reference: Option<&ImageRef>, pixels: &image::RgbaImage) -> Result<ImageRef, EncodeError> {
    match reference {
        Some(reference) if reference.is_data_url() => Ok(reference.clone()),
        _ => to_data_url(pixels),
    }
}

impl ProjectLayer {
    fn from_layer(layer: &Layer) -> Result<Self, EncodeError> {
        let bounds = layer.bounds();
        Ok(Self {
            id: Some(layer.id().clone()),
            name: layer.name().to_string(),
            x: bounds.x0,
            y: bounds.y0,
            width: Some(bounds.width()),
            height: Some(bounds.height()),
            visible: layer.visible(),
            has_alpha: layer.has_alpha(),
            image_data: inline_ref(layer.current_ref(), layer.pixels())?,
            original_image_data: Some(inline_ref(layer.original_ref(), layer.original_pixels())?),
        })
    }
}

impl ProjectFile {
    /// Capture the canvas, embedding all pixel data.
    pub fn capture(canvas: &Canvas) -> Result<Self, EncodeError> {
        let layers = canvas
            .layers()
            .iter()
            .map(ProjectLayer::from_layer)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            version: PROJECT_FORMAT_VERSION.to_string(),
            viewport: Some(canvas.viewport().into()),
            layers,
        })
    }
}

/// Serialize the canvas as a project file.
pub fn export_project(canvas: &Canvas) -> Result<String, ExportError> {
    let project = ProjectFile::capture(canvas)?;
    Ok(serde_json::to_string_pretty(&project)?)
}

/// Parse a project file and resolve its layers.
///
/// The top-level shape must be valid or nothing is imported. Individual
/// layers that are malformed or whose pixels cannot be resolved are dropped
/// with a warning.
pub async fn import_project(
    json: &str,
    resolver: &dyn ImageResolver,
) -> Result<ImportedProject, ImportError> {
    let value: Value = serde_json::from_str(json)?;
    let object = value.as_object().ok_or(ImportError::NotAnObject)?;

    if let Some(version) = object.get("version") {
        let version = version.as_str().map(str::to_string).unwrap_or_else(|| version.to_string());
        if !version.starts_with("1.") && version != "1" {
            return Err(ImportError::UnsupportedVersion(version));
        }
    }
    let entries = object
        .get("layers")
        .and_then(Value::as_array)
        .ok_or(ImportError::MissingLayers)?;
    let viewport = object
        .get("viewport")
        .and_then(|v| serde_json::from_value::<ViewportRecord>(v.clone()).ok())
        .map(Viewport::from);

    let mut dropped = 0;
    let mut parsed = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<ProjectLayer>(entry.clone()) {
            Ok(layer) => parsed.push(layer),
            Err(e) => {
                log::warn!("Skipping layer {} of imported project: {}", index, e);
                dropped += 1;
            }
        }
    }

    let resolved = join_all(parsed.iter().map(|entry| resolve_layer(entry, resolver))).await;

    let mut seen = HashSet::new();
    let mut layers = Vec::with_capacity(resolved.len());
    for layer in resolved {
        match layer {
            Some(mut layer) => {
                if !seen.insert(layer.id().clone()) {
                    layer = layer.with_id(LayerId::new());
                }
                layers.push(layer);
            }
            None => dropped += 1,
        }
    }

    log::info!("Imported {} layers ({} dropped)", layers.len(), dropped);
    Ok(ImportedProject {
        layers,
        viewport,
        dropped,
    })
}

async fn resolve_layer(entry: &ProjectLayer, resolver: &dyn ImageResolver) -> Option<Layer> {
    let pixels = match resolver.resolve(&entry.image_data).await {
        Ok(pixels) => pixels,
        Err(e) => {
            log::warn!("Dropping imported layer '{}': {}", entry.name, e);
            return None;
        }
    };

    let original = match &entry.original_image_data {
        Some(reference) if reference != &entry.image_data => match resolver.resolve(reference).await {
            Ok(original) => Some((original, reference.clone())),
            Err(e) => {
                log::warn!("Original of '{}' unusable, using current pixels: {}", entry.name, e);
                None
            }
        },
        _ => None,
    };

    let size = Size::new(
        entry.width.unwrap_or(pixels.width() as f64),
        entry.height.unwrap_or(pixels.height() as f64),
    );
    let mut layer = Layer::new(pixels, Point::new(entry.x, entry.y), entry.name.clone())
        .with_id(entry.id.clone().unwrap_or_default())
        .with_size(size)
        .with_visible(entry.visible);
    layer = match original {
        Some((original, reference)) => layer
            .with_original(original)
            .with_refs(Some(entry.image_data.clone()), Some(reference)),
        None => layer.with_source(entry.image_data.clone()),
    };
    Some(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::DataUrlResolver;
    use image::{Rgba, RgbaImage};
    use pollster::block_on;

    fn canvas() -> Canvas {
        let mut canvas = Canvas::default();
        canvas.extend(vec![
            Layer::new(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])), Point::new(5.0, 6.0), "One"),
            Layer::new(RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 0])), Point::new(-4.0, 0.5), "Two")
                .with_visible(false),
        ]);
        canvas
    }

    #[test]
    fn test_export_shape() {
        let json = export_project(&canvas()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], PROJECT_FORMAT_VERSION);
        assert_eq!(value["layers"].as_array().unwrap().len(), 2);
        let first = &value["layers"][0];
        assert!(first["imageData"].as_str().unwrap().starts_with("data:image/png;base64,"));
        assert!(first["originalImageData"].as_str().is_some());
        assert_eq!(value["layers"][1]["hasAlpha"], true);
    }

    #[test]
    fn test_roundtrip() {
        let source = canvas();
        let json = export_project(&source).unwrap();
        let imported = block_on(import_project(&json, &DataUrlResolver)).unwrap();

        assert_eq!(imported.dropped, 0);
        assert_eq!(imported.viewport, Some(Viewport::default()));
        for (a, b) in source.layers().iter().zip(&imported.layers) {
            assert_eq!(a.id(), b.id());
            assert_eq!(a.name(), b.name());
            assert_eq!(a.position(), b.position());
            assert_eq!(a.size(), b.size());
            assert_eq!(a.visible(), b.visible());
            assert_eq!(a.pixels().as_ref(), b.pixels().as_ref());
        }
    }

    #[test]
    fn test_structure_errors() {
        assert!(matches!(
            block_on(import_project("not json", &DataUrlResolver)),
            Err(ImportError::InvalidJson(_))
        ));
        assert!(matches!(
            block_on(import_project("[1, 2]", &DataUrlResolver)),
            Err(ImportError::NotAnObject)
        ));
        assert!(matches!(
            block_on(import_project("{\"version\": \"1.0\"}", &DataUrlResolver)),
            Err(ImportError::MissingLayers)
        ));
        assert!(matches!(
            block_on(import_project("{\"version\": \"2.0\", \"layers\": []}", &DataUrlResolver)),
            Err(ImportError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_bad_layers_are_dropped() {
        let good = to_data_url(&RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]))).unwrap();
        let json = serde_json::json!({
            "layers": [
                {"name": "ok", "x": 1, "y": 2, "imageData": good},
                {"name": "no pixels", "x": 0, "y": 0},
                {"name": "broken", "x": 0, "y": 0, "imageData": "data:image/png;base64,AAAA"},
            ]
        })
        .to_string();
        let imported = block_on(import_project(&json, &DataUrlResolver)).unwrap();
        assert_eq!(imported.layers.len(), 1);
        assert_eq!(imported.dropped, 2);
        assert!(imported.viewport.is_none());
        assert_eq!(imported.layers[0].size(), Size::new(1.0, 1.0));
    }
}

//! Serialized shapes of the externally owned state sources.

use super::{StateStore, StorageError, StorageResult};
use crate::imaging::{EncodeError, ImageRef, to_data_url};
use crate::layer::{Layer, LayerId};
use crate::viewport::Viewport;
use kurbo::Vec2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted viewport: `screen = canvas * scale + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportRecord {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for ViewportRecord {
    fn default() -> Self {
        Self::from(Viewport::default())
    }
}

impl From<Viewport> for ViewportRecord {
    fn from(viewport: Viewport) -> Self {
        Self {
            x: viewport.offset.x,
            y: viewport.offset.y,
            scale: viewport.scale,
        }
    }
}

impl From<ViewportRecord> for Viewport {
    fn from(record: ViewportRecord) -> Self {
        Viewport::with_offset_and_scale(Vec2::new(record.x, record.y), record.scale)
    }
}

/// One layer in the persisted session, carrying references instead of pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRecord {
    pub id: LayerId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "imageUrl")]
    pub current_image_ref: ImageRef,
    #[serde(alias = "originalImageUrl")]
    pub original_image_ref: ImageRef,
    #[serde(default, alias = "hasTransparency")]
    pub has_alpha: bool,
}

fn default_visible() -> bool {
    true
}

impl LayerRecord {
    /// Describe a layer, encoding its pixels inline where no reference is known.
    pub fn from_layer(layer: &Layer) -> Result<Self, EncodeError> {
        let current = match layer.current_ref() {
            Some(reference) => reference.clone(),
            None => to_data_url(layer.pixels())?,
        };
        let original = match layer.original_ref() {
            Some(reference) => reference.clone(),
            None => to_data_url(layer.original_pixels())?,
        };
        let bounds = layer.bounds();
        Ok(Self {
            id: layer.id().clone(),
            x: bounds.x0,
            y: bounds.y0,
            width: bounds.width(),
            height: bounds.height(),
            visible: layer.visible(),
            name: layer.name().to_string(),
            current_image_ref: current,
            original_image_ref: original,
            has_alpha: layer.has_alpha(),
        })
    }
}

/// The persisted editing session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub viewport: ViewportRecord,
    pub layers: Vec<LayerRecord>,
}

impl SessionRecord {
    /// Capture the given layers and viewport.
    pub fn capture<'a>(
        layers: impl IntoIterator<Item = &'a Layer>,
        viewport: Viewport,
    ) -> Result<Self, EncodeError> {
        let layers = layers
            .into_iter()
            .map(LayerRecord::from_layer)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            viewport: viewport.into(),
            layers,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// An entry of the external collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: LayerId,
    #[serde(rename = "imageUrl", alias = "imageRef")]
    pub image_ref: ImageRef,
    #[serde(default)]
    pub name: Option<String>,
}

/// Read and parse the JSON value stored under `key`.
///
/// A missing key is `Ok(None)`; an unparsable value is a serialization error.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> StorageResult<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Remove every collection entry whose id is `id`.
///
/// Entries are edited as raw JSON so fields this editor does not model are
/// kept intact. Returns whether anything was removed.
pub async fn remove_collection_item(
    store: &dyn StateStore,
    key: &str,
    id: &LayerId,
) -> StorageResult<bool> {
    let Some(raw) = store.get(key).await? else {
        return Ok(false);
    };
    let entries: Vec<Value> = serde_json::from_str(&raw)?;
    let before = entries.len();
    let kept: Vec<Value> = entries
        .into_iter()
        .filter(|entry| {
            entry
                .get("id")
                .and_then(|v| serde_json::from_value::<LayerId>(v.clone()).ok())
                .is_none_or(|entry_id| &entry_id != id)
        })
        .collect();

    if kept.len() == before {
        return Ok(false);
    }
    let json = serde_json::to_string(&kept).map_err(StorageError::from)?;
    store.set(key, json).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use image::{Rgba, RgbaImage};
    use kurbo::Point;
    use pollster::block_on;

    #[test]
    fn test_session_json_shape() {
        let layer = Layer::new(
            RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])),
            Point::new(10.0, 20.0),
            "Layer 1",
        )
        .with_source(ImageRef::from("a.png"));
        let record = SessionRecord::capture([&layer], Viewport::default()).unwrap();
        let value: Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(value["viewport"]["scale"], 1.0);
        let entry = &value["layers"][0];
        assert_eq!(entry["x"], 10.0);
        assert_eq!(entry["width"], 2.0);
        assert_eq!(entry["currentImageRef"], "a.png");
        assert_eq!(entry["originalImageRef"], "a.png");
        assert_eq!(entry["hasAlpha"], false);
    }

    #[test]
    fn test_capture_encodes_missing_refs() {
        let layer = Layer::new(RgbaImage::new(1, 1), Point::ZERO, "a");
        let record = SessionRecord::capture([&layer], Viewport::default()).unwrap();
        assert!(record.layers[0].current_image_ref.is_data_url());
        assert!(record.layers[0].has_alpha);
    }

    #[test]
    fn test_legacy_field_names_accepted() {
        let json = r#"{
            "viewport": {"x": 5, "y": 6, "scale": 2},
            "layers": [{"id": 17.25, "x": 0, "y": 0, "width": 4, "height": 4,
                        "visible": false, "name": "n",
                        "imageUrl": "u.png", "originalImageUrl": "o.png",
                        "hasTransparency": true}]
        }"#;
        let record = SessionRecord::from_json(json).unwrap();
        assert_eq!(record.viewport.scale, 2.0);
        assert_eq!(record.layers[0].id.as_str(), "17.25");
        assert_eq!(record.layers[0].original_image_ref.as_str(), "o.png");
        assert!(!record.layers[0].visible);
        assert!(record.layers[0].has_alpha);
    }

    #[test]
    fn test_collection_item_name_optional() {
        let items: Vec<CollectionItem> =
            serde_json::from_str(r#"[{"id": 3, "imageUrl": "x.png"}]"#).unwrap();
        assert_eq!(items[0].id.as_str(), "3");
        assert_eq!(items[0].name, None);
    }

    #[test]
    fn test_read_json_missing_and_malformed() {
        let store = MemoryStore::with_entries([("bad", "{not json")]);
        let missing: Option<SessionRecord> = block_on(read_json(&store, "none")).unwrap();
        assert!(missing.is_none());
        let bad = block_on(read_json::<SessionRecord>(&store, "bad"));
        assert!(matches!(bad, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_remove_collection_item_keeps_other_fields() {
        let store = MemoryStore::with_entries([(
            "board",
            r#"[{"id": 1, "imageUrl": "a.png", "tags": ["x"]}, {"id": "2", "imageUrl": "b.png"}]"#,
        )]);
        let removed = block_on(remove_collection_item(&store, "board", &LayerId::from("2"))).unwrap();
        assert!(removed);

        let left: Vec<Value> = serde_json::from_str(&store.peek("board").unwrap()).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["tags"][0], "x");

        let again = block_on(remove_collection_item(&store, "board", &LayerId::from("2"))).unwrap();
        assert!(!again);
    }
}

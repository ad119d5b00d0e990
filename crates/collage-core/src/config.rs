//! Editor configuration.

use crate::color::SerializableColor;
use crate::history::MAX_HISTORY;
use crate::ops::StrokeStyle;
use crate::snap::{GRID_SIZE, SNAP_THRESHOLD_PX};
use crate::storage::DEFAULT_AUTOSAVE_DELAY_MS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable editor behaviour. Every field has a default, so a config file only
/// needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Snap grid spacing, canvas units.
    pub grid_size: f64,
    /// Snap distance, screen pixels.
    pub snap_threshold_px: f64,
    pub history_limit: usize,
    pub autosave_delay_ms: u64,
    /// Position offset between consecutively imported layers.
    pub import_stride: f64,
    /// Position offset of a duplicate from its source.
    pub duplicate_stride: f64,
    /// Factor for the zoom in/out commands.
    pub zoom_step: f64,
    pub wheel_zoom_in: f64,
    pub wheel_zoom_out: f64,
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
    /// Margin around the content in flattened exports.
    pub export_padding: f64,
    pub show_grid: bool,
    pub session_key: String,
    pub inbox_key: String,
    pub collection_key: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            snap_threshold_px: SNAP_THRESHOLD_PX,
            history_limit: MAX_HISTORY,
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            import_stride: 50.0,
            duplicate_stride: 20.0,
            zoom_step: 1.2,
            wheel_zoom_in: 1.1,
            wheel_zoom_out: 0.9,
            stroke_color: SerializableColor::new(0xef, 0x44, 0x44, 0xff),
            stroke_width: 4.0,
            export_padding: 20.0,
            show_grid: true,
            session_key: "canvas_state".to_string(),
            inbox_key: "initial_canvas_images".to_string(),
            collection_key: "inspiration_board".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle {
            color: self.stroke_color,
            width: self.stroke_width,
        }
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EditorConfig::from_json(r#"{"grid_size": 25.0, "show_grid": false}"#).unwrap();
        assert_eq!(config.grid_size, 25.0);
        assert!(!config.show_grid);
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.session_key, "canvas_state");
    }

    #[test]
    fn test_roundtrip() {
        let config = EditorConfig::default();
        let parsed = EditorConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}

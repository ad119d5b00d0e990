//! The top-level editor controller.
//!
//! Owns the canvas, the interaction controller and the persistence wiring,
//! and runs reconciliation exactly once through an explicit lifecycle.

use crate::canvas::Canvas;
use crate::config::EditorConfig;
use crate::imaging::{ImageResolver, decode_image};
use crate::input::PointerEvent;
use crate::interaction::{InteractionController, TransientOverlay};
use crate::layer::{Layer, LayerId};
use crate::project::{ExportError, ImportError, export_project, import_project};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::shortcuts::Command;
use crate::storage::{
    AutoSaveManager, SessionRecord, StateStore, StorageError, StorageResult, remove_collection_item,
};
use crate::tools::Tool;
use image::RgbaImage;
use kurbo::{Point, Size};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Initialization state of an [`Editor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Reconciling,
    Ready,
}

/// Failure to place an image on the system clipboard.
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Clipboard rejected the image: {0}")]
    Rejected(String),
}

/// Somewhere a layer's pixels can be copied to.
pub trait ClipboardTarget {
    fn set_image(&mut self, image: &RgbaImage) -> Result<(), ClipboardError>;
}

/// Non-blocking feedback for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The named layer was copied.
    Copied(String),
    NothingSelected,
    CopyFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Copied(name) => write!(f, "Copied '{}' to the clipboard", name),
            Notice::NothingSelected => f.write_str("No layer selected"),
            Notice::CopyFailed(reason) => write!(f, "Copy failed: {}", reason),
        }
    }
}

/// Snapshot of editor state for a shell to display.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub lifecycle: Lifecycle,
    pub layer_count: usize,
    pub visible_count: usize,
    pub selected: Option<(LayerId, String)>,
    pub tool: Tool,
    pub zoom: f64,
    pub history_len: usize,
}

impl Status {
    pub fn is_processing(&self) -> bool {
        self.lifecycle == Lifecycle::Reconciling
    }

    pub fn can_undo(&self) -> bool {
        self.history_len > 0
    }
}

/// The editor: canvas state plus persistence and external sources.
pub struct Editor<S: StateStore, R: ImageResolver> {
    canvas: Canvas,
    controller: InteractionController,
    config: EditorConfig,
    store: Arc<S>,
    resolver: Arc<R>,
    autosave: AutoSaveManager<S>,
    lifecycle: Lifecycle,
    /// Canvas revision last handed to the autosave scheduler.
    observed_revision: u64,
}

impl<S: StateStore, R: ImageResolver> Editor<S, R> {
    pub fn new(store: Arc<S>, resolver: Arc<R>, config: EditorConfig) -> Self {
        let mut autosave = AutoSaveManager::new(Arc::clone(&store), config.session_key.clone());
        autosave.set_delay(config.autosave_delay());
        let mut controller = InteractionController::new();
        controller.set_stroke_style(config.stroke_style());
        let canvas = Canvas::new(config.history_limit);
        Self {
            observed_revision: canvas.revision(),
            canvas,
            controller,
            config,
            store,
            resolver,
            autosave,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_processing(&self) -> bool {
        self.lifecycle == Lifecycle::Reconciling
    }

    /// Reconcile all state sources. Runs once; later calls return `None`.
    pub async fn initialize(&mut self) -> Option<ReconcileReport> {
        if self.lifecycle != Lifecycle::Uninitialized {
            return None;
        }
        self.lifecycle = Lifecycle::Reconciling;
        log::info!("Loading and syncing canvas state");

        let report = Reconciler::new(self.store.as_ref(), self.resolver.as_ref(), &self.config)
            .run(&mut self.canvas)
            .await;

        self.lifecycle = Lifecycle::Ready;
        log::info!(
            "Canvas ready: {} layers ({} failed references)",
            self.canvas.layers().len(),
            report.failed
        );
        Some(report)
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn status(&self) -> Status {
        let layers = self.canvas.layers();
        Status {
            lifecycle: self.lifecycle,
            layer_count: layers.len(),
            visible_count: layers.iter().filter(|l| l.visible()).count(),
            selected: layers
                .selected()
                .map(|layer| (layer.id().clone(), layer.name().to_string())),
            tool: self.controller.tool(),
            zoom: self.canvas.viewport().scale,
            history_len: self.canvas.history_len(),
        }
    }

    // --- Interaction ---

    pub fn tool(&self) -> Tool {
        self.controller.tool()
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.controller.set_tool(&mut self.canvas, tool);
    }

    /// Feed a pointer event. Returns true if a redraw is needed.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        self.controller.handle(&mut self.canvas, event, &self.config)
    }

    pub fn cancel_gesture(&mut self) {
        self.controller.cancel(&mut self.canvas);
    }

    pub fn overlay(&self) -> TransientOverlay {
        self.controller.overlay()
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.canvas.set_viewport_size(size);
    }

    // --- Layer actions ---

    /// Decode raw images and add each as a new layer, as one undo step.
    /// Images that fail to decode are skipped.
    pub fn import_images(&mut self, images: Vec<Vec<u8>>) -> Vec<LayerId> {
        let stride = self.config.import_stride;
        let base = self.canvas.layers().len();
        let mut layers = Vec::with_capacity(images.len());
        for (index, bytes) in images.iter().enumerate() {
            match decode_image(bytes) {
                Ok(pixels) => {
                    let offset = index as f64 * stride;
                    let name = format!("Layer {}", base + layers.len() + 1);
                    layers.push(Layer::new(pixels, Point::new(offset, offset), name));
                }
                Err(e) => log::warn!("Skipping image {}: {}", index + 1, e),
            }
        }
        self.canvas.add_layers(layers)
    }

    pub fn select(&mut self, id: &LayerId) -> bool {
        self.canvas.select(id)
    }

    pub fn clear_selection(&mut self) {
        self.canvas.clear_selection();
    }

    pub fn rename(&mut self, id: &LayerId, name: impl Into<String>) -> bool {
        self.canvas.rename(id, name)
    }

    pub fn toggle_visible(&mut self, id: &LayerId) -> Option<bool> {
        self.canvas.toggle_visible(id)
    }

    pub fn bring_to_front(&mut self, id: &LayerId) -> bool {
        self.canvas.bring_to_front(id)
    }

    pub fn send_to_back(&mut self, id: &LayerId) -> bool {
        self.canvas.send_to_back(id)
    }

    pub fn bring_forward(&mut self, id: &LayerId) -> bool {
        self.canvas.bring_forward(id)
    }

    pub fn send_backward(&mut self, id: &LayerId) -> bool {
        self.canvas.send_backward(id)
    }

    /// Delete the selected layer, and its collection entry if it has one.
    pub async fn delete_selected(&mut self) -> Option<LayerId> {
        self.controller.cancel(&mut self.canvas);
        let removed = match self.canvas.delete_selected() {
            Ok(layer) => layer,
            Err(e) => {
                log::debug!("Delete skipped: {}", e);
                return None;
            }
        };
        let id = removed.id().clone();
        match remove_collection_item(self.store.as_ref(), &self.config.collection_key, &id).await {
            Ok(true) => log::info!("Removed '{}' from the collection", removed.name()),
            Ok(false) => {}
            Err(e) => log::error!("Failed to update the collection: {}", e),
        }
        Some(id)
    }

    pub fn duplicate_selected(&mut self) -> Option<LayerId> {
        self.canvas
            .duplicate_selected(self.config.duplicate_stride)
            .inspect_err(|e| log::debug!("Duplicate skipped: {}", e))
            .ok()
    }

    /// Copy the selected layer's pixels. Failures become a notice.
    pub fn copy_selected(&self, clipboard: &mut dyn ClipboardTarget) -> Notice {
        let Some(layer) = self.canvas.layers().selected() else {
            return Notice::NothingSelected;
        };
        match clipboard.set_image(layer.pixels()) {
            Ok(()) => Notice::Copied(layer.name().to_string()),
            Err(e) => {
                log::warn!("Failed to copy to clipboard: {}", e);
                Notice::CopyFailed(e.to_string())
            }
        }
    }

    pub fn undo(&mut self) -> bool {
        self.controller.cancel(&mut self.canvas);
        self.canvas.undo()
    }

    pub fn can_undo(&self) -> bool {
        self.canvas.can_undo()
    }

    pub fn history_len(&self) -> usize {
        self.canvas.history_len()
    }

    // --- View ---

    pub fn zoom_in(&mut self) {
        self.canvas.zoom_centered(self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.canvas.zoom_centered(1.0 / self.config.zoom_step);
    }

    pub fn reset_view(&mut self) {
        self.canvas.reset_view();
    }

    pub fn fit_to_content(&mut self) -> bool {
        self.canvas.fit_to_content(self.config.export_padding)
    }

    /// Run a keyboard command. Copy needs a clipboard; without one it is a no-op.
    pub async fn execute(
        &mut self,
        command: Command,
        clipboard: Option<&mut dyn ClipboardTarget>,
    ) -> Option<Notice> {
        match command {
            Command::Undo => {
                self.undo();
            }
            Command::Copy => return clipboard.map(|target| self.copy_selected(target)),
            Command::Duplicate => {
                self.duplicate_selected();
            }
            Command::Delete => {
                self.delete_selected().await;
            }
            Command::ZoomIn => self.zoom_in(),
            Command::ZoomOut => self.zoom_out(),
            Command::ResetView => self.reset_view(),
            Command::Cancel => self.cancel_gesture(),
            Command::SetTool(tool) => self.set_tool(tool),
        }
        None
    }

    // --- Project files ---

    pub fn export_json(&self) -> Result<String, ExportError> {
        export_project(&self.canvas)
    }

    /// Replace the canvas with a project file as one undo step.
    /// On error the canvas is left unchanged.
    pub async fn load_json(&mut self, json: &str) -> Result<usize, ImportError> {
        let imported = import_project(json, self.resolver.as_ref()).await?;
        self.controller.cancel(&mut self.canvas);
        let count = imported.layers.len();
        self.canvas.replace_state(imported.layers, imported.viewport);
        Ok(count)
    }

    // --- Persistence ---

    /// Schedule and perform debounced saves. Call after state changes or
    /// periodically. Returns true if a save happened.
    pub async fn tick_at(&mut self, now: Instant) -> StorageResult<bool> {
        if self.lifecycle != Lifecycle::Ready {
            return Ok(false);
        }
        if self.canvas.revision() != self.observed_revision {
            self.observed_revision = self.canvas.revision();
            self.autosave.mark_dirty_at(now);
        }
        if !self.autosave.should_save_at(now) {
            return Ok(false);
        }
        self.persist().await?;
        Ok(true)
    }

    pub async fn tick(&mut self) -> StorageResult<bool> {
        self.tick_at(Instant::now()).await
    }

    /// Persist immediately if anything changed since the last save.
    pub async fn flush(&mut self) -> StorageResult<()> {
        if self.lifecycle != Lifecycle::Ready {
            return Ok(());
        }
        if self.canvas.revision() != self.observed_revision || self.autosave.is_dirty() {
            self.observed_revision = self.canvas.revision();
            self.persist().await?;
        }
        Ok(())
    }

    async fn persist(&mut self) -> StorageResult<()> {
        self.canvas
            .materialize_refs()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let record = SessionRecord::capture(self.canvas.layers().iter(), self.canvas.viewport())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        if let Err(e) = self.autosave.save(Some(&record)).await {
            log::error!("Failed to persist session: {}", e);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{DataUrlResolver, encode_png, to_data_url};
    use crate::storage::MemoryStore;
    use image::Rgba;
    use pollster::block_on;
    use std::time::Duration;

    type TestEditor = Editor<MemoryStore, DataUrlResolver>;

    fn editor(store: MemoryStore) -> TestEditor {
        Editor::new(Arc::new(store), Arc::new(DataUrlResolver), EditorConfig::default())
    }

    fn png(shade: u8) -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(8, 8, Rgba([shade, 0, 0, 255]))).unwrap()
    }

    struct RecordingClipboard {
        copied: Vec<(u32, u32)>,
        fail: bool,
    }

    impl ClipboardTarget for RecordingClipboard {
        fn set_image(&mut self, image: &RgbaImage) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unavailable("no display".to_string()));
            }
            self.copied.push(image.dimensions());
            Ok(())
        }
    }

    #[test]
    fn test_initialize_runs_once() {
        let mut editor = editor(MemoryStore::new());
        assert_eq!(editor.lifecycle(), Lifecycle::Uninitialized);
        assert!(block_on(editor.initialize()).is_some());
        assert_eq!(editor.lifecycle(), Lifecycle::Ready);
        assert!(block_on(editor.initialize()).is_none());
    }

    #[test]
    fn test_import_images_skips_bad_bytes() {
        let mut editor = editor(MemoryStore::new());
        let ids = editor.import_images(vec![png(1), b"garbage".to_vec(), png(2)]);
        assert_eq!(ids.len(), 2);
        assert_eq!(editor.history_len(), 1);

        let layers: Vec<&Layer> = editor.canvas().layers().iter().collect();
        assert_eq!(layers[0].name(), "Layer 1");
        assert_eq!(layers[1].name(), "Layer 2");
        assert_eq!(layers[1].position(), Point::new(100.0, 100.0));
        assert_eq!(editor.canvas().layers().selection(), Some(&ids[1]));
    }

    #[test]
    fn test_debounced_save_and_clear() {
        let store = Arc::new(MemoryStore::new());
        let mut editor: TestEditor =
            Editor::new(Arc::clone(&store), Arc::new(DataUrlResolver), EditorConfig::default());
        block_on(editor.initialize());

        let t0 = Instant::now();
        editor.import_images(vec![png(1)]);
        assert!(!block_on(editor.tick_at(t0)).unwrap());
        assert!(!block_on(editor.tick_at(t0 + Duration::from_millis(499))).unwrap());
        assert!(block_on(editor.tick_at(t0 + Duration::from_millis(500))).unwrap());

        let saved = SessionRecord::from_json(&store.peek("canvas_state").unwrap()).unwrap();
        assert_eq!(saved.layers.len(), 1);
        assert!(saved.layers[0].current_image_ref.is_data_url());

        // Deleting everything clears the record
        block_on(editor.delete_selected());
        block_on(editor.flush()).unwrap();
        assert!(store.peek("canvas_state").is_none());
    }

    #[test]
    fn test_delete_removes_collection_entry() {
        let image = to_data_url(&RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]))).unwrap();
        let board = serde_json::json!([
            {"id": "keep", "imageUrl": image},
            {"id": "drop", "imageUrl": image},
        ]);
        let store = Arc::new(MemoryStore::with_entries([("inspiration_board", board.to_string())]));
        let mut editor: TestEditor =
            Editor::new(Arc::clone(&store), Arc::new(DataUrlResolver), EditorConfig::default());
        block_on(editor.initialize());
        assert_eq!(editor.canvas().layers().len(), 2);

        editor.select(&LayerId::from("drop"));
        assert_eq!(block_on(editor.delete_selected()), Some(LayerId::from("drop")));

        let left: Vec<serde_json::Value> =
            serde_json::from_str(&store.peek("inspiration_board").unwrap()).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["id"], "keep");
    }

    #[test]
    fn test_delete_and_duplicate_need_selection() {
        let mut editor = editor(MemoryStore::new());
        block_on(editor.initialize());
        editor.import_images(vec![png(1)]);
        editor.clear_selection();

        assert_eq!(editor.duplicate_selected(), None);
        assert_eq!(block_on(editor.delete_selected()), None);
        assert_eq!(editor.canvas().layers().len(), 1);
    }

    #[test]
    fn test_copy_notices() {
        let mut editor = editor(MemoryStore::new());
        let mut clipboard = RecordingClipboard {
            copied: Vec::new(),
            fail: false,
        };
        assert_eq!(editor.copy_selected(&mut clipboard), Notice::NothingSelected);

        editor.import_images(vec![png(3)]);
        assert_eq!(editor.copy_selected(&mut clipboard), Notice::Copied("Layer 1".to_string()));
        assert_eq!(clipboard.copied, vec![(8, 8)]);

        clipboard.fail = true;
        assert!(matches!(editor.copy_selected(&mut clipboard), Notice::CopyFailed(_)));
    }

    #[test]
    fn test_load_json_is_undoable_and_atomic() {
        let mut editor = editor(MemoryStore::new());
        editor.import_images(vec![png(1), png(2)]);
        let json = editor.export_json().unwrap();

        let mut other = self::editor(MemoryStore::new());
        other.import_images(vec![png(9)]);
        assert!(block_on(other.load_json("{\"layers\": 3}")).is_err());
        assert_eq!(other.canvas().layers().len(), 1);

        assert_eq!(block_on(other.load_json(&json)).unwrap(), 2);
        assert_eq!(other.canvas().layers().len(), 2);
        other.undo();
        assert_eq!(other.canvas().layers().len(), 1);
    }

    #[test]
    fn test_execute_commands() {
        let mut editor = editor(MemoryStore::new());
        editor.import_images(vec![png(1)]);
        block_on(editor.execute(Command::Duplicate, None));
        assert_eq!(editor.canvas().layers().len(), 2);
        block_on(editor.execute(Command::ZoomIn, None));
        assert!((editor.canvas().viewport().scale - 1.2).abs() < 1e-12);
        block_on(editor.execute(Command::SetTool(Tool::Erase), None));
        assert_eq!(editor.tool(), Tool::Erase);
        block_on(editor.execute(Command::Undo, None));
        assert_eq!(editor.canvas().layers().len(), 1);
        assert_eq!(block_on(editor.execute(Command::Copy, None)), None);
    }

    #[test]
    fn test_status() {
        let mut editor = editor(MemoryStore::new());
        editor.import_images(vec![png(1)]);
        let status = editor.status();
        assert_eq!(status.layer_count, 1);
        assert_eq!(status.selected.as_ref().unwrap().1, "Layer 1");
        assert!(status.can_undo());
        assert!(!status.is_processing());
    }
}

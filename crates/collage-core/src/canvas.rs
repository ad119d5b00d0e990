//! Canvas state: layers, viewport and undo history.

use crate::history::{History, HistorySnapshot};
use crate::layer::{Layer, LayerId};
use crate::layers::LayerStore;
use crate::ops::{self, CropPlan, EditError};
use crate::viewport::Viewport;
use kurbo::{Point, Size, Vec2};

/// The live editing state.
///
/// Every mutation of persisted state (layers or viewport) bumps
/// [`Canvas::revision`]; selection changes do not.
#[derive(Debug, Clone)]
pub struct Canvas {
    layers: LayerStore,
    viewport: Viewport,
    history: History,
    /// Screen area the canvas is shown in, if known.
    viewport_size: Option<Size>,
    revision: u64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(crate::history::MAX_HISTORY)
    }
}

impl Canvas {
    pub fn new(history_limit: usize) -> Self {
        Self {
            layers: LayerStore::new(),
            viewport: Viewport::default(),
            history: History::new(history_limit),
            viewport_size: None,
            revision: 0,
        }
    }

    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// Mutable access to the layers. Marks the state changed.
    pub(crate) fn layers_mut(&mut self) -> &mut LayerStore {
        self.revision += 1;
        &mut self.layers
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.revision += 1;
        }
    }

    pub fn viewport_size(&self) -> Option<Size> {
        self.viewport_size
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport_size = Some(size);
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // --- History ---

    /// Capture layers and viewport by value.
    pub fn capture_snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            layers: self.layers.as_slice().to_vec(),
            viewport: self.viewport,
        }
    }

    /// Push a snapshot captured earlier (e.g. at the start of a gesture).
    pub fn push_snapshot(&mut self, snapshot: HistorySnapshot) {
        self.history.push(snapshot);
    }

    /// Snapshot the current state. Call before making changes.
    pub fn push_undo(&mut self) {
        let snapshot = self.capture_snapshot();
        self.history.push(snapshot);
    }

    /// Restore the most recent snapshot.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        self.layers.replace_all(snapshot.layers);
        self.viewport = snapshot.viewport;
        self.revision += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // --- Selection ---

    pub fn select(&mut self, id: &LayerId) -> bool {
        self.layers.select(id)
    }

    pub fn clear_selection(&mut self) {
        self.layers.clear_selection();
    }

    // --- Viewport ---

    /// Pan by a screen-space delta. Not undoable.
    pub fn pan(&mut self, delta: Vec2) {
        if delta != Vec2::ZERO {
            self.viewport.pan(delta);
            self.revision += 1;
        }
    }

    /// Zoom keeping the canvas point under `screen_point` fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let mut viewport = self.viewport;
        viewport.zoom_at(screen_point, factor);
        self.set_viewport(viewport);
    }

    /// Zoom around the centre of the screen area (or the origin if unknown).
    pub fn zoom_centered(&mut self, factor: f64) {
        let anchor = self
            .viewport_size
            .map(|size| Point::new(size.width / 2.0, size.height / 2.0))
            .unwrap_or(Point::ZERO);
        self.zoom_at(anchor, factor);
    }

    pub fn reset_view(&mut self) {
        self.set_viewport(Viewport::default());
    }

    /// Centre all layers in the screen area. No-op without layers or a known size.
    pub fn fit_to_content(&mut self, padding: f64) -> bool {
        let (Some(bounds), Some(size)) = (self.layers.bounds(), self.viewport_size) else {
            return false;
        };
        let mut viewport = self.viewport;
        viewport.fit_to_bounds(bounds, size, padding);
        self.set_viewport(viewport);
        true
    }

    // --- Layer edits ---

    /// Add layers as one undoable step. The last one ends up selected.
    pub fn add_layers(&mut self, layers: Vec<Layer>) -> Vec<LayerId> {
        if layers.is_empty() {
            return Vec::new();
        }
        self.push_undo();
        let store = self.layers_mut();
        layers
            .into_iter()
            .map(|layer| {
                let id = layer.id().clone();
                store.append(layer);
                id
            })
            .collect()
    }

    /// Move a layer without recording history (live drag updates).
    pub fn move_layer(&mut self, id: &LayerId, position: Point) -> bool {
        let unchanged = self
            .layers
            .get(id)
            .is_none_or(|layer| layer.position() == position);
        if unchanged {
            return self.layers.contains(id);
        }
        self.layers_mut().move_to(id, position)
    }

    /// Remove a layer without recording history (erase gestures).
    pub(crate) fn remove_layer(&mut self, id: &LayerId) -> Option<Layer> {
        if !self.layers.contains(id) {
            return None;
        }
        self.layers_mut().remove(id)
    }

    /// Delete the selected layer as one undoable step.
    pub fn delete_selected(&mut self) -> Result<Layer, EditError> {
        let id = self.layers.selection().ok_or(EditError::NoSelection)?.clone();
        self.push_undo();
        self.layers_mut()
            .remove(&id)
            .ok_or(EditError::LayerNotFound(id))
    }

    /// Duplicate the selected layer, offset by `stride`. The copy becomes selected.
    pub fn duplicate_selected(&mut self, stride: f64) -> Result<LayerId, EditError> {
        let copy = self
            .layers
            .selected()
            .ok_or(EditError::NoSelection)?
            .duplicate(stride);
        let id = copy.id().clone();
        self.push_undo();
        self.layers_mut().append(copy);
        Ok(id)
    }

    /// Apply a validated crop as one undoable step.
    pub fn apply_crop(&mut self, plan: &CropPlan) -> Result<LayerId, EditError> {
        if !self.layers.contains(&plan.source) {
            return Err(EditError::LayerNotFound(plan.source.clone()));
        }
        self.push_undo();
        ops::apply_crop(self.layers_mut(), plan)
    }

    pub fn set_visible(&mut self, id: &LayerId, visible: bool) -> bool {
        match self.layers.get(id) {
            Some(layer) if layer.visible() == visible => true,
            Some(_) => self.layers_mut().set_visible(id, visible),
            None => false,
        }
    }

    pub fn toggle_visible(&mut self, id: &LayerId) -> Option<bool> {
        if !self.layers.contains(id) {
            return None;
        }
        self.layers_mut().toggle_visible(id)
    }

    pub fn rename(&mut self, id: &LayerId, name: impl Into<String>) -> bool {
        if !self.layers.contains(id) {
            return false;
        }
        self.layers_mut().rename(id, name)
    }

    pub fn bring_to_front(&mut self, id: &LayerId) -> bool {
        self.reorder(id, LayerStore::bring_to_front)
    }

    pub fn send_to_back(&mut self, id: &LayerId) -> bool {
        self.reorder(id, LayerStore::send_to_back)
    }

    pub fn bring_forward(&mut self, id: &LayerId) -> bool {
        self.reorder(id, LayerStore::bring_forward)
    }

    pub fn send_backward(&mut self, id: &LayerId) -> bool {
        self.reorder(id, LayerStore::send_backward)
    }

    /// Run a z-order change, recording history only if the order changed.
    fn reorder(&mut self, id: &LayerId, op: fn(&mut LayerStore, &LayerId) -> bool) -> bool {
        let snapshot = self.capture_snapshot();
        if !op(&mut self.layers, id) {
            return false;
        }
        let order_changed = !self
            .layers
            .iter()
            .map(Layer::id)
            .eq(snapshot.layers.iter().map(Layer::id));
        if order_changed {
            self.push_snapshot(snapshot);
            self.revision += 1;
        }
        order_changed
    }

    // --- Whole-state replacement ---

    /// Install reconciled state. Not undoable.
    pub fn commit(&mut self, layers: Vec<Layer>, viewport: Viewport) {
        self.layers.replace_all(layers);
        self.viewport = viewport;
        self.revision += 1;
    }

    /// Add layers on top without changing the selection. Not undoable.
    pub fn extend(&mut self, layers: Vec<Layer>) {
        if !layers.is_empty() {
            self.layers_mut().extend(layers);
        }
    }

    /// Replace everything as one undoable step (project import).
    pub fn replace_state(&mut self, layers: Vec<Layer>, viewport: Option<Viewport>) {
        self.push_undo();
        self.layers.clear();
        self.layers.replace_all(layers);
        if let Some(viewport) = viewport {
            self.viewport = viewport;
        }
        self.revision += 1;
    }

    /// Encode inline references for layers that lack them.
    pub(crate) fn materialize_refs(&mut self) -> Result<usize, crate::imaging::EncodeError> {
        self.layers.materialize_refs()
    }
}

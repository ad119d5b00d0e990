//! The ordered layer collection and the selection.

use crate::imaging::{EncodeError, to_data_url};
use crate::layer::{Layer, LayerId};
use image::RgbaImage;
use kurbo::{Point, Rect};

/// Layers in paint order (last = topmost) plus at most one selected id.
///
/// This is the single authoritative layer state; every mutation goes through
/// its methods.
#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    layers: Vec<Layer>,
    selection: Option<LayerId>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer on top and select it.
    pub fn append(&mut self, layer: Layer) {
        self.selection = Some(layer.id().clone());
        self.layers.push(layer);
    }

    /// Add layers on top without changing the selection.
    pub fn extend(&mut self, layers: impl IntoIterator<Item = Layer>) {
        self.layers.extend(layers);
    }

    /// Remove a layer. Clears the selection if it was selected.
    pub fn remove(&mut self, id: &LayerId) -> Option<Layer> {
        let index = self.index_of(id)?;
        if self.selection.as_ref() == Some(id) {
            self.selection = None;
        }
        Some(self.layers.remove(index))
    }

    /// Replace the whole layer set. The selection is kept only if it still exists.
    pub fn replace_all(&mut self, layers: Vec<Layer>) {
        self.layers = layers;
        if self.selection.as_ref().is_some_and(|id| !self.contains(id)) {
            self.selection = None;
        }
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.selection = None;
    }

    /// Topmost visible layer whose bounds contain `point` (canvas space).
    pub fn find_topmost_at(&self, point: Point) -> Option<&Layer> {
        self.layers
            .iter()
            .rev()
            .find(|layer| layer.visible() && layer.contains(point))
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }

    fn get_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id() == id)
    }

    pub fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id() == id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.index_of(id).is_some()
    }

    /// Layers bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn as_slice(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns false if the layer does not exist.
    pub fn set_visible(&mut self, id: &LayerId, visible: bool) -> bool {
        self.get_mut(id).map(|layer| layer.set_visible(visible)).is_some()
    }

    /// Flip visibility. Returns the new state.
    pub fn toggle_visible(&mut self, id: &LayerId) -> Option<bool> {
        let layer = self.get_mut(id)?;
        let visible = !layer.visible();
        layer.set_visible(visible);
        Some(visible)
    }

    pub fn move_to(&mut self, id: &LayerId, position: Point) -> bool {
        self.get_mut(id).map(|layer| layer.set_position(position)).is_some()
    }

    /// Swap a layer's bitmap, keeping position, size and name.
    pub fn replace_pixels(&mut self, id: &LayerId, pixels: RgbaImage) -> bool {
        self.get_mut(id).map(|layer| layer.replace_pixels(pixels)).is_some()
    }

    pub fn rename(&mut self, id: &LayerId, name: impl Into<String>) -> bool {
        let name = name.into();
        self.get_mut(id).map(|layer| layer.set_name(name)).is_some()
    }

    pub fn selection(&self) -> Option<&LayerId> {
        self.selection.as_ref()
    }

    pub fn selected(&self) -> Option<&Layer> {
        self.selection.as_ref().and_then(|id| self.get(id))
    }

    /// Select a layer. Returns false (and leaves the selection) if it does not exist.
    pub fn select(&mut self, id: &LayerId) -> bool {
        if self.contains(id) {
            self.selection = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Move a layer to the top of the paint order.
    pub fn bring_to_front(&mut self, id: &LayerId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                let layer = self.layers.remove(index);
                self.layers.push(layer);
                true
            }
            None => false,
        }
    }

    /// Move a layer to the bottom of the paint order.
    pub fn send_to_back(&mut self, id: &LayerId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                let layer = self.layers.remove(index);
                self.layers.insert(0, layer);
                true
            }
            None => false,
        }
    }

    /// Move a layer one step up. Returns true if it moved.
    pub fn bring_forward(&mut self, id: &LayerId) -> bool {
        if let Some(pos) = self.index_of(id) {
            if pos + 1 < self.layers.len() {
                self.layers.swap(pos, pos + 1);
                return true;
            }
        }
        false
    }

    /// Move a layer one step down. Returns true if it moved.
    pub fn send_backward(&mut self, id: &LayerId) -> bool {
        if let Some(pos) = self.index_of(id) {
            if pos > 0 {
                self.layers.swap(pos, pos - 1);
                return true;
            }
        }
        false
    }

    /// Union of the bounds of all visible layers.
    pub fn visible_bounds(&self) -> Option<Rect> {
        self.layers
            .iter()
            .filter(|layer| layer.visible())
            .map(Layer::bounds)
            .reduce(|acc, bounds| acc.union(bounds))
    }

    /// Union of the bounds of all layers.
    pub fn bounds(&self) -> Option<Rect> {
        self.layers.iter().map(Layer::bounds).reduce(|acc, b| acc.union(b))
    }

    /// Encode an inline reference for every layer whose pixels have none yet,
    /// so repeated session saves do not re-encode unchanged bitmaps.
    pub fn materialize_refs(&mut self) -> Result<usize, EncodeError> {
        let mut encoded = 0;
        for layer in &mut self.layers {
            if layer.current_ref().is_none() {
                let reference = to_data_url(layer.pixels())?;
                layer.set_current_ref(reference);
                encoded += 1;
            }
            if layer.original_ref().is_none() {
                let reference = to_data_url(layer.original_pixels())?;
                layer.set_original_ref(reference);
                encoded += 1;
            }
        }
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn layer(x: f64, y: f64, size: u32) -> Layer {
        Layer::new(
            RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 255])),
            Point::new(x, y),
            "layer",
        )
    }

    #[test]
    fn test_append_selects_and_goes_on_top() {
        let mut store = LayerStore::new();
        let a = layer(0.0, 0.0, 10);
        let b = layer(0.0, 0.0, 10);
        let b_id = b.id().clone();
        store.append(a);
        store.append(b);
        assert_eq!(store.selection(), Some(&b_id));
        assert_eq!(store.iter().last().unwrap().id(), &b_id);
    }

    #[test]
    fn test_extend_keeps_selection() {
        let mut store = LayerStore::new();
        let a = layer(0.0, 0.0, 10);
        let a_id = a.id().clone();
        store.append(a);
        store.extend([layer(5.0, 5.0, 10)]);
        assert_eq!(store.selection(), Some(&a_id));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut store = LayerStore::new();
        let a = layer(0.0, 0.0, 10);
        let id = a.id().clone();
        store.append(a);
        assert!(store.remove(&id).is_some());
        assert!(store.selection().is_none());
        assert!(store.remove(&id).is_none());
    }

    #[test]
    fn test_find_topmost_skips_hidden() {
        let mut store = LayerStore::new();
        let bottom = layer(0.0, 0.0, 100);
        let top = layer(50.0, 50.0, 100);
        let bottom_id = bottom.id().clone();
        let top_id = top.id().clone();
        store.append(bottom);
        store.append(top);

        let p = Point::new(60.0, 60.0);
        assert_eq!(store.find_topmost_at(p).unwrap().id(), &top_id);
        store.set_visible(&top_id, false);
        assert_eq!(store.find_topmost_at(p).unwrap().id(), &bottom_id);
        assert!(store.find_topmost_at(Point::new(500.0, 500.0)).is_none());
    }

    #[test]
    fn test_z_order_operations() {
        let mut store = LayerStore::new();
        let ids: Vec<LayerId> = (0..3)
            .map(|_| {
                let l = layer(0.0, 0.0, 1);
                let id = l.id().clone();
                store.append(l);
                id
            })
            .collect();

        assert!(store.bring_to_front(&ids[0]));
        assert_eq!(store.index_of(&ids[0]), Some(2));
        assert!(!store.bring_forward(&ids[0]));
        assert!(store.send_backward(&ids[0]));
        assert_eq!(store.index_of(&ids[0]), Some(1));
        assert!(store.send_to_back(&ids[0]));
        assert_eq!(store.index_of(&ids[0]), Some(0));
    }

    #[test]
    fn test_visible_bounds() {
        let mut store = LayerStore::new();
        assert!(store.visible_bounds().is_none());
        let hidden = layer(500.0, 500.0, 10).with_visible(false);
        store.append(layer(0.0, 0.0, 10));
        store.append(layer(20.0, 30.0, 10));
        store.append(hidden);
        assert_eq!(store.visible_bounds(), Some(Rect::new(0.0, 0.0, 30.0, 40.0)));
        assert_eq!(store.bounds(), Some(Rect::new(0.0, 0.0, 510.0, 510.0)));
    }

    #[test]
    fn test_replace_all_drops_stale_selection() {
        let mut store = LayerStore::new();
        store.append(layer(0.0, 0.0, 1));
        store.replace_all(vec![layer(0.0, 0.0, 1)]);
        assert!(store.selection().is_none());
    }

    #[test]
    fn test_materialize_refs_once() {
        let mut store = LayerStore::new();
        store.append(layer(0.0, 0.0, 2));
        assert_eq!(store.materialize_refs().unwrap(), 2);
        assert_eq!(store.materialize_refs().unwrap(), 0);
    }

    #[test]
    fn test_rename_and_move() {
        let mut store = LayerStore::new();
        let a = layer(0.0, 0.0, 2);
        let id = a.id().clone();
        store.append(a);
        assert!(store.rename(&id, "renamed"));
        assert!(store.move_to(&id, Point::new(3.0, 4.0)));
        let l = store.get(&id).unwrap();
        assert_eq!(l.name(), "renamed");
        assert_eq!(l.position(), Point::new(3.0, 4.0));
        assert!(!store.rename(&LayerId::from("missing"), "x"));
    }
}

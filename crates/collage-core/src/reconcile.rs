//! Startup merge of the persisted session, the pending-import inbox and the
//! external collection into one layer set.
//!
//! The steps run strictly in order: the inbox is deduplicated against the
//! restored session, and the collection against what was committed from
//! both. Within a step all references resolve concurrently. A reference that
//! fails to resolve drops only its own layer.

use crate::canvas::Canvas;
use crate::config::EditorConfig;
use crate::imaging::{ImageRef, ImageResolver};
use crate::layer::{Layer, LayerId};
use crate::storage::{CollectionItem, LayerRecord, SessionRecord, StateStore, read_json};
use crate::viewport::Viewport;
use futures::future::join_all;
use kurbo::{Point, Size};
use std::collections::HashSet;

/// What a reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Whether a usable persisted session was found.
    pub session_found: bool,
    /// Layers restored from the session.
    pub restored: usize,
    /// Inbox references that became new layers.
    pub inbox_added: usize,
    /// Inbox references already present in the session.
    pub inbox_duplicates: usize,
    /// Collection entries that became new layers.
    pub collection_added: usize,
    /// References that failed to resolve, across all steps.
    pub failed: usize,
}

/// Runs reconciliation against a store and a resolver.
pub struct Reconciler<'a> {
    store: &'a dyn StateStore,
    resolver: &'a dyn ImageResolver,
    config: &'a EditorConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a dyn StateStore,
        resolver: &'a dyn ImageResolver,
        config: &'a EditorConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            config,
        }
    }

    /// Merge all sources into `canvas`.
    pub async fn run(&self, canvas: &mut Canvas) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        // 1. Persisted session
        let session = self.read_session().await;
        report.session_found = session.is_some();
        let (mut layers, viewport) = match session {
            Some(session) => {
                let total = session.layers.len();
                let restored = self.restore_layers(&session.layers).await;
                report.restored = restored.len();
                report.failed += total - restored.len();
                log::info!("Restored {} of {} session layers", restored.len(), total);
                (restored, Viewport::from(session.viewport))
            }
            None => (Vec::new(), Viewport::default()),
        };

        // 2. Pending-import inbox, consumed exactly once
        let inbox = self.take_inbox().await;
        if !inbox.is_empty() {
            let known: HashSet<&ImageRef> = layers.iter().filter_map(Layer::original_ref).collect();
            let mut seen = HashSet::new();
            let fresh: Vec<ImageRef> = inbox
                .iter()
                .filter(|reference| !known.contains(reference) && seen.insert(*reference))
                .cloned()
                .collect();
            report.inbox_duplicates = inbox.len() - fresh.len();

            let base = layers.len();
            let added = self.import_inbox(&fresh, base).await;
            report.inbox_added = added.len();
            report.failed += fresh.len() - added.len();
            if !added.is_empty() {
                log::info!("Added {} layers from pending imports", added.len());
            }
            layers.extend(added);
        }

        // 3. Commit
        canvas.commit(layers, viewport);

        // 4. External collection, merged onto the committed state
        let items = self.read_collection().await;
        if !items.is_empty() {
            let live: HashSet<LayerId> = canvas.layers().iter().map(|l| l.id().clone()).collect();
            let mut seen = HashSet::new();
            let missing: Vec<&CollectionItem> = items
                .iter()
                .filter(|item| !live.contains(&item.id) && seen.insert(&item.id))
                .collect();

            if missing.is_empty() {
                log::info!("Canvas is up to date with the collection");
            } else {
                let base = canvas.layers().len();
                let added = self.import_collection(&missing, base).await;
                report.collection_added = added.len();
                report.failed += missing.len() - added.len();
                log::info!("Added {} layers from the collection", added.len());
                canvas.extend(added);
            }
        }

        report
    }

    async fn read_session(&self) -> Option<SessionRecord> {
        match read_json::<SessionRecord>(self.store, &self.config.session_key).await {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Ignoring unreadable session state: {}", e);
                None
            }
        }
    }

    async fn take_inbox(&self) -> Vec<ImageRef> {
        let key = &self.config.inbox_key;
        let inbox = match read_json::<Vec<ImageRef>>(self.store, key).await {
            Ok(Some(inbox)) => inbox,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Ignoring unreadable pending imports: {}", e);
                Vec::new()
            }
        };
        if let Err(e) = self.store.remove(key).await {
            log::error!("Failed to clear pending imports: {}", e);
        }
        inbox
    }

    async fn read_collection(&self) -> Vec<CollectionItem> {
        match read_json::<Vec<CollectionItem>>(self.store, &self.config.collection_key).await {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                log::warn!("Ignoring unreadable collection: {}", e);
                Vec::new()
            }
        }
    }

    async fn restore_layers(&self, records: &[LayerRecord]) -> Vec<Layer> {
        join_all(records.iter().map(|record| self.restore_layer(record)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn restore_layer(&self, record: &LayerRecord) -> Option<Layer> {
        let current = &record.current_image_ref;
        let original = &record.original_image_ref;

        let (pixels, original_pixels) = if current == original {
            (self.resolve(current).await?, None)
        } else {
            let (a, b) = futures::join!(self.resolve(current), self.resolve(original));
            (a?, Some(b?))
        };

        let mut layer = Layer::new(pixels, Point::new(record.x, record.y), record.name.clone())
            .with_id(record.id.clone())
            .with_size(Size::new(record.width, record.height))
            .with_visible(record.visible)
            .with_refs(Some(current.clone()), Some(original.clone()));
        if let Some(original_pixels) = original_pixels {
            layer = layer.with_original(original_pixels);
        }
        Some(layer)
    }

    async fn import_inbox(&self, references: &[ImageRef], base: usize) -> Vec<Layer> {
        let stride = self.config.import_stride;
        join_all(references.iter().enumerate().map(|(index, reference)| async move {
            let pixels = self.resolve(reference).await?;
            let slot = base + index;
            let offset = slot as f64 * stride;
            Some(
                Layer::new(pixels, Point::new(offset, offset), format!("Layer {}", slot + 1))
                    .with_source(reference.clone()),
            )
        }))
        .await
        .into_iter()
        .flatten()
        .collect()
    }

    async fn import_collection(&self, items: &[&CollectionItem], base: usize) -> Vec<Layer> {
        let stride = self.config.import_stride;
        join_all(items.iter().enumerate().map(|(index, item)| async move {
            let pixels = self.resolve(&item.image_ref).await?;
            let offset = (base + index) as f64 * stride;
            let name = item
                .name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("Synced Layer {}", index + 1));
            Some(
                Layer::new(pixels, Point::new(offset, offset), name)
                    .with_id(item.id.clone())
                    .with_source(item.image_ref.clone()),
            )
        }))
        .await
        .into_iter()
        .flatten()
        .collect()
    }

    async fn resolve(&self, reference: &ImageRef) -> Option<image::RgbaImage> {
        match self.resolver.resolve(reference).await {
            Ok(pixels) => Some(pixels),
            Err(e) => {
                log::warn!("Dropping layer, could not resolve {}: {}", reference, e);
                None
            }
        }
    }
}

//! Collage Core Library
//!
//! Platform-agnostic engine for the Collage layer-compositing editor: the
//! viewport, layer model, undo history, interaction controller, destructive
//! edit operators, persistence and startup reconciliation.

pub mod canvas;
pub mod color;
pub mod config;
pub mod editor;
pub mod history;
pub mod imaging;
pub mod input;
pub mod interaction;
pub mod layer;
pub mod layers;
pub mod ops;
pub mod project;
pub mod reconcile;
pub mod shortcuts;
pub mod snap;
pub mod storage;
pub mod tools;
pub mod viewport;

pub use canvas::Canvas;
pub use color::SerializableColor;
pub use config::EditorConfig;
pub use editor::{ClipboardError, ClipboardTarget, Editor, Lifecycle, Notice, Status};
pub use history::{History, HistorySnapshot, MAX_HISTORY};
pub use imaging::{DefaultResolver, EncodeError, ImageRef, ImageResolver, ResolveError};
pub use input::{Modifiers, PointerEvent};
pub use interaction::{InteractionController, StrokePreview, TransientOverlay};
pub use layer::{Layer, LayerId, Pixels};
pub use layers::LayerStore;
pub use ops::{EditError, StrokeStyle};
pub use project::{ExportError, ImportError, PROJECT_FORMAT_VERSION};
pub use reconcile::{ReconcileReport, Reconciler};
pub use shortcuts::{Command, Shortcut, ShortcutRegistry};
pub use snap::{GRID_SIZE, SNAP_THRESHOLD_PX, SnapGuide, SnapResult, snap_layer_position};
pub use storage::{FileStore, MemoryStore, StateStore, StorageError};
pub use tools::Tool;
pub use viewport::{MAX_ZOOM, MIN_ZOOM, Viewport};

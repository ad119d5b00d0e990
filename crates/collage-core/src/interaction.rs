//! Pointer-driven interaction: move, crop, draw and erase gestures.
//!
//! Each gesture records the state it started from. History is pushed on
//! release, using the snapshot taken before the first live mutation, so one
//! undo always reverts the whole gesture.

use crate::canvas::Canvas;
use crate::config::EditorConfig;
use crate::history::HistorySnapshot;
use crate::input::{Modifiers, PointerEvent};
use crate::layer::LayerId;
use crate::ops::{EditError, StrokeStyle, local_crop_rect, plan_crop, stroke_layer};
use crate::snap::{SnapGuide, snap_layer_position};
use crate::tools::Tool;
use kurbo::{Point, Rect, Vec2};

/// In-progress gesture.
#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    /// Dragging a layer. `grab` is the pointer offset from the layer origin.
    DragLayer {
        id: LayerId,
        grab: Vec2,
        origin: Point,
        before: HistorySnapshot,
    },
    /// Panning the viewport; `last` is the previous screen position.
    Pan { last: Point },
    /// Dragging out a crop rectangle on `layer`, canvas space.
    Crop {
        layer: LayerId,
        start: Point,
        end: Point,
    },
    /// Collecting marker points, canvas space.
    Stroke { points: Vec<Point> },
    /// Deleting layers under the pointer.
    Erase {
        before: HistorySnapshot,
        removed: usize,
    },
}

/// A marker stroke being drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePreview {
    pub points: Vec<Point>,
    pub style: StrokeStyle,
}

/// Render-only state of the current gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransientOverlay {
    /// Normalized crop rectangle, canvas space.
    pub crop_rect: Option<Rect>,
    pub stroke_preview: Option<StrokePreview>,
    pub guides: Vec<SnapGuide>,
}

impl TransientOverlay {
    pub fn is_empty(&self) -> bool {
        self.crop_rect.is_none() && self.stroke_preview.is_none() && self.guides.is_empty()
    }
}

/// Interprets pointer input against the canvas.
#[derive(Debug, Default)]
pub struct InteractionController {
    tool: Tool,
    gesture: Gesture,
    guides: Vec<SnapGuide>,
    stroke_style: StrokeStyle,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools, abandoning any gesture in progress.
    pub fn set_tool(&mut self, canvas: &mut Canvas, tool: Tool) {
        if tool != self.tool {
            self.cancel(canvas);
            self.tool = tool;
        }
    }

    pub fn set_stroke_style(&mut self, style: StrokeStyle) {
        self.stroke_style = style;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::DragLayer { .. } | Gesture::Pan { .. })
    }

    pub fn is_drawing_stroke(&self) -> bool {
        matches!(self.gesture, Gesture::Stroke { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    /// Abandon the current gesture, undoing its live effects.
    pub fn cancel(&mut self, canvas: &mut Canvas) {
        match std::mem::take(&mut self.gesture) {
            Gesture::DragLayer { id, origin, .. } => {
                canvas.move_layer(&id, origin);
            }
            Gesture::Erase { before, removed } if removed > 0 => {
                canvas.commit(before.layers, before.viewport);
            }
            _ => {}
        }
        self.guides.clear();
    }

    /// Feed one pointer event. Returns true if anything visible changed.
    pub fn handle(&mut self, canvas: &mut Canvas, event: PointerEvent, config: &EditorConfig) -> bool {
        match event {
            PointerEvent::Down { position, modifiers } => self.handle_press(canvas, position, modifiers),
            PointerEvent::Move { position } => self.handle_drag(canvas, position, config),
            PointerEvent::Up { position } => self.handle_release(canvas, position),
            PointerEvent::Scroll { position, delta } => {
                if delta.y == 0.0 {
                    return false;
                }
                let factor = if delta.y > 0.0 {
                    config.wheel_zoom_out
                } else {
                    config.wheel_zoom_in
                };
                canvas.zoom_at(position, factor);
                true
            }
        }
    }

    fn handle_press(&mut self, canvas: &mut Canvas, screen: Point, modifiers: Modifiers) -> bool {
        if !self.is_idle() {
            // A press without a matching release: settle the old gesture first
            self.cancel(canvas);
        }
        let point = canvas.viewport().screen_to_canvas(screen);

        self.gesture = match self.tool {
            Tool::Move => match canvas.layers().find_topmost_at(point) {
                Some(layer) => {
                    let id = layer.id().clone();
                    let origin = layer.position();
                    let before = canvas.capture_snapshot();
                    if !modifiers.additive() {
                        canvas.select(&id);
                    }
                    Gesture::DragLayer {
                        id,
                        grab: point - origin,
                        origin,
                        before,
                    }
                }
                None => {
                    if !modifiers.additive() {
                        canvas.clear_selection();
                    }
                    Gesture::Pan { last: screen }
                }
            },
            Tool::Crop => match canvas.layers().selection() {
                Some(id) => Gesture::Crop {
                    layer: id.clone(),
                    start: point,
                    end: point,
                },
                None => {
                    log::debug!("Crop not started: {}", EditError::NoSelection);
                    Gesture::Idle
                }
            },
            Tool::Draw => Gesture::Stroke { points: Vec::new() },
            Tool::Erase => {
                let before = canvas.capture_snapshot();
                let removed = erase_at(canvas, point);
                Gesture::Erase { before, removed }
            }
        };
        true
    }

    fn handle_drag(&mut self, canvas: &mut Canvas, screen: Point, config: &EditorConfig) -> bool {
        let point = canvas.viewport().screen_to_canvas(screen);
        match &mut self.gesture {
            Gesture::Idle => false,
            Gesture::DragLayer { id, grab, .. } => {
                let Some(size) = canvas.layers().get(id).map(|layer| layer.size()) else {
                    return false;
                };
                let candidate = point - *grab;
                let threshold = config.snap_threshold_px / canvas.viewport().scale;
                let snapped = snap_layer_position(candidate, size, config.grid_size, threshold);
                self.guides = snapped.guides;
                canvas.move_layer(id, snapped.position);
                true
            }
            Gesture::Pan { last } => {
                let delta = screen - *last;
                *last = screen;
                canvas.pan(delta);
                true
            }
            Gesture::Crop { end, .. } => {
                *end = point;
                true
            }
            Gesture::Stroke { points } => {
                points.push(point);
                true
            }
            Gesture::Erase { removed, .. } => {
                let count = erase_at(canvas, point);
                *removed += count;
                count > 0
            }
        }
    }

    fn handle_release(&mut self, canvas: &mut Canvas, screen: Point) -> bool {
        self.guides.clear();
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => false,
            Gesture::DragLayer {
                id, origin, before, ..
            } => {
                let moved = canvas
                    .layers()
                    .get(&id)
                    .is_some_and(|layer| layer.position() != origin);
                if moved {
                    canvas.push_snapshot(before);
                }
                true
            }
            Gesture::Pan { .. } => true,
            Gesture::Crop { layer, start, .. } => {
                let end = canvas.viewport().screen_to_canvas(screen);
                let Some(target) = canvas.layers().get(&layer) else {
                    return true;
                };
                let local = local_crop_rect(target, start, end);
                match plan_crop(target, local) {
                    Ok(plan) => {
                        if let Err(e) = canvas.apply_crop(&plan) {
                            log::debug!("Crop not applied: {}", e);
                        }
                    }
                    Err(e) => log::debug!("Crop rejected: {}", e),
                }
                true
            }
            Gesture::Stroke { points } => {
                match stroke_layer(&points, &self.stroke_style) {
                    Ok(layer) => {
                        canvas.add_layers(vec![layer]);
                    }
                    Err(e) => log::debug!("Stroke discarded: {}", e),
                }
                true
            }
            Gesture::Erase { before, removed } => {
                if removed > 0 {
                    canvas.push_snapshot(before);
                }
                removed > 0
            }
        }
    }

    /// Render-only state for the current gesture.
    pub fn overlay(&self) -> TransientOverlay {
        let mut overlay = TransientOverlay {
            guides: self.guides.clone(),
            ..TransientOverlay::default()
        };
        match &self.gesture {
            Gesture::Crop { start, end, .. } => {
                overlay.crop_rect = Some(Rect::from_points(*start, *end));
            }
            Gesture::Stroke { points } if !points.is_empty() => {
                overlay.stroke_preview = Some(StrokePreview {
                    points: points.clone(),
                    style: self.stroke_style,
                });
            }
            _ => {}
        }
        overlay
    }
}

/// Remove the topmost visible layer at `point`. Returns how many were removed.
fn erase_at(canvas: &mut Canvas, point: Point) -> usize {
    let Some(id) = canvas.layers().find_topmost_at(point).map(|layer| layer.id().clone()) else {
        return 0;
    };
    log::debug!("Erasing layer {}", id);
    usize::from(canvas.remove_layer(&id).is_some())
}

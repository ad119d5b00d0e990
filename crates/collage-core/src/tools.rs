//! Interaction tools.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Available tools. One handler per variant in the interaction controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Drag layers, or pan the canvas when nothing is hit.
    #[default]
    Move,
    /// Cut a rectangle out of the selected layer into a new layer.
    Crop,
    /// Freehand marker strokes, each becoming a new layer.
    Draw,
    /// Delete whole layers under the pointer.
    Erase,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Move, Tool::Crop, Tool::Draw, Tool::Erase];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Move => "move",
            Tool::Crop => "crop",
            Tool::Draw => "draw",
            Tool::Erase => "erase",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Keyboard commands and their shortcuts.

use crate::input::Modifiers;
use crate::tools::Tool;

/// An editor command reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Undo,
    Copy,
    Duplicate,
    Delete,
    ZoomIn,
    ZoomOut,
    ResetView,
    /// Abandon the current gesture.
    Cancel,
    SetTool(Tool),
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    /// Ctrl, or Cmd on macOS.
    pub command: bool,
    pub command_id: Command,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        command: bool,
        command_id: Command,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            command,
            command_id,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Z").
    pub fn format(&self) -> String {
        if self.command {
            format!("Ctrl+{}", self.key)
        } else {
            self.key.to_string()
        }
    }

    fn matches(&self, key: &str, modifiers: Modifiers) -> bool {
        self.command == modifiers.command() && self.key.eq_ignore_ascii_case(key)
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("Z", true, Command::Undo, "Undo"),
            Shortcut::new("C", true, Command::Copy, "Copy selected layer as PNG"),
            Shortcut::new("D", true, Command::Duplicate, "Duplicate selected layer"),
            Shortcut::new("Delete", false, Command::Delete, "Delete selected layer"),
            Shortcut::new("Backspace", false, Command::Delete, "Delete selected layer"),
            Shortcut::new("=", false, Command::ZoomIn, "Zoom in"),
            Shortcut::new("-", false, Command::ZoomOut, "Zoom out"),
            Shortcut::new("0", false, Command::ResetView, "Reset view"),
            Shortcut::new("Escape", false, Command::Cancel, "Cancel current action"),
            Shortcut::new("V", false, Command::SetTool(Tool::Move), "Move tool"),
            Shortcut::new("C", false, Command::SetTool(Tool::Crop), "Crop & excise tool"),
            Shortcut::new("D", false, Command::SetTool(Tool::Draw), "Marker tool"),
            Shortcut::new("E", false, Command::SetTool(Tool::Erase), "Erase tool"),
        ]
    }

    /// Command bound to a key press, if any.
    pub fn lookup(key: &str, modifiers: Modifiers) -> Option<Command> {
        Self::all()
            .into_iter()
            .find(|shortcut| shortcut.matches(key, modifiers))
            .map(|shortcut| shortcut.command_id)
    }

    /// Render the shortcut table, one per line.
    pub fn describe() -> String {
        Self::all()
            .iter()
            .map(|shortcut| format!("  {:12} {}", shortcut.format(), shortcut.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

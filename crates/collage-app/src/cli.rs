//! Command-line arguments.

use clap::{Parser, Subcommand};
use collage_render::ExportBackground;
use std::path::PathBuf;

/// Layer-compositing canvas editor, headless.
///
/// Every command restores the saved session first (merging any pending
/// inbox images and collection items) and saves it again afterwards.
#[derive(Parser, Debug)]
#[command(name = "collage", version, about = "Collage canvas editor (headless)")]
pub struct Cli {
    /// Editor configuration file (JSON). Missing fields use defaults.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted editor state.
    /// Defaults to the platform data directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Print the layer stack, selection and view.
    Status,

    /// Add image files as new layers.
    Import {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },

    /// Write the visible layers as one flattened PNG.
    ExportPng {
        output: PathBuf,
        /// `transparent` or a hex color such as `#ffffff`.
        #[arg(long, default_value = "transparent", value_name = "BACKGROUND")]
        background: ExportBackground,
    },

    /// Write the full project (every layer, current and original pixels) as JSON.
    ExportJson { output: PathBuf },

    /// Replace the canvas with a project exported by `export-json`.
    LoadJson { file: PathBuf },

    /// Render the current view, with grid and selection, to a PNG.
    Render {
        output: PathBuf,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 800)]
        height: u32,
    },

    /// Copy the selected layer (or the topmost one) to the system clipboard.
    Copy,
}

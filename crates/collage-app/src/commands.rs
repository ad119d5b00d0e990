//! Command dispatch against a file-backed editor session.

use crate::cli::{Cli, CliCommand};
use crate::clipboard::system_clipboard;
use collage_core::imaging::encode_png;
use collage_core::{
    ClipboardTarget, DefaultResolver, Editor, EditorConfig, EncodeError, ExportError, FileStore,
    ImportError, StorageError,
};
use collage_render::{GridStyle, RenderContext, RendererError, SoftwareRenderer, export_png};
use kurbo::Size;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

type AppEditor = Editor<FileStore, DefaultResolver>;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write {}: {}", .path.display(), .source)]
    Write { path: PathBuf, source: io::Error },
    #[error("Invalid config {}: {}", .path.display(), .message)]
    Config { path: PathBuf, message: String },
    #[error("Could not determine the working directory: {0}")]
    WorkingDir(io::Error),
    #[error("None of the {0} files could be imported")]
    NothingImported(usize),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),
    #[error("Render failed: {0}")]
    Render(#[from] RendererError),
    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

/// Run a command with the system clipboard.
pub async fn run(cli: Cli) -> Result<String, AppError> {
    let mut clipboard = system_clipboard();
    execute(cli, clipboard.as_mut()).await
}

/// Restore the session, run one command, save the session.
pub async fn execute(cli: Cli, clipboard: &mut dyn ClipboardTarget) -> Result<String, AppError> {
    let config = load_config(cli.config.as_deref())?;
    let store = match &cli.store {
        Some(dir) => FileStore::new(dir)?,
        None => FileStore::default_location()?,
    };
    log::debug!("State directory: {}", store.base_path().display());
    let root = std::env::current_dir().map_err(AppError::WorkingDir)?;

    let mut editor = Editor::new(Arc::new(store), Arc::new(DefaultResolver::new(root)), config);
    if let Some(report) = editor.initialize().await {
        if report.failed > 0 {
            log::warn!("{} stored image references could not be restored", report.failed);
        }
    }

    let output = dispatch(&mut editor, cli.command, clipboard).await?;
    editor.flush().await?;
    Ok(output)
}

async fn dispatch(
    editor: &mut AppEditor,
    command: CliCommand,
    clipboard: &mut dyn ClipboardTarget,
) -> Result<String, AppError> {
    match command {
        CliCommand::Status => Ok(describe(editor)),
        CliCommand::Import { files } => {
            let total = files.len();
            let images = files.iter().map(|path| read(path)).collect::<Result<Vec<_>, _>>()?;
            let added = editor.import_images(images);
            if added.is_empty() {
                return Err(AppError::NothingImported(total));
            }
            Ok(format!("Imported {} of {} images", added.len(), total))
        }
        CliCommand::ExportPng { output, background } => {
            let png = export_png(editor.canvas().layers(), editor.config().export_padding, background)?;
            write(&output, &png)?;
            Ok(format!("Exported {} ({} background)", output.display(), background))
        }
        CliCommand::ExportJson { output } => {
            let json = editor.export_json()?;
            write(&output, json.as_bytes())?;
            Ok(format!("Exported {} layers to {}", editor.canvas().layers().len(), output.display()))
        }
        CliCommand::LoadJson { file } => {
            let json = String::from_utf8_lossy(&read(&file)?).into_owned();
            let count = editor.load_json(&json).await?;
            Ok(format!("Loaded {} layers from {}", count, file.display()))
        }
        CliCommand::Render { output, width, height } => {
            let size = Size::new(width as f64, height as f64);
            editor.set_viewport_size(size);
            let ctx = RenderContext::new(editor.canvas(), size)
                .with_grid(GridStyle::from_toggle(editor.config().show_grid))
                .with_grid_size(editor.config().grid_size)
                .with_overlay(editor.overlay());
            let frame = SoftwareRenderer::new().render(&ctx)?;
            write(&output, &encode_png(&frame)?)?;
            Ok(format!("Rendered {}x{} view to {}", width, height, output.display()))
        }
        CliCommand::Copy => {
            if editor.canvas().layers().selected().is_none() {
                let topmost = editor.canvas().layers().iter().next_back().map(|l| l.id().clone());
                if let Some(id) = topmost {
                    editor.select(&id);
                }
            }
            Ok(editor.copy_selected(clipboard).to_string())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig, AppError> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let raw = String::from_utf8_lossy(&read(path)?).into_owned();
    EditorConfig::from_json(&raw).map_err(|e| AppError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read(path: &Path) -> Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|source| AppError::Read { path: path.to_path_buf(), source })
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    std::fs::write(path, bytes).map_err(|source| AppError::Write { path: path.to_path_buf(), source })?;
    log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Human-readable summary, topmost layer first.
fn describe(editor: &AppEditor) -> String {
    let status = editor.status();
    let viewport = editor.canvas().viewport();
    let mut out = format!(
        "{} layers ({} visible), zoom {:.0}%, offset ({:.0}, {:.0})",
        status.layer_count,
        status.visible_count,
        status.zoom * 100.0,
        viewport.offset.x,
        viewport.offset.y,
    );
    let selected = editor.canvas().layers().selection();
    for layer in editor.canvas().layers().iter().rev() {
        let bounds = layer.bounds();
        let _ = write!(
            out,
            "\n{} {} [{}] at ({:.0}, {:.0}) {:.0}x{:.0}{}",
            if selected == Some(layer.id()) { "*" } else { "-" },
            layer.name(),
            layer.id(),
            bounds.x0,
            bounds.y0,
            bounds.width(),
            bounds.height(),
            if layer.visible() { "" } else { " (hidden)" },
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use collage_core::ClipboardError;
    use collage_core::imaging::decode_image;
    use image::{Rgba, RgbaImage};
    use tempfile::{TempDir, tempdir};

    #[derive(Default)]
    struct RecordingClipboard {
        copied: Vec<(u32, u32)>,
    }

    impl ClipboardTarget for RecordingClipboard {
        fn set_image(&mut self, image: &RgbaImage) -> Result<(), ClipboardError> {
            self.copied.push(image.dimensions());
            Ok(())
        }
    }

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self { dir: tempdir().unwrap() }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn write_png(&self, name: &str, width: u32, height: u32) -> PathBuf {
            let path = self.path(name);
            let image = RgbaImage::from_pixel(width, height, Rgba([20, 40, 60, 255]));
            std::fs::write(&path, encode_png(&image).unwrap()).unwrap();
            path
        }

        fn run(&self, command: CliCommand) -> Result<String, AppError> {
            let mut clipboard = RecordingClipboard::default();
            self.run_with(command, &mut clipboard)
        }

        fn run_with(&self, command: CliCommand, clipboard: &mut dyn ClipboardTarget) -> Result<String, AppError> {
            let cli = Cli { config: None, store: Some(self.path("state")), command };
            pollster::block_on(execute(cli, clipboard))
        }
    }

    #[test]
    fn test_import_persists_between_runs() {
        let fx = Fixture::new();
        let a = fx.write_png("a.png", 8, 6);
        let b = fx.write_png("b.png", 4, 4);

        let out = fx.run(CliCommand::Import { files: vec![a, b] }).unwrap();
        assert_eq!(out, "Imported 2 of 2 images");

        let status = fx.run(CliCommand::Status).unwrap();
        assert!(status.starts_with("2 layers (2 visible)"));
        assert!(status.contains("Layer 2"));
        assert!(status.contains("at (50, 50) 4x4"));
    }

    #[test]
    fn test_import_rejects_undecodable() {
        let fx = Fixture::new();
        let junk = fx.path("junk.png");
        std::fs::write(&junk, b"not an image").unwrap();
        let err = fx.run(CliCommand::Import { files: vec![junk] }).unwrap_err();
        assert!(matches!(err, AppError::NothingImported(1)));

        let missing = fx.run(CliCommand::Import { files: vec![fx.path("missing.png")] });
        assert!(matches!(missing, Err(AppError::Read { .. })));
    }

    #[test]
    fn test_export_png_crops_to_visible() {
        let fx = Fixture::new();
        let a = fx.write_png("a.png", 10, 10);
        fx.run(CliCommand::Import { files: vec![a] }).unwrap();

        let out = fx.path("flat.png");
        fx.run(CliCommand::ExportPng {
            output: out.clone(),
            background: "#ffffff".parse().unwrap(),
        })
        .unwrap();
        let image = decode_image(&std::fs::read(&out).unwrap()).unwrap();
        // 10px layer plus 20px padding each side
        assert_eq!(image.dimensions(), (50, 50));
        assert_eq!(*image.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*image.get_pixel(25, 25), Rgba([20, 40, 60, 255]));
    }

    #[test]
    fn test_export_png_empty_canvas_fails() {
        let fx = Fixture::new();
        let err = fx
            .run(CliCommand::ExportPng { output: fx.path("x.png"), background: Default::default() })
            .unwrap_err();
        assert!(matches!(err, AppError::Export(ExportError::NothingVisible)));
        assert!(!fx.path("x.png").exists());
    }

    #[test]
    fn test_json_export_and_load() {
        let fx = Fixture::new();
        let a = fx.write_png("a.png", 5, 5);
        fx.run(CliCommand::Import { files: vec![a.clone(), a] }).unwrap();
        let project = fx.path("project.json");
        fx.run(CliCommand::ExportJson { output: project.clone() }).unwrap();

        let other = Fixture::new();
        let out = other.run(CliCommand::LoadJson { file: project }).unwrap();
        assert!(out.starts_with("Loaded 2 layers"));
        let status = other.run(CliCommand::Status).unwrap();
        assert!(status.starts_with("2 layers"));
    }

    #[test]
    fn test_load_json_rejects_bad_structure() {
        let fx = Fixture::new();
        let bad = fx.path("bad.json");
        std::fs::write(&bad, r#"{"version": "1.0"}"#).unwrap();
        let err = fx.run(CliCommand::LoadJson { file: bad }).unwrap_err();
        assert!(matches!(err, AppError::Import(ImportError::MissingLayers)));
    }

    #[test]
    fn test_copy_falls_back_to_topmost() {
        let fx = Fixture::new();
        fx.run(CliCommand::Import { files: vec![fx.write_png("a.png", 3, 3), fx.write_png("b.png", 7, 2)] })
            .unwrap();

        let mut clipboard = RecordingClipboard::default();
        let out = fx.run_with(CliCommand::Copy, &mut clipboard).unwrap();
        assert_eq!(out, "Copied 'Layer 2' to the clipboard");
        assert_eq!(clipboard.copied, vec![(7, 2)]);

        let empty = Fixture::new();
        assert_eq!(empty.run(CliCommand::Copy).unwrap(), "No layer selected");
    }

    #[test]
    fn test_render_writes_view() {
        let fx = Fixture::new();
        fx.run(CliCommand::Import { files: vec![fx.write_png("a.png", 10, 10)] }).unwrap();
        let out = fx.path("view.png");
        fx.run(CliCommand::Render { output: out.clone(), width: 64, height: 48 }).unwrap();
        let frame = decode_image(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(frame.dimensions(), (64, 48));
        assert_eq!(*frame.get_pixel(5, 5), Rgba([20, 40, 60, 255]));
    }

    #[test]
    fn test_bad_config_reported() {
        let fx = Fixture::new();
        let config = fx.path("config.json");
        std::fs::write(&config, "{ nope").unwrap();
        let cli = Cli { config: Some(config), store: Some(fx.path("state")), command: CliCommand::Status };
        let err = pollster::block_on(execute(cli, &mut RecordingClipboard::default())).unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
    }
}

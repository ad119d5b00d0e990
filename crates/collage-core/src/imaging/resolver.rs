//! Resolution of image references into bitmaps.

use super::{ImageRef, ResolveError, decode_image, parse_data_url};
use crate::storage::BoxFuture;
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};

/// Turns an [`ImageRef`] into decoded pixels.
///
/// Resolution is asynchronous so callers can run many of them concurrently;
/// failures are per-reference and never poison a batch.
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, reference: &ImageRef) -> BoxFuture<'_, Result<RgbaImage, ResolveError>>;
}

/// Resolves inline `data:` URLs only.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUrlResolver;

impl ImageResolver for DataUrlResolver {
    fn resolve(&self, reference: &ImageRef) -> BoxFuture<'_, Result<RgbaImage, ResolveError>> {
        resolve_inline(reference.clone())
    }
}

fn resolve_inline(reference: ImageRef) -> BoxFuture<'static, Result<RgbaImage, ResolveError>> {
    Box::pin(async move {
        if !reference.is_data_url() {
            return Err(ResolveError::Unsupported(reference.to_string()));
        }
        let bytes = parse_data_url(reference.as_str())?;
        decode_image(&bytes)
    })
}

/// Resolves `file://` URLs and plain paths, relative paths against `root`.
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a reference to a path, or `None` if it uses another scheme.
    fn path_for(&self, reference: &str) -> Option<PathBuf> {
        let raw = match reference.strip_prefix("file://") {
            Some(path) => path,
            None if reference.contains("://") || reference.starts_with("data:") => return None,
            None => reference,
        };
        let path = Path::new(raw);
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        })
    }
}

impl ImageResolver for FileResolver {
    fn resolve(&self, reference: &ImageRef) -> BoxFuture<'_, Result<RgbaImage, ResolveError>> {
        let path = self.path_for(reference.as_str());
        let shown = reference.to_string();
        Box::pin(async move {
            let path = path.ok_or(ResolveError::Unsupported(shown))?;
            let bytes = fs::read(&path).map_err(|e| {
                ResolveError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            decode_image(&bytes)
        })
    }
}

/// Data URLs first, then local files. Network schemes are unsupported.
#[derive(Debug, Clone)]
pub struct DefaultResolver {
    files: FileResolver,
}

impl DefaultResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            files: FileResolver::new(root),
        }
    }
}

impl ImageResolver for DefaultResolver {
    fn resolve(&self, reference: &ImageRef) -> BoxFuture<'_, Result<RgbaImage, ResolveError>> {
        if reference.is_data_url() {
            resolve_inline(reference.clone())
        } else {
            self.files.resolve(reference)
        }
    }
}

//! System clipboard access.

use collage_core::{ClipboardError, ClipboardTarget};
use image::RgbaImage;

/// The desktop clipboard.
#[cfg(feature = "native")]
pub struct SystemClipboard;

#[cfg(feature = "native")]
impl ClipboardTarget for SystemClipboard {
    fn set_image(&mut self, image: &RgbaImage) -> Result<(), ClipboardError> {
        // arboard expects raw RGBA pixel data
        let image_data = arboard::ImageData {
            width: image.width() as usize,
            height: image.height() as usize,
            bytes: std::borrow::Cow::Borrowed(image.as_raw()),
        };
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        clipboard
            .set_image(image_data)
            .map_err(|e| ClipboardError::Rejected(e.to_string()))?;
        log::info!("Image copied to clipboard ({}x{})", image.width(), image.height());
        Ok(())
    }
}

/// Stand-in used when built without clipboard support.
pub struct NoClipboard;

impl ClipboardTarget for NoClipboard {
    fn set_image(&mut self, _image: &RgbaImage) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable("built without clipboard support".to_string()))
    }
}

#[cfg(feature = "native")]
pub fn system_clipboard() -> Box<dyn ClipboardTarget> {
    Box::new(SystemClipboard)
}

#[cfg(not(feature = "native"))]
pub fn system_clipboard() -> Box<dyn ClipboardTarget> {
    Box::new(NoClipboard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_clipboard_reports_unavailable() {
        let result = NoClipboard.set_image(&RgbaImage::new(1, 1));
        assert!(matches!(result, Err(ClipboardError::Unavailable(_))));
    }
}

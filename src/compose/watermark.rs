//! Watermark stamping.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Watermark width as a fraction of the canvas width.
pub const WATERMARK_WIDTH_RATIO: f32 = 0.15;
/// Distance from the bottom-right corner, in pixels.
pub const WATERMARK_INSET: i64 = 10;
/// Opacity applied on top of the asset's own alpha.
pub const WATERMARK_OPACITY: f32 = 0.8;

/// Where the watermark comes from.
#[derive(Debug, Clone)]
pub enum WatermarkAsset {
    /// Read from disk at every composition.
    Path(PathBuf),
    /// Already decoded.
    Image(Arc<RgbaImage>),
    Disabled,
}

impl WatermarkAsset {
    /// Load the asset. Failures are logged and yield `None`.
    pub fn load(&self) -> Option<Arc<RgbaImage>> {
        match self {
            WatermarkAsset::Path(path) => match image::open(path) {
                Ok(img) => Some(Arc::new(img.to_rgba8())),
                Err(e) => {
                    warn!(
                        target: "compose",
                        "Failed to load watermark {}, continuing without it: {}",
                        path.display(),
                        e
                    );
                    None
                }
            },
            WatermarkAsset::Image(img) => Some(img.clone()),
            WatermarkAsset::Disabled => None,
        }
    }
}

/// Pixel rectangle the watermark occupies on a canvas of the given size:
/// `(x, y, width, height)`. `x`/`y` may be negative on tiny canvases.
pub fn placement(canvas_w: u32, canvas_h: u32, mark_w: u32, mark_h: u32) -> (i64, i64, u32, u32) {
    let width = (canvas_w as f32 * WATERMARK_WIDTH_RATIO).round().max(1.0);
    let aspect = if mark_w == 0 { 1.0 } else { mark_h as f32 / mark_w as f32 };
    let height = (width * aspect).round().max(1.0);
    let x = canvas_w as i64 - width as i64 - WATERMARK_INSET;
    let y = canvas_h as i64 - height as i64 - WATERMARK_INSET;
    (x, y, width as u32, height as u32)
}

/// Stamp the watermark in the bottom-right corner at reduced opacity.
pub fn apply(canvas: &mut RgbaImage, mark: &RgbaImage) {
    if mark.width() == 0 || mark.height() == 0 {
        return;
    }
    let (x, y, w, h) = placement(canvas.width(), canvas.height(), mark.width(), mark.height());
    let mut scaled = imageops::resize(mark, w, h, FilterType::Triangle);
    for px in scaled.pixels_mut() {
        px[3] = (px[3] as f32 * WATERMARK_OPACITY).round() as u8;
    }
    imageops::overlay(canvas, &scaled, x, y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_placement_bottom_right() {
        // 1000px wide canvas → 150px watermark; 2:1 asset → 75px tall
        let (x, y, w, h) = placement(1000, 800, 200, 100);
        assert_eq!((w, h), (150, 75));
        assert_eq!((x, y), (1000 - 150 - 10, 800 - 75 - 10));
    }

    #[test]
    fn test_apply_blends_with_opacity() {
        let mut canvas = RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 255]));
        let mark = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        apply(&mut canvas, &mark);

        // 30x30 mark at (160, 160)
        let inside = canvas.get_pixel(175, 175);
        assert!((200..=208).contains(&inside[0]), "got {:?}", inside);
        assert_eq!(*canvas.get_pixel(100, 100), Rgba([0, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(195, 195), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_missing_file_is_not_fatal() {
        let asset = WatermarkAsset::Path(PathBuf::from("/no/such/watermark.png"));
        assert!(asset.load().is_none());
        assert!(WatermarkAsset::Disabled.load().is_none());
    }

    #[test]
    fn test_tiny_canvas_does_not_panic() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let mark = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        apply(&mut canvas, &mark);
    }
}

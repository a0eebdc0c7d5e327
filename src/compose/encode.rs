//! Output encoding.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use serde::Serialize;

use crate::error::MemeError;
use crate::source::SourceFormat;

/// JPEG quality for static exports.
pub const JPEG_QUALITY: u8 = 90;

/// Encoding of a composition result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    Gif,
}

impl OutputFormat {
    /// Output encoding for a static render of the given source.
    pub fn for_static(source: SourceFormat) -> Self {
        match source {
            SourceFormat::Png => OutputFormat::Png,
            _ => OutputFormat::Jpeg,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Gif => "image/gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => ".png",
            OutputFormat::Jpeg => ".jpg",
            OutputFormat::Gif => ".gif",
        }
    }
}

/// Encode a finished canvas.
///
/// JPEG drops the alpha channel. GIF is never re-encoded; animated sources
/// are passed through untouched.
pub fn encode(canvas: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>, MemeError> {
    let mut bytes = Vec::new();
    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut bytes)
                .write_image(canvas.as_raw(), canvas.width(), canvas.height(), ExtendedColorType::Rgba8)
                .map_err(|e| MemeError::Encode(format!("PNG encoding failed: {}", e)))?;
        }
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(|e| MemeError::Encode(format!("JPEG encoding failed: {}", e)))?;
        }
        OutputFormat::Gif => {
            return Err(MemeError::Encode(
                "GIF output is only produced by passthrough".to_string(),
            ));
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};

    #[test]
    fn test_encode_png_and_jpeg() {
        let canvas = RgbaImage::from_pixel(8, 6, Rgba([10, 20, 30, 255]));

        let png = encode(&canvas, OutputFormat::Png).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);

        let jpeg = encode(&canvas, OutputFormat::Jpeg).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn test_gif_is_not_encoded() {
        let canvas = RgbaImage::new(2, 2);
        assert!(matches!(encode(&canvas, OutputFormat::Gif), Err(MemeError::Encode(_))));
    }

    #[test]
    fn test_static_format_choice() {
        assert_eq!(OutputFormat::for_static(SourceFormat::Png), OutputFormat::Png);
        assert_eq!(OutputFormat::for_static(SourceFormat::Other), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::Jpeg.extension(), ".jpg");
    }
}

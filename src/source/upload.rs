//! Upload validation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;

use crate::error::MemeError;

use super::{SourceFormat, UploadedImage};

/// Largest accepted upload (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Validate an uploaded file and turn it into an image source.
///
/// The MIME type comes from the client when provided, otherwise it is
/// guessed from the file name.
pub fn accept_upload(filename: &str, mime: Option<&str>, bytes: Vec<u8>) -> Result<UploadedImage, MemeError> {
    let mime = match mime {
        Some(m) if !m.is_empty() => m.to_lowercase(),
        _ => mime_guess::from_path(filename).first_or_octet_stream().to_string(),
    };

    if !mime.starts_with("image/") {
        return Err(MemeError::validation("Please select an image file"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(MemeError::validation("Image size must be less than 10MB"));
    }
    if image::guess_format(&bytes).is_err() {
        return Err(MemeError::Decode(format!("Unsupported or corrupt image '{}'", filename)));
    }

    let format = SourceFormat::from_content(Some(&mime), &bytes);
    Ok(UploadedImage {
        filename: filename.to_string(),
        mime,
        bytes: Arc::new(bytes),
        format,
    })
}

/// Split a base64 `data:` URL into its MIME type and decoded bytes.
pub fn parse_data_url(data_url: &str) -> Result<(String, Vec<u8>), MemeError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| MemeError::validation("Not a data URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| MemeError::validation("Malformed data URL"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| MemeError::validation("Only base64 data URLs are supported"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| MemeError::Decode(format!("Invalid base64 payload: {}", e)))?;
    Ok((mime.to_lowercase(), bytes))
}

/// Encode bytes as a `data:` URL.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10])));
        let img = if format == ImageFormat::Gif {
            DynamicImage::ImageRgba8(rgb.to_rgba8())
        } else {
            rgb
        };
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_rejects_non_image_mime() {
        let err = accept_upload("notes.txt", Some("text/plain"), b"hello".to_vec()).unwrap_err();
        assert_eq!(err.to_string(), "Please select an image file");
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let mut bytes = encoded(ImageFormat::Png);
        bytes.resize(MAX_UPLOAD_BYTES + 1, 0);
        let err = accept_upload("big.png", Some("image/png"), bytes).unwrap_err();
        assert_eq!(err.to_string(), "Image size must be less than 10MB");
    }

    #[test]
    fn test_accepts_exactly_ten_megabytes() {
        let mut bytes = encoded(ImageFormat::Png);
        bytes.resize(MAX_UPLOAD_BYTES, 0);
        assert!(accept_upload("edge.png", Some("image/png"), bytes).is_ok());
    }

    #[test]
    fn test_guesses_mime_from_filename() {
        let upload = accept_upload("photo.jpg", None, encoded(ImageFormat::Jpeg)).unwrap();
        assert_eq!(upload.mime, "image/jpeg");
        assert_eq!(upload.format, SourceFormat::Other);
    }

    #[test]
    fn test_detects_png_and_gif() {
        let png = accept_upload("a.png", Some("image/png"), encoded(ImageFormat::Png)).unwrap();
        assert_eq!(png.format, SourceFormat::Png);
        let gif = accept_upload("a.gif", Some("image/gif"), encoded(ImageFormat::Gif)).unwrap();
        assert_eq!(gif.format, SourceFormat::Gif);
    }

    #[test]
    fn test_rejects_garbage_bytes() {
        let err = accept_upload("fake.png", Some("image/png"), vec![1, 2, 3, 4]).unwrap_err();
        assert!(matches!(err, MemeError::Decode(_)));
    }

    #[test]
    fn test_data_url_roundtrip() {
        let bytes = encoded(ImageFormat::Png);
        let url = to_data_url("image/png", &bytes);
        assert!(url.starts_with("data:image/png;base64,"));
        let (mime, decoded) = parse_data_url(&url).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_data_url_errors() {
        assert!(parse_data_url("http://x").is_err());
        assert!(parse_data_url("data:image/png;base64").is_err());
        assert!(parse_data_url("data:image/png,plain").is_err());
        assert!(parse_data_url("data:image/png;base64,!!!").is_err());
    }
}

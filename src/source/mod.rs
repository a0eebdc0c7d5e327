//! # Image Sources
//!
//! A meme starts from exactly one base image: a catalog template, an uploaded
//! file, or a remote URL. [`ActiveImageSource`] is that choice; the
//! compositor consumes it directly.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`upload`] | Upload validation (type, size) and `data:` URL decoding |
//! | [`remote`] | Remote URL loading with ordered fallback strategies |

pub mod remote;
pub mod upload;

use serde::Serialize;
use std::sync::Arc;

use crate::catalog::TemplateDescriptor;
use crate::overlay::DEFAULT_LINE_COUNT;

pub use remote::{LoadStrategy, RemoteResolver};
pub use upload::{MAX_UPLOAD_BYTES, accept_upload, parse_data_url};

/// The format a source indicates, which decides the output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Png,
    Gif,
    /// Anything else (JPEG, WebP, BMP, unknown); exported as JPEG.
    Other,
}

impl SourceFormat {
    /// Detect from a URL or file name. Any mention of "gif" flags animation.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.contains("gif") {
            SourceFormat::Gif
        } else if lower.contains(".png") {
            SourceFormat::Png
        } else {
            SourceFormat::Other
        }
    }

    /// Detect from a MIME type and the leading bytes of the file.
    pub fn from_content(mime: Option<&str>, bytes: &[u8]) -> Self {
        let mime = mime.map(|m| m.to_lowercase());
        if bytes.starts_with(b"GIF8") || mime.as_deref() == Some("image/gif") {
            return SourceFormat::Gif;
        }
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Png) => SourceFormat::Png,
            Ok(image::ImageFormat::Gif) => SourceFormat::Gif,
            Ok(_) => SourceFormat::Other,
            Err(_) if mime.as_deref() == Some("image/png") => SourceFormat::Png,
            Err(_) => SourceFormat::Other,
        }
    }

    /// Detect a remote image. A "gif" anywhere in the URL flags animation
    /// whatever the body holds; otherwise the body decides, then the URL.
    pub fn for_remote(url: &str, bytes: Option<&[u8]>) -> Self {
        let by_url = Self::from_url(url);
        let by_content = bytes.map_or(SourceFormat::Other, |b| Self::from_content(None, b));
        match (by_url, by_content) {
            (SourceFormat::Gif, _) | (_, SourceFormat::Gif) => SourceFormat::Gif,
            (by_url, SourceFormat::Other) => by_url,
            (_, by_content) => by_content,
        }
    }
}

/// A user-uploaded image held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub filename: String,
    pub mime: String,
    pub bytes: Arc<Vec<u8>>,
    pub format: SourceFormat,
}

/// An image referenced by URL.
///
/// `bytes` is set when a fetch strategy downloaded the image; a URL accepted
/// only by pattern matching is fetched again at composition time.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteImage {
    pub url: String,
    pub bytes: Option<Arc<Vec<u8>>>,
    pub format: SourceFormat,
    /// Name of the strategy that accepted the URL.
    pub strategy: &'static str,
}

/// The single base image currently in use.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveImageSource {
    Template(TemplateDescriptor),
    Upload(UploadedImage),
    Remote(RemoteImage),
}

impl ActiveImageSource {
    /// Number of text lines this source supports.
    pub fn line_count(&self) -> usize {
        match self {
            ActiveImageSource::Template(t) => t.lines,
            _ => DEFAULT_LINE_COUNT,
        }
    }

    pub fn format(&self) -> SourceFormat {
        match self {
            ActiveImageSource::Template(_) => SourceFormat::Png,
            ActiveImageSource::Upload(u) => u.format,
            ActiveImageSource::Remote(r) => r.format,
        }
    }

    /// Animated sources are passed through instead of re-rendered.
    pub fn is_animated(&self) -> bool {
        self.format() == SourceFormat::Gif
    }

    /// Tag used in download file names.
    pub fn tag(&self) -> &str {
        match self {
            ActiveImageSource::Template(t) => &t.id,
            ActiveImageSource::Upload(_) => "custom",
            ActiveImageSource::Remote(_) => "url",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ActiveImageSource::Template(_) => "template",
            ActiveImageSource::Upload(_) => "upload",
            ActiveImageSource::Remote(_) => "url",
        }
    }

    /// A client-facing summary without the image bytes.
    pub fn summary(&self) -> SourceSummary {
        let (id, name) = match self {
            ActiveImageSource::Template(t) => (Some(t.id.clone()), t.name.clone()),
            ActiveImageSource::Upload(u) => (None, u.filename.clone()),
            ActiveImageSource::Remote(r) => (None, r.url.clone()),
        };
        SourceSummary {
            kind: self.kind(),
            id,
            name,
            format: self.format(),
            animated: self.is_animated(),
            lines: self.line_count(),
        }
    }
}

/// Serializable view of the active source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub kind: &'static str,
    pub id: Option<String>,
    pub name: String,
    pub format: SourceFormat,
    pub animated: bool,
    pub lines: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_format_from_url() {
        assert_eq!(SourceFormat::from_url("https://i.imgur.com/a.GIF"), SourceFormat::Gif);
        assert_eq!(SourceFormat::from_url("https://media.giphy.com/media/x/giphy.gif"), SourceFormat::Gif);
        assert_eq!(SourceFormat::from_url("https://x.com/cat.png?w=10"), SourceFormat::Png);
        assert_eq!(SourceFormat::from_url("https://x.com/cat.jpg"), SourceFormat::Other);
    }

    #[test]
    fn test_format_from_content() {
        assert_eq!(SourceFormat::from_content(None, b"GIF89a...."), SourceFormat::Gif);
        assert_eq!(SourceFormat::from_content(Some("image/gif"), b"junk"), SourceFormat::Gif);
        assert_eq!(SourceFormat::from_content(None, PNG_MAGIC), SourceFormat::Png);
        assert_eq!(SourceFormat::from_content(Some("image/png"), b"junk"), SourceFormat::Png);
        assert_eq!(SourceFormat::from_content(Some("image/jpeg"), &[0xFF, 0xD8, 0xFF, 0xE0]), SourceFormat::Other);
    }

    #[test]
    fn test_remote_format() {
        let giphy = "https://media.giphy.com/media/abc/giphy.gif";
        assert_eq!(SourceFormat::for_remote(giphy, Some(PNG_MAGIC)), SourceFormat::Gif);
        assert_eq!(SourceFormat::for_remote(giphy, None), SourceFormat::Gif);
        assert_eq!(SourceFormat::for_remote("https://x.com/a.jpg", Some(b"GIF89a")), SourceFormat::Gif);
        assert_eq!(SourceFormat::for_remote("https://x.com/a.jpg", Some(PNG_MAGIC)), SourceFormat::Png);
        assert_eq!(SourceFormat::for_remote("https://x.com/a.png", Some(&[0xFF, 0xD8, 0xFF])), SourceFormat::Png);
        assert_eq!(SourceFormat::for_remote("https://x.com/a.jpg", None), SourceFormat::Other);
    }

    #[test]
    fn test_line_counts_and_tags() {
        let template = ActiveImageSource::Template(TemplateDescriptor::new("drake", "Drake", "http://t/drake.png", 3));
        assert_eq!(template.line_count(), 3);
        assert_eq!(template.tag(), "drake");
        assert!(!template.is_animated());

        let remote = ActiveImageSource::Remote(RemoteImage {
            url: "https://media.tenor.com/x.gif".to_string(),
            bytes: None,
            format: SourceFormat::from_url("https://media.tenor.com/x.gif"),
            strategy: "pattern",
        });
        assert_eq!(remote.line_count(), DEFAULT_LINE_COUNT);
        assert_eq!(remote.tag(), "url");
        assert!(remote.is_animated());
    }
}

//! # Export and Sharing
//!
//! Download naming, native-share/clipboard payloads, and social intent links
//! for a finished composition.

use serde::Serialize;

use crate::compose::{CompositionResult, OutputFormat};
use crate::source::{ActiveImageSource, SourceFormat, upload::to_data_url};

pub const SHARE_TITLE: &str = "Tank Bank Meme";
pub const SHARE_TEXT: &str = "Check out this Tank Bank meme!";
pub const SOCIAL_TEXT: &str = "Check out this Tank Bank meme! 🚀💰 #TankBank #Meme";
pub const CLIPBOARD_NOTICE: &str = "Meme URL copied to clipboard!";
/// Window features for the social share popup.
pub const SOCIAL_WINDOW: &str = "width=550,height=420";

const X_INTENT_URL: &str = "https://twitter.com/intent/tweet";

/// A file ready to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: std::sync::Arc<Vec<u8>>,
}

/// Extension for the downloaded file.
///
/// The source wins when it says GIF or PNG; otherwise the result encoding
/// decides.
pub fn file_extension(source: Option<&ActiveImageSource>, result: &CompositionResult) -> &'static str {
    match source.map(|s| s.format()) {
        Some(SourceFormat::Gif) => ".gif",
        Some(SourceFormat::Png) => ".png",
        _ => match result.format {
            OutputFormat::Png => ".png",
            OutputFormat::Gif => ".gif",
            OutputFormat::Jpeg => ".jpg",
        },
    }
}

/// Build the download for a result.
pub fn download(source: Option<&ActiveImageSource>, result: &CompositionResult) -> Download {
    let tag = source.map(|s| s.tag()).unwrap_or("meme");
    Download {
        filename: format!("tank_bank_meme_{}{}", tag, file_extension(source, result)),
        content_type: result.format.mime(),
        bytes: result.bytes.clone(),
    }
}

/// Reference to a result that can be shared or copied: a `data:` URL.
pub fn result_reference(result: &CompositionResult) -> String {
    to_data_url(result.format.mime(), &result.bytes)
}

/// What the client should do to share a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ShareAction {
    /// Invoke the platform share sheet with this payload.
    Native { title: String, text: String, url: String },
    /// Copy the reference and tell the user.
    Clipboard { text: String, notice: String },
}

/// Choose between native share and the clipboard fallback.
pub fn share(result: &CompositionResult, native_available: bool) -> ShareAction {
    let url = result_reference(result);
    if native_available {
        ShareAction::Native {
            title: SHARE_TITLE.to_string(),
            text: SHARE_TEXT.to_string(),
            url,
        }
    } else {
        ShareAction::Clipboard {
            text: url,
            notice: CLIPBOARD_NOTICE.to_string(),
        }
    }
}

/// A pre-filled social post to open in a popup window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialIntent {
    pub url: String,
    pub target: &'static str,
    pub features: &'static str,
}

/// Pre-filled post on X embedding the promotional text and `reference`.
pub fn social_intent(reference: &str) -> SocialIntent {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("text", SOCIAL_TEXT)
        .append_pair("url", reference)
        .finish();
    SocialIntent {
        url: format!("{}?{}", X_INTENT_URL, query),
        target: "_blank",
        features: SOCIAL_WINDOW,
    }
}

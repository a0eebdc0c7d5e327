//! Remote image loading.
//!
//! A pasted URL is tried against an ordered list of [`LoadStrategy`]s. Each
//! attempt gets its own timeout; the first one that succeeds wins.
//!
//! 1. `strict`: download, require an `image/*` content type and a readable image header
//! 2. `lenient`: download, ignore the content type, sniff the bytes
//! 3. `pattern`: accept without downloading if the URL looks like an image link

use async_trait::async_trait;
use image::ImageReader;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::MemeError;

use super::{RemoteImage, SourceFormat};

/// Per-attempt timeout used when none is configured.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Message shown when every strategy failed.
pub const REMOTE_FAILURE_HINT: &str = "Failed to load image from URL. The image may not be publicly accessible or may have CORS restrictions. Try:\n\n\
• Direct image links (ending in .jpg, .png, etc.)\n\
• Images from imgur.com, i.redd.it, or other image hosts\n\
• Make sure the URL is correct and publicly accessible";

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp", ".svg"];
const PERMISSIVE_HOSTS: &[&str] = &["imgur", "giphy", "tenor"];

/// One way of turning a URL into an image.
#[async_trait]
pub trait LoadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(Some(bytes))` when downloaded, `Ok(None)` when accepted without
    /// downloading, `Err` when this strategy cannot load the URL.
    async fn attempt(&self, url: &Url) -> Result<Option<Vec<u8>>, MemeError>;
}

/// Validate user input as an absolute http(s) URL.
pub fn validate_url(input: &str) -> Result<Url, MemeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MemeError::validation("Please enter a valid image URL"));
    }
    let url = Url::parse(input).map_err(|_| MemeError::validation("Please enter a valid URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(MemeError::validation("Please enter a valid URL"));
    }
    Ok(url)
}

/// Download a URL and return its body. Shared by the fetch strategies and the
/// compositor (for URLs accepted by pattern only).
pub async fn fetch_bytes(http: &reqwest::Client, url: &Url, require_image_type: bool) -> Result<Vec<u8>, MemeError> {
    let response = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| MemeError::Load(format!("Failed to download {}: {}", url, e)))?;
    if !response.status().is_success() {
        return Err(MemeError::Load(format!(
            "Failed to download {}: HTTP {}",
            url,
            response.status()
        )));
    }
    if require_image_type {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.to_lowercase().starts_with("image/") {
            return Err(MemeError::Load(format!(
                "{} is not an image (content type '{}')",
                url, content_type
            )));
        }
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| MemeError::Load(format!("Failed to read image data: {}", e)))?;
    Ok(bytes.to_vec())
}

/// Check that the bytes carry a readable image header.
fn probe_image(bytes: &[u8]) -> Result<(u32, u32), MemeError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MemeError::Decode(format!("Failed to read image: {}", e)))?
        .into_dimensions()
        .map_err(|e| MemeError::Decode(format!("Failed to decode image: {}", e)))
}

/// Download with a strict content-type check.
pub struct StrictFetch {
    http: reqwest::Client,
}

#[async_trait]
impl LoadStrategy for StrictFetch {
    fn name(&self) -> &'static str {
        "strict"
    }

    async fn attempt(&self, url: &Url) -> Result<Option<Vec<u8>>, MemeError> {
        let bytes = fetch_bytes(&self.http, url, true).await?;
        probe_image(&bytes)?;
        Ok(Some(bytes))
    }
}

/// Download and sniff, for hosts that send wrong content types.
pub struct LenientFetch {
    http: reqwest::Client,
}

#[async_trait]
impl LoadStrategy for LenientFetch {
    fn name(&self) -> &'static str {
        "lenient"
    }

    async fn attempt(&self, url: &Url) -> Result<Option<Vec<u8>>, MemeError> {
        let bytes = fetch_bytes(&self.http, url, false).await?;
        image::guess_format(&bytes)
            .map_err(|_| MemeError::Decode(format!("{} did not return an image", url)))?;
        Ok(Some(bytes))
    }
}

/// Accept image-looking links without downloading them.
pub struct PatternMatch;

impl PatternMatch {
    pub fn matches(url: &Url) -> bool {
        let path = url.path().to_lowercase();
        let full = url.as_str().to_lowercase();
        IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
            || PERMISSIVE_HOSTS.iter().any(|host| full.contains(host))
    }
}

#[async_trait]
impl LoadStrategy for PatternMatch {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn attempt(&self, url: &Url) -> Result<Option<Vec<u8>>, MemeError> {
        if Self::matches(url) {
            Ok(None)
        } else {
            Err(MemeError::Load(format!("{} does not look like an image link", url)))
        }
    }
}

/// Runs strategies in order until one accepts the URL.
pub struct RemoteResolver {
    strategies: Vec<Box<dyn LoadStrategy>>,
    attempt_timeout: Duration,
}

impl RemoteResolver {
    pub fn new(strategies: Vec<Box<dyn LoadStrategy>>, attempt_timeout: Duration) -> Self {
        Self {
            strategies,
            attempt_timeout,
        }
    }

    /// The standard strict → lenient → pattern chain.
    pub fn standard(http: reqwest::Client, attempt_timeout: Duration) -> Self {
        Self::new(
            vec![
                Box::new(StrictFetch { http: http.clone() }),
                Box::new(LenientFetch { http }),
                Box::new(PatternMatch),
            ],
            attempt_timeout,
        )
    }

    pub async fn resolve(&self, input: &str) -> Result<RemoteImage, MemeError> {
        let url = validate_url(input)?;

        for strategy in &self.strategies {
            match tokio::time::timeout(self.attempt_timeout, strategy.attempt(&url)).await {
                Ok(Ok(bytes)) => {
                    info!(target: "source", "Loaded {} via {} strategy", url, strategy.name());
                    let format = SourceFormat::for_remote(url.as_str(), bytes.as_deref());
                    return Ok(RemoteImage {
                        url: url.to_string(),
                        bytes: bytes.map(Arc::new),
                        format,
                        strategy: strategy.name(),
                    });
                }
                Ok(Err(e)) => {
                    debug!(target: "source", "{} strategy failed for {}: {}", strategy.name(), url, e);
                }
                Err(_) => {
                    debug!(
                        target: "source",
                        "{} strategy timed out after {:?} for {}",
                        strategy.name(),
                        self.attempt_timeout,
                        url
                    );
                }
            }
        }

        warn!(target: "source", "Unable to load image from {}", url);
        Err(MemeError::Load(REMOTE_FAILURE_HINT.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Strategy with a scripted outcome that records when it ran.
    struct Scripted {
        name: &'static str,
        outcome: Option<Option<Vec<u8>>>,
        delay: Duration,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl LoadStrategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self, _url: &Url) -> Result<Option<Vec<u8>>, MemeError> {
            self.calls.lock().unwrap().push(self.name);
            tokio::time::sleep(self.delay).await;
            self.outcome
                .clone()
                .ok_or_else(|| MemeError::Load(format!("{} failed", self.name)))
        }
    }

    fn scripted(
        name: &'static str,
        outcome: Option<Option<Vec<u8>>>,
        calls: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Box<dyn LoadStrategy> {
        Box::new(Scripted {
            name,
            outcome,
            delay: Duration::ZERO,
            calls: calls.clone(),
        })
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(validate_url("   ").unwrap_err().to_string(), "Please enter a valid image URL");
        assert_eq!(validate_url("not a url").unwrap_err().to_string(), "Please enter a valid URL");
        assert!(validate_url("ftp://x.com/a.png").is_err());
        assert!(validate_url(" https://x.com/a.png ").is_ok());
    }

    #[test]
    fn test_pattern_match() {
        let ok = |s: &str| PatternMatch::matches(&Url::parse(s).unwrap());
        assert!(ok("https://example.com/cat.JPG"));
        assert!(ok("https://example.com/cat.webp?size=large"));
        assert!(ok("https://imgur.com/gallery/abc"));
        assert!(ok("https://media.giphy.com/media/abc/"));
        assert!(ok("https://tenor.com/view/abc"));
        assert!(!ok("https://example.com/page.html"));
        assert!(!ok("https://example.com/png"));
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = RemoteResolver::new(
            vec![
                scripted("a", None, &calls),
                scripted("b", Some(Some(b"GIF89a".to_vec())), &calls),
                scripted("c", Some(None), &calls),
            ],
            Duration::from_secs(1),
        );

        let image = resolver.resolve("https://example.com/funny").await.unwrap();
        assert_eq!(image.strategy, "b");
        assert_eq!(image.format, SourceFormat::Gif);
        assert_eq!(image.bytes.as_deref().map(|b| b.as_slice()), Some(&b"GIF89a"[..]));
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_timeout_moves_to_next_strategy() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let slow = Box::new(Scripted {
            name: "slow",
            outcome: Some(Some(vec![0])),
            delay: Duration::from_secs(30),
            calls: calls.clone(),
        });
        let resolver = RemoteResolver::new(
            vec![slow, scripted("pattern", Some(None), &calls)],
            Duration::from_millis(20),
        );

        let image = resolver.resolve("https://example.com/cat.png").await.unwrap();
        assert_eq!(image.strategy, "pattern");
        assert!(image.bytes.is_none());
        assert_eq!(image.format, SourceFormat::Png);
    }

    #[tokio::test]
    async fn test_gif_url_wins_over_png_body() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let resolver = RemoteResolver::new(vec![scripted("lenient", Some(Some(png)), &calls)], Duration::from_secs(1));

        let image = resolver
            .resolve("https://media.giphy.com/media/abc/giphy.gif")
            .await
            .unwrap();
        assert_eq!(image.format, SourceFormat::Gif);
    }

    #[tokio::test]
    async fn test_all_strategies_fail() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = RemoteResolver::new(
            vec![scripted("a", None, &calls), scripted("b", None, &calls)],
            Duration::from_secs(1),
        );
        let err = resolver.resolve("https://example.com/page").await.unwrap_err();
        assert!(matches!(err, MemeError::Load(ref msg) if msg.contains("CORS")));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_url_tries_nothing() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = RemoteResolver::new(vec![scripted("a", Some(None), &calls)], Duration::from_secs(1));
        assert!(matches!(resolver.resolve("nope").await, Err(MemeError::Validation(_))));
        assert!(calls.lock().unwrap().is_empty());
    }
}

//! # Meme Compositor
//!
//! Turns an image source, the overlay lines and the global style into a
//! finished, encoded image.
//!
//! | Source | What happens |
//! |--------|--------------|
//! | GIF (upload or URL) | original bytes returned untouched |
//! | static upload / URL | base drawn at natural size, lines, watermark, PNG or JPEG |
//! | template | rendered by the template service, then watermarked, PNG |
//!
//! Rendering is CPU-bound and runs on the blocking thread pool.

pub mod encode;
pub mod fonts;
pub mod text;
pub mod watermark;

use image::{DynamicImage, RgbaImage};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::catalog::{TemplateRenderRequest, TemplateService};
use crate::error::MemeError;
use crate::overlay::{OverlayModel, StyleSettings, TextLine};
use crate::source::{ActiveImageSource, remote};

pub use encode::OutputFormat;
pub use fonts::FontBook;
pub use watermark::WatermarkAsset;

/// Notice shown after an animated source is "generated".
pub const GIF_NOTICE: &str = "For animated GIFs, the text overlays you see in the preview show the positioning, \
but the downloaded file will be the original animated GIF. This preserves the animation quality.";

/// A finished composition, held in memory until the next one replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionResult {
    pub format: OutputFormat,
    pub bytes: Arc<Vec<u8>>,
    /// True when the source was animated and returned unchanged.
    pub animated_passthrough: bool,
}

/// Snapshot of everything a composition reads.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub source: ActiveImageSource,
    pub lines: Vec<TextLine>,
    pub style: StyleSettings,
}

impl ComposeRequest {
    /// Check the generate preconditions and take a snapshot.
    pub fn prepare(
        source: Option<&ActiveImageSource>,
        overlay: &OverlayModel,
        style: &StyleSettings,
    ) -> Result<Self, MemeError> {
        let source = source.ok_or_else(|| MemeError::validation("Please select an image first"))?;
        if !overlay.has_text() {
            return Err(MemeError::validation("Please add some text to your meme"));
        }
        Ok(Self {
            source: source.clone(),
            lines: overlay.lines().to_vec(),
            style: *style,
        })
    }
}

/// Draw lines and watermark onto a decoded base image.
pub fn render_static(
    base: &DynamicImage,
    lines: &[TextLine],
    style: &StyleSettings,
    fonts: &FontBook,
    mark: Option<&RgbaImage>,
) -> RgbaImage {
    let mut canvas = base.to_rgba8();
    let font = fonts.font_for(style.font);
    for line in lines {
        text::draw_line(&mut canvas, line, style, font);
    }
    if let Some(mark) = mark {
        watermark::apply(&mut canvas, mark);
    }
    canvas
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, MemeError> {
    image::load_from_memory(bytes).map_err(|e| MemeError::Decode(format!("Failed to decode image: {}", e)))
}

/// Renders compositions. Cheap to share behind an `Arc`.
pub struct Compositor {
    templates: Arc<dyn TemplateService>,
    http: reqwest::Client,
    fonts: Arc<FontBook>,
    watermark: WatermarkAsset,
}

impl Compositor {
    pub fn new(
        templates: Arc<dyn TemplateService>,
        http: reqwest::Client,
        fonts: FontBook,
        watermark: WatermarkAsset,
    ) -> Self {
        Self {
            templates,
            http,
            fonts: Arc::new(fonts),
            watermark,
        }
    }

    pub async fn compose(&self, request: ComposeRequest) -> Result<CompositionResult, MemeError> {
        let ComposeRequest { source, lines, style } = request;

        match source {
            ActiveImageSource::Template(template) => {
                let render = TemplateRenderRequest {
                    template_id: template.id.clone(),
                    lines: lines
                        .iter()
                        .filter(|l| !l.is_blank())
                        .map(|l| l.text.trim().to_string())
                        .collect(),
                    slot_count: template.lines,
                    font: style.font,
                    size: style.size,
                };
                let rendered = self.templates.render(&render).await?;
                info!(target: "compose", "Template '{}' rendered by service ({} bytes)", template.id, rendered.len());

                let mark = self.watermark.clone();
                self.blocking(move || {
                    let mut canvas = decode(&rendered)?.to_rgba8();
                    if let Some(mark) = mark.load() {
                        watermark::apply(&mut canvas, &mark);
                    }
                    encode::encode(&canvas, OutputFormat::Png).map(|bytes| CompositionResult {
                        format: OutputFormat::Png,
                        bytes: Arc::new(bytes),
                        animated_passthrough: false,
                    })
                })
                .await
            }
            ActiveImageSource::Upload(_) | ActiveImageSource::Remote(_) => {
                let format = source.format();
                let bytes = self.source_bytes(&source).await?;

                if source.is_animated() {
                    info!(target: "compose", "Animated source, returning original ({} bytes)", bytes.len());
                    return Ok(CompositionResult {
                        format: OutputFormat::Gif,
                        bytes,
                        animated_passthrough: true,
                    });
                }

                let output = OutputFormat::for_static(format);
                let fonts = self.fonts.clone();
                let mark = self.watermark.clone();
                self.blocking(move || {
                    let base = decode(&bytes)?;
                    debug!(target: "compose", "Rendering {}x{} canvas", base.width(), base.height());
                    let mark = mark.load();
                    let canvas = render_static(&base, &lines, &style, &fonts, mark.as_deref());
                    encode::encode(&canvas, output).map(|bytes| CompositionResult {
                        format: output,
                        bytes: Arc::new(bytes),
                        animated_passthrough: false,
                    })
                })
                .await
            }
        }
    }

    /// Bytes of an upload or remote source, downloading URLs that were
    /// accepted without a fetch.
    async fn source_bytes(&self, source: &ActiveImageSource) -> Result<Arc<Vec<u8>>, MemeError> {
        match source {
            ActiveImageSource::Upload(upload) => Ok(upload.bytes.clone()),
            ActiveImageSource::Remote(remote) => match &remote.bytes {
                Some(bytes) => Ok(bytes.clone()),
                None => {
                    let url = Url::parse(&remote.url)
                        .map_err(|e| MemeError::Load(format!("Invalid URL {}: {}", remote.url, e)))?;
                    Ok(Arc::new(remote::fetch_bytes(&self.http, &url, false).await?))
                }
            },
            ActiveImageSource::Template(t) => Err(MemeError::Load(format!(
                "Template '{}' is rendered by the template service",
                t.id
            ))),
        }
    }

    async fn blocking<F>(&self, work: F) -> Result<CompositionResult, MemeError>
    where
        F: FnOnce() -> Result<CompositionResult, MemeError> + Send + 'static,
    {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| MemeError::Encode(format!("Processing error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateDescriptor;
    use crate::source::{RemoteImage, SourceFormat, UploadedImage};
    use async_trait::async_trait;
    use image::{ImageFormat, Rgba, RgbImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Template service that records render requests and returns a flat image.
    #[derive(Default)]
    struct FakeTemplates {
        requests: Mutex<Vec<TemplateRenderRequest>>,
    }

    #[async_trait]
    impl TemplateService for FakeTemplates {
        async fn list_templates(&self) -> Result<Vec<TemplateDescriptor>, MemeError> {
            Ok(Vec::new())
        }

        async fn render(&self, request: &TemplateRenderRequest) -> Result<Vec<u8>, MemeError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(encoded(ImageFormat::Png, 300, 200))
        }
    }

    fn encoded(format: ImageFormat, w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, image::Rgb([30, 90, 160])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    fn compositor(templates: Arc<FakeTemplates>, watermark: WatermarkAsset) -> Compositor {
        Compositor::new(templates, reqwest::Client::new(), FontBook::embedded(), watermark)
    }

    fn upload(format: ImageFormat, mime: &str) -> ActiveImageSource {
        let bytes = encoded(format, 120, 80);
        ActiveImageSource::Upload(UploadedImage {
            filename: "in".to_string(),
            mime: mime.to_string(),
            format: SourceFormat::from_content(Some(mime), &bytes),
            bytes: Arc::new(bytes),
        })
    }

    fn overlay_with(text: &str) -> OverlayModel {
        let mut overlay = OverlayModel::default();
        overlay.update_text(0, text).unwrap();
        overlay
    }

    fn request(source: ActiveImageSource, text: &str) -> ComposeRequest {
        ComposeRequest::prepare(Some(&source), &overlay_with(text), &StyleSettings::default()).unwrap()
    }

    #[test]
    fn test_prepare_requires_source_and_text() {
        let style = StyleSettings::default();
        let source = upload(ImageFormat::Png, "image/png");

        let no_source = ComposeRequest::prepare(None, &overlay_with("hi"), &style).unwrap_err();
        assert_eq!(no_source.to_string(), "Please select an image first");

        let no_text = ComposeRequest::prepare(Some(&source), &OverlayModel::default(), &style).unwrap_err();
        assert_eq!(no_text.to_string(), "Please add some text to your meme");

        let neither = ComposeRequest::prepare(None, &OverlayModel::default(), &style).unwrap_err();
        assert!(matches!(neither, MemeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_png_source_yields_png() {
        let c = compositor(Arc::default(), WatermarkAsset::Disabled);
        let result = c.compose(request(upload(ImageFormat::Png, "image/png"), "GG")).await.unwrap();
        assert_eq!(result.format, OutputFormat::Png);
        assert_eq!(image::guess_format(&result.bytes).unwrap(), ImageFormat::Png);
        assert!(!result.animated_passthrough);
    }

    #[tokio::test]
    async fn test_jpeg_source_yields_jpeg() {
        let c = compositor(Arc::default(), WatermarkAsset::Disabled);
        let result = c.compose(request(upload(ImageFormat::Jpeg, "image/jpeg"), "GG")).await.unwrap();
        assert_eq!(result.format, OutputFormat::Jpeg);
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
    }

    #[tokio::test]
    async fn test_gif_source_passes_through() {
        let gif_bytes = {
            let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([1, 2, 3, 255])));
            let mut bytes = Vec::new();
            img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Gif).unwrap();
            Arc::new(bytes)
        };
        let source = ActiveImageSource::Remote(RemoteImage {
            url: "https://media.giphy.com/tank.gif".to_string(),
            bytes: Some(gif_bytes.clone()),
            format: SourceFormat::Gif,
            strategy: "strict",
        });
        let c = compositor(Arc::default(), WatermarkAsset::Disabled);
        let result = c.compose(request(source, "ignored")).await.unwrap();
        assert!(result.animated_passthrough);
        assert_eq!(result.format, OutputFormat::Gif);
        assert!(Arc::ptr_eq(&result.bytes, &gif_bytes));
    }

    #[tokio::test]
    async fn test_template_uses_service_and_watermark() {
        let templates = Arc::new(FakeTemplates::default());
        let mark = Arc::new(RgbaImage::from_pixel(20, 10, Rgba([255, 255, 255, 255])));
        let c = compositor(templates.clone(), WatermarkAsset::Image(mark));

        let template = TemplateDescriptor::new("drake", "Drake", "http://t/drake.png", 2);
        let mut overlay = OverlayModel::with_lines(2);
        overlay.update_text(0, "  ").unwrap();
        overlay.update_text(1, " bottom ").unwrap();
        let style = StyleSettings::default();
        let req = ComposeRequest::prepare(Some(&ActiveImageSource::Template(template)), &overlay, &style).unwrap();

        let result = c.compose(req).await.unwrap();
        assert_eq!(result.format, OutputFormat::Png);

        let sent = templates.requests.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].lines, vec!["bottom".to_string()]);

        // 300px wide → 45x23 mark at bottom-right, inset 10
        let out = image::load_from_memory(&result.bytes).unwrap().to_rgba8();
        let inside = out.get_pixel(300 - 10 - 20, 200 - 10 - 10);
        assert!(inside[0] > 150, "watermark missing: {:?}", inside);
        assert_eq!(*out.get_pixel(5, 5), Rgba([30, 90, 160, 255]));
    }

    #[test]
    fn test_render_static_places_watermark_and_text() {
        let base = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 300, image::Rgb([0, 0, 255])));
        let mut overlay = OverlayModel::default();
        overlay.update_text(0, "GG").unwrap();
        let mark = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 0, 255]));

        let canvas = render_static(&base, overlay.lines(), &StyleSettings::default(), &FontBook::embedded(), Some(&mark));

        // Text near the top-center (y=10% of 300)
        let blue = Rgba([0, 0, 255, 255]);
        let top_changed = (150..250).any(|x| (20..45).any(|y| *canvas.get_pixel(x, y) != blue));
        assert!(top_changed, "no text near top-center");
        // Watermark: 60x60 at (330, 230)
        let wm = canvas.get_pixel(360, 260);
        assert!(wm[0] > 150 && wm[1] > 150, "watermark missing: {:?}", wm);
        // Untouched middle
        assert_eq!(*canvas.get_pixel(200, 150), blue);
    }
}

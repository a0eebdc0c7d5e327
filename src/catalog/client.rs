//! HTTP client for the memegen-compatible template service.
//!
//! The service lists templates at `GET /templates` and renders text onto a
//! template at `GET /images/{id}/{line1}/{line2}.png?font=..&size=..`.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::MemeError;
use crate::overlay::{FontFamily, style::DEFAULT_TEXT_SIZE};

use super::TemplateDescriptor;

/// Everything the template service needs to render a template with text.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRenderRequest {
    pub template_id: String,
    /// Trimmed, non-empty lines in slot order.
    pub lines: Vec<String>,
    /// Slot count, used for placeholders when `lines` is empty.
    pub slot_count: usize,
    pub font: FontFamily,
    pub size: u32,
}

/// `base` with `segments` appended to its path, keeping any path prefix
/// whether or not it ends in a slash.
fn endpoint<I>(base: &Url, segments: I) -> Result<Url, MemeError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| MemeError::Load(format!("Template service URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl TemplateRenderRequest {
    /// Build the render URL relative to the service base URL.
    ///
    /// Font and size are only sent when they differ from the service defaults.
    pub fn url(&self, base: &Url) -> Result<Url, MemeError> {
        let mut segments: Vec<String> = if self.lines.is_empty() {
            vec!["_".to_string(); self.slot_count.max(1)]
        } else {
            self.lines.clone()
        };
        if let Some(last) = segments.last_mut() {
            last.push_str(".png");
        }

        let path = ["images", self.template_id.as_str()]
            .into_iter()
            .chain(segments.iter().map(String::as_str));
        let mut url = endpoint(base, path)?;

        let mut params = Vec::new();
        if self.font != FontFamily::Impact {
            params.push(("font", self.font.name().to_string()));
        }
        if self.size != DEFAULT_TEXT_SIZE {
            params.push(("size", self.size.to_string()));
        }
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        Ok(url)
    }
}

/// The external template-serving collaborator.
#[async_trait]
pub trait TemplateService: Send + Sync {
    /// Fetch every available template.
    async fn list_templates(&self) -> Result<Vec<TemplateDescriptor>, MemeError>;

    /// Render a template with text baked in; returns encoded image bytes.
    async fn render(&self, request: &TemplateRenderRequest) -> Result<Vec<u8>, MemeError>;
}

/// `reqwest`-backed [`TemplateService`].
pub struct MemegenClient {
    http: reqwest::Client,
    base_url: Url,
}

impl MemegenClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MemeError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MemeError::Load(format!("Invalid template service URL '{}': {}", base_url, e)))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("tankmeme/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>, MemeError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MemeError::Load(format!("Failed to fetch {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(MemeError::Load(format!(
                "Failed to fetch {}: HTTP {}",
                url,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MemeError::Load(format!("Failed to read response from {}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TemplateService for MemegenClient {
    async fn list_templates(&self) -> Result<Vec<TemplateDescriptor>, MemeError> {
        let url = endpoint(&self.base_url, ["templates"])?;
        let body = self.get_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|e| MemeError::Load(format!("Malformed template list: {}", e)))
    }

    async fn render(&self, request: &TemplateRenderRequest) -> Result<Vec<u8>, MemeError> {
        let url = request.url(&self.base_url)?;
        debug!(target: "catalog", "Rendering template via {}", url);
        self.get_bytes(url).await
    }
}

//! Server state and configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::catalog::{MemegenClient, TemplateService};
use crate::compose::{Compositor, FontBook, WatermarkAsset};
use crate::error::MemeError;
use crate::profiles::{MemoryProfileStore, PostgrestStore, ProfileStore};
use crate::session::MemeSession;
use crate::source::RemoteResolver;

/// How long idle meme sessions are kept (1 hour).
pub const SESSION_EXPIRATION_SECS: u64 = 3600;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TEMPLATE_SERVICE: &str = "http://localhost:5000";
pub const DEFAULT_WATERMARK_PATH: &str = "assets/watermark.png";

/// Hosted profile table credentials.
#[derive(Debug, Clone)]
pub struct ProfileStoreConfig {
    pub url: String,
    pub api_key: String,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Base URL of the memegen-compatible template service
    pub template_service_url: String,
    /// Watermark image; `None` disables stamping
    pub watermark_path: Option<PathBuf>,
    /// Directory of `{family}.ttf` overrides for the bundled fonts
    pub font_dir: Option<PathBuf>,
    /// Per-request timeout for template and remote image fetches
    pub fetch_timeout: Duration,
    /// In-memory profiles when unset
    pub profile_store: Option<ProfileStoreConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            template_service_url: DEFAULT_TEMPLATE_SERVICE.to_string(),
            watermark_path: Some(PathBuf::from(DEFAULT_WATERMARK_PATH)),
            font_dir: None,
            fetch_timeout: crate::source::remote::DEFAULT_ATTEMPT_TIMEOUT,
            profile_store: None,
        }
    }
}

impl ServerConfig {
    pub fn font_book(&self) -> FontBook {
        match &self.font_dir {
            Some(dir) => FontBook::with_dir(dir),
            None => FontBook::embedded(),
        }
    }

    pub fn watermark(&self) -> WatermarkAsset {
        match &self.watermark_path {
            Some(path) => WatermarkAsset::Path(path.clone()),
            None => WatermarkAsset::Disabled,
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    /// Meme editing sessions keyed by session ID
    pub sessions: RwLock<HashMap<Uuid, MemeSession>>,
    pub templates: Arc<dyn TemplateService>,
    pub compositor: Compositor,
    pub resolver: RemoteResolver,
    pub profiles: Arc<dyn ProfileStore>,
}

impl AppState {
    /// Wire up the real collaborators from configuration.
    pub fn new(config: ServerConfig) -> Result<Self, MemeError> {
        let templates: Arc<dyn TemplateService> =
            Arc::new(MemegenClient::new(&config.template_service_url, config.fetch_timeout)?);
        let http = reqwest::Client::builder()
            .user_agent(concat!("tankmeme/", env!("CARGO_PKG_VERSION")))
            .timeout(config.fetch_timeout)
            .build()?;
        let resolver = RemoteResolver::standard(http.clone(), config.fetch_timeout);
        let profiles: Arc<dyn ProfileStore> = match &config.profile_store {
            Some(store) => {
                info!(target: "server", "Using hosted profile store at {}", store.url);
                Arc::new(PostgrestStore::new(&store.url, &store.api_key, config.fetch_timeout)?)
            }
            None => {
                info!(target: "server", "No profile store configured, keeping profiles in memory");
                Arc::new(MemoryProfileStore::new())
            }
        };
        Ok(Self::with_services(config, templates, http, resolver, profiles))
    }

    /// Build state around explicit collaborators.
    pub fn with_services(
        config: ServerConfig,
        templates: Arc<dyn TemplateService>,
        http: reqwest::Client,
        resolver: RemoteResolver,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let compositor = Compositor::new(templates.clone(), http, config.font_book(), config.watermark());
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            templates,
            compositor,
            resolver,
            profiles,
        }
    }
}

//! # Tank Bank Meme Composition
//!
//! Builds captioned memes from a template catalog, an uploaded file, or a
//! remote image URL, stamps the Tank Bank watermark, and prepares the result
//! for download or sharing.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tankmeme::{
//!     catalog::{Catalog, MemegenClient, TemplateService},
//!     compose::{Compositor, FontBook, WatermarkAsset},
//!     session::MemeSession,
//! };
//!
//! # async fn example() -> Result<(), tankmeme::MemeError> {
//! let templates: Arc<dyn TemplateService> =
//!     Arc::new(MemegenClient::new("http://localhost:5000", Duration::from_secs(10))?);
//! let compositor = Compositor::new(
//!     templates.clone(),
//!     reqwest::Client::new(),
//!     FontBook::embedded(),
//!     WatermarkAsset::Path("assets/watermark.png".into()),
//! );
//!
//! let mut session = MemeSession::new(Catalog::load(templates.as_ref()).await);
//! session.select_template("drake")?;
//! session.update_text(0, "Writing it by hand")?;
//! session.update_text(1, "Generating it")?;
//! session.generate(&compositor).await?;
//!
//! let file = session.download()?;
//! std::fs::write(&file.filename, file.bytes.as_slice())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`catalog`] | Template catalog paging and the template service client |
//! | [`source`] | Template / upload / remote URL image sources |
//! | [`overlay`] | Text lines, positions, rotation, drag, style |
//! | [`compose`] | Software rasterizer: text, watermark, encoding |
//! | [`export`] | Download naming, share payloads, social links |
//! | [`session`] | One editing session tying it all together |
//! | [`profiles`] | Commander profiles and leaderboard |
//! | [`server`] | HTTP API |
//! | [`error`] | Error types |

pub mod catalog;
pub mod compose;
pub mod error;
pub mod export;
pub mod overlay;
pub mod profiles;
pub mod server;
pub mod session;
pub mod source;

// Re-exports for convenience
pub use error::MemeError;
pub use session::MemeSession;

//! # Tank Bank Meme CLI
//!
//! Command-line interface for the meme composition service.
//!
//! ## Usage
//!
//! ```bash
//! # Run the HTTP API
//! tankmeme serve --listen 0.0.0.0:8080 --templates-url http://localhost:5000
//!
//! # Caption a local image
//! tankmeme compose photo.jpg --line "TOP TEXT" --line "BOTTOM TEXT" --output meme.jpg
//!
//! # Browse the template catalog
//! tankmeme templates --page 2
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use tankmeme::{
    MemeError,
    catalog::{Catalog, Direction, MemegenClient, TemplateService},
    compose::{ComposeRequest, Compositor, GIF_NOTICE},
    export,
    overlay::{Color, FontFamily, OverlayModel, StyleSettings},
    server::{ProfileStoreConfig, ServerConfig},
    source::{ActiveImageSource, accept_upload},
};

/// Tank Bank meme generator
#[derive(Parser, Debug)]
#[command(name = "tankmeme")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// Base URL of the template service
        #[arg(long, default_value = "http://localhost:5000")]
        templates_url: String,

        /// Watermark image stamped on every meme
        #[arg(long, value_name = "FILE", default_value = "assets/watermark.png")]
        watermark: PathBuf,

        /// Do not stamp a watermark
        #[arg(long)]
        no_watermark: bool,

        /// Directory with `{family}.ttf` files replacing the bundled fonts
        #[arg(long, value_name = "DIR")]
        font_dir: Option<PathBuf>,

        /// Timeout for template and remote image fetches, in seconds
        #[arg(long, default_value = "10")]
        fetch_timeout: u64,

        /// Hosted profile store base URL (profiles stay in memory when omitted)
        #[arg(long, requires = "profile_store_key")]
        profile_store_url: Option<String>,

        /// API key for the hosted profile store
        #[arg(long)]
        profile_store_key: Option<String>,
    },

    /// Caption a local image and write the result
    Compose {
        /// Image to caption
        input: PathBuf,

        /// Text line, top to bottom (repeat for more lines)
        #[arg(long = "line", value_name = "TEXT")]
        lines: Vec<String>,

        /// Font family (impact, arial, comic, times, helvetica, kalam)
        #[arg(long, default_value = "impact")]
        font: FontFamily,

        /// Text size in pixels (20-120)
        #[arg(long, default_value = "50")]
        size: u32,

        /// Fill color (#rrggbb, #rgb or a color name)
        #[arg(long, default_value = "white")]
        fill: Color,

        /// Outline color
        #[arg(long, default_value = "black")]
        outline: Color,

        /// Watermark image
        #[arg(long, value_name = "FILE")]
        watermark: Option<PathBuf>,

        /// Directory with `{family}.ttf` font overrides
        #[arg(long, value_name = "DIR")]
        font_dir: Option<PathBuf>,

        /// Output file (defaults to the download name in the current directory)
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List a page of the template catalog
    Templates {
        /// Base URL of the template service
        #[arg(long, default_value = "http://localhost:5000")]
        templates_url: String,

        /// Page to show, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), MemeError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            templates_url,
            watermark,
            no_watermark,
            font_dir,
            fetch_timeout,
            profile_store_url,
            profile_store_key,
        } => {
            let profile_store = match (profile_store_url, profile_store_key) {
                (Some(url), Some(api_key)) => Some(ProfileStoreConfig { url, api_key }),
                _ => None,
            };
            let config = ServerConfig {
                listen_addr: listen,
                template_service_url: templates_url,
                watermark_path: (!no_watermark).then_some(watermark),
                font_dir,
                fetch_timeout: Duration::from_secs(fetch_timeout),
                profile_store,
            };
            tankmeme::server::serve(config).await
        }

        Commands::Compose {
            input,
            lines,
            font,
            size,
            fill,
            outline,
            watermark,
            font_dir,
            output,
        } => {
            let bytes = std::fs::read(&input)?;
            let filename = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let source = ActiveImageSource::Upload(accept_upload(&filename, None, bytes)?);

            let mut overlay = OverlayModel::with_lines(lines.len().max(1));
            for (index, text) in lines.into_iter().enumerate() {
                overlay.update_text(index, text)?;
            }
            let mut style = StyleSettings {
                font,
                fill,
                outline,
                ..StyleSettings::default()
            };
            style.set_size(size);

            let config = ServerConfig {
                font_dir,
                watermark_path: watermark,
                ..ServerConfig::default()
            };
            let templates: Arc<dyn TemplateService> =
                Arc::new(MemegenClient::new(&config.template_service_url, config.fetch_timeout)?);
            let compositor = Compositor::new(
                templates,
                reqwest::Client::new(),
                config.font_book(),
                config.watermark(),
            );

            let request = ComposeRequest::prepare(Some(&source), &overlay, &style)?;
            let result = compositor.compose(request).await?;
            if result.animated_passthrough {
                println!("{}", GIF_NOTICE);
            }

            let download = export::download(Some(&source), &result);
            let path = output.unwrap_or_else(|| PathBuf::from(&download.filename));
            std::fs::write(&path, download.bytes.as_slice())?;
            println!("Saved {} ({} bytes)", path.display(), download.bytes.len());
            Ok(())
        }

        Commands::Templates { templates_url, page } => {
            let client = MemegenClient::new(&templates_url, Duration::from_secs(10))?;
            let mut catalog = Catalog::new(client.list_templates().await?);
            for _ in 1..page {
                if !catalog.navigate(Direction::Next) {
                    break;
                }
            }
            println!(
                "Templates (page {} of {}, {} total):",
                catalog.page() + 1,
                catalog.total_pages(),
                catalog.len()
            );
            for template in catalog.visible() {
                println!("  {:<20} {} ({} lines)", template.id, template.name, template.lines);
            }
            Ok(())
        }
    }
}

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gallery_client::{
    GalleryController, GalleryEvent, GallerySink, HttpPhotoList, HttpUploader, MissingUploader,
    PhotoUploader, StatusTone, UploadFile,
};
use shared::domain::{EventTag, PhotoRef};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

mod config;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(name = "gallery", about = "Browse and upload event gallery photos")]
struct Cli {
    #[arg(long, default_value = "gallery.toml")]
    config: PathBuf,
    #[arg(long)]
    backend_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print photo URLs, newest first, one page at a time.
    Browse {
        #[arg(long, default_value_t = 1)]
        pages: usize,
        #[arg(long)]
        all: bool,
    },
    Upload {
        path: PathBuf,
        #[arg(long)]
        tag: Option<String>,
    },
}

struct TerminalSink {
    base_url: Url,
}

impl TerminalSink {
    fn display(&self, photo: &PhotoRef) -> String {
        photo
            .resolve(&self.base_url)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| photo.to_string())
    }
}

impl GallerySink for TerminalSink {
    fn emit(&self, event: GalleryEvent) {
        match event {
            GalleryEvent::PhotoPrepended(photo) => println!("new: {}", self.display(&photo)),
            GalleryEvent::PhotoAppended(photo) => println!("{}", self.display(&photo)),
            GalleryEvent::Status(status) => match status.tone {
                StatusTone::Error => eprintln!("{}", status.text),
                StatusTone::Info | StatusTone::Success => println!("{}", status.text),
            },
            GalleryEvent::LoadMore(state) => {
                debug!(state = ?state, label = ?state.label(), "load more affordance changed");
            }
        }
    }
}

fn build_controller(
    settings: &Settings,
    uploader: Arc<dyn PhotoUploader>,
) -> Result<Arc<GalleryController>> {
    let base_url = Url::parse(&settings.backend_url)
        .with_context(|| format!("invalid backend url {}", settings.backend_url))?;
    Ok(GalleryController::new(
        Arc::new(HttpPhotoList::new(settings.backend_url.clone())),
        uploader,
        Arc::new(TerminalSink { base_url }),
    ))
}

async fn browse(settings: &Settings, pages: usize, all: bool) -> Result<()> {
    let controller = build_controller(settings, Arc::new(MissingUploader))?;
    controller.activate().await?;

    let mut loaded = 1;
    while (all || loaded < pages.max(1)) && controller.has_more().await {
        controller.fetch_next_page().await?;
        loaded += 1;
    }

    if controller.has_more().await {
        println!("more photos available; rerun with --pages {}", loaded + 1);
    }
    Ok(())
}

async fn upload(settings: &Settings, path: PathBuf, tag: Option<String>) -> Result<()> {
    let uploader = Arc::new(HttpUploader::new(settings.upload_contract()?));
    let controller = build_controller(settings, uploader)?;

    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    let mime_type = mime_guess::from_path(&path)
        .first()
        .map(|mime| mime.essence_str().to_string());
    let tag = EventTag::or_default(tag.as_deref().unwrap_or(&settings.default_tag));

    controller
        .submit_upload(
            UploadFile {
                filename,
                mime_type,
                bytes,
            },
            tag,
        )
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config);
    if let Some(backend_url) = cli.backend_url {
        settings.backend_url = backend_url;
    }

    match cli.command {
        Command::Browse { pages, all } => browse(&settings, pages, all).await,
        Command::Upload { path, tag } => upload(&settings, path, tag).await,
    }
}

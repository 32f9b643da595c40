//! Render the preview pages into a standalone HTML document.
//!
//! Usage: ialum-preview [--out FILE] [--settings FILE] [--persist]

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ialum::backup::{BackupStore, FileStore, KeyValueStore};
use ialum::dom::Dom;
use ialum::pages;
use ialum::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "ialum-preview")]
#[command(about = "Render the Ialum card component pages with mock data")]
struct Args {
    /// Write the HTML here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Settings JSON file
    #[arg(short, long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Keep form and list drafts in the data directory between runs
    #[arg(long)]
    persist: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_env("IALUM_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = match &args.settings {
        Some(path) => Settings::load(path).with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let store = if args.persist {
        let dir = settings.data_dir();
        let file = FileStore::in_dir(&dir).with_context(|| format!("opening backup store in {}", dir.display()))?;
        info!(path = %file.path().display(), "using persistent backup store");
        let shared: Rc<dyn KeyValueStore> = Rc::new(file);
        let store = BackupStore::new(shared, settings.backup_expiration());
        let purged = store.purge_expired();
        if purged > 0 {
            info!(purged, "dropped expired backups");
        }
        Some(store)
    } else {
        None
    };

    let dom = Dom::new();
    let mounted = pages::mount_all(&dom, &settings, store).context("mounting preview pages")?;
    info!(
        topics = mounted.topics.get_items().len(),
        posts = mounted.schedule.get_items().len(),
        "pages mounted"
    );
    let html = pages::render_document(&dom, "Ialum - pré-visualização");

    match &args.out {
        Some(path) => {
            std::fs::write(path, &html).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), bytes = html.len(), "preview written");
        }
        None => print!("{}", html),
    }
    Ok(())
}

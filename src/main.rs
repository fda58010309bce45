//! # Thumb Archiver - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Costruzione del subscriber `tracing` dal livello richiesto, installato solo
//!   per la durata del batch
//! - Creazione della configurazione e avvio della pipeline
//! - Messaggio di terminazione chiaro in caso di errore fatale
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (directory, size, output, log, etc.)
//! 2. Carica l'eventuale file di configurazione e applica gli override della CLI
//! 3. Configura il logging (INFO o DEBUG, `RUST_LOG` ha la precedenza)
//! 4. Esegue la pipeline e riporta il risultato
//!
//! ## Esempio di utilizzo:
//! ```bash
//! thumb-archiver --dir /path/to/photos --size 1000 --out thumbs.tar.gz --log debug
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use thumb_archiver::config::{ProgressMode, Verbosity};
use thumb_archiver::json_output::JsonMessage;
use thumb_archiver::resize::ResizeFilter;
use thumb_archiver::{BatchPipeline, Config};

#[derive(Parser)]
#[command(name = "thumb-archiver")]
#[command(about = "Resize every image under a directory and pack the thumbnails into one archive")]
#[command(
    long_about = "Resize every JPG, JPEG and PNG under a directory and pack the thumbnails into one \
gzip-compressed tar archive (.tar.gz, not .zip). Every entry holds JPEG data and keeps its \
relative path and original file name."
)]
struct Args {
    /// Directory containing the images to thumbnail [default: .]
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Maximum width or height of each thumbnail, in pixels [default: 1000]
    #[arg(short, long)]
    size: Option<u32>,

    /// Output archive, written as gzip-compressed tar (.tar.gz) [default: out.tar.gz]
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Log level to display [default: info]
    #[arg(short, long, value_enum)]
    log: Option<Verbosity>,

    /// JPEG quality (1-100) [default: 75]
    #[arg(short, long)]
    quality: Option<u8>,

    /// Resize filter [default: lanczos]
    #[arg(long, value_enum)]
    filter: Option<ResizeFilter>,

    /// Progress rendering [default: bar]
    #[arg(long, value_enum)]
    progress: Option<ProgressMode>,

    /// Minimum milliseconds between two progress updates
    #[arg(long)]
    progress_interval_ms: Option<u64>,

    /// Show only percentage and counts in progress updates
    #[arg(long)]
    no_eta: bool,

    /// Load settings from a JSON file (must exist); command line flags override it
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = match self.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(dir) = self.dir {
            config.root_dir = dir;
        }
        if let Some(size) = self.size {
            config.max_dimension = size;
        }
        if let Some(out) = self.out {
            config.output_path = out;
        }
        if let Some(log) = self.log {
            config.verbosity = log;
        }
        if let Some(quality) = self.quality {
            config.jpeg_quality = quality;
        }
        if let Some(filter) = self.filter {
            config.resize_filter = filter;
        }
        if let Some(progress) = self.progress {
            config.progress_mode = progress;
        }
        if self.progress_interval_ms.is_some() {
            config.progress_interval_ms = self.progress_interval_ms;
        }
        if self.no_eta {
            config.show_eta = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let config = Args::parse().into_config()?;

    // Logging lives for the run only, stderr keeps stdout free for JSON events
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(config.verbosity.as_level()).into())
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    let json = config.progress_mode == ProgressMode::Json;

    tracing::subscriber::with_default(subscriber, || {
        let result = BatchPipeline::new(config).and_then(|pipeline| pipeline.run());

        match result {
            Ok(result) => {
                info!(
                    "Done: {} candidates, {} converted, {} skipped",
                    result.total_candidates,
                    result.converted(),
                    result.skipped_count
                );
                Ok(())
            }
            Err(e) => {
                error!("Batch aborted, no archive produced: {}", e);
                if json {
                    JsonMessage::error("Batch aborted".to_string(), Some(e.to_string())).emit();
                }
                Err(e.into())
            }
        }
    })
}

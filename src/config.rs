//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri del batch
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!   (un file indicato ma assente è un errore)
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `root_dir`: Directory da scansionare (default: ".")
//! - `max_dimension`: Lato massimo in pixel, applicato a larghezza e altezza (default: 1000)
//! - `output_path`: Archivio di output (default: "out.tar.gz")
//! - `jpeg_quality`: Qualità JPEG (1-100, default: 75)
//! - `resize_filter`: Filtro di ridimensionamento (default: Lanczos)
//! - `verbosity`: Livello diagnostico, `debug` o `info` (default: info)
//! - `progress_mode`: Rendering del progresso, `bar`, `log` o `json` (default: bar)
//! - `progress_interval_ms`: Intervallo minimo tra due aggiornamenti (default: dipende dal modo)
//! - `show_eta`: Mostra velocità e tempo stimato (default: true)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     max_dimension: 640,
//!     jpeg_quality: 85,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::ConfigError;
use crate::resize::{MaxDimensions, ResizeFilter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default name of the output archive
pub const DEFAULT_OUTPUT: &str = "out.tar.gz";

/// Diagnostic verbosity of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Per-file diagnostics (open, color conversion, resize, write)
    Debug,
    /// Summary messages only
    #[default]
    Info,
}

impl Verbosity {
    pub fn as_level(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
        }
    }
}

/// How progress is rendered while the batch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Single self-overwriting progress bar on stderr
    #[default]
    Bar,
    /// One structured log record per throttle interval
    Log,
    /// JSON events on stdout for programmatic use
    Json,
}

impl ProgressMode {
    pub fn default_interval(self) -> Duration {
        match self {
            Self::Bar => Duration::from_millis(10),
            Self::Log => Duration::from_secs(1),
            Self::Json => Duration::from_millis(250),
        }
    }
}

/// Configuration for a thumbnail batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory scanned recursively for images
    pub root_dir: PathBuf,
    /// Maximum width and height of every output image
    pub max_dimension: u32,
    /// Destination archive
    pub output_path: PathBuf,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Filter used when downscaling
    pub resize_filter: ResizeFilter,
    /// Diagnostic verbosity
    pub verbosity: Verbosity,
    /// Progress rendering
    pub progress_mode: ProgressMode,
    /// Minimum gap between progress updates (None = mode default)
    pub progress_interval_ms: Option<u64>,
    /// Include speed and ETA in progress updates
    pub show_eta: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            max_dimension: 1000,
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            jpeg_quality: 75,
            resize_filter: ResizeFilter::default(),
            verbosity: Verbosity::default(),
            progress_mode: ProgressMode::default(),
            progress_interval_ms: None,
            show_eta: true,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "Maximum dimension must be greater than 0".to_string(),
            ));
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::Validation(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "Output path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn max_dimensions(&self) -> MaxDimensions {
        MaxDimensions::square(self.max_dimension)
    }

    /// Throttle interval for progress updates
    pub fn progress_interval(&self) -> Duration {
        self.progress_interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.progress_mode.default_interval())
    }

    /// Progress rendering used for the run. With debug verbosity per-file
    /// records share stderr with the bar, so bar progress becomes log records.
    pub fn effective_progress_mode(&self) -> ProgressMode {
        match (self.progress_mode, self.verbosity) {
            (ProgressMode::Bar, Verbosity::Debug) => ProgressMode::Log,
            (mode, _) => mode,
        }
    }

    /// Load configuration from file. A missing file is an error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

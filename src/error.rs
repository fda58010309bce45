//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Separa gli errori fatali (scan, archivio, configurazione) da quelli
//!   recuperabili per singolo file (conversione)
//! - Fornisce messaggi di errore descrittivi con il path coinvolto
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `ScanError`: Directory radice mancante o non attraversabile (fatale)
//! - `ConversionError`: Decode/resize/encode di un file fallito (file saltato)
//! - `ArchiveError`: Creazione, scrittura o chiusura dell'archivio (fatale)
//! - `ConfigError`: Parametri non validi o file di configurazione illeggibile
//! - `BatchError`: Errore fatale che interrompe l'intero batch
//!
//! ## Esempio:
//! ```rust,ignore
//! match converter.convert(&task.source) {
//!     Ok(bytes) => archive.write_entry(&task.name, &bytes)?,
//!     Err(e) => skipped += 1, // ConversionError: si continua
//! }
//! ```

use std::path::PathBuf;

/// Failures while enumerating the root directory. Always fatal.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("Root directory does not exist: {0}")]
    NotFound(PathBuf),

    #[error("Root path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Directory traversal failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Failures converting a single image. The batch skips the file and continues.
#[derive(thiserror::Error, Debug)]
pub enum ConversionError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Cannot encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Failures on the output archive. Always fatal.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("Cannot create archive {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write entry '{name}' to archive: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot finalize archive {path}: {source}")]
    Finish {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// A fatal error that aborts the whole batch.
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Archive failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

//! # Thumb Archiver Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom (fatali e per singolo file)
//! - `file_manager`: Discovery ricorsiva dei file e filtro per estensione
//! - `resize`: Geometria del ridimensionamento e filtri
//! - `image_processor`: Decode, normalizzazione colore, resize ed encode JPEG in memoria
//! - `archive`: Archivio tar.gz append-only
//! - `progress`: Stima di avanzamento, velocità ed ETA con rendering intercambiabile
//! - `json_output`: Eventi JSON per uso programmatico
//! - `pipeline`: Orchestratore del batch
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use thumb_archiver::{BatchPipeline, Config};
//!
//! let config = Config {
//!     root_dir: "photos".into(),
//!     max_dimension: 1000,
//!     ..Default::default()
//! };
//! let result = BatchPipeline::new(config)?.run()?;
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod pipeline;
pub mod progress;
pub mod resize;

pub use archive::ArchiveWriter;
pub use config::Config;
pub use error::{ArchiveError, BatchError, ConversionError, ScanError};
pub use file_manager::{FileEntry, FileManager};
pub use image_processor::ImageConverter;
pub use pipeline::{BatchPipeline, BatchResult};
pub use progress::ProgressEstimator;
pub use resize::MaxDimensions;

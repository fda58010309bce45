//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per comunicazione con
//! altri processi (`--progress json`).
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout
//! - Riusa `ProgressReport` e `BatchResult` invece di duplicare i calcoli
//! - I log `tracing` vanno su stderr, quindi stdout resta JSON puro
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch (radice, archivio, numero di candidati)
//! - `progress`: Progresso corrente (percentuale, velocità, ETA)
//! - `file_complete`: Fine elaborazione di un file (convertito o saltato)
//! - `complete`: Fine del batch con i contatori finali
//! - `error`: Errore fatale che ha interrotto il batch

use crate::pipeline::BatchResult;
use crate::progress::ProgressReport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del batch
    #[serde(rename = "start")]
    Start {
        root_dir: PathBuf,
        output_path: PathBuf,
        total_candidates: usize,
        max_dimension: u32,
    },

    /// Progresso corrente
    #[serde(rename = "progress")]
    Progress {
        current: u64,
        total: u64,
        percentage: f64,
        speed: Option<f64>,
        remaining_seconds: Option<f64>,
        eta: Option<String>,
    },

    /// Fine elaborazione di un file specifico
    #[serde(rename = "file_complete")]
    FileComplete {
        name: String,
        index: usize,
        skipped: bool,
        error: Option<String>,
    },

    /// Batch completato
    #[serde(rename = "complete")]
    Complete {
        total_candidates: usize,
        skipped: usize,
        converted: usize,
        archive_bytes: u64,
        duration_seconds: f64,
    },

    /// Errore fatale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Crea un messaggio di inizio
    pub fn start(
        root_dir: PathBuf,
        output_path: PathBuf,
        total_candidates: usize,
        max_dimension: u32,
    ) -> Self {
        Self::Start {
            root_dir,
            output_path,
            total_candidates,
            max_dimension,
        }
    }

    /// Crea un messaggio di progresso
    pub fn progress(report: &ProgressReport) -> Self {
        let timing = report.timing.as_ref();
        Self::Progress {
            current: report.current,
            total: report.total,
            percentage: report.percent,
            speed: timing.map(|t| t.speed),
            remaining_seconds: timing.map(|t| t.remaining_secs),
            eta: timing.and_then(|t| t.eta.map(|_| t.eta_string())),
        }
    }

    /// Crea un messaggio di completamento file
    pub fn file_complete(name: &str, index: usize, error: Option<String>) -> Self {
        Self::FileComplete {
            name: name.to_string(),
            index,
            skipped: error.is_some(),
            error,
        }
    }

    /// Crea un messaggio di completamento generale
    pub fn complete(result: &BatchResult, archive_bytes: u64, duration_seconds: f64) -> Self {
        Self::Complete {
            total_candidates: result.total_candidates,
            skipped: result.skipped_count,
            converted: result.converted(),
            archive_bytes,
            duration_seconds,
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

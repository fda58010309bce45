//! # Archive Writer Module
//!
//! Questo modulo scrive l'archivio compresso di output (tar + gzip).
//!
//! ## Responsabilità:
//! - Crea il file di destinazione e lo stream gzip sopra di esso
//! - Aggiunge una entry per ogni immagine convertita, una sola volta (append-only)
//! - Finalizza l'archivio (blocchi di chiusura tar + trailer gzip)
//!
//! ## Garanzie:
//! - L'archivio è valido solo dopo `finish()` senza errori
//! - Se il writer viene distrutto senza `finish()` (abort per errore fatale,
//!   panic) lo stream viene chiuso e il file incompleto rimosso, così non può
//!   essere scambiato per un archivio completo
//! - I nomi duplicati non vengono deduplicati: è responsabilità del chiamante
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut archive = ArchiveWriter::create(Path::new("out.tar.gz"))?;
//! archive.write_entry("a.jpg", &jpeg_bytes)?;
//! let summary = archive.finish()?;
//! ```

use crate::error::ArchiveError;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tar::{Builder, EntryType, Header};
use tracing::{debug, warn};

type ArchiveStream = Builder<GzEncoder<BufWriter<File>>>;

/// Result of a finalized archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub size_bytes: u64,
}

/// Destination of converted entries. A failed write is fatal for the batch.
pub trait EntryWriter {
    fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError>;
}

/// Append-only gzip-compressed tar writer.
pub struct ArchiveWriter {
    path: PathBuf,
    builder: Option<ArchiveStream>,
    entries: usize,
    mtime: u64,
}

impl ArchiveWriter {
    /// Create the archive file at `path`, truncating any existing file.
    pub fn create(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::create(path).map_err(|e| ArchiveError::Create {
            path: path.to_path_buf(),
            source: e,
        })?;

        let enc = GzEncoder::new(BufWriter::new(file), Compression::default());
        let builder = Builder::new(enc);

        let mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        debug!("Opened archive: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            builder: Some(builder),
            entries: 0,
            mtime,
        })
    }

    /// Number of entries written so far
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Append one regular-file entry named `name` holding `bytes`.
    pub fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        let write_err = |e: std::io::Error| ArchiveError::Write {
            name: name.to_string(),
            source: e,
        };

        let builder = self.builder.as_mut().ok_or_else(|| {
            write_err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "archive already closed",
            ))
        })?;

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(self.mtime);

        builder.append_data(&mut header, name, bytes).map_err(write_err)?;
        self.entries += 1;

        debug!("Wrote archive entry: {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    /// Write the tar trailer, flush the gzip stream and close the file.
    pub fn finish(mut self) -> Result<ArchiveSummary, ArchiveError> {
        let finish_err = |path: &Path, e: std::io::Error| ArchiveError::Finish {
            path: path.to_path_buf(),
            source: e,
        };

        // taking the builder disarms the cleanup in Drop
        let builder = match self.builder.take() {
            Some(builder) => builder,
            None => {
                return Err(finish_err(
                    &self.path,
                    std::io::Error::new(std::io::ErrorKind::Other, "archive already closed"),
                ))
            }
        };

        let result = builder
            .into_inner()
            .and_then(|enc| enc.finish())
            .and_then(|mut writer| {
                writer.flush()?;
                writer.into_inner().map_err(|e| e.into_error())
            })
            .and_then(|file| file.sync_all());

        if let Err(e) = result {
            Self::remove_incomplete(&self.path);
            return Err(finish_err(&self.path, e));
        }

        let size_bytes = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| finish_err(&self.path, e))?;

        Ok(ArchiveSummary {
            path: self.path.clone(),
            entries: self.entries,
            size_bytes,
        })
    }

    fn remove_incomplete(path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => warn!("Removed incomplete archive: {}", path.display()),
            Err(e) => warn!("Could not remove incomplete archive {}: {}", path.display(), e),
        }
    }
}

impl EntryWriter for ArchiveWriter {
    fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        ArchiveWriter::write_entry(self, name, bytes)
    }
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        if let Some(builder) = self.builder.take() {
            // close the handle before removing the file
            drop(builder);
            Self::remove_incomplete(&self.path);
        }
    }
}

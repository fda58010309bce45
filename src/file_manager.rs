//! # File Management Module
//!
//! Questo modulo gestisce la discovery ricorsiva dei file e la selezione dei candidati.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di tutti i file regolari sotto una directory radice
//! - Path relativi alla radice (la radice stessa non compare mai)
//! - Selezione dei candidati per estensione (case-insensitive)
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati supportati:
//! - **Immagini**: JPG, JPEG, PNG
//!
//! ## Ordine e determinismo:
//! - Visita depth-first, voci di ogni directory ordinate per nome
//! - I link simbolici a directory vengono seguiti; un ciclo è un errore fatale
//! - Un link simbolico senza destinazione è elencato come file (fallirà in apertura)
//! - Qualunque errore di attraversamento interrompe la scansione (nessun risultato parziale)
//!
//! ## Esempio:
//! ```rust,ignore
//! let entries = FileManager::scan(Path::new("/photos"))?;
//! let candidates: Vec<_> = entries
//!     .into_iter()
//!     .filter(|e| FileManager::is_candidate(e.relative()))
//!     .collect();
//! ```

use crate::error::ScanError;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions accepted as candidates, lowercase
pub const CANDIDATE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// One regular file discovered under the scan root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEntry {
    relative: PathBuf,
}

impl FileEntry {
    pub fn new(relative: impl Into<PathBuf>) -> Self {
        Self { relative: relative.into() }
    }

    /// Path relative to the scan root, with the platform separator
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Entry name inside the archive: path components joined by `/`
    pub fn archive_name(&self) -> String {
        self.relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Manages file discovery
pub struct FileManager;

impl FileManager {
    /// Find every regular file under `root`, relative to `root`
    pub fn scan(root: &Path) -> Result<Vec<FileEntry>, ScanError> {
        if !root.exists() {
            return Err(ScanError::NotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let path = match entry {
                Ok(entry) if entry.file_type().is_file() => entry.into_path(),
                Ok(_) => continue,
                Err(e) => match Self::dangling_link(&e) {
                    Some(path) => {
                        debug!("Dangling symlink kept as a file: {}", path.display());
                        path
                    }
                    None => return Err(e.into()),
                },
            };

            // entries always live under root, strip_prefix cannot fail here
            if let Ok(relative) = path.strip_prefix(root) {
                files.push(FileEntry::new(relative));
            }
        }

        debug!("Scanned {} files under {}", files.len(), root.display());
        Ok(files)
    }

    /// Path of a symlink below the root whose target is missing.
    ///
    /// Such a link is listed like a regular file and fails later on open.
    /// Loops and permission errors are not matched and stay fatal.
    fn dangling_link(err: &walkdir::Error) -> Option<PathBuf> {
        if err.depth() == 0 || err.loop_ancestor().is_some() {
            return None;
        }
        if err.io_error()?.kind() != ErrorKind::NotFound {
            return None;
        }
        let path = err.path()?;
        let is_link = std::fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        is_link.then(|| path.to_path_buf())
    }

    /// Check if a file has one of the candidate extensions
    pub fn is_candidate(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            CANDIDATE_EXTENSIONS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

//! # Batch Pipeline Orchestrator Module
//!
//! Questo è il modulo principale che orchestra tutto il processo di conversione.
//!
//! ## Responsabilità:
//! - Coordinamento di scanner, converter, archivio e progress
//! - Isolamento degli errori per singolo file (contati e saltati)
//! - Interruzione immediata sugli errori fatali (scan, apertura o scrittura archivio)
//! - Report finale con candidati, file saltati e dimensione dell'archivio
//!
//! ## Flusso di esecuzione:
//! 1. **Discovery**: Scansione ricorsiva della directory radice
//! 2. **Filtro**: Solo estensioni JPG, JPEG, PNG (case-insensitive)
//! 3. **Archivio**: Apertura del file di destinazione (errore = abort prima di ogni conversione)
//! 4. **Loop sequenziale**: progress → conversione → scrittura entry
//! 5. **Chiusura**: Finalizzazione dell'archivio e statistiche
//!
//! ## Error handling:
//! - `ConversionError`: warning con la causa, `skipped_count += 1`, si prosegue
//! - `ArchiveError` in scrittura: il loop si interrompe, l'archivio incompleto
//!   viene rimosso dal drop guard di `ArchiveWriter`
//! - `ScanError`: nessun archivio creato, nessun output di progresso
//!
//! ## Concorrenza:
//! - Nessuna: un file viene completamente processato prima del successivo
//!
//! ## Esempio:
//! ```rust,ignore
//! let result = BatchPipeline::new(Config::default())?.run()?;
//! println!("{} candidates, {} skipped", result.total_candidates, result.skipped_count);
//! ```

use crate::{
    archive::{ArchiveWriter, EntryWriter},
    config::{Config, ProgressMode},
    error::{BatchError, ConfigError},
    file_manager::{FileEntry, FileManager},
    image_processor::ImageConverter,
    json_output::JsonMessage,
    progress::{sink_for, ProgressEstimator},
    resize::MaxDimensions,
};
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Summary of a completed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchResult {
    /// Files whose extension is in the allowlist
    pub total_candidates: usize,
    /// Candidates that failed conversion and are missing from the archive
    pub skipped_count: usize,
}

impl BatchResult {
    /// Entries written to the archive
    pub fn converted(&self) -> usize {
        self.total_candidates - self.skipped_count
    }
}

/// One candidate: where to read it and what to call it in the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTask {
    pub source: PathBuf,
    pub name: String,
}

impl ConversionTask {
    pub fn new(root: &Path, entry: &FileEntry) -> Self {
        Self {
            source: root.join(entry.relative()),
            name: entry.archive_name(),
        }
    }
}

/// Scan, convert and archive every candidate image under a root directory
pub struct BatchPipeline {
    config: Config,
    converter: ImageConverter,
}

impl BatchPipeline {
    pub fn new(config: Config) -> Result<Self, BatchError> {
        config.validate()?;
        let converter = ImageConverter::from_config(&config);
        Ok(Self { config, converter })
    }

    /// Run the batch
    pub fn run(&self) -> Result<BatchResult, BatchError> {
        let started = Instant::now();
        let root = self.config.root_dir.as_path();

        info!("Scanning directory: {}", root.display());
        let tasks: Vec<ConversionTask> = FileManager::scan(root)?
            .iter()
            .filter(|entry| FileManager::is_candidate(entry.relative()))
            .map(|entry| ConversionTask::new(root, entry))
            .collect();

        info!("{} files were selected", tasks.len());

        let json = self.config.progress_mode == ProgressMode::Json;
        if json {
            JsonMessage::start(
                root.to_path_buf(),
                self.config.output_path.clone(),
                tasks.len(),
                self.config.max_dimension,
            )
            .emit();
        }

        let mut progress = NonZeroU64::new(tasks.len() as u64).map(|total| {
            ProgressEstimator::new(total, sink_for(self.config.effective_progress_mode(), total))
                .with_interval(self.config.progress_interval())
                .with_verbose(self.config.show_eta)
        });

        let mut archive = ArchiveWriter::create(&self.config.output_path)?;
        let result = BatchResult {
            total_candidates: tasks.len(),
            skipped_count: self.convert_all(&tasks, &mut archive, progress.as_mut())?,
        };

        let summary = archive.finish()?;

        info!("{} files were skipped", result.skipped_count);
        info!(
            "Archive written: {} ({} entries, {})",
            summary.path.display(),
            summary.entries,
            FileManager::format_size(summary.size_bytes)
        );
        info!("Complete");

        if json {
            JsonMessage::complete(&result, summary.size_bytes, started.elapsed().as_secs_f64()).emit();
        }

        Ok(result)
    }

    /// Convert each task in order and write it to `archive`, returning the skip count.
    ///
    /// A conversion failure skips the file. A write failure stops the loop at once.
    fn convert_all(
        &self,
        tasks: &[ConversionTask],
        archive: &mut dyn EntryWriter,
        mut progress: Option<&mut ProgressEstimator>,
    ) -> Result<usize, BatchError> {
        let json = self.config.progress_mode == ProgressMode::Json;
        let mut skipped_count = 0;

        for (index, task) in tasks.iter().enumerate() {
            if let Some(progress) = progress.as_mut() {
                progress.update(index as u64);
            }

            match self.converter.convert(&task.source) {
                Ok(bytes) => {
                    debug!("Writing to archive: {}", task.name);
                    archive.write_entry(&task.name, &bytes)?;
                    if json {
                        JsonMessage::file_complete(&task.name, index, None).emit();
                    }
                }
                Err(e) => {
                    let report = || warn!("Cannot convert file, skipping: {}", e);
                    match progress.as_deref() {
                        Some(progress) => progress.suspend(report),
                        None => report(),
                    }
                    skipped_count += 1;
                    if json {
                        JsonMessage::file_complete(&task.name, index, Some(e.to_string())).emit();
                    }
                }
            }
        }

        if let Some(progress) = progress.as_mut() {
            progress.update(tasks.len() as u64);
        }

        Ok(skipped_count)
    }
}

/// Convert every candidate under `root` into `destination` with default settings
pub fn run(root: &Path, max: MaxDimensions, destination: &Path) -> Result<BatchResult, BatchError> {
    if max.width == 0 || max.height == 0 {
        return Err(ConfigError::Validation(
            "Maximum dimensions must be greater than 0".to_string(),
        )
        .into());
    }

    let config = Config {
        root_dir: root.to_path_buf(),
        max_dimension: max.width.max(max.height),
        output_path: destination.to_path_buf(),
        progress_mode: ProgressMode::Log,
        ..Default::default()
    };
    config.validate()?;

    let converter = ImageConverter::from_config(&config).with_max_dimensions(max);
    BatchPipeline { config, converter }.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArchiveError, ScanError};
    use crate::progress::BarSink;
    use flate2::read::GzDecoder;
    use image::{DynamicImage, GenericImageView, ImageOutputFormat, Rgb, RgbImage};
    use std::collections::HashMap;
    use std::fs::{self, File};
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    fn write_image(path: &Path, width: u32, height: u32, format: ImageOutputFormat) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([12, 160, 220])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        fs::write(path, bytes).unwrap();
    }

    fn write_bytes(path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, bytes).unwrap();
    }

    fn read_archive(path: &Path) -> HashMap<String, Vec<u8>> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let name = entry.path().unwrap().to_string_lossy().into_owned();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).unwrap();
                (name, data)
            })
            .collect()
    }

    fn config_for(root: &Path, output: &Path) -> Config {
        Config {
            root_dir: root.to_path_buf(),
            output_path: output.to_path_buf(),
            progress_mode: ProgressMode::Log,
            ..Default::default()
        }
    }

    #[test]
    fn test_mixed_tree_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("photos");
        let output = temp_dir.path().join("out.tar.gz");

        write_image(&root.join("a.jpg"), 800, 600, ImageOutputFormat::Jpeg(90));
        write_image(&root.join("b.png"), 2000, 100, ImageOutputFormat::Png);
        write_bytes(&root.join("c.txt"), b"not an image");
        write_bytes(&root.join("d/e.jpeg"), b"\xff\xd8\xff corrupt bytes");

        let result = BatchPipeline::new(config_for(&root, &output)).unwrap().run().unwrap();

        assert_eq!(result.total_candidates, 3);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.converted(), 2);

        let entries = read_archive(&output);
        let mut names: Vec<&String> = entries.keys().collect();
        names.sort();
        assert_eq!(names, vec!["a.jpg", "b.png"]);

        let a = image::load_from_memory(&entries["a.jpg"]).unwrap();
        assert_eq!(a.dimensions(), (800, 600));

        let b = image::load_from_memory(&entries["b.png"]).unwrap();
        let (w, h) = b.dimensions();
        assert_eq!(w, 1000);
        assert!((49..=51).contains(&h), "height was {}", h);
        // entry keeps its .png name but holds JPEG bytes
        assert_eq!(image::guess_format(&entries["b.png"]).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn test_empty_root_creates_empty_archive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("empty");
        fs::create_dir_all(&root).unwrap();
        let output = temp_dir.path().join("out.tar.gz");

        let result = BatchPipeline::new(config_for(&root, &output)).unwrap().run().unwrap();

        assert_eq!(result, BatchResult { total_candidates: 0, skipped_count: 0 });
        assert!(output.exists());
        assert!(read_archive(&output).is_empty());
    }

    #[test]
    fn test_missing_root_fails_before_archive() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.tar.gz");

        let err = BatchPipeline::new(config_for(&temp_dir.path().join("missing"), &output))
            .unwrap()
            .run()
            .unwrap_err();

        assert!(matches!(err, BatchError::Scan(ScanError::NotFound(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_unopenable_archive_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("photos");
        write_image(&root.join("a.jpg"), 10, 10, ImageOutputFormat::Jpeg(90));
        let output = temp_dir.path().join("no/such/dir/out.tar.gz");

        let err = BatchPipeline::new(config_for(&root, &output)).unwrap().run().unwrap_err();
        assert!(matches!(err, BatchError::Archive(ArchiveError::Create { .. })));
    }

    #[test]
    fn test_filter_is_case_insensitive_and_ignores_others() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("photos");
        let output = temp_dir.path().join("out.tar.gz");

        write_image(&root.join("a.JpG"), 20, 10, ImageOutputFormat::Jpeg(90));
        write_image(&root.join("sub/a.jpg"), 20, 10, ImageOutputFormat::Jpeg(90));
        write_image(&root.join("x.PNG"), 20, 10, ImageOutputFormat::Png);
        write_bytes(&root.join("a.gif"), b"GIF89a");
        write_bytes(&root.join("README"), b"hello");

        let result = BatchPipeline::new(config_for(&root, &output)).unwrap().run().unwrap();

        assert_eq!(result.total_candidates, 3);
        assert_eq!(result.skipped_count, 0);

        let entries = read_archive(&output);
        assert!(entries.contains_key("a.JpG"));
        assert!(entries.contains_key("sub/a.jpg"));
        assert!(entries.contains_key("x.PNG"));
        assert!(!entries.contains_key("a.gif"));
    }

    #[test]
    fn test_every_corrupt_file_is_skipped_once() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("photos");
        let output = temp_dir.path().join("out.tar.gz");

        write_bytes(&root.join("1.jpg"), b"");
        write_image(&root.join("2.jpg"), 30, 30, ImageOutputFormat::Jpeg(90));
        write_bytes(&root.join("3.png"), b"\x89PNG garbage");
        write_image(&root.join("4.png"), 30, 30, ImageOutputFormat::Png);
        write_bytes(&root.join("5.jpeg"), b"nope");

        let result = BatchPipeline::new(config_for(&root, &output)).unwrap().run().unwrap();

        assert_eq!(result.total_candidates, 5);
        assert_eq!(result.skipped_count, 3);
        assert_eq!(read_archive(&output).len(), result.converted());
    }

    #[test]
    fn test_all_skipped_still_produces_archive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("photos");
        let output = temp_dir.path().join("out.tar.gz");
        write_bytes(&root.join("broken.png"), b"broken");

        let result = BatchPipeline::new(config_for(&root, &output)).unwrap().run().unwrap();

        assert_eq!(result, BatchResult { total_candidates: 1, skipped_count: 1 });
        assert!(read_archive(&output).is_empty());
    }

    /// Delegates to a real archive and fails the `fail_at`-th write.
    struct FailingWriter {
        inner: ArchiveWriter,
        fail_at: usize,
        attempts: Vec<String>,
    }

    impl EntryWriter for FailingWriter {
        fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
            self.attempts.push(name.to_string());
            if self.attempts.len() == self.fail_at {
                return Err(ArchiveError::Write {
                    name: name.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.inner.write_entry(name, bytes)
        }
    }

    #[test]
    fn test_write_failure_aborts_remaining_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("photos");
        let output = temp_dir.path().join("out.tar.gz");
        for name in ["1.jpg", "2.jpg", "3.jpg", "4.jpg"] {
            write_image(&root.join(name), 16, 16, ImageOutputFormat::Jpeg(90));
        }

        let pipeline = BatchPipeline::new(config_for(&root, &output)).unwrap();
        let tasks: Vec<ConversionTask> = FileManager::scan(&root)
            .unwrap()
            .iter()
            .map(|entry| ConversionTask::new(&root, entry))
            .collect();
        let mut progress = ProgressEstimator::new(NonZeroU64::new(4).unwrap(), Box::new(BarSink::hidden(4)));
        let mut writer = FailingWriter {
            inner: ArchiveWriter::create(&output).unwrap(),
            fail_at: 2,
            attempts: Vec::new(),
        };

        let err = pipeline
            .convert_all(&tasks, &mut writer, Some(&mut progress))
            .unwrap_err();

        assert!(matches!(err, BatchError::Archive(ArchiveError::Write { ref name, .. }) if name == "2.jpg"));
        assert_eq!(writer.attempts, vec!["1.jpg", "2.jpg"]);
        assert!(!progress.is_finished());

        // the unfinished archive goes away with its writer
        assert!(output.exists());
        drop(writer);
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_candidate_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("photos");
        let output = temp_dir.path().join("out.tar.gz");
        write_image(&root.join("a.jpg"), 16, 16, ImageOutputFormat::Jpeg(90));
        write_bytes(&root.join("notes.txt"), b"hello");
        std::os::unix::fs::symlink(root.join("gone.txt"), root.join("stale.txt")).unwrap();
        std::os::unix::fs::symlink(root.join("gone.png"), root.join("lost.png")).unwrap();

        let result = BatchPipeline::new(config_for(&root, &output)).unwrap().run().unwrap();

        assert_eq!(result, BatchResult { total_candidates: 2, skipped_count: 1 });
        let entries = read_archive(&output);
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("a.jpg"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            max_dimension: 0,
            ..Default::default()
        };
        assert!(matches!(BatchPipeline::new(config), Err(BatchError::Config(_))));
    }

    #[test]
    fn test_run_with_rectangular_bounds() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("photos");
        let output = temp_dir.path().join("thumbs.tar.gz");
        write_image(&root.join("big.png"), 400, 400, ImageOutputFormat::Png);

        let result = run(&root, MaxDimensions::new(200, 100), &output).unwrap();
        assert_eq!(result.converted(), 1);

        let entries = read_archive(&output);
        let img = image::load_from_memory(&entries["big.png"]).unwrap();
        assert_eq!(img.dimensions(), (100, 100));
    }

    #[test]
    fn test_run_rejects_zero_bounds() {
        let temp_dir = TempDir::new().unwrap();
        let err = run(
            temp_dir.path(),
            MaxDimensions::new(0, 100),
            &temp_dir.path().join("out.tar.gz"),
        )
        .unwrap_err();
        assert!(matches!(err, BatchError::Config(_)));
    }

    #[test]
    fn test_conversion_task_paths() {
        let root = Path::new("/photos");
        let entry = FileEntry::new(Path::new("d").join("e.jpeg"));
        let task = ConversionTask::new(root, &entry);
        assert_eq!(task.source, root.join("d").join("e.jpeg"));
        assert_eq!(task.name, "d/e.jpeg");
    }
}

//! # Image Processing Module
//!
//! Questo modulo converte una singola immagine nel formato canonico di output,
//! interamente in memoria.
//!
//! ## Pipeline di Conversione
//!
//! 1. **Decode**: Legge il file e riconosce il formato dal contenuto
//! 2. **Color mode**: Qualunque modo diverso da RGB8 (RGBA, grayscale, 16 bit)
//!    viene convertito in RGB8
//! 3. **Resize**: Riduce l'immagine per farla rientrare nel box massimo,
//!    preservando l'aspect ratio; mai ingrandita
//! 4. **Encode**: JPEG con qualità configurabile, restituito come `Vec<u8>`
//!
//! ## Error Handling
//!
//! Ogni fallimento (file illeggibile, formato sconosciuto, dati corrotti) produce
//! un `ConversionError`: il chiamante salta il file e prosegue. Nessun retry interno,
//! nessuna scrittura su filesystem.
//!
//! ## Esempio
//!
//! ```rust,ignore
//! let converter = ImageConverter::new(MaxDimensions::square(1000));
//! let jpeg_bytes = converter.convert(Path::new("/photos/a.png"))?;
//! ```

use crate::config::Config;
use crate::error::ConversionError;
use crate::resize::{fit_within, MaxDimensions, ResizeFilter};
use image::codecs::jpeg::JpegEncoder;
use image::io::Reader as ImageReader;
use image::{ColorType, DynamicImage, GenericImageView};
use std::path::Path;
use tracing::debug;

/// Default JPEG quality for archive entries
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Decodes, normalizes, downsizes and re-encodes single images.
#[derive(Debug, Clone)]
pub struct ImageConverter {
    max: MaxDimensions,
    quality: u8,
    filter: ResizeFilter,
}

impl ImageConverter {
    pub fn new(max: MaxDimensions) -> Self {
        Self {
            max,
            quality: DEFAULT_JPEG_QUALITY,
            filter: ResizeFilter::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_dimensions())
            .with_quality(config.jpeg_quality)
            .with_filter(config.resize_filter)
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn with_max_dimensions(mut self, max: MaxDimensions) -> Self {
        self.max = max;
        self
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn max_dimensions(&self) -> MaxDimensions {
        self.max
    }

    /// Converts the image at `source` into JPEG bytes that fit the bounding box.
    ///
    /// # Errors
    /// Returns a `ConversionError` if the file cannot be opened, is not a
    /// recognized image, is corrupt, or cannot be encoded.
    pub fn convert(&self, source: &Path) -> Result<Vec<u8>, ConversionError> {
        debug!("Opening file: {}", source.display());
        let img = Self::decode(source)?;

        let img = Self::normalize(img);
        let img = self.downscale(img);

        debug!("Encoding JPEG (quality {})", self.quality);
        let rgb = img.to_rgb8();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| ConversionError::Encode {
                path: source.to_path_buf(),
                source: e,
            })?;

        Ok(bytes)
    }

    fn decode(source: &Path) -> Result<DynamicImage, ConversionError> {
        let reader = ImageReader::open(source)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| ConversionError::Read {
                path: source.to_path_buf(),
                source: e,
            })?;

        reader.decode().map_err(|e| ConversionError::Decode {
            path: source.to_path_buf(),
            source: e,
        })
    }

    /// Brings any color mode to RGB8, the only mode the JPEG encoder gets.
    fn normalize(img: DynamicImage) -> DynamicImage {
        if img.color() == ColorType::Rgb8 {
            return img;
        }
        debug!("Converting color mode: {:?} -> {:?}", img.color(), ColorType::Rgb8);
        DynamicImage::ImageRgb8(img.to_rgb8())
    }

    fn downscale(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        let (target_w, target_h) = fit_within(width, height, self.max);

        if (target_w, target_h) == (width, height) {
            debug!("Keeping size {}x{} (fits {}x{})", width, height, self.max.width, self.max.height);
            return img;
        }

        debug!(
            "Resizing: {}x{} -> {}x{} ({:?})",
            width, height, target_w, target_h, self.filter
        );
        img.resize_exact(target_w, target_h, self.filter.to_filter_type())
    }
}

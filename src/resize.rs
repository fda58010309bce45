//! # Image Resize Module
//!
//! Questo modulo contiene la geometria del ridimensionamento e la scelta del
//! filtro usato per ridurre le immagini.
//!
//! ## Caratteristiche
//! - **Solo downscale**: Un'immagine che rientra già nel box non viene toccata
//! - **Aspect ratio**: Preservato con tolleranza di un pixel di arrotondamento
//! - **Filtri**: Lanczos (default), Catmull-Rom, Gaussian, Triangle, Nearest
//!
//! ## Esempio
//! ```rust,ignore
//! let max = MaxDimensions::square(1000);
//! assert_eq!(fit_within(2000, 100, max), (1000, 50));
//! assert_eq!(fit_within(800, 600, max), (800, 600));
//! ```

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Bounding box every output image must fit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxDimensions {
    pub width: u32,
    pub height: u32,
}

impl MaxDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Same bound on both axes.
    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn contains(&self, width: u32, height: u32) -> bool {
        width <= self.width && height <= self.height
    }
}

/// Algoritmi di resize disponibili
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    /// Lanczos - Migliore qualità per downscaling (default per thumbnails)
    #[default]
    Lanczos,
    /// Catmull-Rom - Buon bilanciamento qualità/velocità
    CatmullRom,
    /// Gaussian - Risultato più morbido
    Gaussian,
    /// Triangle - Veloce, qualità accettabile per anteprime veloci
    Triangle,
    /// Nearest - Nessuna interpolazione
    Nearest,
}

impl ResizeFilter {
    pub fn to_filter_type(self) -> FilterType {
        match self {
            Self::Lanczos => FilterType::Lanczos3,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Triangle => FilterType::Triangle,
            Self::Nearest => FilterType::Nearest,
        }
    }
}

/// Computes the output size for a `width`x`height` image so it fits in `max`.
///
/// Images already inside the box keep their size. Otherwise the limiting axis
/// lands exactly on its bound and the other one is scaled by the same ratio,
/// rounded to the nearest pixel and never below 1.
pub fn fit_within(width: u32, height: u32, max: MaxDimensions) -> (u32, u32) {
    if max.contains(width, height) {
        return (width, height);
    }

    let ratio_w = max.width as f64 / width as f64;
    let ratio_h = max.height as f64 / height as f64;

    if ratio_w <= ratio_h {
        let scaled = (height as f64 * ratio_w).round() as u32;
        (max.width, scaled.clamp(1, max.height))
    } else {
        let scaled = (width as f64 * ratio_h).round() as u32;
        (scaled.clamp(1, max.width), max.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_within_keeps_small_images() {
        let max = MaxDimensions::square(1000);
        assert_eq!(fit_within(800, 600, max), (800, 600));
        assert_eq!(fit_within(1000, 1000, max), (1000, 1000));
        assert_eq!(fit_within(1, 1, max), (1, 1));
    }

    #[test]
    fn test_fit_within_wide_image() {
        let max = MaxDimensions::square(1000);
        assert_eq!(fit_within(2000, 100, max), (1000, 50));
        assert_eq!(fit_within(3000, 2000, max), (1000, 667));
    }

    #[test]
    fn test_fit_within_tall_image() {
        let max = MaxDimensions::square(1000);
        assert_eq!(fit_within(600, 1800, max), (333, 1000));
    }

    #[test]
    fn test_fit_within_extreme_ratio_never_collapses() {
        let max = MaxDimensions::square(100);
        assert_eq!(fit_within(100_000, 10, max), (100, 1));
    }

    #[test]
    fn test_fit_within_rectangular_bounds() {
        let max = MaxDimensions::new(400, 300);
        let (w, h) = fit_within(1600, 1600, max);
        assert_eq!((w, h), (300, 300));
        assert!(max.contains(w, h));
    }

    #[test]
    fn test_fit_within_preserves_aspect_ratio() {
        let max = MaxDimensions::square(500);
        for &(w, h) in &[(1234u32, 987u32), (4000, 3000), (777, 2500), (501, 499)] {
            let (nw, nh) = fit_within(w, h, max);
            assert!(max.contains(nw, nh));
            assert_eq!(nw.max(nh), 500);
            // recompute the short side from the long one, must agree within a pixel
            let expected = if w >= h {
                h as f64 * nw as f64 / w as f64
            } else {
                w as f64 * nh as f64 / h as f64
            };
            let actual = if w >= h { nh } else { nw } as f64;
            assert!((expected - actual).abs() <= 1.0, "{}x{} -> {}x{}", w, h, nw, nh);
        }
    }

    #[test]
    fn test_filter_mapping() {
        assert_eq!(ResizeFilter::default(), ResizeFilter::Lanczos);
        assert!(matches!(ResizeFilter::Lanczos.to_filter_type(), FilterType::Lanczos3));
        assert!(matches!(ResizeFilter::Nearest.to_filter_type(), FilterType::Nearest));
    }
}

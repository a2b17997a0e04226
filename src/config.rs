//! Configuration types for PDF repair.
//!
//! Every knob lives in [`FixConfig`], built through [`FixConfigBuilder`].
//! Only two settings shape the output: rasterisation density and JPEG
//! quality. Both are read once at the start of a conversion and stay fixed
//! for all of its pages, so every page of one output shares the same
//! sharpness and compression.

use crate::error::FixError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default rasterisation density.
pub const DEFAULT_DPI: u32 = 150;

/// Default JPEG quality on a 0–1 scale.
pub const DEFAULT_JPEG_QUALITY: f32 = 0.85;

const MIN_DPI: u32 = 72;
const MAX_DPI: u32 = 600;

/// Configuration for a repair run.
///
/// # Example
/// ```rust
/// use pdf_fixer::FixConfig;
///
/// let config = FixConfig::builder()
///     .dpi(200)
///     .jpeg_quality(0.9)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct FixConfig {
    /// Rasterisation density in dots per inch. Range: 72–600. Default: 150.
    ///
    /// Higher values give sharper text in the repaired file at the cost of
    /// larger pages: output size grows roughly with the square of the DPI.
    pub dpi: u32,

    /// JPEG quality in `(0, 1]`. Default: 0.85.
    ///
    /// Lower values shrink the output but introduce visible ringing around
    /// text edges.
    pub jpeg_quality: f32,

    /// Explicit pdfium shared library. When `None` the library is located
    /// (or downloaded) by `pdfium-fetch`.
    pub pdfium_library: Option<PathBuf>,

    /// Receives per-page progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            pdfium_library: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FixConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixConfig")
            .field("dpi", &self.dpi)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("pdfium_library", &self.pdfium_library)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn FixProgressCallback>"),
            )
            .finish()
    }
}

impl FixConfig {
    /// Create a new builder for `FixConfig`.
    pub fn builder() -> FixConfigBuilder {
        FixConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the invariants the builder enforces. Useful for configs that
    /// were assembled field by field.
    pub fn validate(&self) -> Result<(), FixError> {
        if !(MIN_DPI..=MAX_DPI).contains(&self.dpi) {
            return Err(FixError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                self.dpi
            )));
        }
        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            return Err(FixError::InvalidConfig(format!(
                "JPEG quality must be in (0, 1], got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// Builder for [`FixConfig`].
#[derive(Debug)]
pub struct FixConfigBuilder {
    config: FixConfig,
}

impl FixConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(MIN_DPI, MAX_DPI);
        self
    }

    /// Values outside `(0, 1]` are clamped; NaN is kept so `build` rejects it.
    pub fn jpeg_quality(mut self, quality: f32) -> Self {
        self.config.jpeg_quality = if quality.is_nan() {
            quality
        } else {
            quality.clamp(0.01, 1.0)
        };
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FixConfig, FixError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

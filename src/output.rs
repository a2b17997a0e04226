//! Result types of a repair run.

use crate::pipeline::geometry::Orientation;
use serde::{Deserialize, Serialize};

/// A repaired document.
///
/// `bytes` is the complete output PDF; everything else describes it and is
/// what `--json` prints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedDocument {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// `"<basename> - Fixed.pdf"`.
    pub filename: String,
    pub pages: Vec<PageSummary>,
    pub stats: FixStats,
}

impl FixedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Per-page description of the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed.
    pub page_num: usize,
    pub width_px: u32,
    pub height_px: u32,
    pub width_pt: f32,
    pub height_pt: f32,
    pub orientation: Orientation,
    pub jpeg_bytes: usize,
}

/// Timing and size statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixStats {
    pub total_pages: usize,
    pub dpi: u32,
    pub jpeg_quality: f32,
    pub input_bytes: usize,
    pub output_bytes: usize,
    /// Time spent waiting on the renderer (load + all pages).
    pub render_duration_ms: u64,
    pub encode_duration_ms: u64,
    pub assemble_duration_ms: u64,
    pub total_duration_ms: u64,
}

//! Page geometry: pixel rasters back to point-sized pages.
//!
//! A page rendered at `dpi` is `width` pixels wide, so the repaired page is
//! `width * 72 / dpi` points wide. Using the same DPI for rendering and for
//! this conversion makes every output page exactly as large as its source.

use crate::error::AssemblyError;
use serde::{Deserialize, Serialize};
use std::fmt;

const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        })
    }
}

/// Size of one output page in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageGeometry {
    pub fn from_pixels(width_px: u32, height_px: u32, dpi: u32) -> Self {
        let dpi = dpi as f32;
        Self {
            width_pt: width_px as f32 * POINTS_PER_INCH / dpi,
            height_pt: height_px as f32 * POINTS_PER_INCH / dpi,
        }
    }

    /// Landscape only when strictly wider than tall; squares are portrait.
    pub fn orientation(&self) -> Orientation {
        if self.width_pt > self.height_pt {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Nominal `[short, long]` size plus orientation flag.
    pub fn page_box(&self) -> PageBox {
        PageBox {
            format: [
                self.width_pt.min(self.height_pt),
                self.width_pt.max(self.height_pt),
            ],
            orientation: self.orientation(),
        }
    }

    /// Rejects zero, negative or non-finite sides. `page` is 1-indexed.
    pub fn validate(&self, page: usize) -> Result<(), AssemblyError> {
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if usable(self.width_pt) && usable(self.height_pt) {
            Ok(())
        } else {
            Err(AssemblyError::DegeneratePage {
                page,
                width_pt: self.width_pt,
                height_pt: self.height_pt,
            })
        }
    }
}

/// Page size in "format + orientation" form: `format` is always
/// `[short side, long side]`, and `orientation` says which one runs
/// horizontally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub format: [f32; 2],
    pub orientation: Orientation,
}

impl PageBox {
    /// `[llx, lly, urx, ury]` for a `/MediaBox` entry.
    pub fn media_box(&self) -> [f32; 4] {
        let [short, long] = self.format;
        match self.orientation {
            Orientation::Portrait => [0.0, 0.0, short, long],
            Orientation::Landscape => [0.0, 0.0, long, short],
        }
    }
}

//! # pdf-fixer
//!
//! Repair PDFs that other tools refuse to open by rebuilding them from
//! pictures of their own pages.
//!
//! ## How it works
//!
//! A damaged or exotic PDF is often still *renderable*: viewers paper over
//! broken cross-reference tables, odd fonts and malformed streams. This crate
//! asks pdfium to draw every page, compresses each drawing as a JPEG, and
//! writes a brand-new document with one full-page image per page. The result
//! looks like the original but has none of its structure, so any reader can
//! open it. Text is no longer selectable; that is the trade.
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Load      renderer thread opens the document, reports N pages
//!  ├─ 2. Render    page 0 … N-1 in order, one request at a time (150 DPI)
//!  ├─ 3. Encode    RGBA → JPEG (quality 0.85)
//!  ├─ 4. Close     the source document is released on every path
//!  └─ 5. Assemble  fresh PDF, page size = pixels × 72 / DPI
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_fixer::{fix_file, FixConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fixed = fix_file("broken.pdf", "broken - Fixed.pdf", &FixConfig::default()).await?;
//!     eprintln!("{} pages, {} bytes", fixed.page_count(), fixed.stats.output_bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-fixer` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## PDFium
//!
//! The pdfium shared library is located through `PDFIUM_LIB_PATH`, then the
//! `pdfium-fetch` cache, and downloaded there on first use.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FixConfig, FixConfigBuilder, DEFAULT_DPI, DEFAULT_JPEG_QUALITY};
pub use convert::{fix_bytes, fix_file, fix_sync, Fixer, PRODUCER};
pub use error::{AssemblyError, FixError};
pub use output::{FixStats, FixedDocument, PageSummary};
pub use pipeline::geometry::{Orientation, PageGeometry};
pub use pipeline::input::{default_output_path, suggested_filename};
pub use pipeline::render::{Bitmap, OpenDocument, RasterEngine};
pub use progress::{
    ChannelProgress, FixProgressCallback, NoopProgressCallback, ProgressCallback, ProgressEvent,
};

//! Pipeline stages for rebuilding a PDF from page rasters.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ geometry ──▶ assemble
//! (bytes)   (pdfium)   (JPEG)     (px → pt)    (lopdf)
//! ```
//!
//! 1. [`input`]    read the source file; derive the output name
//! 2. [`render`]   a dedicated thread owns the engine and answers
//!    [`protocol`] requests; [`pdfium`] is the production engine
//! 3. [`encode`]   RGBA raster → baseline JPEG
//! 4. [`geometry`] pixel size at a DPI → page size in points, orientation
//! 5. [`assemble`] one full-page image per page in a brand-new document

pub mod assemble;
pub mod encode;
pub mod geometry;
pub mod input;
pub mod pdfium;
pub mod protocol;
pub mod render;

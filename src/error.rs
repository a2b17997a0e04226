//! Error types for the pdf-fixer library.
//!
//! A conversion either produces a complete document or fails with exactly one
//! [`FixError`]. There is no partial output: a single unreadable page aborts
//! the whole run, because a repaired file silently missing pages is worse than
//! no file.
//!
//! Failures inside the renderer thread travel back as a
//! [`crate::pipeline::protocol::RendererFailure`] payload and are mapped into
//! [`FixError::Load`] or [`FixError::Render`] by the controller.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-fixer library.
#[derive(Debug, Error)]
pub enum FixError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the input.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The engine could not open the bytes as a document.
    #[error("Could not open '{filename}' as a PDF: {message}")]
    Load { filename: String, message: String },

    /// Rasterising one page failed (1-indexed page number).
    #[error("Rendering page {page} failed: {message}")]
    Render { page: usize, message: String },

    /// JPEG compression of a rendered page failed.
    #[error("Encoding page {page} as JPEG failed: {detail}")]
    Encode { page: usize, detail: String },

    /// The collected pages could not be turned into an output document.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    // ── Renderer thread errors ────────────────────────────────────────────
    /// The rasterisation engine could not be initialised on the worker.
    #[error(
        "PDF rendering engine unavailable: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If that failed you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    EngineUnavailable(String),

    /// The renderer thread stopped before answering.
    #[error("Renderer thread exited unexpectedly")]
    RendererGone,

    /// A reply did not match the outstanding request.
    #[error("Renderer protocol violation: {0}")]
    Protocol(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why the rendered pages could not be assembled into a PDF.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    /// The source document reported zero pages.
    #[error("Cannot build a PDF without pages: the input document has none")]
    NoPages,

    /// A page has a zero or non-finite side (1-indexed page number).
    #[error("Page {page} has degenerate geometry ({width_pt} x {height_pt} pt)")]
    DegeneratePage {
        page: usize,
        width_pt: f32,
        height_pt: f32,
    },

    /// lopdf failed to encode a content stream or serialise the file.
    #[error("Failed to serialise output PDF: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_display_names_file_and_cause() {
        let e = FixError::Load {
            filename: "scan.pdf".into(),
            message: "format error: not a PDF".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.pdf"), "got: {msg}");
        assert!(msg.contains("not a PDF"), "got: {msg}");
    }

    #[test]
    fn render_display_is_one_indexed() {
        let e = FixError::Render {
            page: 3,
            message: "bad xref".into(),
        };
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn assembly_error_converts_transparently() {
        let e: FixError = AssemblyError::NoPages.into();
        assert!(matches!(e, FixError::Assembly(AssemblyError::NoPages)));
        assert_eq!(e.to_string(), AssemblyError::NoPages.to_string());
    }

    #[test]
    fn degenerate_page_display() {
        let e = AssemblyError::DegeneratePage {
            page: 2,
            width_pt: 0.0,
            height_pt: 792.0,
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 2"), "got: {msg}");
        assert!(msg.contains("792"), "got: {msg}");
    }
}

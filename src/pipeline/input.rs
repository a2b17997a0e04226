//! Input handling: reading the source file and naming the repaired one.
//!
//! The input is not checked for a `%PDF` header or anything else here. Files
//! that need repair are exactly the ones with odd structure, so the engine is
//! the only judge of whether the bytes can be opened.

use crate::error::FixError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

static PDF_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

const FIXED_SUFFIX: &str = " - Fixed.pdf";

/// Read the whole input file, mapping the common failures to [`FixError`].
pub async fn read_input(path: &Path) -> Result<Vec<u8>, FixError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) => Err(match e.kind() {
            std::io::ErrorKind::NotFound => FixError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => FixError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => FixError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        }),
    }
}

/// The name shown to the user and handed to the engine: the final path
/// component, or the whole path when there is none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// `"report.PDF"` → `"report - Fixed.pdf"`.
///
/// Only a trailing `.pdf` (any case) is stripped; other extensions are kept.
pub fn suggested_filename(display_name: &str) -> String {
    let base = PDF_EXTENSION.replace(display_name, "");
    format!("{base}{FIXED_SUFFIX}")
}

/// Default output location: the suggested name next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let name = suggested_filename(&display_name(input));
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggested_name_strips_pdf_extension_case_insensitively() {
        assert_eq!(suggested_filename("report.pdf"), "report - Fixed.pdf");
        assert_eq!(suggested_filename("SCAN.PDF"), "SCAN - Fixed.pdf");
        assert_eq!(suggested_filename("mixed.Pdf"), "mixed - Fixed.pdf");
    }

    #[test]
    fn suggested_name_keeps_other_extensions() {
        assert_eq!(suggested_filename("notes"), "notes - Fixed.pdf");
        assert_eq!(suggested_filename("a.pdf.bak"), "a.pdf.bak - Fixed.pdf");
        assert_eq!(suggested_filename("my.pdf.pdf"), "my.pdf - Fixed.pdf");
    }

    #[test]
    fn display_name_is_last_component() {
        assert_eq!(display_name(Path::new("/tmp/in/doc.pdf")), "doc.pdf");
        assert_eq!(display_name(Path::new("doc.pdf")), "doc.pdf");
    }

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("/data/in/Invoice.PDF")),
            PathBuf::from("/data/in/Invoice - Fixed.pdf")
        );
        assert_eq!(
            default_output_path(Path::new("x.pdf")),
            PathBuf::from("x - Fixed.pdf")
        );
    }

    #[tokio::test]
    async fn missing_file_maps_to_not_found() {
        let err = read_input(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, FixError::FileNotFound { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.pdf");
        std::fs::write(&path, b"%PDF-1.4 whatever").unwrap();
        assert_eq!(read_input(&path).await.unwrap(), b"%PDF-1.4 whatever");
    }
}

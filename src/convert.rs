//! The controller: drives a repair from input bytes to output bytes.
//!
//! ## Page loop
//!
//! ```text
//! load ──▶ render 0 ──▶ encode 0 ──▶ render 1 ──▶ encode 1 ──▶ … ──▶ close ──▶ assemble
//! ```
//!
//! Exactly one request is outstanding at any time and each page is encoded
//! before the next one is requested, so at most one raw pixel buffer is alive.
//! Rendering page `i + 1` while encoding page `i` would be faster; it is not
//! done, which keeps memory flat on documents with hundreds of pages.
//!
//! `close` is sent after the loop whether it succeeded or not, so a failed
//! conversion never leaves the source document open in the renderer.
//!
//! There is no timeout: a page that hangs the engine stalls the conversion.

use crate::config::FixConfig;
use crate::error::FixError;
use crate::output::{FixStats, FixedDocument, PageSummary};
use crate::pipeline::assemble::{assemble_document, PageRecord};
use crate::pipeline::encode::encode_page;
use crate::pipeline::geometry::PageGeometry;
use crate::pipeline::input;
use crate::pipeline::pdfium::PdfiumEngine;
use crate::pipeline::render::{RasterEngine, RendererHandle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Written into the `/Producer` entry of every output.
pub const PRODUCER: &str = concat!("pdf-fixer ", env!("CARGO_PKG_VERSION"));

/// A controller bound to one renderer thread.
///
/// Reuse a `Fixer` to repair many documents without re-binding the engine:
/// each [`Fixer::fix`] loads its input over whatever the previous run left.
pub struct Fixer {
    renderer: RendererHandle,
}

#[derive(Default)]
struct Timings {
    render: Duration,
    encode: Duration,
}

impl Fixer {
    /// Start a renderer backed by pdfium.
    pub async fn new(config: &FixConfig) -> Result<Self, FixError> {
        let library = config.pdfium_library.clone();
        Self::with_engine(move || PdfiumEngine::bind(library.as_deref())).await
    }

    /// Start a renderer backed by any [`RasterEngine`]. The factory runs on
    /// the renderer thread.
    pub async fn with_engine<E, F>(make_engine: F) -> Result<Self, FixError>
    where
        E: RasterEngine + 'static,
        F: FnOnce() -> Result<E, String> + Send + 'static,
    {
        Ok(Self {
            renderer: RendererHandle::spawn(make_engine).await?,
        })
    }

    /// Repair one document held in memory.
    ///
    /// `bytes` moves to the renderer. `display_name` is used for error
    /// messages and to derive [`FixedDocument::filename`].
    pub async fn fix(
        &mut self,
        bytes: Vec<u8>,
        display_name: &str,
        config: &FixConfig,
    ) -> Result<FixedDocument, FixError> {
        config.validate()?;
        let started = Instant::now();
        let input_bytes = bytes.len();
        info!(
            "Repairing '{}' ({} bytes) at {} DPI, JPEG quality {}",
            display_name, input_bytes, config.dpi, config.jpeg_quality
        );

        let mut timings = Timings::default();
        let collected = self
            .collect_pages(bytes, display_name, config, &mut timings)
            .await;
        self.renderer.close();
        let records = collected?;

        let pages: Vec<PageSummary> = records
            .iter()
            .enumerate()
            .map(|(i, r)| PageSummary {
                page_num: i + 1,
                width_px: r.width_px,
                height_px: r.height_px,
                width_pt: r.geometry.width_pt,
                height_pt: r.geometry.height_pt,
                orientation: r.geometry.orientation(),
                jpeg_bytes: r.jpeg.len(),
            })
            .collect();

        let assemble_start = Instant::now();
        let output = assemble_document(records, PRODUCER)?;
        let assemble_duration = assemble_start.elapsed();

        let stats = FixStats {
            total_pages: pages.len(),
            dpi: config.dpi,
            jpeg_quality: config.jpeg_quality,
            input_bytes,
            output_bytes: output.len(),
            render_duration_ms: timings.render.as_millis() as u64,
            encode_duration_ms: timings.encode.as_millis() as u64,
            assemble_duration_ms: assemble_duration.as_millis() as u64,
            total_duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            "Repaired '{}': {} pages, {} → {} bytes in {}ms",
            display_name, stats.total_pages, input_bytes, stats.output_bytes, stats.total_duration_ms
        );

        Ok(FixedDocument {
            bytes: output,
            filename: input::suggested_filename(display_name),
            pages,
            stats,
        })
    }

    /// Stop the renderer thread.
    pub async fn shutdown(self) -> Result<(), FixError> {
        self.renderer.shutdown().await
    }

    /// Load, then render and encode every page in order.
    async fn collect_pages(
        &mut self,
        bytes: Vec<u8>,
        display_name: &str,
        config: &FixConfig,
        timings: &mut Timings,
    ) -> Result<Vec<PageRecord>, FixError> {
        let progress = config.progress_callback.as_deref();
        let dpi = config.dpi;

        let load_start = Instant::now();
        let total = self.renderer.load(bytes, display_name).await?;
        timings.render += load_start.elapsed();

        if let Some(cb) = progress {
            cb.on_conversion_start(total);
        }

        let mut records = Vec::with_capacity(total);
        for page_index in 0..total {
            let page_num = page_index + 1;
            if let Some(cb) = progress {
                cb.on_page_start(page_num, total);
            }

            match self.process_page(page_index, config, timings).await {
                Ok(record) => {
                    records.push(record);
                    if let Some(cb) = progress {
                        cb.on_page_complete(page_num, total);
                    }
                }
                Err(e) => {
                    warn!("Page {}/{} failed: {}", page_num, total, e);
                    if let Some(cb) = progress {
                        cb.on_page_error(page_num, total, &e.to_string());
                        cb.on_conversion_complete(total, records.len());
                    }
                    return Err(e);
                }
            }
        }

        if let Some(cb) = progress {
            cb.on_conversion_complete(total, records.len());
        }
        debug!("Collected {} pages at {} DPI", records.len(), dpi);
        Ok(records)
    }

    async fn process_page(
        &mut self,
        page_index: usize,
        config: &FixConfig,
        timings: &mut Timings,
    ) -> Result<PageRecord, FixError> {
        let render_start = Instant::now();
        let page = self.renderer.render(page_index, config.dpi).await?;
        timings.render += render_start.elapsed();

        let (width_px, height_px) = (page.width, page.height);
        let geometry = PageGeometry::from_pixels(width_px, height_px, config.dpi);
        geometry.validate(page_index + 1)?;

        // JPEG compression is CPU-bound; keep it off the async workers. The
        // raw buffer is dropped on the blocking thread once encoded.
        let quality = config.jpeg_quality;
        let encode_start = Instant::now();
        let jpeg = tokio::task::spawn_blocking(move || encode_page(&page, quality))
            .await
            .map_err(|e| FixError::Internal(format!("Encode task panicked: {e}")))?
            .map_err(|e| FixError::Encode {
                page: page_index + 1,
                detail: e.to_string(),
            })?;
        timings.encode += encode_start.elapsed();

        Ok(PageRecord {
            jpeg,
            width_px,
            height_px,
            geometry,
        })
    }
}

/// Repair a PDF held in memory using a fresh pdfium renderer.
///
/// # Example
/// ```rust,no_run
/// use pdf_fixer::{fix_bytes, FixConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("broken.pdf")?;
/// let fixed = fix_bytes(bytes, "broken.pdf", &FixConfig::default()).await?;
/// std::fs::write(&fixed.filename, &fixed.bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn fix_bytes(
    bytes: Vec<u8>,
    display_name: &str,
    config: &FixConfig,
) -> Result<FixedDocument, FixError> {
    let mut fixer = Fixer::new(config).await?;
    let result = fixer.fix(bytes, display_name, config).await;
    if let Err(e) = fixer.shutdown().await {
        warn!("Renderer shutdown failed: {}", e);
    }
    result
}

/// Repair the PDF at `input` and write the result to `output`.
///
/// The output is written to a temporary file in the same directory and
/// moved into place, so a failed run never leaves a partial file behind.
pub async fn fix_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &FixConfig,
) -> Result<FixedDocument, FixError> {
    let input = input.as_ref();
    let output = output.as_ref().to_path_buf();

    let bytes = input::read_input(input).await?;
    let mut fixed = fix_bytes(bytes, &input::display_name(input), config).await?;

    fixed.bytes = write_output(output, std::mem::take(&mut fixed.bytes)).await?;
    Ok(fixed)
}

/// Write `data` atomically on a blocking thread and hand the buffer back.
async fn write_output(path: PathBuf, data: Vec<u8>) -> Result<Vec<u8>, FixError> {
    let target = path.clone();
    let (data, result) = tokio::task::spawn_blocking(move || {
        let result = write_atomically(&target, &data);
        (data, result)
    })
    .await
    .map_err(|e| FixError::Internal(format!("Write task panicked: {e}")))?;

    result.map_err(|source| FixError::OutputWriteFailed {
        path: path.clone(),
        source,
    })?;
    info!("Wrote {}", path.display());
    Ok(data)
}

/// Synchronous wrapper around [`fix_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn fix_sync(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &FixConfig,
) -> Result<FixedDocument, FixError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FixError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(fix_file(input, output, config))
}

fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

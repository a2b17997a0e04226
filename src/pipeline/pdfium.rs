//! Production [`RasterEngine`] backed by pdfium-render.
//!
//! The [`Pdfium`] binding and every document opened through it stay on the
//! renderer thread (see [`super::render`]).

use crate::pipeline::render::{Bitmap, OpenDocument, RasterEngine};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    /// Bind the library at `library`, or locate/download one via
    /// `pdfium-fetch` when `None`.
    pub fn bind(library: Option<&Path>) -> Result<Self, String> {
        let pdfium = match library {
            Some(path) => pdfium_fetch::bind(path),
            None => pdfium_fetch::fetch_and_bind(),
        }
        .map_err(|e| e.to_string())?;
        Ok(Self { pdfium })
    }
}

impl RasterEngine for PdfiumEngine {
    type Document<'a> = PdfiumDocument<'a>;

    fn open<'a>(&'a self, bytes: Vec<u8>, filename: &str) -> Result<PdfiumDocument<'a>, String> {
        debug!("Opening '{}' ({} bytes)", filename, bytes.len());
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(bytes, None)
            .map_err(|e| format!("{e:?}"))?;
        Ok(PdfiumDocument { document })
    }
}

pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl OpenDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn rasterize(&self, page_index: usize, dpi: u32) -> Result<Bitmap, String> {
        let index = u16::try_from(page_index)
            .map_err(|_| format!("page index {page_index} exceeds pdfium's page limit"))?;
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|e| format!("{e:?}"))?;

        // Output size is the page box scaled by dpi/72; the raster starts
        // opaque white so transparent page areas come out as paper.
        let scale = dpi as f32 / POINTS_PER_INCH;
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .set_clear_color(PdfColor::new(255, 255, 255, 255))
            .render_form_data(true);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("{e:?}"))?;
        let rgba = bitmap.as_image().into_rgba8();
        let (width, height) = rgba.dimensions();

        // `bitmap` and `page` drop here, before the pixels leave the thread.
        Ok(Bitmap {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

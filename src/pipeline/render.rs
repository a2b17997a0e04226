//! The renderer: a dedicated thread that owns the open source document.
//!
//! ## Why a thread of its own?
//!
//! pdfium keeps thread-local state and its document handles are neither
//! `Send` nor `Sync`. Binding the library, opening the document and drawing
//! pages therefore all happen on one OS thread, and the rest of the crate
//! talks to it only through the messages in [`super::protocol`]. The open
//! document is a local of that thread: nothing outside can reach it, and
//! replacing or closing it drops the old handle on the spot.
//!
//! [`RasterEngine`] and [`OpenDocument`] are the seam to the opaque
//! parser/rasteriser. Production uses [`super::pdfium::PdfiumEngine`]; tests
//! plug in scripted engines.

use crate::error::FixError;
use crate::pipeline::protocol::{RenderedPage, RendererFailure, Reply, Request};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Opens documents from bytes.
///
/// Implementations are created on, and never leave, the renderer thread.
pub trait RasterEngine {
    /// An open document; may borrow the engine.
    type Document<'a>: OpenDocument
    where
        Self: 'a;

    /// Parse `bytes`. `filename` is informational (format sniffing, logs).
    fn open<'a>(&'a self, bytes: Vec<u8>, filename: &str) -> Result<Self::Document<'a>, String>;
}

/// A document held open by the renderer.
///
/// Per-page resources (page objects, bitmaps, devices) must be released
/// before `rasterize` returns; only the document itself persists.
pub trait OpenDocument {
    fn page_count(&self) -> usize;

    /// Draw page `page_index` at `dpi` onto an opaque white RGBA raster.
    fn rasterize(&self, page_index: usize, dpi: u32) -> Result<Bitmap, String>;
}

/// Output of [`OpenDocument::rasterize`]: packed RGBA rows.
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// The controller's end of the renderer thread.
///
/// Methods take `&mut self`, so a handle can never have two requests in
/// flight. Dropping the handle closes the request channel and the thread
/// exits after finishing its current request.
pub struct RendererHandle {
    requests: mpsc::UnboundedSender<Request>,
    replies: mpsc::UnboundedReceiver<Reply>,
    /// A request was sent but its reply never consumed (caller future dropped).
    awaiting_reply: bool,
    worker: Option<thread::JoinHandle<()>>,
}

impl RendererHandle {
    /// Start the renderer thread and build its engine there.
    ///
    /// Resolves once the engine is ready, or fails with
    /// [`FixError::EngineUnavailable`] carrying the factory's message.
    pub async fn spawn<E, F>(make_engine: F) -> Result<Self, FixError>
    where
        E: RasterEngine + 'static,
        F: FnOnce() -> Result<E, String> + Send + 'static,
    {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), String>>();

        let worker = thread::Builder::new()
            .name("pdf-renderer".into())
            .spawn(move || {
                let engine = match make_engine() {
                    Ok(engine) => engine,
                    Err(reason) => {
                        let _ = ready_tx.send(Err(reason));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                serve(&engine, &mut request_rx, &reply_tx);
                debug!("Renderer thread stopped");
            })
            .map_err(|e| FixError::Internal(format!("Failed to start renderer thread: {e}")))?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => return Err(FixError::EngineUnavailable(reason)),
            // The factory panicked before reporting.
            Err(_) => return Err(FixError::RendererGone),
        }

        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            awaiting_reply: false,
            worker: Some(worker),
        })
    }

    /// Open `bytes` as the current document and return its page count.
    ///
    /// `bytes` moves to the renderer thread.
    pub async fn load(&mut self, bytes: Vec<u8>, filename: &str) -> Result<usize, FixError> {
        let request = Request::Load {
            bytes,
            filename: filename.to_string(),
        };
        match self.round_trip(request).await? {
            Reply::Loaded { page_count } => Ok(page_count),
            Reply::Error(failure) => Err(FixError::Load {
                filename: filename.to_string(),
                message: failure.message,
            }),
            other => Err(FixError::Protocol(format!(
                "expected 'loaded', got '{}'",
                other.kind()
            ))),
        }
    }

    /// Rasterise page `page_index` (0-indexed) of the current document.
    pub async fn render(&mut self, page_index: usize, dpi: u32) -> Result<RenderedPage, FixError> {
        match self.round_trip(Request::Render { page_index, dpi }).await? {
            Reply::Rendered(page) if page.page_index == page_index => Ok(page),
            Reply::Rendered(page) => Err(FixError::Protocol(format!(
                "requested page {}, received page {}",
                page_index + 1,
                page.page_index + 1
            ))),
            Reply::Error(failure) => Err(FixError::Render {
                page: page_index + 1,
                message: failure.message,
            }),
            other => Err(FixError::Protocol(format!(
                "expected 'rendered', got '{}'",
                other.kind()
            ))),
        }
    }

    /// Ask the renderer to release its document. Fire-and-forget and
    /// idempotent; a renderer that is already gone has nothing to release.
    pub fn close(&self) {
        let _ = self.requests.send(Request::Close);
    }

    /// Close the request channel and wait for the thread to exit.
    pub async fn shutdown(self) -> Result<(), FixError> {
        let Self {
            requests, worker, ..
        } = self;
        drop(requests);

        let Some(worker) = worker else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || worker.join())
            .await
            .map_err(|e| FixError::Internal(format!("Renderer join task failed: {e}")))?
            .map_err(|_| FixError::Internal("Renderer thread panicked".into()))
    }

    async fn round_trip(&mut self, request: Request) -> Result<Reply, FixError> {
        if self.awaiting_reply {
            // Discard the answer to an abandoned request so it cannot be
            // mistaken for the answer to this one.
            let stale = self.replies.recv().await.ok_or(FixError::RendererGone)?;
            warn!("Discarded stale '{}' reply from renderer", stale.kind());
            self.awaiting_reply = false;
        }

        self.requests
            .send(request)
            .map_err(|_| FixError::RendererGone)?;
        self.awaiting_reply = true;
        let reply = self.replies.recv().await.ok_or(FixError::RendererGone)?;
        self.awaiting_reply = false;
        Ok(reply)
    }
}

/// Request loop of the renderer thread. Returns when the controller hangs up.
fn serve<E: RasterEngine>(
    engine: &E,
    requests: &mut mpsc::UnboundedReceiver<Request>,
    replies: &mpsc::UnboundedSender<Reply>,
) {
    let mut current: Option<E::Document<'_>> = None;

    while let Some(request) = requests.blocking_recv() {
        let reply = match request {
            Request::Load { bytes, filename } => {
                if current.take().is_some() {
                    debug!("Released previous document before loading '{}'", filename);
                }
                match engine.open(bytes, &filename) {
                    Ok(document) => {
                        let page_count = document.page_count();
                        info!("Loaded '{}': {} pages", filename, page_count);
                        current = Some(document);
                        Reply::Loaded { page_count }
                    }
                    Err(message) => {
                        warn!("Failed to load '{}': {}", filename, message);
                        Reply::Error(RendererFailure::load(message))
                    }
                }
            }
            Request::Render { page_index, dpi } => match current.as_ref() {
                Some(document) => render_page(document, page_index, dpi),
                None => Reply::Error(RendererFailure::no_document(page_index)),
            },
            Request::Close => {
                if current.take().is_some() {
                    debug!("Document released");
                }
                continue;
            }
        };

        if replies.send(reply).is_err() {
            break;
        }
    }
}

fn render_page<D: OpenDocument>(document: &D, page_index: usize, dpi: u32) -> Reply {
    let total = document.page_count();
    if page_index >= total {
        return Reply::Error(RendererFailure::render(
            page_index,
            format!("page index out of range (document has {total} pages)"),
        ));
    }

    match document.rasterize(page_index, dpi) {
        Ok(bitmap) => {
            let expected = RenderedPage::expected_len(bitmap.width, bitmap.height);
            if bitmap.pixels.len() != expected {
                return Reply::Error(RendererFailure::render(
                    page_index,
                    format!(
                        "engine returned {} bytes for a {}x{} RGBA raster (expected {})",
                        bitmap.pixels.len(),
                        bitmap.width,
                        bitmap.height,
                        expected
                    ),
                ));
            }
            debug!(
                "Rendered page {} → {}x{} px",
                page_index + 1,
                bitmap.width,
                bitmap.height
            );
            Reply::Rendered(RenderedPage {
                page_index,
                width: bitmap.width,
                height: bitmap.height,
                pixels: bitmap.pixels,
            })
        }
        Err(message) => Reply::Error(RendererFailure::render(page_index, message)),
    }
}

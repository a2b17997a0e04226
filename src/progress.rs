//! Progress-callback trait for per-page repair events.
//!
//! Inject an [`Arc<dyn FixProgressCallback>`] via
//! [`crate::config::FixConfigBuilder::progress_callback`]. Pages are processed
//! strictly in order, one at a time, so events for one conversion never
//! overlap and the `completed` counter passed to
//! [`FixProgressCallback::on_page_complete`] only ever grows, ending at
//! `(total, total)` on success.
//!
//! # Example
//!
//! ```rust
//! use pdf_fixer::{FixConfig, FixProgressCallback};
//! use std::sync::Arc;
//!
//! struct Percent;
//!
//! impl FixProgressCallback for Percent {
//!     fn on_page_complete(&self, completed: usize, total: usize) {
//!         eprintln!("{}%", completed * 100 / total);
//!     }
//! }
//!
//! let config = FixConfig::builder()
//!     .progress_callback(Arc::new(Percent))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;
use tokio::sync::mpsc;

/// Called by the controller as it walks through the pages.
///
/// All methods default to no-ops. Implementations must be `Send + Sync`
/// because one config may be shared by conversions on several tasks.
pub trait FixProgressCallback: Send + Sync {
    /// The source document is open and has `total_pages` pages.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// The render request for `page_num` (1-indexed) is about to be sent.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// `completed` pages are rendered and encoded.
    fn on_page_complete(&self, completed: usize, total_pages: usize) {
        let _ = (completed, total_pages);
    }

    /// `page_num` failed; no further pages will be attempted.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// The page loop ended, after `completed` of `total_pages` pages.
    fn on_conversion_complete(&self, total_pages: usize, completed: usize) {
        let _ = (total_pages, completed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl FixProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::FixConfig`].
pub type ProgressCallback = Arc<dyn FixProgressCallback>;

/// One progress notification, as forwarded by [`ChannelProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started { total: usize },
    PageStarted { page: usize, total: usize },
    PageCompleted { completed: usize, total: usize },
    PageFailed { page: usize, total: usize, error: String },
    Finished { total: usize, completed: usize },
}

/// Forwards every callback as a [`ProgressEvent`] over a tokio channel.
///
/// Send errors are ignored: a dropped receiver only means nobody is watching.
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl FixProgressCallback for ChannelProgress {
    fn on_conversion_start(&self, total_pages: usize) {
        self.emit(ProgressEvent::Started { total: total_pages });
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        self.emit(ProgressEvent::PageStarted {
            page: page_num,
            total: total_pages,
        });
    }

    fn on_page_complete(&self, completed: usize, total_pages: usize) {
        self.emit(ProgressEvent::PageCompleted {
            completed,
            total: total_pages,
        });
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        self.emit(ProgressEvent::PageFailed {
            page: page_num,
            total: total_pages,
            error: error.to_string(),
        });
    }

    fn on_conversion_complete(&self, total_pages: usize, completed: usize) {
        self.emit(ProgressEvent::Finished {
            total: total_pages,
            completed,
        });
    }
}

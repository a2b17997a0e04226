//! Messages exchanged between the controller and the renderer thread.
//!
//! | Request  | Reply                                   |
//! |----------|-----------------------------------------|
//! | `Load`   | `Loaded { page_count }` or `Error`      |
//! | `Render` | `Rendered(RenderedPage)` or `Error`     |
//! | `Close`  | none                                    |
//!
//! Large buffers move through the channel: the input bytes are owned by the
//! renderer once `Load` is sent, and the pixel buffer of a `Rendered` reply is
//! owned by the controller once received. Nothing is copied on either hop.
//!
//! The controller keeps at most one request outstanding, so a reply always
//! answers the last request sent. `Rendered` still echoes the page index so
//! the controller can detect a mismatch instead of mis-assigning pixels.

use std::fmt;

/// Controller → renderer.
#[derive(Debug)]
pub enum Request {
    /// Open `bytes` as the current document, releasing any previous one.
    Load { bytes: Vec<u8>, filename: String },
    /// Rasterise one page (0-indexed) of the current document.
    Render { page_index: usize, dpi: u32 },
    /// Release the current document. Never answered.
    Close,
}

/// Renderer → controller.
#[derive(Debug)]
pub enum Reply {
    Loaded { page_count: usize },
    Rendered(RenderedPage),
    Error(RendererFailure),
}

impl Reply {
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Loaded { .. } => "loaded",
            Reply::Rendered(_) => "rendered",
            Reply::Error(_) => "error",
        }
    }
}

/// Raw raster of one page.
///
/// `pixels` is tightly packed RGBA, `width * height * 4` bytes, top row first.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub page_index: usize,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderedPage {
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }
}

// Pixel buffers are megabytes; keep them out of debug output.
impl fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page_index", &self.page_index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &format_args!("<{} bytes>", self.pixels.len()))
            .finish()
    }
}

/// Where in the renderer a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Load,
    Render { page_index: usize },
    /// `Render` arrived while no document was open.
    NoDocument { page_index: usize },
}

/// Typed error payload of a [`Reply::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererFailure {
    pub stage: FailureStage,
    pub message: String,
}

impl RendererFailure {
    pub fn load(message: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Load,
            message: message.into(),
        }
    }

    pub fn render(page_index: usize, message: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Render { page_index },
            message: message.into(),
        }
    }

    pub fn no_document(page_index: usize) -> Self {
        Self {
            stage: FailureStage::NoDocument { page_index },
            message: "no document is open".to_string(),
        }
    }
}

impl fmt::Display for RendererFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            FailureStage::Load => write!(f, "load: {}", self.message),
            FailureStage::Render { page_index } | FailureStage::NoDocument { page_index } => {
                write!(f, "render page {}: {}", page_index + 1, self.message)
            }
        }
    }
}

//! Controller integration tests against a scripted raster engine.
//!
//! No pdfium involved: the fake engine "opens" documents written as
//! `pdf:WxH,WxH,…` (page sizes in points), records every call it receives,
//! and renders plain white rasters of the matching pixel size.

use pdf_fixer::{
    AssemblyError, Bitmap, ChannelProgress, FixConfig, FixError, Fixer, OpenDocument,
    Orientation, ProgressEvent, RasterEngine,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fake engine ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Open(String),
    Render { page_index: usize, dpi: u32 },
}

#[derive(Clone, Default)]
struct Probe {
    calls: Arc<Mutex<Vec<Call>>>,
    live: Arc<AtomicUsize>,
}

impl Probe {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn rendered(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Render { page_index, .. } => Some(page_index),
                _ => None,
            })
            .collect()
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// `close` is fire-and-forget; give the renderer thread a moment.
    async fn wait_until_released(&self) {
        for _ in 0..200 {
            if self.live() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("document still open: {} live", self.live());
    }
}

struct FakeEngine {
    probe: Probe,
}

struct FakeDoc {
    /// Page sizes in points; a zero width makes that page fail.
    pages: Vec<(f32, f32)>,
    probe: Probe,
}

impl Drop for FakeDoc {
    fn drop(&mut self) {
        self.probe.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RasterEngine for FakeEngine {
    type Document<'a> = FakeDoc;

    fn open<'a>(&'a self, bytes: Vec<u8>, filename: &str) -> Result<Self::Document<'a>, String> {
        self.probe
            .calls
            .lock()
            .unwrap()
            .push(Call::Open(filename.to_string()));

        let text = String::from_utf8(bytes).map_err(|_| "binary garbage".to_string())?;
        let body = text
            .strip_prefix("pdf:")
            .ok_or_else(|| "no PDF header".to_string())?;
        let pages = body
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|size| {
                let (w, h) = size.split_once('x').ok_or("bad size")?;
                Ok((
                    w.parse().map_err(|_| "bad width")?,
                    h.parse().map_err(|_| "bad height")?,
                ))
            })
            .collect::<Result<Vec<(f32, f32)>, &str>>()
            .map_err(str::to_string)?;

        self.probe.live.fetch_add(1, Ordering::SeqCst);
        Ok(FakeDoc {
            pages,
            probe: self.probe.clone(),
        })
    }
}

impl OpenDocument for FakeDoc {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn rasterize(&self, page_index: usize, dpi: u32) -> Result<Bitmap, String> {
        self.probe
            .calls
            .lock()
            .unwrap()
            .push(Call::Render { page_index, dpi });

        let (w_pt, h_pt) = self.pages[page_index];
        if w_pt == 0.0 {
            return Err("content stream is corrupt".into());
        }
        let width = (w_pt * dpi as f32 / 72.0).round() as u32;
        let height = (h_pt * dpi as f32 / 72.0).round() as u32;
        Ok(Bitmap {
            width,
            height,
            pixels: vec![255; width as usize * height as usize * 4],
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

async fn fixer(probe: &Probe) -> Fixer {
    let probe = probe.clone();
    Fixer::with_engine(move || Ok(FakeEngine { probe }))
        .await
        .expect("fake engine starts")
}

fn doc(sizes: &[(u32, u32)]) -> Vec<u8> {
    let body: Vec<String> = sizes.iter().map(|(w, h)| format!("{w}x{h}")).collect();
    format!("pdf:{}", body.join(",")).into_bytes()
}

/// 72 DPI keeps rasters tiny: one pixel per point.
fn small_config() -> FixConfig {
    FixConfig::builder().dpi(72).build().unwrap()
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_page_is_rendered_once_in_order() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;

    let input = doc(&[(40, 50), (50, 40), (30, 30), (60, 20), (20, 60)]);
    let fixed = fixer.fix(input, "five.pdf", &small_config()).await.unwrap();

    assert_eq!(fixed.page_count(), 5);
    assert_eq!(probe.rendered(), vec![0, 1, 2, 3, 4]);
    assert!(probe
        .calls()
        .iter()
        .all(|c| !matches!(c, Call::Render { dpi, .. } if *dpi != 72)));

    let out = lopdf::Document::load_mem(&fixed.bytes).expect("output parses");
    assert_eq!(out.get_pages().len(), 5);
    assert_eq!(fixed.stats.total_pages, 5);
    assert_eq!(fixed.stats.output_bytes, fixed.bytes.len());
}

#[tokio::test]
async fn progress_is_monotonic_and_ends_at_total() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;
    let (cb, mut rx) = ChannelProgress::new();
    let config = FixConfig::builder()
        .dpi(72)
        .progress_callback(cb)
        .build()
        .unwrap();

    fixer
        .fix(doc(&[(10, 10), (10, 10), (10, 10)]), "p.pdf", &config)
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.first(), Some(&ProgressEvent::Started { total: 3 }));
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Finished {
            total: 3,
            completed: 3
        })
    );

    let completed: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::PageCompleted { completed, total } => {
                assert_eq!(*total, 3);
                Some(*completed)
            }
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![1, 2, 3]);
}

#[tokio::test]
async fn letter_pages_keep_size_and_orientation() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;

    let fixed = fixer
        .fix(doc(&[(612, 792), (792, 612)]), "letter.pdf", &FixConfig::default())
        .await
        .unwrap();

    let portrait = &fixed.pages[0];
    assert_eq!((portrait.width_px, portrait.height_px), (1275, 1650));
    assert_eq!((portrait.width_pt, portrait.height_pt), (612.0, 792.0));
    assert_eq!(portrait.orientation, Orientation::Portrait);

    let landscape = &fixed.pages[1];
    assert_eq!((landscape.width_px, landscape.height_px), (1650, 1275));
    assert_eq!((landscape.width_pt, landscape.height_pt), (792.0, 612.0));
    assert_eq!(landscape.orientation, Orientation::Landscape);
}

#[tokio::test]
async fn same_input_gives_same_output() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;
    let input = doc(&[(30, 40), (40, 30)]);

    let a = fixer.fix(input.clone(), "x.pdf", &small_config()).await.unwrap();
    let b = fixer.fix(input, "x.pdf", &small_config()).await.unwrap();

    assert_eq!(a.page_count(), b.page_count());
    assert_eq!(a.pages, b.pages);
}

#[tokio::test]
async fn output_name_is_derived_from_input() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;
    let fixed = fixer
        .fix(doc(&[(10, 10)]), "Quarterly Report.PDF", &small_config())
        .await
        .unwrap();
    assert_eq!(fixed.filename, "Quarterly Report - Fixed.pdf");
}

#[tokio::test]
async fn load_failure_renders_nothing() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;
    let (cb, mut rx) = ChannelProgress::new();
    let config = FixConfig::builder().progress_callback(cb).build().unwrap();

    let err = fixer
        .fix(b"\x00\x01 not a pdf".to_vec(), "junk.pdf", &config)
        .await
        .unwrap_err();

    match err {
        FixError::Load { filename, .. } => assert_eq!(filename, "junk.pdf"),
        other => panic!("expected Load, got {other:?}"),
    }
    assert!(probe.rendered().is_empty());
    assert!(drain(&mut rx).is_empty(), "no progress before a successful load");
}

#[tokio::test]
async fn fixer_is_reusable_after_a_failure() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;

    assert!(fixer
        .fix(b"garbage".to_vec(), "bad.pdf", &small_config())
        .await
        .is_err());
    let fixed = fixer
        .fix(doc(&[(10, 20)]), "good.pdf", &small_config())
        .await
        .unwrap();
    assert_eq!(fixed.page_count(), 1);
}

#[tokio::test]
async fn fixer_is_reusable_after_a_render_failure() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;

    let err = fixer
        .fix(doc(&[(10, 10), (0, 10)]), "bad.pdf", &small_config())
        .await
        .unwrap_err();
    assert!(matches!(err, FixError::Render { page: 2, .. }), "got: {err:?}");

    let fixed = fixer
        .fix(doc(&[(20, 10), (10, 20)]), "good.pdf", &small_config())
        .await
        .unwrap();
    assert_eq!(fixed.page_count(), 2);
    assert_eq!(probe.rendered(), vec![0, 1, 0, 1]);
}

#[tokio::test]
async fn empty_raster_is_degenerate_geometry() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;

    // 10 x 0 pt renders to a 10 x 0 px bitmap.
    let err = fixer
        .fix(doc(&[(10, 0), (10, 10)]), "flat.pdf", &small_config())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            FixError::Assembly(AssemblyError::DegeneratePage { page: 1, .. })
        ),
        "got: {err:?}"
    );
    assert_eq!(probe.rendered(), vec![0]);
    probe.wait_until_released().await;
}

#[tokio::test]
async fn source_is_released_after_success() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;

    fixer
        .fix(doc(&[(10, 10), (10, 10)]), "a.pdf", &small_config())
        .await
        .unwrap();
    probe.wait_until_released().await;
}

#[tokio::test]
async fn render_failure_aborts_and_still_releases() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;
    let (cb, mut rx) = ChannelProgress::new();
    let config = FixConfig::builder()
        .dpi(72)
        .progress_callback(cb)
        .build()
        .unwrap();

    let err = fixer
        .fix(doc(&[(10, 10), (10, 10), (0, 10), (10, 10)]), "c.pdf", &config)
        .await
        .unwrap_err();

    match err {
        FixError::Render { page, message } => {
            assert_eq!(page, 3);
            assert!(message.contains("corrupt"), "message: {message}");
        }
        other => panic!("expected Render, got {other:?}"),
    }
    // Nothing after the failing page is attempted.
    assert_eq!(probe.rendered(), vec![0, 1, 2]);
    probe.wait_until_released().await;

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::PageFailed { page: 3, total: 4, .. })));
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Finished {
            total: 4,
            completed: 2
        })
    );
}

#[tokio::test]
async fn zero_page_document_fails_assembly() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;

    let err = fixer
        .fix(b"pdf:".to_vec(), "empty.pdf", &small_config())
        .await
        .unwrap_err();

    assert!(
        matches!(err, FixError::Assembly(AssemblyError::NoPages)),
        "got: {err:?}"
    );
    assert!(probe.rendered().is_empty());
    probe.wait_until_released().await;
}

#[tokio::test]
async fn invalid_config_is_rejected_before_loading() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;
    let config = FixConfig {
        dpi: 10,
        ..FixConfig::default()
    };

    let err = fixer
        .fix(doc(&[(10, 10)]), "a.pdf", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, FixError::InvalidConfig(_)), "got: {err:?}");
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn engine_that_fails_to_start_is_reported() {
    let result = Fixer::with_engine(|| -> Result<FakeEngine, String> {
        Err("libpdfium.so: cannot open shared object file".into())
    })
    .await;

    match result {
        Err(FixError::EngineUnavailable(msg)) => assert!(msg.contains("libpdfium")),
        Err(other) => panic!("expected EngineUnavailable, got {other:?}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn shutdown_releases_the_renderer() {
    let probe = Probe::default();
    let mut fixer = fixer(&probe).await;
    fixer
        .fix(doc(&[(10, 10)]), "a.pdf", &small_config())
        .await
        .unwrap();
    fixer.shutdown().await.unwrap();
    assert_eq!(probe.live(), 0);
}

//! CLI binary for pdf-fixer.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `FixConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_fixer::{
    default_output_path, fix_file, FixConfig, FixProgressCallback, FixedDocument,
    ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the document loads, then a page bar.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Loading");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl FixProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_pages as u64);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(error),
        ));
    }

    fn on_conversion_complete(&self, _total_pages: usize, _completed: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Writes "scan - Fixed.pdf" next to the input
  pdf-fixer scan.pdf

  # Explicit output path
  pdf-fixer broken.pdf -o repaired.pdf

  # Sharper, larger output
  pdf-fixer --dpi 300 --jpeg-quality 0.95 slides.pdf

  # Machine-readable summary
  pdf-fixer --json report.pdf > summary.json

ENVIRONMENT VARIABLES:
  PDF_FIXER_DPI            Default for --dpi
  PDF_FIXER_JPEG_QUALITY   Default for --jpeg-quality
  PDFIUM_LIB_PATH          Path to an existing libpdfium (skips download)
  PDFIUM_FETCH_CACHE_DIR   Override the pdfium cache directory
  RUST_LOG                 Override log filtering (e.g. pdf_fixer=trace)

NOTES:
  Every page is rasterised and stored as a JPEG image. The output opens
  anywhere but its text is no longer selectable or searchable.
"#;

/// Repair PDFs by re-rendering every page into a fresh document.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-fixer",
    version,
    about = "Repair PDFs by re-rendering every page into a fresh document",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to repair.
    input: PathBuf,

    /// Output path. Default: "<name> - Fixed.pdf" next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rasterisation DPI (72–600).
    #[arg(long, env = "PDF_FIXER_DPI", default_value_t = pdf_fixer::DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// JPEG quality in (0, 1].
    #[arg(long, env = "PDF_FIXER_JPEG_QUALITY", default_value_t = pdf_fixer::DEFAULT_JPEG_QUALITY)]
    jpeg_quality: f32,

    /// Use this pdfium shared library instead of the cached download.
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,

    /// Print a JSON summary of the output on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bars.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Ensure PDFium engine is available ────────────────────────────────
    if cli.pdfium_lib.is_none() && pdfium_fetch::locate().is_none() {
        if show_progress {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            tokio::task::block_in_place(|| {
                pdfium_fetch::fetch(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length() != Some(t) {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;

            dl_bar.finish_and_clear();
        } else {
            tokio::task::block_in_place(|| pdfium_fetch::fetch(None))
                .context("Failed to download PDFium engine")?;
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn FixProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let fixed = fix_file(&cli.input, &output_path, &config)
        .await
        .with_context(|| format!("Failed to repair {}", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&fixed).context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&fixed, &output_path);
    }

    Ok(())
}

/// Map CLI args to `FixConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<FixConfig> {
    if !(cli.jpeg_quality > 0.0 && cli.jpeg_quality <= 1.0) {
        anyhow::bail!(
            "--jpeg-quality must be in (0, 1], got {}",
            cli.jpeg_quality
        );
    }

    let mut builder = FixConfig::builder()
        .dpi(cli.dpi)
        .jpeg_quality(cli.jpeg_quality);
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

fn print_summary(fixed: &FixedDocument, output_path: &std::path::Path) {
    let stats = &fixed.stats;
    eprintln!(
        "{}  {} pages  {}ms  →  {}",
        green("✔"),
        stats.total_pages,
        stats.total_duration_ms,
        bold(&output_path.display().to_string()),
    );
    eprintln!(
        "   {}",
        dim(&format!(
            "{} → {} bytes at {} DPI, JPEG {:.2}",
            stats.input_bytes, stats.output_bytes, stats.dpi, stats.jpeg_quality
        )),
    );
}

//! # pdfium-fetch
//!
//! Finds a usable [PDFium](https://pdfium.googlesource.com/pdfium/) shared
//! library for `pdfium-render`, downloading a prebuilt one on first use.
//!
//! Resolution order, first match wins:
//!
//! 1. `PDFIUM_LIB_PATH` pointing at an existing file.
//! 2. The per-user cache, `{cache_dir}/pdf-fixer/pdfium-{RELEASE}/`.
//!    `PDFIUM_FETCH_CACHE_DIR` replaces `{cache_dir}/pdf-fixer`.
//! 3. A download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries),
//!    streamed through gunzip and tar straight into the cache.
//!
//! ```rust,no_run
//! let path = pdfium_fetch::fetch(Some(&|done, total| {
//!     eprint!("\r{done}/{}", total.unwrap_or(0));
//! }))?;
//! let pdfium = pdfium_fetch::bind(&path)?;
//! # Ok::<(), pdfium_fetch::FetchError>(())
//! ```

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

/// pdfium-binaries release tag (`chromium/{RELEASE}`).
pub const RELEASE: &str = "7690";

const DOWNLOAD_BASE: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Progress hook: `(bytes_received, content_length)`.
pub type DownloadProgress<'a> = &'a dyn Fn(u64, Option<u64>);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("No prebuilt PDFium for {os}/{arch}; set PDFIUM_LIB_PATH to a local build")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cannot prepare cache directory '{path}': {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Archive from {url} is unreadable: {reason}")]
    Archive { url: String, reason: String },

    #[error("Cannot load PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// One downloadable build of the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    /// Release asset name, e.g. `pdfium-linux-x64.tgz`.
    pub archive: &'static str,
    /// Path of the library inside the archive.
    pub member: &'static str,
    /// File name the library is stored under in the cache.
    pub file_name: &'static str,
}

impl Asset {
    /// The asset for the platform this binary was compiled for.
    pub fn current() -> Result<Self, FetchError> {
        Self::for_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn for_target(os: &str, arch: &str) -> Result<Self, FetchError> {
        const SO: (&str, &str) = ("lib/libpdfium.so", "libpdfium.so");
        const DYLIB: (&str, &str) = ("lib/libpdfium.dylib", "libpdfium.dylib");
        const DLL: (&str, &str) = ("bin/pdfium.dll", "pdfium.dll");

        let (archive, (member, file_name)) = match (os, arch) {
            ("linux", "x86_64") => ("pdfium-linux-x64.tgz", SO),
            ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", SO),
            ("macos", "x86_64") => ("pdfium-mac-x64.tgz", DYLIB),
            ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", DYLIB),
            ("windows", "x86_64") => ("pdfium-win-x64.tgz", DLL),
            ("windows", "aarch64") => ("pdfium-win-arm64.tgz", DLL),
            ("windows", "x86") => ("pdfium-win-x86.tgz", DLL),
            _ => {
                return Err(FetchError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };

        Ok(Self {
            archive,
            member,
            file_name,
        })
    }

    pub fn url(&self) -> String {
        format!("{DOWNLOAD_BASE}/chromium%2F{RELEASE}/{}", self.archive)
    }
}

/// Directory holding the cached library for [`RELEASE`].
pub fn cache_dir() -> PathBuf {
    let root = match std::env::var_os("PDFIUM_FETCH_CACHE_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
            .unwrap_or_else(std::env::temp_dir)
            .join("pdf-fixer"),
    };
    root.join(format!("pdfium-{RELEASE}"))
}

/// Returns an already-present library without touching the network.
pub fn locate() -> Option<PathBuf> {
    if let Some(path) = env_override() {
        return Some(path);
    }
    let asset = Asset::current().ok()?;
    let cached = cache_dir().join(asset.file_name);
    cached.is_file().then_some(cached)
}

static FETCHED: OnceLock<PathBuf> = OnceLock::new();

/// Returns a path to the library, downloading it if nothing is cached.
///
/// The resolved path is memoised for the lifetime of the process.
pub fn fetch(on_progress: Option<DownloadProgress<'_>>) -> Result<PathBuf, FetchError> {
    if let Some(path) = FETCHED.get() {
        return Ok(path.clone());
    }

    let path = match locate() {
        Some(path) => path,
        None => {
            if let Some(var) = std::env::var_os("PDFIUM_LIB_PATH") {
                warn!(
                    "PDFIUM_LIB_PATH={} does not exist, downloading instead",
                    Path::new(&var).display()
                );
            }
            download(&Asset::current()?, &cache_dir(), on_progress)?
        }
    };

    Ok(FETCHED.get_or_init(|| path).clone())
}

/// Loads the library at `path`.
pub fn bind(path: &Path) -> Result<Pdfium, FetchError> {
    debug!("Binding PDFium from {}", path.display());
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| FetchError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// [`fetch`] then [`bind`], without progress reporting.
pub fn fetch_and_bind() -> Result<Pdfium, FetchError> {
    let path = fetch(None)?;
    bind(&path)
}

fn env_override() -> Option<PathBuf> {
    let path = PathBuf::from(std::env::var_os("PDFIUM_LIB_PATH")?);
    path.is_file().then_some(path)
}

fn download(
    asset: &Asset,
    dir: &Path,
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<PathBuf, FetchError> {
    let url = asset.url();
    info!("Downloading PDFium {} from {}", RELEASE, url);

    std::fs::create_dir_all(dir).map_err(|source| FetchError::Cache {
        path: dir.to_path_buf(),
        source,
    })?;

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-fetch/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| FetchError::Download {
            url: url.clone(),
            reason: e.to_string(),
        })?;

    let response = client.get(&url).send().map_err(|e| FetchError::Download {
        url: url.clone(),
        reason: e.to_string(),
    })?;
    if !response.status().is_success() {
        return Err(FetchError::Download {
            url,
            reason: format!("HTTP {}", response.status()),
        });
    }

    let total = response.content_length();
    let body = Counting {
        inner: response,
        seen: 0,
        total,
        on_progress,
    };

    let dest = dir.join(asset.file_name);
    unpack_member(body, asset.member, &dest).map_err(|reason| FetchError::Archive {
        url: url.clone(),
        reason,
    })?;

    info!("PDFium cached at {}", dest.display());
    Ok(dest)
}

/// Streams a `.tgz` and writes the single entry named `member` to `dest`.
///
/// The entry lands in a sibling temp file first and is renamed into place,
/// so an interrupted download never leaves a truncated library behind.
fn unpack_member<R: Read>(archive: R, member: &str, dest: &Path) -> Result<(), String> {
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    let partial = dest.with_extension("partial");

    for entry in tar.entries().map_err(|e| e.to_string())? {
        let mut entry = entry.map_err(|e| e.to_string())?;
        let is_member = entry
            .path()
            .map_err(|e| e.to_string())?
            .to_str()
            .is_some_and(|p| p.trim_start_matches("./") == member);
        if !is_member {
            continue;
        }

        entry
            .unpack(&partial)
            .map_err(|e| format!("writing {}: {e}", partial.display()))?;
        return std::fs::rename(&partial, dest)
            .map_err(|e| format!("moving into {}: {e}", dest.display()));
    }

    Err(format!("'{member}' is missing from the archive"))
}

/// Reader adapter reporting cumulative bytes to the progress hook.
struct Counting<'a, R> {
    inner: R,
    seen: u64,
    total: Option<u64>,
    on_progress: Option<DownloadProgress<'a>>,
}

impl<R: Read> Read for Counting<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.seen += n as u64;
        if let Some(report) = self.on_progress {
            report(self.seen, self.total);
        }
        Ok(n)
    }
}

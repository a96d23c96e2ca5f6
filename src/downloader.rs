//! Download invoker: destination handling around the external media fetcher.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rust_embed::RustEmbed;
use tempfile::NamedTempFile;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    runtime::Runtime,
};

use crate::error::DownloadError;
use crate::progress::{parse_progress_from_line, progress_template};

/// Output file name: the remote title plus its extension
pub const FILENAME_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Optional yt-dlp binaries shipped inside the executable
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

/// Runtime used to drive the yt-dlp subprocess from blocking callers
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

fn runtime() -> Result<&'static Runtime, DownloadError> {
    RUNTIME
        .get_or_try_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
        })
        .map_err(DownloadError::Spawn)
}

/// What a backend reports while a fetch is running
#[derive(Debug, Clone, PartialEq)]
pub enum FetchUpdate {
    /// Fraction done, 0.0..=1.0
    Progress(f32),
    /// A line of human-readable output from the fetcher
    Output(String),
}

/// The external library call, treated as an opaque blocking operation.
pub trait MediaBackend: Send + Sync {
    /// Download `url`, writing to `output_template`, reporting through `on_update`.
    fn fetch(
        &self,
        url: &str,
        output_template: &str,
        on_update: &mut dyn FnMut(FetchUpdate),
    ) -> Result<(), DownloadError>;
}

/// `MediaBackend` that shells out to yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    /// yt-dlp format selector
    pub format: String,
    /// Explicit executable; resolved from the bundled assets or `PATH` when `None`
    pub binary: Option<PathBuf>,
}

impl Default for YtDlpBackend {
    fn default() -> Self {
        Self {
            format: "best".to_owned(),
            binary: None,
        }
    }
}

impl YtDlpBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn args(&self, url: &str, output_template: &str) -> Vec<String> {
        vec![
            "-f".to_owned(),
            self.format.clone(),
            "--progress-template".to_owned(),
            progress_template(),
            "--newline".to_owned(),
            "-o".to_owned(),
            output_template.to_owned(),
            url.to_owned(),
        ]
    }

    fn resolve_binary(&self) -> Result<PathBuf, DownloadError> {
        if let Some(bin) = &self.binary {
            return Ok(bin.clone());
        }
        let bin = if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" };
        match Asset::get(bin) {
            Some(data) => extract_to(&std::env::temp_dir(), bin, &data.data),
            None => Ok(PathBuf::from(bin)),
        }
    }
}

/// Writes the bundled binary into `dir` and returns its path.
///
/// An existing file is reused only when its size matches `data`; anything else
/// (a truncated earlier extraction, another version) is replaced. The new file
/// is written under a temp name and renamed into place, so a concurrent
/// launcher never executes a half-written binary.
fn extract_to(dir: &Path, name: &str, data: &[u8]) -> Result<PathBuf, DownloadError> {
    let target = dir.join(name);
    if fs::metadata(&target).is_ok_and(|m| m.is_file() && m.len() == data.len() as u64) {
        return Ok(target);
    }

    let fail = |e: std::io::Error| DownloadError::MissingBinary(format!("{}: {e}", target.display()));
    let mut tmp = NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(data).and_then(|_| tmp.as_file().sync_all()).map_err(fail)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o755)).map_err(fail)?;
    }
    tmp.persist(&target).map_err(|e| fail(e.error))?;
    tracing::debug!(path = %target.display(), "extracted bundled yt-dlp");
    Ok(target)
}

impl MediaBackend for YtDlpBackend {
    fn fetch(
        &self,
        url: &str,
        output_template: &str,
        on_update: &mut dyn FnMut(FetchUpdate),
    ) -> Result<(), DownloadError> {
        let bin = self.resolve_binary()?;
        let args = self.args(url, output_template);
        runtime()?.block_on(run_ytdlp(bin, args, on_update))
    }
}

async fn run_ytdlp(
    bin: PathBuf,
    args: Vec<String>,
    on_update: &mut dyn FnMut(FetchUpdate),
) -> Result<(), DownloadError> {
    let mut child = Command::new(&bin)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                DownloadError::MissingBinary(format!("{} not found", bin.display()))
            }
            _ => DownloadError::Spawn(e),
        })?;

    // Drain stderr alongside stdout so a chatty extractor can't fill the pipe.
    let stderr_task = child.stderr.take().map(|err| {
        tokio::spawn(async move {
            let mut last = None;
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    last = Some(line);
                }
            }
            last
        })
    });

    if let Some(out) = child.stdout.take() {
        let mut lines = BufReader::new(out).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(pct) = parse_progress_from_line(&line) {
                on_update(FetchUpdate::Progress(pct));
            } else if !line.trim().is_empty() {
                tracing::trace!(target: "video_queue::ytdlp", "{line}");
                on_update(FetchUpdate::Output(line));
            }
        }
    }

    let status = child.wait().await?;
    let last_err = match stderr_task {
        Some(task) => task.await.ok().flatten(),
        None => None,
    };

    if status.success() {
        Ok(())
    } else {
        Err(DownloadError::Backend(last_err.unwrap_or_else(|| {
            format!("yt-dlp exited with {status}")
        })))
    }
}

/// Create `path` (and parents) if missing. Calling it on an existing directory is a no-op.
pub fn ensure_directory(path: &Path) -> Result<(), DownloadError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(DownloadError::NotADirectory(path.to_path_buf()));
        }
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|source| DownloadError::CreateDir {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "created download directory");
    Ok(())
}

/// Output template for `path`; an empty path means the working directory.
pub fn output_template(path: &str) -> String {
    if path.is_empty() {
        FILENAME_TEMPLATE.to_owned()
    } else {
        Path::new(path).join(FILENAME_TEMPLATE).display().to_string()
    }
}

/// Stateless wrapper that prepares the destination and calls the backend
#[derive(Clone)]
pub struct Downloader {
    backend: Arc<dyn MediaBackend>,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new(Arc::new(YtDlpBackend::default()))
    }
}

impl Downloader {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self { backend }
    }

    /// Download `url` into `path`, creating it if needed. An empty `path` writes
    /// into the current working directory.
    pub fn download(
        &self,
        url: &str,
        path: &str,
        on_update: &mut dyn FnMut(FetchUpdate),
    ) -> Result<(), DownloadError> {
        if !path.is_empty() {
            ensure_directory(Path::new(path))?;
        }
        let template = output_template(path);
        tracing::debug!(%url, %template, "invoking media backend");
        self.backend.fetch(url, &template, on_update)
    }
}

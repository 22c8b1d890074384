//! Archive download with redirect following
//!
//! Downloads the zipball of a repository branch into a per-cycle temporary
//! directory:
//! - Redirects are followed by hand, up to a configured hop limit
//! - The access token only travels to the origin host
//! - The file name comes from `Content-Disposition`
//! - The body is streamed to disk, optionally behind a progress bar
//!
//! The returned [`DownloadResult`] owns the temporary directory; dropping it
//! removes the downloaded file.

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use plugsync_core::types::RuntimeConfig;
use reqwest::header::{
    HeaderMap, HeaderName, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_LENGTH, LOCATION,
};
use reqwest::{StatusCode, Url};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{Result, UpdateError};
use crate::repository::RepositoryRef;

/// Fallback header some servers use instead of `Location`
const URI_HEADER: HeaderName = HeaderName::from_static("uri");

/// A downloaded archive, deleted when dropped
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the downloaded file
    pub file_path: PathBuf,

    /// File name reported by the server
    pub file_name: String,

    /// Size of the downloaded file in bytes
    pub file_size: u64,

    /// Per-cycle directory holding the file
    temp_dir: TempDir,
}

impl DownloadResult {
    /// Directory holding the download
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// Downloads repository archives
pub struct ArchiveFetcher {
    /// HTTP client with redirects disabled
    client: reqwest::Client,

    /// Prefix for repository endpoints
    api_url: String,

    /// Branch whose archive is requested
    branch: String,

    /// Root for per-cycle download directories
    temp_root: PathBuf,

    /// Maximum number of redirects followed
    max_redirects: u32,

    /// Enable progress bars
    show_progress: bool,
}

impl ArchiveFetcher {
    /// Create a fetcher from runtime configuration
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.network.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.network.connect_timeout_secs))
            .timeout(Duration::from_secs(config.network.download_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.github.api_url.trim_end_matches('/').to_string(),
            branch: config.github.branch.clone(),
            temp_root: config.paths.temp_root(),
            max_redirects: config.network.max_redirects,
            show_progress: config.display.show_progress,
        })
    }

    /// Set the maximum number of redirects
    pub fn with_max_redirects(mut self, hops: u32) -> Self {
        self.max_redirects = hops;
        self
    }

    /// Enable or disable progress bars
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Root for per-cycle download directories
    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Archive endpoint for a repository
    pub fn archive_url(&self, repo: &RepositoryRef) -> Result<Url> {
        let raw = format!(
            "{}/{}/{}/zipball/{}",
            self.api_url,
            repo.owner(),
            repo.name(),
            self.branch
        );
        Url::parse(&raw).map_err(|e| UpdateError::validation("api-url", format!("{}: {}", raw, e)))
    }

    /// Download the branch archive of `repo`
    pub async fn fetch(&self, repo: &RepositoryRef, token: Option<&str>) -> Result<DownloadResult> {
        let temp_dir = self.create_temp_dir()?;
        let origin = self.archive_url(repo)?;
        let mut url = origin.clone();
        let mut hops = 0u32;

        let response = loop {
            let mut request = self.client.get(url.clone());
            if let Some(token) = token {
                if same_host(&origin, &url) {
                    request = request.header(AUTHORIZATION, format!("token {}", token));
                } else {
                    debug!("Not forwarding token to {}", url.host_str().unwrap_or_default());
                }
            }

            debug!("Requesting archive: {}", url);
            let response = request.send().await?;
            let status = response.status();

            if is_redirect(status) {
                let next = redirect_target(&url, response.headers())?;
                hops += 1;
                if hops > self.max_redirects {
                    return Err(UpdateError::TooManyRedirects {
                        url: origin.to_string(),
                        hops,
                    });
                }
                debug!("Redirect {} ({}) -> {}", hops, status, next);
                url = next;
                continue;
            }

            if !status.is_success() {
                return Err(UpdateError::upstream(
                    repo.key(),
                    format!("archive download failed with status {}", status),
                ));
            }

            break response;
        };

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| format!("{}.zip", repo.folder_prefix()));

        let file_path = temp_dir.path().join(&file_name);
        let total_size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        info!("Downloading {} for {}", file_name, repo);

        let progress = if self.show_progress {
            Some(progress_bar(total_size, &file_name))
        } else {
            None
        };

        let mut file = File::create(&file_path).map_err(|source| UpdateError::WriteFailure {
            path: file_path.clone(),
            source,
        })?;

        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk: bytes::Bytes = chunk?;
            file.write_all(&chunk)
                .map_err(|source| UpdateError::WriteFailure {
                    path: file_path.clone(),
                    source,
                })?;
            downloaded += chunk.len() as u64;
            if let Some(pb) = &progress {
                pb.set_position(downloaded);
            }
        }
        file.flush().map_err(|source| UpdateError::WriteFailure {
            path: file_path.clone(),
            source,
        })?;
        drop(file);

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let file_size = fs::metadata(&file_path).map(|m| m.len()).unwrap_or(0);
        if file_size == 0 {
            if let Err(e) = fs::remove_file(&file_path) {
                warn!("Failed to remove empty download {}: {}", file_path.display(), e);
            }
            return Err(UpdateError::EmptyDownload { file_name });
        }

        debug!("Saved {} bytes to {}", file_size, file_path.display());

        Ok(DownloadResult {
            file_path,
            file_name,
            file_size,
            temp_dir,
        })
    }

    fn create_temp_dir(&self) -> Result<TempDir> {
        fs::create_dir_all(&self.temp_root).map_err(|source| UpdateError::TempDirUnavailable {
            path: self.temp_root.clone(),
            source,
        })?;

        tempfile::Builder::new()
            .prefix("download-")
            .tempdir_in(&self.temp_root)
            .map_err(|source| UpdateError::TempDirUnavailable {
                path: self.temp_root.clone(),
                source,
            })
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Next URL of a redirect, from `Location` or `URI`
fn redirect_target(current: &Url, headers: &HeaderMap) -> Result<Url> {
    let location = headers
        .get(LOCATION)
        .or_else(|| headers.get(URI_HEADER))
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| UpdateError::RedirectWithoutLocation {
            url: current.to_string(),
        })?;

    current
        .join(location)
        .map_err(|_| UpdateError::RedirectWithoutLocation {
            url: current.to_string(),
        })
}

fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// `filename=` parameter of a Content-Disposition value, stripped of quotes
/// and directory components
pub fn filename_from_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| {
            let (key, raw) = part.split_once('=')?;
            if !key.trim().eq_ignore_ascii_case("filename") {
                return None;
            }
            let raw = raw.trim().trim_matches('"');
            let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
            if name.is_empty() || name == "." || name == ".." {
                None
            } else {
                Some(name.to_string())
            }
        })
}

fn progress_bar(total: Option<u64>, file_name: &str) -> ProgressBar {
    let pb = match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar().template(concat!(
                "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] ",
                "{bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )) {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        }
        None => ProgressBar::new_spinner(),
    };
    pb.set_message(format!("Downloading {}", file_name));
    pb
}

//! `urls.txt` download queue.
//!
//! Format: an optional leading `#` comment line, then one URL per line. URLs
//! that download successfully are removed from the queue; failed ones stay
//! for the next pass.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{Result, SubpipeError};
use crate::files::write_atomic;

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch `url` into `dest_dir`, returning the written path.
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlQueue {
    pub header: Option<String>,
    pub urls: Vec<String>,
}

impl UrlQueue {
    pub fn parse(content: &str) -> Self {
        let mut lines = content.lines().peekable();
        let header = lines
            .next_if(|l| l.starts_with('#'))
            .map(|l| l.to_string());
        let urls = lines
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self { header, urls }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in self.header.iter().chain(self.urls.iter()) {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Download every queued URL and rewrite the queue with the failures.
    /// Returns the number of files downloaded.
    pub async fn process(
        queue_path: &Path,
        downloader: &dyn Downloader,
        dest_dir: &Path,
    ) -> Result<usize> {
        let content = match tokio::fs::read_to_string(queue_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let queue = Self::parse(&content);
        if queue.urls.is_empty() {
            return Ok(0);
        }

        let mut remaining = Vec::new();
        let mut downloaded = 0;

        for url in &queue.urls {
            info!("Downloading {}...", url);
            match downloader.download(url, dest_dir).await {
                Ok(path) => {
                    info!("Downloaded {}", path.display());
                    downloaded += 1;
                }
                Err(e) => {
                    warn!("Failed to download {}: {}", url, e);
                    remaining.push(url.clone());
                }
            }
        }

        let rewritten = Self {
            header: queue.header,
            urls: remaining,
        };
        write_atomic(queue_path, &rewritten.render())?;

        Ok(downloaded)
    }
}

/// Keep only `[A-Za-z0-9_\- .]`.
pub fn clean_filename(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let re = INVALID.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_\- .]").expect("Invalid regex"));
    re.replace_all(name, "").trim().to_string()
}

fn is_youtube(url: &str) -> bool {
    url.contains("youtube.com") || url.contains("youtu.be")
}

/// Plain HTTP(S) downloader. Video-site links are rejected and stay queued.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn file_name(url: &str) -> Result<String> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let without_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
        let resource = without_scheme.split_once('/').map_or("", |(_, rest)| rest);
        let last = resource
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let name = clean_filename(last);
        if name.is_empty() || name.starts_with('.') {
            return Err(SubpipeError::Download(format!(
                "Cannot derive a file name from {url}"
            )));
        }
        Ok(name)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        if is_youtube(url) {
            return Err(SubpipeError::Download(
                "YouTube links are not supported by the HTTP downloader".to_string(),
            ));
        }

        let name = Self::file_name(url)?;
        let target = dest_dir.join(&name);
        let partial = dest_dir.join(format!("{name}.part"));

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubpipeError::Download(format!("{url} returned {status}")));
        }

        let mut file = tokio::fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => file.write_all(&bytes).await?,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(e.into());
                }
            }
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, &target).await?;
        Ok(target)
    }
}

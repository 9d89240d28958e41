pub mod download;
pub mod ffmpeg;

pub use download::{Downloader, HttpDownloader, UrlQueue};
pub use ffmpeg::FfmpegTranscoder;

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One source media file awaiting transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUnit {
    pub path: PathBuf,
    /// File name without extension.
    pub base_name: String,
    /// Container extension without the dot.
    pub extension: String,
    /// Media length, once probed.
    pub duration: Option<Duration>,
}

impl MediaUnit {
    /// Returns `None` for paths without a usable stem.
    pub fn from_path(path: &Path) -> Option<Self> {
        let base_name = path.file_stem()?.to_str()?.to_string();
        if base_name.is_empty() {
            return None;
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        Some(Self {
            path: path.to_path_buf(),
            base_name,
            extension,
            duration: None,
        })
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// File name of the archived copy in the subtitle directory.
    pub fn archive_name(&self) -> String {
        if self.extension.is_empty() {
            self.base_name.clone()
        } else {
            format!("{}.{}", self.base_name, self.extension)
        }
    }
}

/// Media transcoding and probing.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Extract the audio stream of `input` into `output`; the container is
    /// chosen from `output`'s extension.
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()>;
    async fn probe_duration(&self, input: &Path) -> Result<Duration>;
}

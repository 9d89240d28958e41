use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::Transcoder;
use crate::error::{Result, SubpipeError};

/// Transcoder backed by the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    sample_rate: u32,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            sample_rate: 16000,
        }
    }
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use executables from a specific location instead of `PATH`.
    pub fn with_binaries(mut self, ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    /// Check that both executables run.
    pub async fn check(&self) -> Result<()> {
        for binary in [&self.ffmpeg, &self.ffprobe] {
            let output = Command::new(binary)
                .arg("-version")
                .output()
                .await
                .map_err(|e| {
                    SubpipeError::Transcode(format!(
                        "{} not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}",
                        binary.display()
                    ))
                })?;

            if !output.status.success() {
                return Err(SubpipeError::Transcode(format!(
                    "{} check failed",
                    binary.display()
                )));
            }
        }

        debug!("FFmpeg is available");
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        if input == output {
            return Err(SubpipeError::Transcode(format!(
                "Input and output are the same: {}",
                input.display()
            )));
        }
        if !input.exists() {
            return Err(SubpipeError::FileNotFound(input.display().to_string()));
        }

        info!("Extracting audio from {}", input.display());

        let result = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-y", "-i"])
            .arg(input)
            .args(["-vn", "-ac", "1", "-ar"])
            .arg(self.sample_rate.to_string())
            .arg(output)
            .output()
            .await
            .map_err(|e| SubpipeError::Transcode(format!("Failed to run FFmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SubpipeError::Transcode(format!(
                "FFmpeg audio extraction failed: {}",
                stderr.trim()
            )));
        }

        if !output.exists() {
            return Err(SubpipeError::Transcode(
                "Output file was not created".to_string(),
            ));
        }

        debug!("Audio extracted to {}", output.display());
        Ok(())
    }

    async fn probe_duration(&self, input: &Path) -> Result<Duration> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(input)
            .output()
            .await
            .map_err(|e| SubpipeError::Transcode(format!("Failed to run FFprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubpipeError::Transcode(format!(
                "FFprobe failed: {}",
                stderr.trim()
            )));
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let secs: f64 = raw.trim().parse().map_err(|e| {
        SubpipeError::Transcode(format!("Failed to parse duration '{}': {e}", raw.trim()))
    })?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(SubpipeError::Transcode(format!(
            "Invalid duration '{}'",
            raw.trim()
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

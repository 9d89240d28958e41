use crate::error::{Result, SubpipeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Language labels used for translation calls and derived file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSet {
    /// Language of the transcribed captions (`<name>.<source>.srt`).
    pub source: String,
    /// First translation target; also used in the combined document.
    pub translation_a: String,
    /// Second translation target.
    pub translation_b: String,
    /// Label of the transliteration variant.
    pub transliteration: String,
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self {
            source: "zh".to_string(),
            translation_a: "en".to_string(),
            translation_b: "vi".to_string(),
            transliteration: "py".to_string(),
        }
    }
}

/// Retry and backoff settings shared by translation batches and transcription calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Pause between the two translation calls of one attempt, in seconds.
    pub inter_call_sleep_secs: f64,
    /// Pause after a failed attempt, in seconds.
    pub inter_batch_sleep_secs: f64,
    /// Growth factor applied to both pauses after each failure.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            inter_call_sleep_secs: 1.0,
            inter_batch_sleep_secs: 60.0,
            backoff_factor: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media_dir: PathBuf,
    pub subtitle_dir: PathBuf,
    pub media_extensions: Vec<String>,
    pub languages: LanguageSet,
    pub batch_size: usize,
    pub retry: RetryConfig,
    pub idle_interval_secs: f64,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub whisper_model: String,
    pub gemini_model: String,
    pub download_queue: bool,
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("./downloads"),
            subtitle_dir: PathBuf::from("./downloads/subs"),
            media_extensions: ["mp4", "mp3", "m4a", "wav"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            languages: LanguageSet::default(),
            batch_size: 100,
            retry: RetryConfig::default(),
            idle_interval_secs: 5.0,
            openai_api_key: None,
            gemini_api_key: None,
            whisper_model: "whisper-1".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            download_queue: true,
            show_progress: false,
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the default config file), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let config_path = path
            .map(Path::to_path_buf)
            .or_else(Self::config_file_path);

        if let Some(config_path) = config_path {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents)?;
            } else if path.is_some() {
                return Err(SubpipeError::FileNotFound(
                    config_path.display().to_string(),
                ));
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Ok(dir) = std::env::var("SUBPIPE_MEDIA_DIR") {
            self.media_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("SUBPIPE_SUBTITLE_DIR") {
            self.subtitle_dir = PathBuf::from(dir);
        }
        if let Ok(size) = std::env::var("SUBPIPE_BATCH_SIZE") {
            if let Ok(s) = size.parse() {
                self.batch_size = s;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.is_none() {
            return Err(SubpipeError::Config(
                "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-...".to_string(),
            ));
        }
        if self.gemini_api_key.is_none() {
            return Err(SubpipeError::Config(
                "GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey"
                    .to_string(),
            ));
        }
        self.validate_settings()
    }

    /// Checks everything except credentials.
    pub fn validate_settings(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SubpipeError::Config(
                "Batch size must be greater than 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(SubpipeError::Config(
                "Retry attempts must be greater than 0".to_string(),
            ));
        }
        if self.retry.backoff_factor.is_nan() || self.retry.backoff_factor < 1.0 {
            return Err(SubpipeError::Config(
                "Backoff factor must be at least 1.0".to_string(),
            ));
        }
        for secs in [
            self.retry.inter_call_sleep_secs,
            self.retry.inter_batch_sleep_secs,
            self.idle_interval_secs,
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(SubpipeError::Config(format!(
                    "Sleep intervals must be non-negative, got {secs}"
                )));
            }
        }
        if self.media_dir == self.subtitle_dir {
            return Err(SubpipeError::Config(
                "Media and subtitle directories must differ".to_string(),
            ));
        }
        if self.media_extensions.is_empty() {
            return Err(SubpipeError::Config(
                "At least one media extension is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs_f64(self.idle_interval_secs)
    }

    /// Path of the download queue inside the media directory.
    pub fn url_queue_path(&self) -> PathBuf {
        self.media_dir.join("urls.txt")
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("subpipe").join("config.toml"))
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubpipeError {
    #[error("Transcoding failed: {0}")]
    Transcode(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Alignment mismatch for {language}: expected {expected} lines, got {actual}")]
    Alignment {
        language: String,
        expected: usize,
        actual: usize,
    },

    #[error("API error: {0}")]
    Api(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SubpipeError {
    /// Whether this failure is a line-count mismatch rather than a service error.
    pub fn is_alignment(&self) -> bool {
        matches!(self, SubpipeError::Alignment { .. })
    }
}

pub type Result<T> = std::result::Result<T, SubpipeError>;

pub mod config;
pub mod discovery;
pub mod error;
pub mod files;
pub mod media;
pub mod pipeline;
pub mod retry;
pub mod shutdown;
pub mod subtitle;
pub mod transcribe;
pub mod translate;

pub use config::Config;
pub use error::{Result, SubpipeError};
pub use pipeline::{CycleReport, PassOutcome, Phase, Pipeline, PipelineStats};
pub use shutdown::{Shutdown, Sleeper};

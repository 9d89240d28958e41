use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use subpipe::config::Config;
use subpipe::media::{FfmpegTranscoder, HttpDownloader};
use subpipe::transcribe::WhisperClient;
use subpipe::translate::{GeminiTranslator, PinyinTransliterator};
use subpipe::{PassOutcome, Pipeline, Shutdown};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "subpipe")]
#[command(version, about = "Transcribe media and translate the subtitles, unattended")]
#[command(long_about = "Watches a media directory, transcribes new files into source-language \
subtitles, then translates those into two more languages plus a transliteration and a \
combined subtitle file.")]
struct Cli {
    /// Directory containing media files (and urls.txt)
    media_dir: Option<PathBuf>,

    /// Directory to store subtitle files
    subtitle_dir: Option<PathBuf>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run one transcription pass and one translation pass, then exit
    #[arg(long)]
    once: bool,

    /// Do not process urls.txt
    #[arg(long)]
    no_download: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("subpipe={level}")));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn build_pipeline(config: Config) -> Result<Pipeline> {
    let openai_key = config
        .openai_api_key
        .clone()
        .context("OpenAI API key not set. Set OPENAI_API_KEY environment variable.")?;
    let gemini_key = config
        .gemini_api_key
        .clone()
        .context("Gemini API key not set. Set GEMINI_API_KEY environment variable.")?;

    let transcriber = WhisperClient::new(openai_key)
        .with_model(config.whisper_model.clone())
        .with_language(config.languages.source.clone());
    let translator = GeminiTranslator::new(gemini_key).with_model(config.gemini_model.clone());

    let pipeline = Pipeline::new(
        config,
        Box::new(FfmpegTranscoder::new()),
        Box::new(transcriber),
        Box::new(translator),
        Box::new(PinyinTransliterator::new()),
    )
    .with_downloader(Box::new(HttpDownloader::new()));

    Ok(pipeline)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.media_dir {
        config.media_dir = dir;
    }
    if let Some(dir) = cli.subtitle_dir {
        config.subtitle_dir = dir;
    }
    if cli.no_download {
        config.download_queue = false;
    }
    config
        .validate()
        .context("Configuration validation failed")?;

    FfmpegTranscoder::new()
        .check()
        .await
        .context("FFmpeg is required. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux)")?;

    info!("Media:     {}", config.media_dir.display());
    info!("Subtitles: {}", config.subtitle_dir.display());
    info!(
        "Languages: {} -> {}, {} (+{})",
        config.languages.source,
        config.languages.translation_a,
        config.languages.translation_b,
        config.languages.transliteration
    );

    let pipeline = build_pipeline(config)?;
    pipeline
        .prepare_directories()
        .context("Failed to create working directories")?;

    let shutdown = Shutdown::new();
    let handle = shutdown.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, stopping at the next pause...");
        handle.trigger();
    })
    .context("Failed to install Ctrl+C handler")?;

    if cli.once {
        let report = pipeline.run_cycle(&shutdown).await;
        info!("Transcription: {:?}", report.transcription);
        info!("Translation:   {:?}", report.translation);
        if matches!(report.transcription, PassOutcome::Failed { .. })
            || matches!(report.translation, PassOutcome::Failed { .. })
        {
            anyhow::bail!("Cycle finished with failures");
        }
        return Ok(());
    }

    let stats = pipeline.run(&shutdown).await;
    info!(
        "Transcribed {} ({} empty), translated {}, aborted {}, failed {}",
        stats.transcribed, stats.empty, stats.translated, stats.aborted, stats.failed
    );

    Ok(())
}

//! Work discovery.
//!
//! Whether a unit still needs work is decided purely from which files exist.
//! Candidates are considered in lexicographic order of file name and at most
//! one unit is returned per call.
//!
//! A unit whose last pass failed or was aborted is put on a [`Deferred`] list
//! and passed over while any other candidate is pending. When every pending
//! candidate is deferred, the list is cleared and the first of them is
//! returned, which starts a new round. A unit that always fails is therefore
//! retried once per round and never blocks the units after it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{Config, LanguageSet};
use crate::error::Result;
use crate::media::MediaUnit;

/// Every file a unit produces in the subtitle directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub source: PathBuf,
    pub sidecar: PathBuf,
    pub translation_a: PathBuf,
    pub translation_b: PathBuf,
    pub transliteration: PathBuf,
    pub combined: PathBuf,
}

impl OutputPaths {
    pub fn new(subtitle_dir: &Path, base_name: &str, languages: &LanguageSet) -> Self {
        let path = |suffix: &str| subtitle_dir.join(format!("{base_name}{suffix}"));
        Self {
            source: path(&format!(".{}.srt", languages.source)),
            sidecar: path(".txt"),
            translation_a: path(&format!(".{}.srt", languages.translation_a)),
            translation_b: path(&format!(".{}.srt", languages.translation_b)),
            transliteration: path(&format!(".{}.srt", languages.transliteration)),
            combined: path(".srt"),
        }
    }

    /// The four files written by the translation phase.
    pub fn derived(&self) -> [&Path; 4] {
        [
            &self.translation_a,
            &self.translation_b,
            &self.transliteration,
            &self.combined,
        ]
    }

    pub fn translation_complete(&self) -> bool {
        self.derived().iter().all(|p| p.exists())
    }

    pub fn transcription_complete(&self, archived_media: &Path) -> bool {
        self.source.exists() && archived_media.exists()
    }
}

/// A source-language subtitle whose derived variants are missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    pub base_name: String,
    pub paths: OutputPaths,
}

/// Units that failed during the current round, keyed by their input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deferred {
    units: HashSet<PathBuf>,
}

impl Deferred {
    pub fn defer(&mut self, path: &Path) {
        self.units.insert(path.to_path_buf());
    }

    pub fn forget(&mut self, path: &Path) {
        self.units.remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.units.contains(path)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Called when a scan found nothing but deferred units; `first` is the
    /// earliest of them.
    fn next_round<T>(&mut self, first: Option<T>) -> Option<T> {
        if first.is_some() {
            info!(
                "Only previously failed units are pending, retrying {} unit(s)",
                self.units.len()
            );
            self.units.clear();
        }
        first
    }
}

/// Characters rejected by common filesystems.
fn invalid_chars() -> &'static Regex {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    INVALID.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("Invalid regex"))
}

pub fn is_portable_name(name: &str) -> bool {
    !name.is_empty()
        && !invalid_chars().is_match(name)
        && !name.ends_with(['.', ' '])
}

/// Drop invalid characters, trailing dots and spaces; spaces become `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned = invalid_chars().replace_all(name, "");
    cleaned
        .trim_end_matches(['.', ' '])
        .replace(' ', "_")
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        debug!("{} does not exist yet", dir.display());
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Rename `path` to a portable name if needed. On failure the original path
/// is kept.
fn ensure_portable(path: PathBuf) -> PathBuf {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return path;
    };
    if is_portable_name(name) {
        return path;
    }

    let sanitized = sanitize_file_name(name);
    if sanitized.is_empty() {
        warn!("Cannot sanitize {}", path.display());
        return path;
    }
    let target = path.with_file_name(&sanitized);
    if target.exists() {
        warn!(
            "Not renaming {}: {} already exists",
            path.display(),
            target.display()
        );
        return path;
    }

    match std::fs::rename(&path, &target) {
        Ok(()) => {
            info!("Renamed {} to {}", path.display(), target.display());
            target
        }
        Err(e) => {
            warn!("Failed to rename {}: {}", path.display(), e);
            path
        }
    }
}

/// Next media file that still needs transcription.
pub fn discover_media(config: &Config, deferred: &mut Deferred) -> Result<Option<MediaUnit>> {
    let mut first_deferred = None;

    for path in sorted_files(&config.media_dir)? {
        if !has_extension(&path, &config.media_extensions) {
            continue;
        }

        let path = ensure_portable(path);
        let Some(unit) = MediaUnit::from_path(&path) else {
            continue;
        };

        let outputs = OutputPaths::new(&config.subtitle_dir, &unit.base_name, &config.languages);
        let archived = config.subtitle_dir.join(unit.archive_name());
        if outputs.transcription_complete(&archived) {
            debug!("Skipping {}: already transcribed", path.display());
            continue;
        }
        if deferred.contains(&unit.path) {
            debug!("Passing over {}: failed earlier", path.display());
            if first_deferred.is_none() {
                first_deferred = Some(unit);
            }
            continue;
        }

        return Ok(Some(unit));
    }
    Ok(deferred.next_round(first_deferred))
}

/// Next source subtitle whose derived variants are incomplete.
pub fn discover_translation(
    config: &Config,
    deferred: &mut Deferred,
) -> Result<Option<TranslationUnit>> {
    let suffix = format!(".{}.srt", config.languages.source);
    let mut first_deferred = None;

    for path in sorted_files(&config.subtitle_dir)? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(base_name) = name.strip_suffix(&suffix).filter(|b| !b.is_empty()) else {
            continue;
        };

        let paths = OutputPaths::new(&config.subtitle_dir, base_name, &config.languages);
        if paths.translation_complete() {
            continue;
        }

        let unit = TranslationUnit {
            base_name: base_name.to_string(),
            paths,
        };
        if deferred.contains(&unit.paths.source) {
            debug!("Passing over {}: failed earlier", path.display());
            if first_deferred.is_none() {
                first_deferred = Some(unit);
            }
            continue;
        }

        return Ok(Some(unit));
    }
    Ok(deferred.next_round(first_deferred))
}

use std::time::Duration;

use tracing::debug;

use super::{TranslationBatch, Translator, Transliterator};
use crate::config::LanguageSet;
use crate::error::{Result, SubpipeError};
use crate::shutdown::Sleeper;
use crate::subtitle::DerivedDocuments;

/// Per-line output of one batch, aligned with `TranslationBatch::indices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub translation_a: Vec<String>,
    pub translation_b: Vec<String>,
    pub transliteration: Vec<String>,
}

impl BatchResult {
    /// Write every line back at its original file position.
    pub fn apply(&self, batch: &TranslationBatch, docs: &mut DerivedDocuments) {
        for (offset, &index) in batch.indices.iter().enumerate() {
            docs.apply(
                index,
                &self.translation_a[offset],
                &self.translation_b[offset],
                &self.transliteration[offset],
            );
        }
    }
}

/// Runs the three conversions for one batch.
pub struct BatchExecutor<'a> {
    translator: &'a dyn Translator,
    transliterator: &'a dyn Transliterator,
    languages: &'a LanguageSet,
    sleeper: &'a dyn Sleeper,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(
        translator: &'a dyn Translator,
        transliterator: &'a dyn Transliterator,
        languages: &'a LanguageSet,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            translator,
            transliterator,
            languages,
            sleeper,
        }
    }

    /// One attempt: translate to A, pause, translate to B, transliterate.
    pub async fn execute(
        &self,
        batch: &TranslationBatch,
        inter_call_sleep: Duration,
    ) -> Result<BatchResult> {
        let text = batch.source_text();
        let expected = batch.len();
        let languages = self.languages;

        let raw_a = self
            .translator
            .translate(&text, &languages.source, &languages.translation_a)
            .await?;
        let translation_a = split_aligned(&raw_a, expected, &languages.translation_a)?;

        debug!("Sleeping {:.1}s between calls", inter_call_sleep.as_secs_f64());
        if !self.sleeper.sleep(inter_call_sleep).await {
            return Err(SubpipeError::Cancelled);
        }

        let raw_b = self
            .translator
            .translate(&text, &languages.source, &languages.translation_b)
            .await?;
        let translation_b = split_aligned(&raw_b, expected, &languages.translation_b)?;

        let raw_p = self.transliterator.transliterate(&text)?;
        let transliteration = split_aligned(&raw_p, expected, &languages.transliteration)?;

        Ok(BatchResult {
            translation_a,
            translation_b,
            transliteration,
        })
    }
}

/// Split engine output into exactly `expected` lines.
pub fn split_aligned(text: &str, expected: usize, language: &str) -> Result<Vec<String>> {
    let body = text.trim_end_matches(['\r', '\n']);
    let lines: Vec<String> = if body.is_empty() {
        Vec::new()
    } else {
        body.split('\n').map(|l| l.trim().to_string()).collect()
    };

    if lines.len() != expected {
        return Err(SubpipeError::Alignment {
            language: language.to_string(),
            expected,
            actual: lines.len(),
        });
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::RawLineSet;
    use crate::translate::plan_batches;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedTranslator {
        replies: HashMap<&'static str, &'static str>,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Translator for FixedTranslator {
        async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((target.to_string(), text.to_string()));
            self.replies
                .get(target)
                .map(|r| r.to_string())
                .ok_or_else(|| SubpipeError::Translation(format!("no reply for {target}")))
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct Upper;

    impl Transliterator for Upper {
        fn transliterate(&self, text: &str) -> Result<String> {
            Ok(text.to_uppercase())
        }
    }

    struct Immediate;

    #[async_trait]
    impl Sleeper for Immediate {
        async fn sleep(&self, _duration: Duration) -> bool {
            true
        }
    }

    fn translator(a: &'static str, b: &'static str) -> FixedTranslator {
        FixedTranslator {
            replies: HashMap::from([("en", a), ("vi", b)]),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_split_aligned() {
        assert_eq!(split_aligned("a\r\nb\n", 2, "en").unwrap(), vec!["a", "b"]);
        assert!(split_aligned("a\nb", 3, "en").unwrap_err().is_alignment());
        assert!(split_aligned("", 1, "en").is_err());
    }

    #[tokio::test]
    async fn test_execute_uses_same_text_for_both_targets() {
        let translator = translator("one\ntwo", "một\nhai");
        let languages = LanguageSet::default();
        let executor = BatchExecutor::new(&translator, &Upper, &languages, &Immediate);
        let batch = plan_batches(vec![(2, "a".to_string()), (6, "b".to_string())], 100)
            .pop()
            .unwrap();

        let result = executor.execute(&batch, Duration::ZERO).await.unwrap();

        assert_eq!(result.translation_a, vec!["one", "two"]);
        assert_eq!(result.translation_b, vec!["một", "hai"]);
        assert_eq!(result.transliteration, vec!["A", "B"]);

        let calls = translator.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ("en".to_string(), "a\nb".to_string()));
        assert_eq!(calls[1], ("vi".to_string(), "a\nb".to_string()));
    }

    #[tokio::test]
    async fn test_misaligned_reply_is_an_error() {
        let translator = translator("one\ntwo", "một");
        let languages = LanguageSet::default();
        let executor = BatchExecutor::new(&translator, &Upper, &languages, &Immediate);
        let batch = plan_batches(vec![(2, "a".to_string()), (6, "b".to_string())], 100)
            .pop()
            .unwrap();

        let err = executor.execute(&batch, Duration::ZERO).await.unwrap_err();
        match err {
            SubpipeError::Alignment {
                language,
                expected,
                actual,
            } => {
                assert_eq!(language, "vi");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_apply_writes_at_file_positions() {
        let set = RawLineSet::parse("1\n00:00:00,000 --> 00:00:01,000\na\n\n2\n00:00:01,000 --> 00:00:02,000\nb\n");
        let mut docs = DerivedDocuments::new(&set);
        let batch = plan_batches(vec![(2, "a".to_string()), (6, "b".to_string())], 100)
            .pop()
            .unwrap();
        let result = BatchResult {
            translation_a: vec!["A1".into(), "A2".into()],
            translation_b: vec!["B1".into(), "B2".into()],
            transliteration: vec!["P1".into(), "P2".into()],
        };

        result.apply(&batch, &mut docs);

        assert_eq!(docs.translation_a[2], "A1");
        assert_eq!(docs.translation_a[6], "A2");
        assert_eq!(docs.translation_b[6], "B2");
        assert_eq!(docs.combined[6], "b\nP2\nA2");
        assert_eq!(docs.translation_a[4], "2");
    }
}

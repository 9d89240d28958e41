pub mod batch;
pub mod executor;
pub mod gemini;
pub mod pass;
pub mod pinyin;

pub use batch::{plan_batches, TranslationBatch};
pub use executor::{BatchExecutor, BatchResult};
pub use gemini::GeminiTranslator;
pub use pass::TranslationPass;
pub use self::pinyin::PinyinTransliterator;

use crate::error::Result;
use async_trait::async_trait;

/// Remote translation engine. Multi-line input must come back with the same
/// number of lines.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Local script-to-script rendering, e.g. Han characters to pinyin.
pub trait Transliterator: Send + Sync {
    fn transliterate(&self, text: &str) -> Result<String>;
}

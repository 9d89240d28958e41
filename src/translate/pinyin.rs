use ::pinyin::ToPinyin;

use super::Transliterator;
use crate::error::Result;

/// Tone-marked pinyin, one syllable per Han character, space separated.
/// Anything that is not a Han character is kept as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinyinTransliterator {
    /// Use tone numbers (`ni3`) instead of tone marks (`nǐ`).
    pub tone_numbers: bool,
}

impl PinyinTransliterator {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, line: &str) -> String {
        let mut tokens: Vec<String> = Vec::new();
        let mut pending = String::new();

        for c in line.chars() {
            match c.to_pinyin() {
                Some(p) => {
                    flush(&mut pending, &mut tokens);
                    let syllable = if self.tone_numbers {
                        p.with_tone_num_end()
                    } else {
                        p.with_tone()
                    };
                    tokens.push(syllable.to_string());
                }
                None => pending.push(c),
            }
        }
        flush(&mut pending, &mut tokens);

        tokens.join(" ")
    }
}

fn flush(pending: &mut String, tokens: &mut Vec<String>) {
    let text = pending.trim();
    if !text.is_empty() {
        tokens.push(text.to_string());
    }
    pending.clear();
}

impl Transliterator for PinyinTransliterator {
    fn transliterate(&self, text: &str) -> Result<String> {
        Ok(text
            .split('\n')
            .map(|l| self.line(l.trim_end_matches('\r')))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

use super::raw::RawLineSet;

/// Combined caption text for one translatable line: source, transliteration,
/// translation, one per line.
pub fn merge_line(source: &str, transliteration: &str, translation: &str) -> String {
    format!("{source}\n{transliteration}\n{translation}")
}

/// Whole-document line arrays for every derived variant of one unit.
///
/// Every array starts as a copy of the source lines, so structural lines are
/// carried over verbatim; [`DerivedDocuments::apply`] replaces caption lines
/// at their original file positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedDocuments {
    pub source: Vec<String>,
    pub translation_a: Vec<String>,
    pub translation_b: Vec<String>,
    pub transliteration: Vec<String>,
    pub combined: Vec<String>,
}

impl DerivedDocuments {
    pub fn new(source: &RawLineSet) -> Self {
        let lines = source.lines.clone();
        Self {
            translation_a: lines.clone(),
            translation_b: lines.clone(),
            transliteration: lines.clone(),
            combined: lines.clone(),
            source: lines,
        }
    }

    /// Write one line's results at file position `index`.
    pub fn apply(
        &mut self,
        index: usize,
        translation_a: &str,
        translation_b: &str,
        transliteration: &str,
    ) {
        let transliteration = transliteration.trim();
        self.translation_a[index] = translation_a.to_string();
        self.translation_b[index] = translation_b.to_string();
        self.transliteration[index] = transliteration.to_string();
        self.combined[index] = merge_line(&self.source[index], transliteration, translation_a);
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

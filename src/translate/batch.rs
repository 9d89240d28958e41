/// A contiguous run of translatable lines sent to the engines together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationBatch {
    /// Position of this batch in the document, 0-based.
    pub number: usize,
    /// File-line index of each line.
    pub indices: Vec<usize>,
    pub lines: Vec<String>,
}

impl TranslationBatch {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The text handed to every engine: one line per caption.
    pub fn source_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Split `(file index, text)` pairs into batches of at most `max_batch_size`.
pub fn plan_batches(lines: Vec<(usize, String)>, max_batch_size: usize) -> Vec<TranslationBatch> {
    let size = max_batch_size.max(1);
    let mut batches = Vec::with_capacity(lines.len().div_ceil(size));
    let mut iter = lines.into_iter().peekable();

    while iter.peek().is_some() {
        let (indices, lines): (Vec<usize>, Vec<String>) = iter.by_ref().take(size).unzip();
        batches.push(TranslationBatch {
            number: batches.len(),
            indices,
            lines,
        });
    }

    batches
}

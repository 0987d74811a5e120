use summarist_common::{Result, SummaristError};

/// Boundary candidates, most preferred first: paragraph, line, sentence, clause, word
pub const DEFAULT_SEPARATORS: &[&str] = &[
    "\n\n", "\n", ". ", "! ", "? ", "。", "！", "？", "; ", ", ", " ",
];

/// Text chunk
///
/// `start`/`end` are character offsets of the raw span in the source text.
/// Consecutive raw spans share exactly `overlap` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Chunk text with surrounding whitespace trimmed
    pub text: String,

    /// Start index in original text (characters)
    pub start: usize,

    /// End index in original text (characters, exclusive)
    pub end: usize,
}

impl TextChunk {
    /// Length of the raw span in characters
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// True when the span holds whitespace only
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Splits text into bounded, overlapping chunks
///
/// Lengths are measured in characters. The splitter cuts after the last
/// separator found inside the window, trying separators in preference order
/// and falling back to a hard cut at `chunk_size`.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create new splitter with the default separators
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(SummaristError::config("Chunk size must be greater than 0"));
        }
        if chunk_overlap >= chunk_size {
            return Err(SummaristError::config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the boundary candidates (most preferred first)
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .collect();
        self
    }

    /// Maximum chunk length in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into ordered chunks
    ///
    /// Empty text yields no chunks.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        // Byte offset of every char boundary, including the end of the text
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            if total - start <= self.chunk_size {
                chunks.push(make_chunk(text, &offsets, start, total));
                break;
            }

            let cut = self.find_break_point(text, &offsets, start);
            chunks.push(make_chunk(text, &offsets, start, cut));

            // cut > start + overlap, so this always advances
            start = cut - self.chunk_overlap;
        }

        chunks
    }

    /// Find the cut position (char index) for the window starting at `start`
    fn find_break_point(&self, text: &str, offsets: &[usize], start: usize) -> usize {
        let window_end = start + self.chunk_size;
        let min_cut = start + self.chunk_overlap;
        let window = &text[offsets[start]..offsets[window_end]];

        for separator in &self.separators {
            let Some(idx) = window.rfind(separator.as_str()) else {
                continue;
            };

            let cut_byte = offsets[start] + idx + separator.len();
            // Separators are whole strings, so the cut lands on a char boundary
            if let Ok(cut) = offsets.binary_search(&cut_byte) {
                if cut > min_cut {
                    return cut;
                }
            }
        }

        window_end
    }
}

fn make_chunk(text: &str, offsets: &[usize], start: usize, end: usize) -> TextChunk {
    TextChunk {
        text: text[offsets[start]..offsets[end]].trim().to_string(),
        start,
        end,
    }
}

/// Split text into chunks with the default separators
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<TextChunk>> {
    Ok(TextSplitter::new(chunk_size, chunk_overlap)?.split(text))
}

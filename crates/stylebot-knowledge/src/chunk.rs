//! Overlapping character-window chunker.
//!
//! Splits a document into windows of at most `chunk_size` characters. Each
//! window ends at a paragraph break when one falls in its second half,
//! otherwise at the last whitespace, otherwise hard at `chunk_size`. The
//! next window starts `chunk_overlap` characters before the previous end,
//! moved forward to the next word start so chunks never begin mid-word.
//!
//! Positions are counted in `char`s, never bytes, so multi-byte text is
//! never split inside a code point.

use stylebot_core::config::RetrievalConfig;

/// Window parameters for [`chunk_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::new(500, 50)
    }
}

impl From<&RetrievalConfig> for ChunkingConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

/// Split `text` into overlapping chunks.
///
/// # Guarantees
///
/// - Every chunk is non-empty and at most `chunk_size` characters.
/// - Empty or whitespace-only text yields no chunks.
/// - Text no longer than `chunk_size` yields exactly one chunk.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let trimmed = text.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    let len = chars.len();

    if len == 0 {
        return Vec::new();
    }
    if len <= config.chunk_size {
        return vec![trimmed.to_string()];
    }

    let size = config.chunk_size;
    let overlap = config.chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let hard_end = (start + size).min(len);
        let end = if hard_end < len {
            find_break(&chars, start, hard_end, size, overlap)
        } else {
            len
        };

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end >= len {
            break;
        }

        // end > start + overlap, so the window always advances.
        let back = end - overlap;
        start = (back..end)
            .find(|&i| i > 0 && chars[i - 1].is_whitespace() && !chars[i].is_whitespace())
            .unwrap_or(back);
    }

    chunks
}

/// Pick the exclusive end of the window starting at `start`.
///
/// `chars[end]` is the first character of the next window, so a break "at"
/// whitespace means the current chunk stops right before it.
fn find_break(chars: &[char], start: usize, hard_end: usize, size: usize, overlap: usize) -> usize {
    let lower = start + overlap + 1;
    if lower > hard_end {
        return hard_end;
    }

    let paragraph_floor = (start + size / 2).max(lower + 1);
    if let Some(i) = (paragraph_floor..=hard_end)
        .rev()
        .find(|&i| chars[i] == '\n' && chars[i - 1] == '\n')
    {
        return i - 1;
    }

    (lower..=hard_end)
        .rev()
        .find(|&i| chars[i].is_whitespace())
        .unwrap_or(hard_end)
}

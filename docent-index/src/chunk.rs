//! Splitting documents into overlapping chunks for embedding

/// Normalize text for consistent embedding generation.
///
/// Lowercases, trims, and collapses runs of whitespace to single spaces.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split `text` into character windows of `chunk_size` with `overlap`
/// characters shared between consecutive chunks.
///
/// Deterministic and pure. A text shorter than `chunk_size` yields exactly
/// one chunk. `overlap` must be smaller than `chunk_size` (validated by the
/// configuration layer).
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Hello World"), "hello world");
        assert_eq!(normalize_text("  Multiple   Spaces  "), "multiple spaces");
        assert_eq!(normalize_text("UPPERCASE"), "uppercase");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_short_text_yields_one_chunk() {
        let chunks = chunk_text("short", 1024, 32);
        assert_eq!(chunks, vec!["short".to_string()]);
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = "abcdefghij"; // 10 chars
        let chunks = chunk_text(text, 4, 2);

        assert_eq!(chunks[0], "abcd");
        assert_eq!(chunks[1], "cdef");
        assert_eq!(chunks[2], "efgh");
        assert_eq!(chunks[3], "ghij");
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(50);
        let first = chunk_text(&text, 100, 10);
        let second = chunk_text(&text, 100, 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunking_handles_multibyte_text() {
        let text = "héllo wörld ünïcode".repeat(20);
        let chunks = chunk_text(&text, 50, 5);
        // Re-joining without the overlapped prefixes reproduces the input
        let mut rebuilt: String = chunks[0].clone();
        for chunk in &chunks[1..] {
            let chars: Vec<char> = chunk.chars().collect();
            rebuilt.extend(chars[5.min(chars.len())..].iter());
        }
        assert_eq!(rebuilt, text);
    }
}

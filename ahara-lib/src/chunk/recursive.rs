use std::collections::VecDeque;
use std::iter;
use std::ops::Range;

use crate::chunk::{
    generate_id, Chunk, ChunkMetadata, Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};

/// Boundaries tried in order; the empty separator is the hard-cut fallback.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Byte range into the source document
type Span = Range<usize>;

/// Recursive chunker - prefers natural boundaries, falls back to a hard cut
///
/// Good for: prose guidelines and food charts extracted from PDFs
///
/// Text is split on the coarsest separator present (paragraph, then line,
/// then word). Each piece keeps the separator that precedes it, so pieces
/// concatenate back to the source and every chunk is an exact, trimmed span
/// of the document. Pieces are merged greedily up to `chunk_size` characters
/// and consecutive chunks share up to `overlap` characters of trailing
/// pieces. A piece that alone exceeds `chunk_size` is split again with the
/// next finer separator, down to single characters.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker for RecursiveChunker {
    fn name(&self) -> &str {
        "recursive"
    }

    fn chunk(&self, content: &str, mut metadata: ChunkMetadata) -> Vec<Chunk> {
        if self.chunk_size == 0 {
            return Vec::new();
        }

        let spans = self.split(content, 0..content.len(), &SEPARATORS);
        metadata.total_chunks = Some(spans.len());

        // span starts never move backwards, so char offsets are counted incrementally
        let mut byte_cursor = 0;
        let mut char_cursor = 0;

        let mut chunks = Vec::with_capacity(spans.len());
        for span in spans {
            if span.start < byte_cursor {
                byte_cursor = 0;
                char_cursor = 0;
            }
            char_cursor += content[byte_cursor..span.start].chars().count();
            byte_cursor = span.start;

            let text = &content[span];
            let mut m = metadata.clone();
            m.position = char_cursor;

            chunks.push(Chunk {
                id: generate_id(text),
                content: text.to_string(),
                metadata: m,
            });
        }
        chunks
    }
}

impl RecursiveChunker {
    /// Create a chunker with the given window size and overlap.
    #[must_use]
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self { chunk_size, overlap }
    }

    fn split(&self, content: &str, range: Span, separators: &[&str]) -> Vec<Span> {
        let text = &content[range.clone()];
        let idx = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(*s))
            .unwrap_or(separators.len() - 1);
        let separator = separators[idx];
        let finer = &separators[idx + 1..];

        let pieces: Vec<Span> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| range.start + i..range.start + i + c.len_utf8())
                .collect()
        } else {
            // cut in front of every separator so each piece starts with it
            let bounds: Vec<usize> = iter::once(0)
                .chain(text.match_indices(separator).map(|(i, _)| i))
                .chain(iter::once(text.len()))
                .collect();
            bounds
                .windows(2)
                .filter(|w| w[0] < w[1])
                .map(|w| range.start + w[0]..range.start + w[1])
                .collect()
        };

        let mut output = Vec::new();
        let mut pending: Vec<(Span, usize)> = Vec::new();
        for piece in pieces {
            let len = char_len(&content[piece.clone()]);
            if len <= self.chunk_size {
                pending.push((piece, len));
                continue;
            }

            if !pending.is_empty() {
                output.extend(self.merge(content, &pending));
                pending.clear();
            }
            if finer.is_empty() {
                push_trimmed(&mut output, content, piece);
            } else {
                output.extend(self.split(content, piece, finer));
            }
        }

        if !pending.is_empty() {
            output.extend(self.merge(content, &pending));
        }
        output
    }

    /// Merge adjacent pieces into chunk spans.
    fn merge(&self, content: &str, pieces: &[(Span, usize)]) -> Vec<Span> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&(Span, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = piece.1;

            if !current.is_empty() && total + len > self.chunk_size {
                push_trimmed(&mut docs, content, covering(&current));

                // keep a tail no longer than the overlap that still leaves room for `piece`
                while let Some(&&(_, front_len)) = current.front() {
                    if total <= self.overlap && total + len <= self.chunk_size {
                        break;
                    }
                    current.pop_front();
                    total -= front_len;
                }
            }

            current.push_back(piece);
            total += len;
        }

        if !current.is_empty() {
            push_trimmed(&mut docs, content, covering(&current));
        }
        docs
    }
}

/// Span from the first piece's start to the last piece's end.
fn covering(pieces: &VecDeque<&(Span, usize)>) -> Span {
    match (pieces.front(), pieces.back()) {
        (Some(first), Some(last)) => first.0.start..last.0.end,
        _ => 0..0,
    }
}

fn push_trimmed(docs: &mut Vec<Span>, content: &str, span: Span) {
    let text = &content[span.clone()];
    let trimmed = text.trim_start();
    let start = span.start + (text.len() - trimmed.len());
    let end = start + trimmed.trim_end().len();
    if start < end {
        docs.push(start..end);
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ChunkMetadata {
        ChunkMetadata::default()
    }

    fn contents(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = RecursiveChunker::default();
        let chunks = chunker.chunk("  Kapha should favor light foods.\n", meta());

        assert_eq!(contents(&chunks), vec!["Kapha should favor light foods."]);
        assert_eq!(chunks[0].metadata.total_chunks, Some(1));
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let chunker = RecursiveChunker::new(30, 10);
        let content = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = chunker.chunk(content, meta());

        assert_eq!(
            contents(&chunks),
            vec!["First paragraph here.", "Second paragraph here."]
        );
    }

    #[test]
    fn test_word_boundaries() {
        let chunker = RecursiveChunker::new(10, 0);
        let chunks = chunker.chunk("one two three four five", meta());

        // the space in front of a word counts toward the chunk it lands in
        assert_eq!(contents(&chunks), vec!["one two", "three", "four five"]);
    }

    #[test]
    fn test_word_overlap() {
        let chunker = RecursiveChunker::new(11, 5);
        let chunks = chunker.chunk("rice ghee milk dates", meta());

        // each chunk repeats the last word of its predecessor
        assert_eq!(contents(&chunks), vec!["rice ghee", "ghee milk", "milk dates"]);
    }

    #[test]
    fn test_hard_cut_fallback() {
        let chunker = RecursiveChunker::new(4, 0);
        let chunks = chunker.chunk("abcdefghij", meta());

        assert_eq!(contents(&chunks), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_hard_cut_with_overlap() {
        let chunker = RecursiveChunker::new(4, 2);
        let chunks = chunker.chunk("abcdefghij", meta());

        assert_eq!(contents(&chunks), vec!["abcd", "cdef", "efgh", "ghij"]);
    }

    #[test]
    fn test_oversized_paragraph_is_split_further() {
        let chunker = RecursiveChunker::new(12, 0);
        let content = "Avoid.\n\nfavor warm soups daily";
        let chunks = chunker.chunk(content, meta());

        assert_eq!(contents(&chunks), vec!["Avoid.", "favor warm", "soups daily"]);
    }

    #[test]
    fn test_chunks_never_exceed_size() {
        let chunker = RecursiveChunker::new(50, 10);
        let content = "Vata types benefit from warm, oily, grounding meals.\n\
            Cooked grains such as oats and rice are favored.\n\n\
            Raw vegetables and cold drinks aggravate Vata and should be reduced. "
            .repeat(5);
        let chunks = chunker.chunk(&content, meta());

        assert!(chunks.len() > 5);
        for chunk in &chunks {
            assert!(!chunk.content.is_empty());
            assert!(chunk.content.chars().count() <= 50, "{:?}", chunk.content);
        }
    }

    #[test]
    fn test_positions_track_source_offsets() {
        let chunker = RecursiveChunker::new(4, 0);
        let chunks = chunker.chunk("aaa bbb", meta());

        assert_eq!(contents(&chunks), vec!["aaa", "bbb"]);
        assert_eq!(chunks[0].metadata.position, 0);
        assert_eq!(chunks[1].metadata.position, 4);
    }

    fn assert_exact_spans(source: &str, chunks: &[Chunk]) {
        for chunk in chunks {
            let len = chunk.content.chars().count();
            let at: String = source.chars().skip(chunk.metadata.position).take(len).collect();
            assert_eq!(at, chunk.content, "chunk {:?} not found at {}", chunk.content, chunk.metadata.position);
        }
    }

    #[test]
    fn test_repeated_spaces_kept_verbatim() {
        let chunker = RecursiveChunker::new(5, 0);
        let source = "xyz ab  cd";
        let chunks = chunker.chunk(source, meta());

        assert_eq!(contents(&chunks), vec!["xyz", "ab", "cd"]);
        let positions: Vec<usize> = chunks.iter().map(|c| c.metadata.position).collect();
        assert_eq!(positions, vec![0, 4, 8]);
        assert_exact_spans(source, &chunks);
    }

    #[test]
    fn test_separator_runs_kept_verbatim() {
        let chunker = RecursiveChunker::default();
        let source = "Vata\n\n\n\nFavor  warm   soups";
        let chunks = chunker.chunk(source, meta());

        assert_eq!(contents(&chunks), vec![source]);
        assert_eq!(chunks[0].metadata.position, 0);
    }

    #[test]
    fn test_spans_exact_with_overlap_and_unicode() {
        let chunker = RecursiveChunker::new(24, 8);
        let source = "Pitta:  avoid chilli,\n\n\n\nfavor  gh\u{012B} and  coconut.\n  Cooling   herbs help.  ".repeat(3);
        let chunks = chunker.chunk(&source, meta());

        assert!(chunks.len() > 3);
        assert_exact_spans(&source, &chunks);
        for pair in chunks.windows(2) {
            assert!(pair[0].metadata.position <= pair[1].metadata.position);
        }
    }

    #[test]
    fn test_deterministic() {
        let chunker = RecursiveChunker::new(40, 8);
        let content = "Pitta should avoid spicy foods.\nFavor cooling cucumber and coconut.\n\n".repeat(6);

        assert_eq!(chunker.chunk(&content, meta()), chunker.chunk(&content, meta()));
    }

    #[test]
    fn test_whitespace_only() {
        let chunker = RecursiveChunker::default();
        assert!(chunker.chunk("\n\n\n   \n\n", meta()).is_empty());
        assert!(chunker.chunk("", meta()).is_empty());
    }
}

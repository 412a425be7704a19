use std::iter;

use crate::chunk::{generate_id, Chunk, ChunkMetadata, Chunker};

/// Fixed-size chunker - splits by character count
///
/// Good for: baseline experiments, tabular food lists without prose
///
/// Windows start every `chunk_size - overlap` characters, so the tail of the
/// document may produce short chunks fully contained in their predecessor.
pub struct FixedSizeChunker {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Chunker for FixedSizeChunker {
    fn name(&self) -> &str {
        "fixed"
    }

    fn chunk(&self, content: &str, mut metadata: ChunkMetadata) -> Vec<Chunk> {
        // byte offset of every char boundary, including the end of the string
        let offsets: Vec<usize> = content
            .char_indices()
            .map(|(i, _)| i)
            .chain(iter::once(content.len()))
            .collect();
        let char_count = offsets.len() - 1;
        if char_count == 0 || self.chunk_size == 0 {
            return Vec::new();
        }

        let stride = self.chunk_size.saturating_sub(self.overlap).max(1);
        let windows: Vec<(usize, &str)> = (0..char_count.div_ceil(stride))
            .map(|i| {
                let start = i * stride;
                let end = (start + self.chunk_size).min(char_count);
                (start, &content[offsets[start]..offsets[end]])
            })
            // whitespace-only windows are dropped
            .filter(|(_, c)| !c.trim().is_empty())
            .collect();

        // set common chunking related metadata
        metadata.total_chunks = Some(windows.len());

        let mut chunks = Vec::with_capacity(windows.len());
        for (start, c) in windows {
            let mut m = metadata.clone();
            m.position = start;

            chunks.push(Chunk {
                id: generate_id(c),
                content: c.to_string(),
                metadata: m,
            });
        }
        chunks
    }
}

//! Sliding-window text chunking.
//!
//! Windows of `chunk_size` characters advance by `chunk_size - chunk_overlap`
//! across each segment, so consecutive chunks share `chunk_overlap`
//! characters. The final chunk of a segment may be shorter; a segment
//! shorter than the window is one chunk.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::loader::Segment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in characters.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// An in-memory chunk before embedding: content, its starting character
/// offset within the source segment, and the segment's loader metadata.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub content: String,
    pub start_offset: usize,
    pub metadata: Value,
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunks one segment, carrying its metadata into every chunk.
    pub fn chunk_segment(&self, segment: &Segment) -> Vec<Chunk> {
        self.split(&segment.text)
            .into_iter()
            .map(|(content, start_offset)| Chunk {
                content,
                start_offset,
                metadata: segment.metadata.clone(),
            })
            .collect()
    }

    /// Chunks an ordered list of segments, preserving segment order.
    pub fn chunk_segments(&self, segments: &[Segment]) -> Vec<Chunk> {
        segments
            .iter()
            .flat_map(|segment| self.chunk_segment(segment))
            .collect()
    }

    fn split(&self, text: &str) -> Vec<(String, usize)> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }

        let size = self.config.chunk_size.max(1);
        let step = size.saturating_sub(self.config.chunk_overlap).max(1);

        let mut out = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + size).min(total);
            out.push((chars[start..end].iter().collect(), start));
            // Once a window reaches the end of the text, a further window
            // would only repeat the tail of this one.
            if end >= total {
                break;
            }
            start += step;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segment(text: &str) -> Segment {
        Segment {
            text: text.to_string(),
            metadata: json!({}),
        }
    }

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
    }

    fn expected_count(len: usize, size: usize, overlap: usize) -> usize {
        if len == 0 {
            return 0;
        }
        if len <= size {
            return 1;
        }
        (len - overlap).div_ceil(size - overlap)
    }

    #[test]
    fn chunk_count_matches_window_formula() {
        for (len, size, overlap) in [
            (2400, 1000, 200),
            (1000, 1000, 200),
            (1001, 1000, 200),
            (5000, 500, 50),
            (999, 1000, 0),
            (50, 10, 3),
        ] {
            let text = "a".repeat(len);
            let chunks = chunker(size, overlap).chunk_segment(&segment(&text));
            assert_eq!(
                chunks.len(),
                expected_count(len, size, overlap),
                "len={} size={} overlap={}",
                len,
                size,
                overlap
            );
        }
    }

    #[test]
    fn chunks_never_exceed_chunk_size() {
        let text: String = ('a'..='z').cycle().take(3217).collect();
        let chunks = chunker(400, 100).chunk_segment(&segment(&text));

        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 400);
        }
    }

    #[test]
    fn adjacent_chunks_share_the_overlap() {
        let text: String = ('a'..='z').cycle().take(2500).collect();
        let overlap = 150;
        let chunks = chunker(600, overlap).chunk_segment(&segment(&text));
        assert!(chunks.len() >= 2);

        for pair in chunks.windows(2) {
            let left: Vec<char> = pair[0].content.chars().collect();
            let right: Vec<char> = pair[1].content.chars().collect();
            let suffix: String = left[left.len() - overlap..].iter().collect();
            let prefix: String = right[..overlap.min(right.len())].iter().collect();
            assert!(suffix.starts_with(&prefix));
        }
    }

    #[test]
    fn tail_window_inside_previous_overlap_is_not_emitted() {
        // 50 chars, size 10, overlap 3: windows start every 7 chars; the
        // window at 49 would repeat the previous tail and must not appear.
        let text = "y".repeat(50);
        let chunks = chunker(10, 3).chunk_segment(&segment(&text));

        assert_eq!(chunks.len(), 7);
        assert_eq!(chunks.last().unwrap().start_offset, 42);
        assert_eq!(chunks.last().unwrap().content.len(), 8);
    }

    #[test]
    fn short_segment_is_one_whole_chunk() {
        let chunks = chunker(1000, 200).chunk_segment(&segment("short text"));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "short text");
        assert_eq!(chunks[0].start_offset, 0);
    }

    #[test]
    fn empty_segment_yields_no_chunks() {
        let chunks = chunker(1000, 200).chunk_segment(&segment(""));
        assert!(chunks.is_empty());
    }

    #[test]
    fn offsets_advance_by_size_minus_overlap() {
        let text = "x".repeat(2400);
        let chunks = chunker(1000, 200).chunk_segment(&segment(&text));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[1].start_offset, 800);
        assert_eq!(chunks[2].start_offset, 1600);
        assert_eq!(chunks[0].content.len(), 1000);
        assert_eq!(chunks[1].content.len(), 1000);
        assert_eq!(chunks[2].content.len(), 800);
    }

    #[test]
    fn segment_metadata_is_carried_into_chunks() {
        let seg = Segment {
            text: "page text".to_string(),
            metadata: json!({ "page": 3 }),
        };
        let chunks = chunker(1000, 200).chunk_segment(&seg);

        assert_eq!(chunks[0].metadata["page"], 3);
    }
}

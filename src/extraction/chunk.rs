//! Parse & Chunk stage.

use super::types::Chunk;
use crate::ids::{ChunkId, DocumentId};

const TARGET_CHUNK_CHARS: usize = 2000;

struct Builder<'a> {
    document_id: &'a DocumentId,
    heading_path: Option<&'a str>,
    chunks: Vec<Chunk>,
    index: usize,
}

impl<'a> Builder<'a> {
    fn push(&mut self, text: String, char_range: (usize, usize)) {
        if text.is_empty() {
            return;
        }
        self.chunks.push(Chunk {
            chunk_id: ChunkId::new(format!("{}_chunk_{}", self.document_id, self.index)),
            document_id: self.document_id.clone(),
            text,
            page_range: None,
            char_range,
            heading_path: self.heading_path.map(|s| s.to_string()),
        });
        self.index += 1;
    }
}

/// Splits document text into chunks with stable IDs `{doc}_chunk_{i}`,
/// page range, character range, and an optional heading path. Splits on
/// paragraph (`\n\n`) boundaries where possible; a single paragraph longer
/// than `TARGET_CHUNK_CHARS` on its own is hard-cut at that width.
pub fn parse_and_chunk(document_id: &DocumentId, text: &str, heading_path: Option<&str>) -> Vec<Chunk> {
    if text.is_empty() {
        return vec![];
    }

    let mut builder = Builder { document_id, heading_path, chunks: Vec::new(), index: 0 };
    let mut buffer = String::new();
    let mut buffer_start = 0usize;
    let mut offset = 0usize;

    for para in text.split("\n\n") {
        if buffer.is_empty() {
            buffer_start = offset;
        }
        if !buffer.is_empty() && buffer.len() + para.len() + 2 > TARGET_CHUNK_CHARS {
            let end = offset.saturating_sub(2).max(buffer_start);
            builder.push(std::mem::take(&mut buffer), (buffer_start, end));
            buffer_start = offset;
        }

        if para.len() > TARGET_CHUNK_CHARS {
            // Oversized single paragraph: hard-cut on char boundaries.
            let mut rest = para;
            let mut cut_start = offset;
            while rest.len() > TARGET_CHUNK_CHARS {
                let mut cut = TARGET_CHUNK_CHARS;
                while !rest.is_char_boundary(cut) {
                    cut -= 1;
                }
                let (head, tail) = rest.split_at(cut);
                builder.push(head.to_string(), (cut_start, cut_start + cut));
                cut_start += cut;
                rest = tail;
            }
            buffer_start = cut_start;
            buffer.push_str(rest);
        } else {
            if !buffer.is_empty() {
                buffer.push_str("\n\n");
            }
            buffer.push_str(para);
        }
        offset += para.len() + 2;
    }
    let end = text.len();
    builder.push(buffer, (buffer_start, end));
    builder.chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_stable_and_sequential() {
        let doc = DocumentId::new("doc1");
        let chunks = parse_and_chunk(&doc, "para one\n\npara two\n\npara three", None);
        assert_eq!(chunks[0].chunk_id.as_str(), "doc1_chunk_0");
        assert_eq!(chunks[1].chunk_id.as_str(), "doc1_chunk_1");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let doc = DocumentId::new("doc1");
        assert!(parse_and_chunk(&doc, "", None).is_empty());
    }

    #[test]
    fn large_paragraph_forces_split() {
        let doc = DocumentId::new("doc1");
        let big = "x".repeat(TARGET_CHUNK_CHARS + 500);
        let text = format!("{big}\n\nsecond paragraph");
        let chunks = parse_and_chunk(&doc, &text, None);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn heading_path_is_attached_to_every_chunk() {
        let doc = DocumentId::new("doc1");
        let chunks = parse_and_chunk(&doc, "a\n\nb", Some("Intro > Scope"));
        assert!(chunks.iter().all(|c| c.heading_path.as_deref() == Some("Intro > Scope")));
    }
}

//! The TextChunk type: a bounded unit of document text ready for embedding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::estimate_tokens;

/// A chunk of document text with provenance metadata.
///
/// Chunks are immutable. They are only created through a [`ChunkSequence`],
/// which assigns the id and number and measures the content once.
///
/// ## Serialized Form
///
/// The persisted chunk list uses camelCase field names:
///
/// ```text
/// {
///   "id": "report-0",
///   "fileId": "report",
///   "chunkNumber": 0,
///   "content": "...",
///   "tokenCount": 412,
///   "pageNumber": 1,
///   "createdAt": "2026-10-18T09:12:44.120Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChunk {
    id: String,
    file_id: String,
    chunk_number: usize,
    content: String,
    token_count: usize,
    page_number: Option<u32>,
    created_at: DateTime<Utc>,
}

impl TextChunk {
    /// Unique id within the file: `{file_id}-{chunk_number}`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The owning document id.
    #[must_use]
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Zero-based position among the chunks of this file.
    #[must_use]
    pub fn chunk_number(&self) -> usize {
        self.chunk_number
    }

    /// The chunk text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Estimated tokens of [`content`](Self::content), measured at creation.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Source page, when the chunk came from a page-scoped text.
    #[must_use]
    pub fn page_number(&self) -> Option<u32> {
        self.page_number
    }

    /// Creation time (UTC).
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Length of the content in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the content is empty. Never true for issued chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl std::fmt::Display for TextChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TextChunk {{ id: {}, page: {:?}, tokens: {}, len: {} }}",
            self.id,
            self.page_number,
            self.token_count,
            self.len()
        )
    }
}

/// Issues sequentially numbered chunks for one file.
///
/// A file's chunks may come from several [`chunk_into`] calls, one per page.
/// Sharing one sequence across those calls keeps `chunk_number` strictly
/// increasing over the whole file.
///
/// ```rust
/// use pageslab::{ChunkSequence, TextChunker, TokenBudget};
///
/// let chunker = TextChunker::new(TokenBudget::new(50).unwrap());
/// let mut seq = ChunkSequence::new("doc");
///
/// let page1 = chunker.chunk_into("First page.", &mut seq, Some(1));
/// let page2 = chunker.chunk_into("Second page.", &mut seq, Some(2));
///
/// assert_eq!(page1[0].id(), "doc-0");
/// assert_eq!(page2[0].id(), "doc-1");
/// assert_eq!(seq.next_number(), 2);
/// ```
///
/// [`chunk_into`]: crate::TextChunker::chunk_into
#[derive(Debug, Clone)]
pub struct ChunkSequence {
    file_id: String,
    next: usize,
}

impl ChunkSequence {
    /// Start a sequence at zero.
    #[must_use]
    pub fn new(file_id: impl Into<String>) -> Self {
        Self::starting_at(file_id, 0)
    }

    /// Resume a sequence at `next`, the first unused number for the file.
    #[must_use]
    pub fn starting_at(file_id: impl Into<String>, next: usize) -> Self {
        Self {
            file_id: file_id.into(),
            next,
        }
    }

    /// The file this sequence numbers.
    #[must_use]
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// The number the next chunk will receive.
    #[must_use]
    pub fn next_number(&self) -> usize {
        self.next
    }

    /// Trim `content` and issue it as the next chunk.
    ///
    /// Returns `None` (without consuming a number) for blank content.
    pub fn issue(&mut self, content: &str, page_number: Option<u32>) -> Option<TextChunk> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        let chunk_number = self.next;
        self.next += 1;
        Some(TextChunk {
            id: format!("{}-{}", self.file_id, chunk_number),
            file_id: self.file_id.clone(),
            chunk_number,
            content: content.to_string(),
            token_count: estimate_tokens(content),
            page_number,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_assigns_sequential_ids() {
        let mut seq = ChunkSequence::new("f");
        let a = seq.issue("alpha", None).unwrap();
        let b = seq.issue("beta", Some(3)).unwrap();
        assert_eq!((a.id(), a.chunk_number()), ("f-0", 0));
        assert_eq!((b.id(), b.chunk_number()), ("f-1", 1));
        assert_eq!(b.page_number(), Some(3));
        assert_eq!(b.file_id(), "f");
    }

    #[test]
    fn test_issue_trims_and_measures() {
        let mut seq = ChunkSequence::new("f");
        let chunk = seq.issue("  one two three \n", None).unwrap();
        assert_eq!(chunk.content(), "one two three");
        assert_eq!(chunk.token_count(), estimate_tokens("one two three"));
    }

    #[test]
    fn test_blank_content_is_not_issued() {
        let mut seq = ChunkSequence::starting_at("f", 7);
        assert!(seq.issue(" \n\t ", None).is_none());
        assert_eq!(seq.next_number(), 7);
        assert_eq!(seq.issue("x", None).unwrap().id(), "f-7");
    }

    #[test]
    fn test_serializes_camel_case_with_null_page() {
        let mut seq = ChunkSequence::new("f");
        let chunk = seq.issue("hello", None).unwrap();
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["fileId"], "f");
        assert_eq!(json["chunkNumber"], 0);
        assert_eq!(json["tokenCount"], 2);
        assert!(json["pageNumber"].is_null());
        assert!(json["createdAt"].is_string());
    }
}

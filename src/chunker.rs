//! Token-budgeted chunking with hierarchical fallback.
//!
//! Packs paragraphs into chunks and only drops to a finer unit when a coarser
//! one cannot fit on its own.
//!
//! ## The Algorithm
//!
//! Given a budget of 800 tokens:
//!
//! ```text
//! 1. Split on blank lines (paragraphs)
//! 2. Paragraph <= 800? Pack it: flush the buffer first if it would overflow
//! 3. Paragraph  > 800? Split it on sentence terminators, pack each sentence
//! 4. Sentence   > 800? Flush the buffer, then greedily pack its words into
//!    standalone chunks
//! 5. Word       > 800? Emit it in consecutive 100-character slices (rare:
//!    only long CJK runs get there)
//! ```
//!
//! Step 5 is the only place a chunk can exceed the budget, and only when the
//! budget is smaller than a 100-character slice of a single word.
//!
//! ## Why Not Recursive Separators?
//!
//! A separator hierarchy re-splits every oversized piece at every level. Here
//! the levels are fixed and each has one policy. A paragraph is never broken
//! while it fits, a sentence is never broken while it fits, and packing is
//! greedy and order-preserving:
//!
//! ```text
//! Paragraphs:  [300] [300] [900: s1=500 s2=400] [100]
//!
//! Chunk 0: [300 + 300]
//! Chunk 1: [s1]           <- s1 does not fit beside the first two
//! Chunk 2: [s2 + 100]
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::{estimate_tokens, split_sentences, ChunkSequence, TextChunk, TokenBudget};

/// Length of a forced slice of an over-budget word, in characters.
pub const FORCED_SLICE_CHARS: usize = 100;

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("invalid paragraph separator pattern"));

/// Paragraph → sentence → word → character chunker.
///
/// ## Example
///
/// ```rust
/// use pageslab::{TextChunker, TokenBudget};
///
/// let chunker = TextChunker::new(TokenBudget::new(20).unwrap());
/// let text = "A short opening paragraph.\n\nA second paragraph that pushes the running total of the chunk over budget.";
/// let chunks = chunker.chunk_text(text, "doc");
///
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[0].id(), "doc-0");
/// assert!(chunks.iter().all(|c| c.token_count() <= 20));
/// ```
#[derive(Debug, Clone)]
pub struct TextChunker {
    budget: TokenBudget,
    slice_chars: usize,
}

impl TextChunker {
    /// Create a chunker for the given budget.
    #[must_use]
    pub fn new(budget: TokenBudget) -> Self {
        Self {
            budget,
            slice_chars: FORCED_SLICE_CHARS,
        }
    }

    /// Override the forced slice length for over-budget words.
    ///
    /// # Panics
    ///
    /// Panics if `slice_chars == 0`.
    #[must_use]
    pub fn with_slice_chars(mut self, slice_chars: usize) -> Self {
        assert!(slice_chars > 0, "slice_chars must be > 0");
        self.slice_chars = slice_chars;
        self
    }

    /// The budget chunks are packed against.
    #[must_use]
    pub fn budget(&self) -> TokenBudget {
        self.budget
    }

    /// Chunk a standalone text, numbering from zero.
    #[must_use]
    pub fn chunk_text(&self, text: &str, file_id: &str) -> Vec<TextChunk> {
        let mut seq = ChunkSequence::new(file_id);
        self.chunk_into(text, &mut seq, None)
    }

    /// Chunk `text`, continuing the numbering of `seq`.
    ///
    /// Every chunk gets `page_number`. Use one sequence for all pages of a
    /// file so chunk numbers never repeat.
    pub fn chunk_into(
        &self,
        text: &str,
        seq: &mut ChunkSequence,
        page_number: Option<u32>,
    ) -> Vec<TextChunk> {
        let mut emitter = Emitter {
            seq,
            page_number,
            chunks: Vec::new(),
        };
        let mut buffer = Buffer::new("\n");

        for paragraph in BLANK_LINES.split(text) {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }

            let tokens = estimate_tokens(paragraph);
            if self.budget.admits(tokens) {
                self.pack(&mut buffer, paragraph, tokens, &mut emitter);
                continue;
            }

            warn!(
                tokens,
                max_tokens = self.budget.max(),
                "paragraph exceeds budget, splitting into sentences"
            );
            for sentence in split_sentences(paragraph) {
                let tokens = estimate_tokens(sentence);
                if self.budget.admits(tokens) {
                    self.pack(&mut buffer, sentence, tokens, &mut emitter);
                } else {
                    warn!(
                        tokens,
                        max_tokens = self.budget.max(),
                        "sentence exceeds budget, splitting into words"
                    );
                    buffer.flush(&mut emitter);
                    self.split_words(sentence, &mut emitter);
                }
            }
        }
        buffer.flush(&mut emitter);

        debug!(
            file_id = emitter.seq.file_id(),
            page = ?page_number,
            chunks = emitter.chunks.len(),
            "chunked text"
        );
        emitter.chunks
    }

    /// Flush-then-append: a unit that fits on its own never shares a chunk
    /// it would push over budget.
    fn pack<'a>(
        &self,
        buffer: &mut Buffer<'a>,
        piece: &'a str,
        tokens: usize,
        out: &mut Emitter<'_>,
    ) {
        if !buffer.is_empty() && self.budget.would_overflow(buffer.tokens, tokens) {
            buffer.flush(out);
        }
        buffer.push(piece, tokens);
    }

    /// Word-level packing for a sentence that is over budget on its own.
    /// Produces standalone chunks only.
    fn split_words(&self, sentence: &str, out: &mut Emitter<'_>) {
        let mut words = Buffer::new(" ");

        for word in sentence.split_whitespace() {
            let tokens = estimate_tokens(word);
            if !self.budget.admits(tokens) {
                words.flush(out);
                for slice in char_slices(word, self.slice_chars) {
                    out.emit(slice);
                }
                continue;
            }
            self.pack(&mut words, word, tokens, out);
        }
        words.flush(out);
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(TokenBudget::default())
    }
}

/// Accumulates pieces and their running token sum.
///
/// The running sum is an upper bound on the estimate of the joined text, so
/// a buffer that stays within budget by sum is within budget by estimate.
struct Buffer<'a> {
    pieces: Vec<&'a str>,
    tokens: usize,
    separator: &'static str,
}

impl<'a> Buffer<'a> {
    fn new(separator: &'static str) -> Self {
        Self {
            pieces: Vec::new(),
            tokens: 0,
            separator,
        }
    }

    fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    fn push(&mut self, piece: &'a str, tokens: usize) {
        self.pieces.push(piece);
        self.tokens = self.tokens.saturating_add(tokens);
    }

    fn flush(&mut self, out: &mut Emitter<'_>) {
        if self.is_empty() {
            return;
        }
        out.emit(&self.pieces.join(self.separator));
        self.pieces.clear();
        self.tokens = 0;
    }
}

struct Emitter<'s> {
    seq: &'s mut ChunkSequence,
    page_number: Option<u32>,
    chunks: Vec<TextChunk>,
}

impl Emitter<'_> {
    fn emit(&mut self, content: &str) {
        if let Some(chunk) = self.seq.issue(content, self.page_number) {
            self.chunks.push(chunk);
        }
    }
}

/// Consecutive slices of at most `size` characters. Never splits a `char`.
fn char_slices(word: &str, size: usize) -> impl Iterator<Item = &str> {
    let mut rest = word;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(size)
            .map_or(rest.len(), |(i, _)| i);
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(head)
    })
}

//! # pageslab
//!
//! Token-budgeted chunking of extracted document text for retrieval-augmented
//! generation (RAG) pipelines.
//!
//! ## The Problem
//!
//! A document question-answering system embeds document chunks and retrieves
//! the closest ones for each question. The input is rarely clean:
//!
//! - Extracted PDF text arrives as one string, with page numbers and binary
//!   residue mixed in
//! - Japanese and Chinese text has no spaces, so "count the words" says
//!   nothing about its size
//! - Embedding models have a hard input limit; a chunk past it is truncated
//!   or rejected
//!
//! Chunks must stay under a token budget, break at natural boundaries, and
//! keep every character of the input in order.
//!
//! ## The Pipeline
//!
//! ```text
//!             ┌───────────────┐   ┌────────────────┐   ┌──────────────┐
//!   stream ──▶│ TextExtractor │──▶│ PageStructurer │──▶│ TextChunker  │──▶ chunks.json
//!             │ clean + pages │   │ (collaborator, │   │ (budgeted,   │
//!             └───────────────┘   │  raw fallback) │   │  hierarchic) │
//!                                 └────────────────┘   └──────────────┘
//!                                   ≤ N pages in flight, page order kept
//! ```
//!
//! 1. **Extraction** cleans the decoded stream and guesses page boundaries
//!    from page-number markers, falling back to fixed-size pages.
//! 2. **Structuring** hands each page to an external collaborator (usually a
//!    language model) that normalizes headings, lists and tables. Failures,
//!    timeouts and blank replies keep the raw page text.
//! 3. **Chunking** packs paragraphs up to the budget and drops to sentences,
//!    words and finally 100-character slices only when a unit cannot fit.
//! 4. **Persistence** writes page texts and the chunk list atomically.
//!
//! ## Token Estimation
//!
//! There is no tokenizer. [`estimate_tokens`] counts CJK characters and
//! whitespace-delimited words in one pass:
//!
//! ```text
//! CJK present:  ceil(cjk × 1.5) + words
//! otherwise:    ceil(words × 1.3)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use pageslab::{estimate_tokens, TextChunker, TokenBudget};
//!
//! let text = "First paragraph.\n\nSecond paragraph.\n\n日本語の段落です。";
//! let chunker = TextChunker::new(TokenBudget::new(800).unwrap());
//! let chunks = chunker.chunk_text(text, "doc-42");
//!
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].id(), "doc-42-0");
//! assert_eq!(chunks[0].token_count(), estimate_tokens(chunks[0].content()));
//! ```
//!
//! ## Full Pipeline
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pageslab::{CancelToken, Pipeline, PipelineConfig, StructuringCollaborator};
//!
//! # async fn demo(collaborator: Arc<dyn StructuringCollaborator>) -> pageslab::Result<()> {
//! let pipeline = Pipeline::new(PipelineConfig::default(), collaborator)?;
//! let file = tokio::fs::File::open("report.txt").await?;
//! let report = pipeline.run(file, "report", &CancelToken::never()).await?;
//!
//! println!("{} chunks, degraded pages: {:?}", report.chunks.len(), report.degraded_pages());
//! # Ok(())
//! # }
//! ```

mod budget;
mod chunk;
mod chunker;
mod config;
mod error;
mod estimate;
mod extract;
mod pipeline;
mod segment;
mod sentence;
mod store;
mod structure;

pub use budget::{TokenBudget, DEFAULT_MAX_TOKENS};
pub use chunk::{ChunkSequence, TextChunk};
pub use chunker::{TextChunker, FORCED_SLICE_CHARS};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use estimate::{estimate_tokens, is_cjk, prefix_within, Estimate, TokenEstimator, TokenTally};
pub use extract::{clean_text, PageTextMap, TextExtractor};
pub use pipeline::{ArtifactSource, CancelToken, PageArtifact, Pipeline, PipelineReport};
pub use segment::{
    find_markers, HeuristicSegmenter, PageSegmenter, Segmentation, DEFAULT_CHARS_PER_PAGE,
    MIN_MARKERS,
};
pub use sentence::split_sentences;
pub use store::{page_number_from_path, validate_file_id, ArtifactStore, FileLock};
pub use structure::{
    PageStructurer, StructuringCollaborator, StructuringError, StructuringOutcome,
    DEFAULT_STRUCTURING_TIMEOUT, DEFAULT_STRUCTURING_TOKEN_CEILING, STRUCTURING_SYSTEM_PROMPT,
};

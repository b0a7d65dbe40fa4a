//! The document pipeline: extract, structure, chunk, persist.
//!
//! ```text
//! stream ──extract_by_page──▶ {1: p1, 2: p2, ...}
//!        ──structure (≤ concurrency in flight)──▶ tmp/{id}-page-N.txt
//!        ──chunk in page order, one sequence──▶ [chunk 0, chunk 1, ...]
//!        ──persist──▶ chunks/{id}.json
//! ```
//!
//! Pages finish structuring in any order; artifacts are reassembled by page
//! number, so chunk order always follows page order. A page whose
//! structuring fails is persisted as raw text and the run continues.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::store::{owned_page_number, validate_file_id};
use crate::{
    ArtifactStore, ChunkSequence, Error, PageStructurer, PageTextMap,
    PipelineConfig, Result, StructuringCollaborator, StructuringError, StructuringOutcome,
    TextChunk, TextChunker, TextExtractor, TokenBudget,
};

/// Cooperative cancellation for a pipeline run.
///
/// Checked before each page starts structuring and between chunked files.
///
/// ```rust
/// use pageslab::CancelToken;
///
/// let (tx, token) = CancelToken::new();
/// assert!(!token.is_cancelled());
/// tx.send(true).unwrap();
/// assert!(token.is_cancelled());
///
/// assert!(!CancelToken::never().is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    /// A token and the sender that cancels it (send `true`).
    #[must_use]
    pub fn new() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx: Some(rx) })
    }

    /// A token that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// How a page artifact's text was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// The collaborator's structured text.
    Structured,
    /// The raw page text, because structuring failed.
    RawFallback {
        /// What went wrong.
        reason: StructuringError,
    },
}

/// One persisted page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArtifact {
    /// 1-based page number.
    pub page_number: u32,
    /// Where the page text was written.
    pub path: PathBuf,
    /// Structured or raw fallback.
    pub source: ArtifactSource,
}

impl PageArtifact {
    /// Whether the page fell back to raw text.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, ArtifactSource::RawFallback { .. })
    }
}

/// Summary of a full [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// The document id.
    pub file_id: String,
    /// Page artifacts in page order.
    pub pages: Vec<PageArtifact>,
    /// Chunks in order.
    pub chunks: Vec<TextChunk>,
    /// Where the chunk list was written.
    pub chunks_path: PathBuf,
}

impl PipelineReport {
    /// Page numbers that fell back to raw text.
    #[must_use]
    pub fn degraded_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|page| page.is_degraded())
            .map(|page| page.page_number)
            .collect()
    }
}

/// Orchestrates extraction, structuring, chunking and persistence.
pub struct Pipeline {
    config: PipelineConfig,
    extractor: TextExtractor,
    structurer: PageStructurer,
    store: ArtifactStore,
}

impl Pipeline {
    /// Build a pipeline from a validated config.
    ///
    /// # Errors
    ///
    /// Any error from [`PipelineConfig::validate`].
    pub fn new(
        config: PipelineConfig,
        collaborator: Arc<dyn StructuringCollaborator>,
    ) -> Result<Self> {
        config.validate()?;
        let structurer = PageStructurer::new(collaborator)
            .with_token_ceiling(config.structuring_token_ceiling)
            .with_timeout(config.structuring_timeout());
        Ok(Self {
            extractor: TextExtractor::new(config.chars_per_page),
            structurer,
            store: ArtifactStore::new(&config.storage_root),
            config,
        })
    }

    /// Replace the extractor, e.g. to use a different page segmenter.
    #[must_use]
    pub fn with_extractor(mut self, extractor: TextExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The artifact store.
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Extract page texts from a decoded stream.
    ///
    /// # Errors
    ///
    /// An I/O error reading `reader`.
    pub async fn extract_pages<R>(&self, reader: R) -> Result<PageTextMap>
    where
        R: AsyncRead + Unpin,
    {
        self.extractor.extract_by_page(reader).await
    }

    /// Chunk a standalone text against `max_tokens`, numbering from zero.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBudget`] if `max_tokens == 0`.
    pub fn chunk_text(
        &self,
        text: &str,
        file_id: &str,
        max_tokens: usize,
    ) -> Result<Vec<TextChunk>> {
        Ok(self.chunker(max_tokens)?.chunk_text(text, file_id))
    }

    /// Structure every non-blank page and write one artifact per page.
    ///
    /// Up to `concurrency` pages are in flight. Failed pages are written as
    /// raw text. The result is ordered by page number.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] if `cancel` fires before all pages started, or
    /// an I/O error writing an artifact.
    pub async fn structure_and_persist_pages(
        &self,
        pages: &PageTextMap,
        file_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<PageArtifact>> {
        validate_file_id(file_id)?;

        let work: Vec<(u32, &str)> = pages
            .iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .collect();
        debug!(
            file_id,
            pages = pages.len(),
            blank = pages.len() - work.len(),
            "structuring pages"
        );

        let done: BTreeMap<u32, PageArtifact> = stream::iter(work)
            .map(|(page, text)| async move {
                cancel.check()?;
                let artifact = self.structure_and_persist_page(file_id, page, text).await?;
                Ok::<_, Error>((page, artifact))
            })
            .buffer_unordered(self.config.concurrency)
            .try_collect()
            .await?;

        let artifacts: Vec<PageArtifact> = done.into_values().collect();
        let degraded = artifacts.iter().filter(|a| a.is_degraded()).count();
        info!(
            file_id,
            pages = artifacts.len(),
            degraded,
            "structured pages"
        );
        Ok(artifacts)
    }

    async fn structure_and_persist_page(
        &self,
        file_id: &str,
        page: u32,
        text: &str,
    ) -> Result<PageArtifact> {
        let outcome = self.structurer.structure_page(page, text).await;
        let path = self.store.write_page(file_id, page, outcome.text()).await?;

        let source = match outcome {
            StructuringOutcome::Structured(_) => ArtifactSource::Structured,
            StructuringOutcome::Degraded { reason, .. } => {
                warn!(file_id, page, %reason, "structuring failed, keeping raw page text");
                ArtifactSource::RawFallback { reason }
            }
        };
        Ok(PageArtifact {
            page_number: page,
            path,
            source,
        })
    }

    /// Chunk page artifacts in the given order with one chunk sequence.
    ///
    /// Chunks from a `{file_id}-page-{n}.txt` path carry page number `n`.
    /// Paths named for another file id carry none.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBudget`] or an I/O error reading a path.
    pub async fn chunk_from_structured_pages(
        &self,
        paths: &[PathBuf],
        file_id: &str,
        max_tokens: usize,
    ) -> Result<Vec<TextChunk>> {
        self.chunk_files(paths, file_id, max_tokens, &CancelToken::never())
            .await
    }

    async fn chunk_files(
        &self,
        paths: &[PathBuf],
        file_id: &str,
        max_tokens: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<TextChunk>> {
        let chunker = self.chunker(max_tokens)?;
        let mut seq = ChunkSequence::new(file_id);
        let mut chunks = Vec::new();

        for path in paths {
            cancel.check()?;
            let text = tokio::fs::read_to_string(path).await?;
            let page = owned_page_number(path, file_id);
            chunks.extend(chunker.chunk_into(&text, &mut seq, page));
        }

        info!(file_id, files = paths.len(), chunks = chunks.len(), "chunked pages");
        Ok(chunks)
    }

    /// Chunk the page artifacts already in the store for `file_id`, in page
    /// order. Pages extracted by an external tool can be dropped into the
    /// store and picked up here.
    ///
    /// # Errors
    ///
    /// An invalid file id or budget, or an I/O error listing or reading pages.
    pub async fn chunk_stored_pages(
        &self,
        file_id: &str,
        max_tokens: usize,
    ) -> Result<Vec<TextChunk>> {
        let paths: Vec<PathBuf> = self
            .store
            .list_pages(file_id)
            .await?
            .into_iter()
            .map(|(_, path)| path)
            .collect();
        self.chunk_from_structured_pages(&paths, file_id, max_tokens)
            .await
    }

    /// Write the chunk list, replacing any previous one.
    ///
    /// # Errors
    ///
    /// An invalid file id, a serialization error, or an I/O error.
    pub async fn persist_chunks(&self, chunks: &[TextChunk], file_id: &str) -> Result<PathBuf> {
        self.store.write_chunks(file_id, chunks).await
    }

    /// Run the whole pipeline for one document.
    ///
    /// Runs for the same `file_id` are serialized. Page artifacts left by an
    /// earlier run for the id are removed before the new pages are written,
    /// so the store only ever holds the current document's pages.
    ///
    /// # Errors
    ///
    /// A read error on `reader`, an invalid file id, an artifact I/O error,
    /// or [`Error::Cancelled`].
    pub async fn run<R>(
        &self,
        reader: R,
        file_id: &str,
        cancel: &CancelToken,
    ) -> Result<PipelineReport>
    where
        R: AsyncRead + Unpin,
    {
        validate_file_id(file_id)?;
        let _guard = self.store.lock(file_id).await;

        let pages = self.extract_pages(reader).await?;
        cancel.check()?;

        self.store.clear_pages(file_id).await?;
        let artifacts = self.structure_and_persist_pages(&pages, file_id, cancel).await?;
        let paths: Vec<PathBuf> = artifacts.iter().map(|a| a.path.clone()).collect();
        let chunks = self
            .chunk_files(&paths, file_id, self.config.max_tokens, cancel)
            .await?;
        cancel.check()?;

        let chunks_path = self.persist_chunks(&chunks, file_id).await?;
        let report = PipelineReport {
            file_id: file_id.to_string(),
            pages: artifacts,
            chunks,
            chunks_path,
        };
        info!(
            file_id,
            pages = report.pages.len(),
            degraded = report.degraded_pages().len(),
            chunks = report.chunks.len(),
            "pipeline complete"
        );
        Ok(report)
    }

    fn chunker(&self, max_tokens: usize) -> Result<TextChunker> {
        Ok(TextChunker::new(TokenBudget::new(max_tokens)?)
            .with_slice_chars(self.config.forced_slice_chars))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("store", &self.store.root())
            .finish_non_exhaustive()
    }
}

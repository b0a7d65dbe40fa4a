//! Text extraction from an already-decoded stream.
//!
//! The input is largely textual (a PDF text layer, a dump, a plain file) but
//! may carry residual binary noise. Extraction is a best-effort cleanup:
//!
//! ```text
//! raw bytes ──utf-8 (lossy)──▶ keep printable ASCII, tab/CR/LF, CJK, fullwidth
//!           ──▶ collapse whitespace runs to one space
//!           ──▶ strip control characters, trim
//! ```
//!
//! Page boundaries are then guessed by a [`PageSegmenter`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::info;

use crate::{HeuristicSegmenter, PageSegmenter, Result};

/// Page texts keyed by 1-based page number, in page order.
///
/// Built once per input and read-only afterwards.
///
/// ```rust
/// use pageslab::PageTextMap;
///
/// let pages = PageTextMap::from_pages(vec!["first".into(), "second".into()]);
/// assert_eq!(pages.get(2), Some("second"));
/// assert_eq!(pages.iter().map(|(n, _)| n).collect::<Vec<_>>(), [1, 2]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTextMap {
    pages: BTreeMap<u32, String>,
}

impl PageTextMap {
    /// Number pages from 1 in the given order.
    #[must_use]
    pub fn from_pages(pages: Vec<String>) -> Self {
        (1u32..).zip(pages).collect()
    }

    /// Text of page `page`, if present.
    #[must_use]
    pub fn get(&self, page: u32) -> Option<&str> {
        self.pages.get(&page).map(String::as_str)
    }

    /// Number of pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether there are no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages in ascending page-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.pages.iter().map(|(&n, text)| (n, text.as_str()))
    }
}

impl FromIterator<(u32, String)> for PageTextMap {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

/// Reads a decoded stream into cleaned full text or page texts.
#[derive(Clone)]
pub struct TextExtractor {
    segmenter: Arc<dyn PageSegmenter>,
}

impl TextExtractor {
    /// Extractor with the default heuristic segmenter.
    #[must_use]
    pub fn new(chars_per_page: usize) -> Self {
        Self::with_segmenter(Arc::new(HeuristicSegmenter::new(chars_per_page)))
    }

    /// Extractor with a custom page segmentation strategy.
    #[must_use]
    pub fn with_segmenter(segmenter: Arc<dyn PageSegmenter>) -> Self {
        Self { segmenter }
    }

    /// Read the whole stream and return its cleaned text.
    ///
    /// # Errors
    ///
    /// Propagates any read error; there is no partial result.
    pub async fn extract_full_text<R>(&self, mut reader: R) -> Result<String>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;

        let text = clean_text(&String::from_utf8_lossy(&bytes));
        info!(bytes = bytes.len(), chars = text.chars().count(), "extracted text");
        Ok(text)
    }

    /// Read the stream and divide its cleaned text into pages.
    ///
    /// Cleaned text without markers that is shorter than one synthetic page
    /// comes back as exactly `{1: text}`.
    ///
    /// # Errors
    ///
    /// Propagates any read error.
    pub async fn extract_by_page<R>(&self, reader: R) -> Result<PageTextMap>
    where
        R: AsyncRead + Unpin,
    {
        let text = self.extract_full_text(reader).await?;
        let pages = self.pages_from_text(text);
        info!(pages = pages.len(), "split text into pages");
        Ok(pages)
    }

    /// Segment already-cleaned text into pages.
    #[must_use]
    pub fn pages_from_text(&self, text: String) -> PageTextMap {
        let pages = self.segmenter.segment(&text);
        if pages.is_empty() {
            return PageTextMap::from_pages(vec![text]);
        }
        PageTextMap::from_pages(pages)
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::with_segmenter(Arc::new(HeuristicSegmenter::default()))
    }
}

/// Clean raw decoded text: drop noise characters, collapse whitespace, trim.
///
/// ```rust
/// use pageslab::clean_text;
///
/// assert_eq!(clean_text("  Hello\u{0}\n\n  世界\u{FFFD} "), "Hello 世界");
/// ```
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let retained: String = raw.chars().filter(|&c| is_retained(c)).collect();
    let collapsed = retained.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().filter(|c| !c.is_control()).collect()
}

/// Printable ASCII, tab/CR/LF, the CJK ranges and fullwidth forms.
fn is_retained(c: char) -> bool {
    matches!(
        c,
        ' '..='~' | '\t' | '\n' | '\r' | '\u{3000}'..='\u{9FFF}' | '\u{FF00}'..='\u{FFEF}'
    )
}

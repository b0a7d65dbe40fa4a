//! Heuristic page segmentation.
//!
//! Extracted text arrives as one cleaned string with no layout metadata. Page
//! boundaries are guessed from page-number markers left in the text, falling
//! back to fixed-size slices.
//!
//! ## Marker-Based
//!
//! A marker is `Page N`, `N/M`, or a text that is nothing but a number:
//!
//! ```text
//! "Cover Page 1 Intro text Page 2 Body text Page 3 Appendix"
//!        ──────            ──────           ──────
//!
//! Page 1: "Cover Intro text"   <- preamble joins the first page
//! Page 2: "Body text"
//! Page 3: "Appendix"
//! ```
//!
//! The text between two consecutive markers is one page. Whatever follows the
//! last marker is the final page.
//!
//! ## Fixed-Size Fallback
//!
//! With fewer than two markers there is nothing to anchor on, so the text is
//! cut every `chars_per_page` characters:
//!
//! ```text
//! chars_per_page = 3000, text = 7000 chars
//!
//! Page 1: [0..3000]
//! Page 2: [3000..6000]
//! Page 3: [6000..7000]
//! ```
//!
//! Both variants are chosen by a single predicate, the marker count, so the
//! heuristic can be tested or replaced without touching the chunker.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Default synthetic page size for the fixed-size fallback.
pub const DEFAULT_CHARS_PER_PAGE: usize = 3000;

/// Markers needed before marker-based segmentation is trusted.
pub const MIN_MARKERS: usize = 2;

static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(page\s+\d+|\d+\s*/\s*\d+|^\s*\d+\s*$)").expect("invalid page marker pattern")
});

/// A strategy for dividing continuous text into pages.
///
/// Implementations return page texts in document order; page `i` of the
/// result becomes page number `i + 1`.
///
/// ```rust
/// use pageslab::{HeuristicSegmenter, PageSegmenter};
///
/// let segmenter = HeuristicSegmenter::default();
/// let pages = segmenter.segment("Page 1 alpha Page 2 beta");
/// assert_eq!(pages, ["alpha", "beta"]);
/// ```
pub trait PageSegmenter: Send + Sync {
    /// Split cleaned text into page texts.
    fn segment(&self, text: &str) -> Vec<String>;
}

/// The segmentation chosen for one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segmentation {
    /// Split at the byte ranges of detected page markers.
    Markers(Vec<Range<usize>>),
    /// Slice every `chars_per_page` characters.
    Fixed {
        /// Characters per synthetic page.
        chars_per_page: usize,
    },
}

impl Segmentation {
    /// Pick marker-based segmentation if `text` has at least [`MIN_MARKERS`]
    /// markers, otherwise fixed-size slicing.
    #[must_use]
    pub fn detect(text: &str, chars_per_page: usize) -> Self {
        let markers = find_markers(text);
        if markers.len() >= MIN_MARKERS {
            Self::Markers(markers)
        } else {
            Self::Fixed { chars_per_page }
        }
    }

    /// Apply this segmentation to `text`.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        match self {
            Self::Markers(markers) => split_at_markers(text, markers),
            Self::Fixed { chars_per_page } => split_fixed(text, *chars_per_page),
        }
    }
}

/// Byte ranges of every page marker in `text`, in order.
#[must_use]
pub fn find_markers(text: &str) -> Vec<Range<usize>> {
    PAGE_MARKER.find_iter(text).map(|m| m.range()).collect()
}

/// The default strategy: markers when there are enough, else fixed slices.
#[derive(Debug, Clone)]
pub struct HeuristicSegmenter {
    chars_per_page: usize,
}

impl HeuristicSegmenter {
    /// Create a segmenter with the given fallback page size.
    ///
    /// # Panics
    ///
    /// Panics if `chars_per_page == 0`.
    #[must_use]
    pub fn new(chars_per_page: usize) -> Self {
        assert!(chars_per_page > 0, "chars_per_page must be > 0");
        Self { chars_per_page }
    }
}

impl Default for HeuristicSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_PAGE)
    }
}

impl PageSegmenter for HeuristicSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        let segmentation = Segmentation::detect(text, self.chars_per_page);
        match &segmentation {
            Segmentation::Markers(markers) => {
                debug!(markers = markers.len(), "segmenting pages at markers");
            }
            Segmentation::Fixed { chars_per_page } => {
                debug!(chars_per_page, "no page markers, slicing fixed-size pages");
            }
        }
        segmentation.split(text)
    }
}

fn split_at_markers(text: &str, markers: &[Range<usize>]) -> Vec<String> {
    let Some((first, rest)) = markers.split_first() else {
        return vec![text.trim().to_string()];
    };

    let mut pages = Vec::with_capacity(markers.len());
    let mut start = first.end;
    for marker in rest {
        if marker.start > start {
            pages.push(text[start..marker.start].trim().to_string());
        }
        start = marker.end;
    }
    if start < text.len() {
        pages.push(text[start..].trim().to_string());
    }

    let preamble = text[..first.start].trim();
    if !preamble.is_empty() {
        match pages.first_mut() {
            Some(page) if page.is_empty() => *page = preamble.to_string(),
            Some(page) => *page = format!("{preamble} {page}"),
            None => pages.push(preamble.to_string()),
        }
    }

    pages
}

fn split_fixed(text: &str, chars_per_page: usize) -> Vec<String> {
    let mut pages = Vec::with_capacity(text.len() / chars_per_page.max(1) + 1);
    let mut rest = text;

    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(chars_per_page)
            .map_or(rest.len(), |(i, _)| i);
        let (page, tail) = rest.split_at(end);
        pages.push(page.trim().to_string());
        rest = tail;
    }

    pages
}

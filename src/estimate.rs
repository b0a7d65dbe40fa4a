//! Heuristic token estimation for mixed CJK/Latin text.
//!
//! ## Why Not a Real Tokenizer?
//!
//! The chunker asks "how big is this?" for every paragraph, sentence and
//! word it considers. Loading a BPE vocabulary for that is slow and ties the
//! crate to one model family. The estimate only has to be stable, cheap and
//! roughly proportional:
//!
//! ```text
//! Latin:  tokens ≈ ceil(words × 1.3)
//! CJK:    tokens ≈ ceil(cjk_chars × 1.5) + words
//!
//! "The quick brown fox"   → 4 words        → 6
//! "日本語のテキスト"        → 8 CJK, 1 word  → 13
//! ```
//!
//! CJK scripts are not whitespace-delimited, so once any hiragana, katakana or
//! kanji appears the per-character term dominates.
//!
//! The formulas are computed in integer arithmetic. If that ever overflows,
//! the estimate falls back to `ceil(chars × 0.5)` and reports itself as
//! [`Estimate::Coarse`].

/// The outcome of an estimate: the scan result or the coarse fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Estimate {
    /// Computed from the character scan.
    Scanned(usize),
    /// Length-based fallback after the scan could not produce a value.
    Coarse(usize),
}

impl Estimate {
    /// The estimated token count, whichever path produced it.
    #[must_use]
    pub const fn tokens(self) -> usize {
        match self {
            Self::Scanned(n) | Self::Coarse(n) => n,
        }
    }

    /// Whether this is the length-based fallback.
    #[must_use]
    pub const fn is_coarse(self) -> bool {
        matches!(self, Self::Coarse(_))
    }
}

/// Stateless entry point for token estimation.
///
/// ```rust
/// use pageslab::{Estimate, TokenEstimator};
///
/// assert_eq!(TokenEstimator::estimate(""), Estimate::Scanned(0));
/// assert_eq!(TokenEstimator::estimate("hello world").tokens(), 3);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenEstimator;

impl TokenEstimator {
    /// Estimate the token count of `text` in a single forward scan.
    #[must_use]
    pub fn estimate(text: &str) -> Estimate {
        let mut tally = TokenTally::default();
        text.chars().for_each(|c| tally.push(c));
        tally.estimate()
    }
}

/// Estimated token count of `text`. Never fails.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    TokenEstimator::estimate(text).tokens()
}

/// Incremental estimator state.
///
/// Feeding characters one at a time yields the same value as estimating the
/// whole prefix, which is what [`prefix_within`] relies on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenTally {
    cjk: usize,
    words: usize,
    chars: usize,
    in_word: bool,
}

impl TokenTally {
    /// Account for one more character.
    pub fn push(&mut self, c: char) {
        self.chars += 1;
        if c.is_whitespace() {
            self.in_word = false;
            return;
        }
        if !self.in_word {
            self.words += 1;
            self.in_word = true;
        }
        if is_cjk(c) {
            self.cjk += 1;
        }
    }

    /// Current estimate.
    #[must_use]
    pub fn estimate(&self) -> Estimate {
        match self.scanned() {
            Some(tokens) => Estimate::Scanned(tokens),
            None => Estimate::Coarse(self.chars.div_ceil(2)),
        }
    }

    /// Current estimate as a plain count.
    #[must_use]
    pub fn tokens(&self) -> usize {
        self.estimate().tokens()
    }

    fn scanned(&self) -> Option<usize> {
        if self.cjk > 0 {
            // ceil(cjk * 1.5) + words
            let cjk = self.cjk.checked_mul(3)?.checked_add(1)? / 2;
            cjk.checked_add(self.words)
        } else {
            // ceil(words * 1.3)
            Some(self.words.checked_mul(13)?.checked_add(9)? / 10)
        }
    }
}

/// Hiragana, katakana and the CJK unified ideographs block.
#[must_use]
pub fn is_cjk(c: char) -> bool {
    matches!(
        c,
        '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}'
    )
}

/// The longest prefix of `text` whose estimate stays within `max_tokens`.
///
/// ```rust
/// use pageslab::{estimate_tokens, prefix_within};
///
/// let text = "one two three four five six";
/// let prefix = prefix_within(text, 4);
/// assert_eq!(prefix.trim_end(), "one two three");
/// assert!(estimate_tokens(prefix) <= 4);
/// ```
#[must_use]
pub fn prefix_within(text: &str, max_tokens: usize) -> &str {
    let mut tally = TokenTally::default();
    for (i, c) in text.char_indices() {
        tally.push(c);
        if tally.tokens() > max_tokens {
            return &text[..i];
        }
    }
    text
}

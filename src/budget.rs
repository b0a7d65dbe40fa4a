//! Token budget configuration.
//!
//! ## The Problem
//!
//! Embedding models have a hard input limit, and retrieval works best when a
//! chunk is one coherent unit. The budget is the ceiling every chunk is packed
//! against:
//!
//! ```text
//! Budget: 800 tokens
//! Paragraphs: [300] [300] [300]
//!
//! Packed:  [300 + 300] | [300]
//!          ↑ 900 would overflow, so the buffer is flushed first
//! ```
//!
//! Unlike a desired/max range, the budget is a single hard ceiling. The only
//! content allowed past it is a forced slice of one word that is itself over
//! budget.

use crate::{Error, Result};

/// Default budget used by the document pipeline.
pub const DEFAULT_MAX_TOKENS: usize = 800;

/// A hard token ceiling for chunk content.
///
/// # Examples
///
/// ```rust
/// use pageslab::TokenBudget;
///
/// let budget = TokenBudget::new(800).unwrap();
/// assert!(budget.admits(800));
/// assert!(!budget.admits(801));
/// assert!(budget.would_overflow(500, 301));
///
/// assert!(TokenBudget::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    max: usize,
}

impl TokenBudget {
    /// Create a budget with the given ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBudget`] if `max == 0`.
    pub fn new(max: usize) -> Result<Self> {
        if max == 0 {
            return Err(Error::InvalidBudget(max));
        }
        Ok(Self { max })
    }

    /// The maximum estimated tokens a chunk may hold.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Whether a unit of `tokens` fits on its own.
    #[must_use]
    pub const fn admits(&self, tokens: usize) -> bool {
        tokens <= self.max
    }

    /// Check if adding `additional` tokens to `current` would exceed the budget.
    ///
    /// Useful for incremental chunk building.
    #[must_use]
    pub fn would_overflow(&self, current: usize, additional: usize) -> bool {
        current.saturating_add(additional) > self.max
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            max: DEFAULT_MAX_TOKENS,
        }
    }
}

impl TryFrom<usize> for TokenBudget {
    type Error = Error;

    fn try_from(max: usize) -> Result<Self> {
        Self::new(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits() {
        let budget = TokenBudget::new(100).unwrap();
        assert!(budget.admits(0));
        assert!(budget.admits(100));
        assert!(!budget.admits(101));
    }

    #[test]
    fn test_would_overflow() {
        let budget = TokenBudget::new(100).unwrap();
        assert!(!budget.would_overflow(50, 49));
        assert!(!budget.would_overflow(50, 50));
        assert!(budget.would_overflow(50, 51));
        assert!(budget.would_overflow(usize::MAX, 1));
    }

    #[test]
    fn test_zero_budget_rejected() {
        assert!(matches!(TokenBudget::new(0), Err(Error::InvalidBudget(0))));
        assert!(TokenBudget::try_from(0).is_err());
    }

    #[test]
    fn test_default_budget() {
        assert_eq!(TokenBudget::default().max(), DEFAULT_MAX_TOKENS);
    }
}

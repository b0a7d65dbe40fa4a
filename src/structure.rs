//! Per-page structuring through an external text-structuring collaborator.
//!
//! The collaborator (typically a hosted language model) rewrites a raw page
//! into clean structured text. It is slow and fallible, so every call is
//! bounded by a timeout and any failure degrades to the raw page text:
//!
//! ```text
//! page text ──prompt (≤ ceiling)──▶ collaborator ──reply──▶ Structured(reply)
//!                                        │
//!                     error / timeout / blank reply
//!                                        ▼
//!                              Degraded { raw page text, reason }
//! ```
//!
//! A failed page never fails the document.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{estimate_tokens, prefix_within};

/// Default upper bound on the estimated size of one structuring prompt.
pub const DEFAULT_STRUCTURING_TOKEN_CEILING: usize = 80_000;

/// Default time allowed for one collaborator call.
pub const DEFAULT_STRUCTURING_TIMEOUT: Duration = Duration::from_secs(120);

/// Fixed instruction sent with every page.
pub const STRUCTURING_SYSTEM_PROMPT: &str = "\
You restructure raw text extracted from a single document page.

Rules:
- Preserve all of the original content. Do not summarize, translate, or add information.
- Mark headings as headings and keep their hierarchy.
- Render bulleted and numbered lists as lists.
- Render tabular data as tables.
- Remove running headers, footers, and page numbers.
- Separate paragraphs with a blank line.
- Change only the structure, never the wording.

Reply with the structured text only.";

/// Why a page fell back to its raw text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuringError {
    /// The call did not finish in time.
    #[error("structuring timed out after {0:?}")]
    Timeout(Duration),

    /// The collaborator replied with blank text.
    #[error("structuring returned an empty response")]
    EmptyResponse,

    /// The collaborator reported a failure.
    #[error("structuring backend failed: {0}")]
    Backend(String),
}

/// An external service that rewrites raw page text into structured text.
///
/// Implementations may take arbitrarily long; callers bound them with a
/// timeout.
#[async_trait]
pub trait StructuringCollaborator: Send + Sync {
    /// Structure `user_prompt` according to `system_prompt`.
    async fn structure(
        &self,
        user_prompt: &str,
        system_prompt: &str,
    ) -> Result<String, StructuringError>;
}

/// The result of structuring one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuringOutcome {
    /// The collaborator's structured text.
    Structured(String),
    /// The original page text, kept because structuring failed.
    Degraded {
        /// The full original page text.
        text: String,
        /// What went wrong.
        reason: StructuringError,
    },
}

impl StructuringOutcome {
    /// The text to persist for this page, structured or not.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Structured(text) | Self::Degraded { text, .. } => text,
        }
    }

    /// Whether the page fell back to raw text.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Runs one collaborator call per page with a prompt ceiling and a timeout.
#[derive(Clone)]
pub struct PageStructurer {
    collaborator: Arc<dyn StructuringCollaborator>,
    token_ceiling: usize,
    timeout: Duration,
}

impl PageStructurer {
    /// Structurer with the default ceiling and timeout.
    pub fn new(collaborator: Arc<dyn StructuringCollaborator>) -> Self {
        Self {
            collaborator,
            token_ceiling: DEFAULT_STRUCTURING_TOKEN_CEILING,
            timeout: DEFAULT_STRUCTURING_TIMEOUT,
        }
    }

    /// Override the prompt ceiling (estimated tokens).
    #[must_use]
    pub fn with_token_ceiling(mut self, token_ceiling: usize) -> Self {
        self.token_ceiling = token_ceiling;
        self
    }

    /// Override the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Structure one page. Never fails: problems yield
    /// [`StructuringOutcome::Degraded`] carrying the whole page text.
    pub async fn structure_page(&self, page: u32, text: &str) -> StructuringOutcome {
        let prompt = self.user_prompt(page, text);
        let call = self.collaborator.structure(&prompt, STRUCTURING_SYSTEM_PROMPT);

        let reason = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(reply)) if !reply.trim().is_empty() => {
                debug!(page, chars = reply.chars().count(), "page structured");
                return StructuringOutcome::Structured(reply);
            }
            Ok(Ok(_)) => StructuringError::EmptyResponse,
            Ok(Err(err)) => err,
            Err(_) => StructuringError::Timeout(self.timeout),
        };

        StructuringOutcome::Degraded {
            text: text.to_string(),
            reason,
        }
    }

    /// The user prompt for `page`, with the page text cut so the estimate of
    /// the whole prompt stays within the ceiling.
    #[must_use]
    pub fn user_prompt(&self, page: u32, text: &str) -> String {
        let header = prompt_header(page);
        let prompt = format!("{header}{text}");
        let tokens = estimate_tokens(&prompt);
        if tokens <= self.token_ceiling {
            return prompt;
        }

        let room = self.token_ceiling.saturating_sub(estimate_tokens(&header));
        let kept = prefix_within(text, room);
        warn!(
            page,
            tokens,
            ceiling = self.token_ceiling,
            kept_chars = kept.chars().count(),
            "page text exceeds structuring ceiling, truncating prompt"
        );
        format!("{header}{kept}")
    }
}

fn prompt_header(page: u32) -> String {
    format!("The following is raw text extracted from page {page} of a document. Structure it.\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl StructuringCollaborator for Echo {
        async fn structure(&self, user_prompt: &str, _: &str) -> Result<String, StructuringError> {
            Ok(format!("# Page\n\n{}", user_prompt.rsplit("\n\n").next().unwrap_or("")))
        }
    }

    struct Fixed(Result<String, StructuringError>);

    #[async_trait]
    impl StructuringCollaborator for Fixed {
        async fn structure(&self, _: &str, _: &str) -> Result<String, StructuringError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_structured_reply() {
        let structurer = PageStructurer::new(Arc::new(Echo));
        let outcome = structurer.structure_page(1, "body text").await;
        assert_eq!(outcome, StructuringOutcome::Structured("# Page\n\nbody text".into()));
        assert!(!outcome.is_degraded());
    }

    #[tokio::test]
    async fn test_backend_error_degrades() {
        let err = StructuringError::Backend("quota".into());
        let structurer = PageStructurer::new(Arc::new(Fixed(Err(err.clone()))));
        let outcome = structurer.structure_page(2, "raw").await;
        assert_eq!(
            outcome,
            StructuringOutcome::Degraded {
                text: "raw".into(),
                reason: err
            }
        );
        assert_eq!(outcome.text(), "raw");
    }

    #[tokio::test]
    async fn test_blank_reply_degrades() {
        let structurer = PageStructurer::new(Arc::new(Fixed(Ok(" \n ".into()))));
        let outcome = structurer.structure_page(1, "raw").await;
        assert!(matches!(
            outcome,
            StructuringOutcome::Degraded {
                reason: StructuringError::EmptyResponse,
                ..
            }
        ));
    }

    #[test]
    fn test_prompt_within_ceiling_is_untouched() {
        let structurer = PageStructurer::new(Arc::new(Echo));
        let prompt = structurer.user_prompt(3, "short page");
        assert!(prompt.contains("page 3"));
        assert!(prompt.ends_with("short page"));
    }

    #[test]
    fn test_prompt_truncated_to_ceiling() {
        let structurer = PageStructurer::new(Arc::new(Echo)).with_token_ceiling(60);
        let text = "word ".repeat(500);
        let prompt = structurer.user_prompt(1, &text);

        assert!(estimate_tokens(&prompt) <= 60);
        let body = prompt.rsplit("\n\n").next().unwrap_or("");
        assert!(!body.is_empty());
        assert!(text.starts_with(body));
    }
}

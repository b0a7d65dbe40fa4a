//! Pipeline configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! max_tokens = 800
//! structuring_token_ceiling = 80000
//! chars_per_page = 3000
//! forced_slice_chars = 100
//! concurrency = 4
//! structuring_timeout_secs = 120
//! storage_root = "storage"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::budget::DEFAULT_MAX_TOKENS;
use crate::chunker::FORCED_SLICE_CHARS;
use crate::segment::DEFAULT_CHARS_PER_PAGE;
use crate::structure::{DEFAULT_STRUCTURING_TIMEOUT, DEFAULT_STRUCTURING_TOKEN_CEILING};
use crate::{Error, Result, TokenBudget};

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

fn default_structuring_token_ceiling() -> usize {
    DEFAULT_STRUCTURING_TOKEN_CEILING
}

fn default_chars_per_page() -> usize {
    DEFAULT_CHARS_PER_PAGE
}

fn default_forced_slice_chars() -> usize {
    FORCED_SLICE_CHARS
}

fn default_concurrency() -> usize {
    4
}

fn default_structuring_timeout_secs() -> u64 {
    DEFAULT_STRUCTURING_TIMEOUT.as_secs()
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("storage")
}

/// Settings for [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Token budget per chunk.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Upper bound on the estimated size of one structuring prompt.
    #[serde(default = "default_structuring_token_ceiling")]
    pub structuring_token_ceiling: usize,
    /// Synthetic page size when no page markers are found.
    #[serde(default = "default_chars_per_page")]
    pub chars_per_page: usize,
    /// Slice length for words that are over budget on their own.
    #[serde(default = "default_forced_slice_chars")]
    pub forced_slice_chars: usize,
    /// Pages structured at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-page structuring timeout in seconds.
    #[serde(default = "default_structuring_timeout_secs")]
    pub structuring_timeout_secs: u64,
    /// Root directory for page and chunk artifacts.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            structuring_token_ceiling: default_structuring_token_ceiling(),
            chars_per_page: default_chars_per_page(),
            forced_slice_chars: default_forced_slice_chars(),
            concurrency: default_concurrency(),
            structuring_timeout_secs: default_structuring_timeout_secs(),
            storage_root: default_storage_root(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for malformed TOML, or any error from
    /// [`validate`](Self::validate).
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// An I/O error reading `path`, or any error from
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBudget`] for a zero `max_tokens`, otherwise
    /// [`Error::InvalidConfig`] listing each out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(Error::InvalidBudget(self.max_tokens));
        }

        let mut errors = Vec::new();
        if self.structuring_token_ceiling == 0 {
            errors.push("structuring_token_ceiling must be positive");
        }
        if self.chars_per_page == 0 {
            errors.push("chars_per_page must be positive");
        }
        if self.forced_slice_chars == 0 {
            errors.push("forced_slice_chars must be positive");
        }
        if self.concurrency == 0 {
            errors.push("concurrency must be at least 1");
        }
        if self.structuring_timeout_secs == 0 {
            errors.push("structuring_timeout_secs must be positive");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(errors.join("; ")))
        }
    }

    /// The chunk budget.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBudget`] if `max_tokens == 0`.
    pub fn budget(&self) -> Result<TokenBudget> {
        TokenBudget::new(self.max_tokens)
    }

    /// The per-page structuring timeout.
    #[must_use]
    pub fn structuring_timeout(&self) -> Duration {
        Duration::from_secs(self.structuring_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.max_tokens, 800);
        assert_eq!(config.structuring_token_ceiling, 80_000);
        assert_eq!(config.chars_per_page, 3000);
        assert_eq!(config.structuring_timeout(), Duration::from_secs(120));
        assert_eq!(config.storage_root, Path::new("storage"));
    }

    #[test]
    fn test_partial_override() {
        let config = PipelineConfig::from_toml_str("max_tokens = 512\nconcurrency = 8").unwrap();
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.budget().unwrap().max(), 512);
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = PipelineConfig::from_toml_str("max_tokens = 0").unwrap_err();
        assert!(matches!(err, Error::InvalidBudget(0)));
    }

    #[test]
    fn test_all_invalid_fields_reported() {
        let config = PipelineConfig {
            concurrency: 0,
            forced_slice_chars: 0,
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("concurrency must be at least 1"), "{err}");
        assert!(err.contains("forced_slice_chars must be positive"), "{err}");
    }

    #[test]
    fn test_malformed_toml() {
        let err = PipelineConfig::from_toml_str("max_tokens = \"many\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pageslab.toml");
        std::fs::write(&path, "storage_root = \"/var/lib/pageslab\"\n").unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.storage_root, Path::new("/var/lib/pageslab"));
    }
}

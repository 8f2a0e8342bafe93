//! Runtime configuration
//!
//! Loaded from TOML. Every section and field is optional; missing values fall
//! back to the defaults below.
//!
//! ```toml
//! [normalize]
//! hide_empty = true
//! max_depth = 256
//!
//! [diff]
//! show_unchanged = false
//!
//! [history]
//! page_size = 25
//! change_request_prefix = "/proposals/"
//! poll_interval_ms = 50
//! build_batch_size = 64
//!
//! [logging]
//! profile = "production"
//! ```

use crate::errors::{RegDiffError, Result};
use crate::logging_facility::Profile;
use crate::normalize::NormalizeOptions;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MAX_DEPTH: usize = 256;
pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const DEFAULT_CHANGE_REQUEST_PREFIX: &str = "/proposals/";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
pub const DEFAULT_BUILD_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegDiffConfig {
    pub normalize: NormalizeConfig,
    pub diff: DiffConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Prune empty leaves and all-empty containers before diffing
    pub hide_empty: bool,
    /// Deepest nesting accepted before normalization fails
    pub max_depth: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            hide_empty: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiffConfig {
    /// Default for the display filter; the diff tree itself is never pruned
    pub show_unchanged: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            show_unchanged: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub page_size: usize,
    /// Object paths under this prefix are change requests
    pub change_request_prefix: String,
    /// How long a history stream sleeps when it has caught up with a building index
    pub poll_interval_ms: u64,
    /// Objects evaluated per step by the in-memory index builder
    pub build_batch_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            change_request_prefix: DEFAULT_CHANGE_REQUEST_PREFIX.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            build_batch_size: DEFAULT_BUILD_BATCH_SIZE,
        }
    }
}

impl HistoryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub profile: Profile,
}

impl RegDiffConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the document does not parse or a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RegDiffConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`RegDiffConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    ///
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.normalize.max_depth == 0 {
            return Err(RegDiffError::InvalidConfig {
                reason: "normalize.max_depth must be at least 1".to_string(),
            });
        }
        if self.history.page_size == 0 {
            return Err(RegDiffError::InvalidConfig {
                reason: "history.page_size must be at least 1".to_string(),
            });
        }
        if self.history.build_batch_size == 0 {
            return Err(RegDiffError::InvalidConfig {
                reason: "history.build_batch_size must be at least 1".to_string(),
            });
        }
        if self.history.change_request_prefix.is_empty() {
            return Err(RegDiffError::InvalidConfig {
                reason: "history.change_request_prefix must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            hide_empty: self.normalize.hide_empty,
            max_depth: self.normalize.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = RegDiffConfig::from_toml_str("").unwrap();
        assert_eq!(config, RegDiffConfig::default());
        assert_eq!(config.history.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.diff.show_unchanged);
        assert!(!config.normalize.hide_empty);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = RegDiffConfig::from_toml_str(
            "[normalize]\nhide_empty = true\n\n[history]\npage_size = 5\n",
        )
        .unwrap();
        assert!(config.normalize.hide_empty);
        assert_eq!(config.normalize.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.history.page_size, 5);
        assert_eq!(config.history.change_request_prefix, "/proposals/");
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let err = RegDiffConfig::from_toml_str("[history]\npage_size = 0\n").unwrap_err();
        assert!(matches!(err, RegDiffError::InvalidConfig { .. }));
    }

    #[test]
    fn test_malformed_toml_is_invalid_config() {
        let err = RegDiffConfig::from_toml_str("[history\npage_size = ").unwrap_err();
        assert!(matches!(err, RegDiffError::InvalidConfig { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regdiff.toml");
        std::fs::write(&path, "[logging]\nprofile = \"test\"\n").unwrap();
        let config = RegDiffConfig::load(&path).unwrap();
        assert_eq!(config.logging.profile, Profile::Test);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RegDiffConfig::load(Path::new("/nonexistent/regdiff.toml")).unwrap_err();
        assert!(matches!(err, RegDiffError::Io { .. }));
    }
}

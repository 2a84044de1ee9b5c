//! Configuration file support for paper-meta.
//!
//! # Configuration File Format
//!
//! ```toml
//! [http]
//! connect_timeout_secs = 8
//! read_timeout_secs = 15
//! user_agent = "paper-meta/0.1.0"
//! contact_email = "you@example.org"
//!
//! [endpoints]
//! doi_base = "https://doi.org"
//! crossref_api = "https://api.crossref.org"
//! arxiv_api = "http://export.arxiv.org/api/query"
//!
//! [resolution]
//! polite_delay_ms = 0
//! pdf_max_pages = 2
//! search_rows = 5
//! author_style = "given-family"   # or "family-given"
//!
//! [retry]
//! max_attempts = 2
//! initial_delay_ms = 500
//! max_delay_ms = 4000
//!
//! [logging]
//! level = "info"
//! format = "text"                 # or "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::Config;

/// A configuration file on disk
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub config: Config,
}

impl ConfigFile {
    /// Load configuration from a TOML file, without environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))
    }
}

impl From<Config> for ConfigFile {
    fn from(config: Config) -> Self {
        Self { config }
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

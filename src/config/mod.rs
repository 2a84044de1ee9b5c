//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `PAPER_META_*` environment variables (`__` separates nested keys, e.g.
//! `PAPER_META_HTTP__CONTACT_EMAIL`).

mod file_config;

pub use file_config::{ConfigFile, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-directory configuration file
pub const LOCAL_CONFIG_FILE: &str = "paper-meta.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PAPER_META";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Outgoing HTTP settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Base URLs of the remote services
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Resolution behaviour
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Retry of transient failures
    #[serde(default)]
    pub retry: RetrySettings,

    /// Logging section
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound for a whole request once connected
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Contact address sent along with the user agent
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            user_agent: default_user_agent(),
            contact_email: None,
        }
    }
}

impl HttpConfig {
    /// User agent with the contact address appended, if any
    pub fn effective_user_agent(&self) -> String {
        match self.contact_email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => format!("{} mailto:{}", self.user_agent, email),
            _ => self.user_agent.clone(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

fn default_connect_timeout() -> u64 {
    8
}

fn default_read_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Remote service base URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// DOI registry used for content negotiation
    #[serde(default = "default_doi_base")]
    pub doi_base: String,

    #[serde(default = "default_crossref_api")]
    pub crossref_api: String,

    /// arXiv Atom query endpoint
    #[serde(default = "default_arxiv_api")]
    pub arxiv_api: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            doi_base: default_doi_base(),
            crossref_api: default_crossref_api(),
            arxiv_api: default_arxiv_api(),
        }
    }
}

fn default_doi_base() -> String {
    "https://doi.org".to_string()
}

fn default_crossref_api() -> String {
    "https://api.crossref.org".to_string()
}

fn default_arxiv_api() -> String {
    "http://export.arxiv.org/api/query".to_string()
}

/// How author names are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorStyle {
    /// "Given Family"
    #[default]
    GivenFamily,
    /// "Family, Given"
    FamilyGiven,
}

/// Resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Pause between consecutive network calls of one resolution
    #[serde(default)]
    pub polite_delay_ms: u64,

    /// Pages sampled when extracting PDF hints
    #[serde(default = "default_pdf_max_pages")]
    pub pdf_max_pages: usize,

    /// Candidates requested from the index title search
    #[serde(default = "default_search_rows")]
    pub search_rows: usize,

    #[serde(default)]
    pub author_style: AuthorStyle,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            polite_delay_ms: 0,
            pdf_max_pages: default_pdf_max_pages(),
            search_rows: default_search_rows(),
            author_style: AuthorStyle::default(),
        }
    }
}

impl ResolutionConfig {
    pub fn polite_delay(&self) -> Duration {
        Duration::from_millis(self.polite_delay_ms)
    }
}

fn default_pdf_max_pages() -> usize {
    2
}

fn default_search_rows() -> usize {
    5
}

/// Retry settings for transient failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    4000
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from an optional file plus the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Locate a configuration file: `./paper-meta.toml`, then the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("paper-meta").join("config.toml"))
        .filter(|path| path.is_file())
}

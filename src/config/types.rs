use crate::ConfigResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Main configuration structure for Site-Indexer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// SHA-256 of the effective configuration (after command-line overrides)
    ///
    /// Stored on each run record so runs with different settings can be told apart.
    pub fn fingerprint(&self) -> ConfigResult<String> {
        let serialized = toml::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from; its canonical form is the site boundary
    #[serde(rename = "seed-url", default)]
    pub seed_url: String,

    /// Stop after this many pages have been indexed
    #[serde(
        rename = "max-to-index",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_to_index: Option<u64>,

    /// Maximum number of fetches in flight
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Stop-word file, one word per line
    #[serde(
        rename = "stopwords-path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stopwords_path: Option<String>,
}

fn default_max_concurrent_fetches() -> u32 {
    1
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_url: String::new(),
            max_to_index: None,
            max_concurrent_fetches: default_max_concurrent_fetches(),
            request_timeout_secs: default_request_timeout_secs(),
            stopwords_path: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SiteIndexer".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/site-indexer".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the document-term matrix CSV
    #[serde(rename = "term-matrix-path")]
    pub term_matrix_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "site_index.db".to_string(),
            term_matrix_path: "term_matrix.csv".to_string(),
        }
    }
}

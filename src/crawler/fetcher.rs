//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Manual redirect handling with loop detection
//! - Typed failure classification

use crate::config::UserAgentConfig;
use crate::url::CanonicalUrl;
use reqwest::{header, redirect::Policy, Client};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirect hops followed for one request
pub const MAX_REDIRECTS: usize = 10;

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was asked for
    pub requested_url: String,
    /// Final URL after redirects; relative links resolve against it
    pub final_url: Url,
    /// HTTP status code (always a success status)
    pub status: u16,
    /// URLs traversed before the final one, in order
    pub redirect_history: Vec<String>,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Raw response body
    pub body: Vec<u8>,
}

/// Why a fetch did not produce a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// The server answered with a non-success status
    #[error("HTTP status {status}")]
    Status {
        status: u16,
        redirect_history: Vec<String>,
    },

    /// No usable response (connection refused, DNS, TLS, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Redirect loop, over-long chain or unusable Location header
    #[error("Redirect error: {message}")]
    Redirect {
        message: String,
        redirect_history: Vec<String>,
    },
}

impl FetchFailure {
    /// Redirects traversed before the failure
    pub fn redirect_history(&self) -> &[String] {
        match self {
            Self::Status {
                redirect_history, ..
            }
            | Self::Redirect {
                redirect_history, ..
            } => redirect_history,
            Self::Network(_) => &[],
        }
    }
}

/// Result of one fetch; failures are values, never panics
pub type FetchOutcome = Result<FetchedPage, FetchFailure>;

/// The page-fetching collaborator
///
/// Implementations must not fail on network problems: every outcome is
/// reported through [`FetchOutcome`].
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &CanonicalUrl) -> impl Future<Output = FetchOutcome> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &CanonicalUrl) -> impl Future<Output = FetchOutcome> + Send {
        let client = self.client.clone();
        let url = url.as_str().to_string();
        async move { fetch_url(&client, &url).await }
    }
}

/// Fetches a URL, following redirects by hand
///
/// # Request Flow
///
/// 1. Send GET request
/// 2. On a 3xx with a `Location` header, record the hop and follow it
///    - More than [`MAX_REDIRECTS`] hops → `Redirect`
///    - A URL visited twice → `Redirect` (loop)
/// 3. A non-success final status → `Status`
/// 4. Read the body; transport errors at any step → `Network`
pub async fn fetch_url(client: &Client, url: &str) -> FetchOutcome {
    let mut current =
        Url::parse(url).map_err(|e| FetchFailure::Network(format!("Invalid URL {}: {}", url, e)))?;
    let mut history: Vec<String> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(current.to_string());

    loop {
        let response = client
            .get(current.clone())
            .send()
            .await
            .map_err(classify_error)?;
        let status = response.status();

        if status.is_redirection() {
            let Some(location) = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                return Err(FetchFailure::Redirect {
                    message: format!("HTTP {} without Location header", status.as_u16()),
                    redirect_history: history,
                });
            };

            let next = current.join(location).map_err(|e| FetchFailure::Redirect {
                message: format!("Invalid Location {:?}: {}", location, e),
                redirect_history: history.clone(),
            })?;

            history.push(current.to_string());
            if history.len() > MAX_REDIRECTS {
                return Err(FetchFailure::Redirect {
                    message: format!("More than {} redirects", MAX_REDIRECTS),
                    redirect_history: history,
                });
            }
            if !visited.insert(next.to_string()) {
                return Err(FetchFailure::Redirect {
                    message: format!("Redirect loop at {}", next),
                    redirect_history: history,
                });
            }

            tracing::trace!("Following redirect {} -> {}", current, next);
            current = next;
            continue;
        }

        if !status.is_success() {
            return Err(FetchFailure::Status {
                status: status.as_u16(),
                redirect_history: history,
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(classify_error)?;

        return Ok(FetchedPage {
            requested_url: url.to_string(),
            final_url: current,
            status: status.as_u16(),
            redirect_history: history,
            content_type,
            body: body.to_vec(),
        });
    }
}

/// Maps a transport error to a failure description
fn classify_error(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Network("Request timeout".to_string())
    } else if e.is_connect() {
        FetchFailure::Network(format!("Connection failed: {}", e))
    } else {
        FetchFailure::Network(e.to_string())
    }
}

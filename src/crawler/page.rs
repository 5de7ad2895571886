//! Page summaries: what the coordinator learns from one fetch

use crate::crawler::fetcher::{FetchFailure, FetchOutcome};
use crate::crawler::parser::{is_html, is_textual, Extractor};
use crate::index::ContentHash;
use crate::state::PageState;
use crate::url::CanonicalUrl;

/// The outcome of fetching one URL, keyed by the URL that was requested
///
/// Links and image sources are absolute but not yet canonical; the URL
/// indexer resolves them when the page is admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSummary {
    pub requested_url: String,
    pub final_url: Option<String>,
    pub state: PageState,
    pub status_code: Option<u16>,
    pub redirect_history: Vec<String>,
    pub content_type: Option<String>,
    pub content_hash: Option<ContentHash>,
    pub a_hrefs: Vec<String>,
    pub img_srcs: Vec<String>,
    pub error: Option<String>,
}

impl PageSummary {
    /// A summary with no response data
    pub fn new(requested_url: impl Into<String>, state: PageState) -> Self {
        Self {
            requested_url: requested_url.into(),
            final_url: None,
            state,
            status_code: None,
            redirect_history: Vec::new(),
            content_type: None,
            content_hash: None,
            a_hrefs: Vec::new(),
            img_srcs: Vec::new(),
            error: None,
        }
    }

    /// Summarizes a fetch outcome
    ///
    /// Failed fetches become broken-URL summaries with no outbound links:
    /// HTTP error statuses are dead links, everything else is unreachable.
    pub fn from_outcome(url: &CanonicalUrl, outcome: &FetchOutcome, extractor: &Extractor) -> Self {
        match outcome {
            Ok(page) => {
                let content_type = page.content_type.as_deref();
                let (a_hrefs, img_srcs) = if is_html(content_type) {
                    let html = String::from_utf8_lossy(&page.body);
                    (
                        extractor.extract_links(&html, &page.final_url),
                        extractor.extract_image_sources(&html, &page.final_url),
                    )
                } else {
                    (Vec::new(), Vec::new())
                };

                Self {
                    requested_url: url.as_str().to_string(),
                    final_url: Some(page.final_url.to_string()),
                    state: PageState::Processed,
                    status_code: Some(page.status),
                    redirect_history: page.redirect_history.clone(),
                    content_type: page.content_type.clone(),
                    content_hash: Some(ContentHash::of(&page.body)),
                    a_hrefs,
                    img_srcs,
                    error: None,
                }
            }
            Err(failure) => {
                let (state, status_code) = match failure {
                    FetchFailure::Status { status, .. } => (PageState::DeadLink, Some(*status)),
                    FetchFailure::Network(_) | FetchFailure::Redirect { .. } => {
                        (PageState::Unreachable, None)
                    }
                };

                let mut summary = Self::new(url.as_str(), state);
                summary.status_code = status_code;
                summary.redirect_history = failure.redirect_history().to_vec();
                summary.error = Some(failure.to_string());
                summary
            }
        }
    }

    /// Returns true if the page was fetched and its body is text
    pub fn is_textual(&self) -> bool {
        self.state.is_success() && is_textual(self.content_type.as_deref())
    }
}

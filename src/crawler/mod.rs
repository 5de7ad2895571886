//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with manual redirect handling
//! - Plain-text, link and image extraction and tokenization
//! - The breadth-first frontier
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod page;
mod parser;

pub use coordinator::{run_crawl, Coordinator, CrawlOutcome};
pub use fetcher::{
    build_http_client, fetch_url, FetchFailure, FetchOutcome, FetchedPage, Fetcher, HttpFetcher,
    MAX_REDIRECTS,
};
pub use frontier::{Frontier, FrontierEmpty};
pub use page::PageSummary;
pub use parser::{is_html, is_textual, Extractor, StopWords};

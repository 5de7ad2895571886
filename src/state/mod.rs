//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: The coordinator's lifecycle (initializing, running, draining, stopped)
//! - `PageState`: The recorded outcome of fetching one page

mod crawl_phase;
mod page_state;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use page_state::PageState;

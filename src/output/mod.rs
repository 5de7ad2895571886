//! Output module for crawl results
//!
//! This module handles:
//! - Collecting report data from the store (indexed, broken, out-of-bounds
//!   and image URLs, duplicate content groups, counts)
//! - Exporting the document-term frequency matrix as CSV

mod report;
mod term_matrix;

pub use report::{BrokenUrl, CrawlReport, DuplicateGroup};
pub use term_matrix::TermMatrix;

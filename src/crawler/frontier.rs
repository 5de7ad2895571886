//! The crawl frontier: a FIFO of canonical URLs awaiting a fetch
//!
//! Admission filtering (indexed, out of bounds, robots) happens before
//! [`Frontier::add_all`] is called. The frontier itself only guarantees that
//! a URL is queued at most once per run.

use crate::url::CanonicalUrl;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

/// Returned by [`Frontier::remove_next`] when nothing is queued
///
/// This is the normal termination signal of a crawl, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Frontier is empty")]
pub struct FrontierEmpty;

/// Breadth-first queue of pending URLs
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CanonicalUrl>,
    seen: HashSet<CanonicalUrl>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends URLs in arrival order, skipping any queued earlier in this run
    ///
    /// Returns the number of URLs actually added.
    pub fn add_all<I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = CanonicalUrl>,
    {
        let mut added = 0;
        for url in urls {
            if self.seen.insert(url.clone()) {
                self.queue.push_back(url);
                added += 1;
            }
        }
        added
    }

    /// Pops the oldest URL
    pub fn pop(&mut self) -> Option<CanonicalUrl> {
        self.queue.pop_front()
    }

    /// Pops the oldest URL, failing with [`FrontierEmpty`] if none remain
    pub fn remove_next(&mut self) -> Result<CanonicalUrl, FrontierEmpty> {
        self.pop().ok_or(FrontierEmpty)
    }

    /// Returns true if the URL was queued at any point this run
    pub fn has_seen(&self, url: &CanonicalUrl) -> bool {
        self.seen.contains(url)
    }

    /// URLs still waiting, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &CanonicalUrl> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

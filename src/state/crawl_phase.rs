//! Crawl coordinator lifecycle
//!
//! `Initializing → Running → Draining → Stopped`. `Initializing` may also go
//! straight to `Draining` when there is nothing to crawl (for example an
//! already exhausted budget on resume).

use crate::IndexerError;
use std::fmt;

/// The phase the crawl coordinator is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Resolving the seed, loading robots rules and checkpoints
    Initializing,

    /// Fetching and admitting pages while the frontier has work
    Running,

    /// Persisting final state; no further network access
    Draining,

    /// Done
    Stopped,
}

impl CrawlPhase {
    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Initializing, Self::Running)
                | (Self::Initializing, Self::Draining)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Stopped)
        )
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: CrawlPhase) -> Result<(), IndexerError> {
        if !self.can_transition_to(next) {
            return Err(IndexerError::InvalidTransition {
                from: *self,
                to: next,
            });
        }

        tracing::debug!("Crawl phase {} -> {}", self, next);
        *self = next;
        Ok(())
    }

    /// Returns true if network access is allowed in this phase
    pub fn allows_fetching(&self) -> bool {
        matches!(self, Self::Initializing | Self::Running)
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

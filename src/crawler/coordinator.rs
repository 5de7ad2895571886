//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl state machine
//! (`Initializing → Running → Draining → Stopped`) that ties together:
//! - Seed resolution, robots rules and the run log record
//! - The frontier and its admission filter
//! - Fetching through a bounded pool of tasks
//! - Page and document admission into the crawl index
//! - A checkpoint after every processed page
//!
//! Fetches may overlap, but every index mutation happens here, on the
//! coordinator task, and results are processed in the order their URLs left
//! the frontier. Id assignment is therefore identical to a sequential crawl.

use crate::config::Config;
use crate::crawler::fetcher::{FetchFailure, FetchOutcome, FetchedPage, Fetcher, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::page::PageSummary;
use crate::crawler::parser::{Extractor, StopWords};
use crate::index::{ContentHash, CrawlIndex};
use crate::robots::{fetch_robots_rules, RobotsRules};
use crate::state::CrawlPhase;
use crate::storage::{NewRun, RunStatus, SqliteStorage, Storage};
use crate::url::{is_within, CanonicalUrl};
use crate::IndexerError;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A fetch that has been started but not yet processed
struct InFlight {
    url: CanonicalUrl,
    handle: JoinHandle<FetchOutcome>,
}

/// Summary of a finished crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub run_id: i64,
    /// Pages admitted during this run
    pub pages_indexed: u64,
    /// Documents admitted during this run
    pub documents_indexed: u64,
    /// Pages in the index, all runs included
    pub total_pages: usize,
    /// Documents in the index, all runs included
    pub total_documents: usize,
    /// URLs left in the frontier when the run stopped
    pub frontier_remaining: usize,
}

/// Main crawler coordinator structure
pub struct Coordinator<F: Fetcher> {
    config: Arc<Config>,
    storage: SqliteStorage,
    fetcher: Arc<F>,
    extractor: Extractor,
    index: CrawlIndex,
    frontier: Frontier,
    robots: RobotsRules,
    seed: Option<CanonicalUrl>,
    phase: CrawlPhase,
    run_id: Option<i64>,
    in_flight: VecDeque<InFlight>,
    claims: HashSet<CanonicalUrl>,
    pages_indexed: u64,
    documents_indexed: u64,
}

impl<F: Fetcher> Coordinator<F> {
    /// Creates a new coordinator instance
    ///
    /// The crawl index is loaded from `storage`, so a coordinator built on a
    /// database from an earlier run resumes it.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawler configuration
    /// * `storage` - The page, document and checkpoint store
    /// * `fetcher` - The page fetcher
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(IndexerError)` - Failed to load the index
    pub fn new(config: Config, storage: SqliteStorage, fetcher: F) -> Result<Self, IndexerError> {
        let index = CrawlIndex::load(&storage)?;

        let stopwords = match &config.crawler.stopwords_path {
            Some(path) => StopWords::load(Path::new(path)),
            None => StopWords::empty(),
        };

        Ok(Self {
            config: Arc::new(config),
            storage,
            fetcher: Arc::new(fetcher),
            extractor: Extractor::new(stopwords),
            index,
            frontier: Frontier::new(),
            robots: RobotsRules::empty(),
            seed: None,
            phase: CrawlPhase::Initializing,
            run_id: None,
            in_flight: VecDeque::new(),
            claims: HashSet::new(),
            pages_indexed: 0,
            documents_indexed: 0,
        })
    }

    /// Runs the crawl to completion
    ///
    /// Per-page failures are recorded and never abort the run; only storage
    /// errors and index invariant violations do. A run that fails is marked
    /// `failed` in the run log. A coordinator runs once: calling `run` again
    /// is rejected without touching the run log.
    pub async fn run(&mut self) -> Result<CrawlOutcome, IndexerError> {
        if self.phase != CrawlPhase::Initializing {
            return Err(IndexerError::InvalidTransition {
                from: self.phase,
                to: CrawlPhase::Initializing,
            });
        }

        let result = self.drive().await;

        if let Err(e) = &result {
            tracing::error!("Crawl aborted: {}", e);
            for in_flight in self.in_flight.drain(..) {
                in_flight.handle.abort();
            }
            if let Some(run_id) = self.run_id {
                if let Err(status_err) = self.storage.update_run_status(run_id, RunStatus::Failed) {
                    tracing::warn!("Failed to mark run {} as failed: {}", run_id, status_err);
                }
            }
        }

        result
    }

    async fn drive(&mut self) -> Result<CrawlOutcome, IndexerError> {
        self.initialize().await?;

        if self.continue_indexing() {
            self.phase.transition(CrawlPhase::Running)?;
            tracing::info!("Crawl running with {} URL(s) queued", self.frontier.len());
            self.crawl_loop().await?;
        }

        self.drain()
    }

    /// Resolves the seed, loads robots rules, writes the run record and seeds the frontier
    async fn initialize(&mut self) -> Result<(), IndexerError> {
        let seed = self.index.urls.resolve(&self.config.crawler.seed_url)?;
        self.robots = fetch_robots_rules(self.fetcher.as_ref(), &seed, &mut self.index.urls).await;

        let run_id = self.storage.create_run(&NewRun {
            seed_url: self.config.crawler.seed_url.clone(),
            bound_url: seed.to_string(),
            forbidden_prefixes: self
                .robots
                .forbidden()
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            max_to_index: self.config.crawler.max_to_index,
            config_hash: self.config.fingerprint()?,
        })?;
        self.run_id = Some(run_id);
        self.seed = Some(seed.clone());

        tracing::info!(
            "Starting run {} from {} ({} pages already indexed)",
            run_id,
            seed,
            self.index.urls.len()
        );

        // Pages stored by an earlier run contribute their links, so an
        // interrupted crawl picks up where it stopped.
        let mut candidates = vec![seed.clone()];
        for page in self.storage.all_pages()? {
            candidates.extend(page.a_hrefs);
            candidates.extend(page.img_srcs);
        }
        self.admit_to_frontier(candidates);

        if self.frontier.is_empty() && !self.index.urls.contains(&seed) {
            tracing::warn!("Seed {} is excluded by robots.txt; nothing to crawl", seed);
        }

        self.index.checkpoint(&mut self.storage)?;
        Ok(())
    }

    /// Fetches and processes pages until the frontier is exhausted or the budget is spent
    async fn crawl_loop(&mut self) -> Result<(), IndexerError> {
        loop {
            self.fill_pool();

            let Some(next) = self.in_flight.pop_front() else {
                break;
            };

            let outcome = match next.handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(FetchFailure::Network(format!("Fetch task failed: {}", e))),
            };
            self.claims.remove(&next.url);

            self.process(next.url, outcome)?;
        }

        tracing::info!(
            "Crawl loop finished: {} pages indexed this run, {} URL(s) left in frontier",
            self.pages_indexed,
            self.frontier.len()
        );
        Ok(())
    }

    /// Starts fetches for queued URLs while there is capacity and budget
    fn fill_pool(&mut self) {
        if !self.phase.allows_fetching() {
            return;
        }

        let capacity = self.config.crawler.max_concurrent_fetches.max(1) as usize;

        while self.in_flight.len() < capacity && self.continue_indexing() {
            let Some(url) = self.frontier.pop() else {
                break;
            };

            // Claimed before the fetch starts, so no other fetch of the
            // same URL can begin while this one is outstanding.
            self.claims.insert(url.clone());

            let fetcher = Arc::clone(&self.fetcher);
            let task_url = url.clone();
            let handle = tokio::spawn(async move { fetcher.fetch(&task_url).await });

            tracing::debug!("Fetching {}", url);
            self.in_flight.push_back(InFlight { url, handle });
        }
    }

    /// False once the frontier is empty or the index (plus claimed URLs) reaches the limit
    pub fn continue_indexing(&self) -> bool {
        if self.frontier.is_empty() {
            return false;
        }

        match self.config.crawler.max_to_index {
            Some(max) => ((self.index.urls.len() + self.claims.len()) as u64) < max,
            None => true,
        }
    }

    /// Admits one fetch result into the index and extends the frontier
    fn process(&mut self, url: CanonicalUrl, outcome: FetchOutcome) -> Result<(), IndexerError> {
        if let Err(failure) = &outcome {
            tracing::warn!("Fetch failed for {}: {}", url, failure);
        }

        let summary = PageSummary::from_outcome(&url, &outcome, &self.extractor);
        let admission = self.index.urls.admit_page(&summary, &mut self.storage)?;

        if admission.is_admitted() {
            self.pages_indexed += 1;

            if let (Ok(page), Some(hash)) = (&outcome, &summary.content_hash) {
                if summary.is_textual() {
                    self.index_document(page, hash)?;
                }
            }

            let discovered = self
                .index
                .urls
                .resolve_all(summary.a_hrefs.iter().chain(summary.img_srcs.iter()), true);
            let added = self.admit_to_frontier(discovered);
            tracing::debug!("{} new URL(s) queued from {}", added, url);
        }

        self.index.checkpoint(&mut self.storage)?;
        Ok(())
    }

    /// Stores the page's term frequencies unless the content is known or has no terms
    fn index_document(&mut self, page: &FetchedPage, hash: &ContentHash) -> Result<(), IndexerError> {
        if self.index.documents.is_indexed(hash) {
            tracing::debug!("Content of {} already indexed", page.final_url);
            return Ok(());
        }

        let Some(text) = self
            .extractor
            .extract_plain_text(&page.body, page.content_type.as_deref())
        else {
            return Ok(());
        };

        let terms = self.extractor.tokenize(&text);
        if terms.is_empty() {
            tracing::debug!("No terms in {}, document not stored", page.final_url);
            return Ok(());
        }

        let admission = self
            .index
            .documents
            .admit_document(hash, terms, &mut self.storage)?;
        if admission.is_admitted() {
            self.documents_indexed += 1;
        }
        Ok(())
    }

    /// Queues the URLs that pass the admission filter, in order
    fn admit_to_frontier(&mut self, candidates: Vec<CanonicalUrl>) -> usize {
        let admissible: Vec<CanonicalUrl> = candidates
            .into_iter()
            .filter(|url| self.is_admissible(url))
            .collect();
        self.frontier.add_all(admissible)
    }

    /// Not indexed, not claimed, within the seed, allowed by robots and not queued before
    fn is_admissible(&self, url: &CanonicalUrl) -> bool {
        let Some(seed) = &self.seed else {
            return false;
        };

        if self.index.urls.contains(url) || self.claims.contains(url) || self.frontier.has_seen(url)
        {
            return false;
        }

        if !is_within(url, seed) {
            tracing::trace!("Out of bounds: {}", url);
            return false;
        }

        if !self.robots.admits(url, &self.config.user_agent.crawler_name) {
            tracing::debug!("Forbidden by robots.txt: {}", url);
            return false;
        }

        true
    }

    /// Persists final state and closes the run; no fetches happen after this
    fn drain(&mut self) -> Result<CrawlOutcome, IndexerError> {
        self.phase.transition(CrawlPhase::Draining)?;

        for in_flight in self.in_flight.drain(..) {
            in_flight.handle.abort();
        }
        self.claims.clear();

        self.index.checkpoint(&mut self.storage)?;

        let run_id = self.run_id.ok_or_else(|| IndexerError::InvalidTransition {
            from: CrawlPhase::Initializing,
            to: CrawlPhase::Draining,
        })?;
        self.storage
            .complete_run(run_id, self.pages_indexed, self.documents_indexed)?;

        self.phase.transition(CrawlPhase::Stopped)?;

        let outcome = CrawlOutcome {
            run_id,
            pages_indexed: self.pages_indexed,
            documents_indexed: self.documents_indexed,
            total_pages: self.index.urls.len(),
            total_documents: self.index.documents.len(),
            frontier_remaining: self.frontier.len(),
        };

        tracing::info!(
            "Run {} stopped: {} pages and {} documents indexed ({} and {} in total)",
            outcome.run_id,
            outcome.pages_indexed,
            outcome.documents_indexed,
            outcome.total_pages,
            outcome.total_documents
        );
        Ok(outcome)
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn index(&self) -> &CrawlIndex {
        &self.index
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Gives the store back, for reporting or for a follow-up run
    pub fn into_storage(self) -> SqliteStorage {
        self.storage
    }
}

/// Runs a complete crawl against the configured database with the HTTP fetcher
///
/// # Arguments
///
/// * `config` - The validated crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - Crawl completed
/// * `Err(IndexerError)` - Crawl failed
pub async fn run_crawl(config: Config) -> Result<CrawlOutcome, IndexerError> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let fetcher = HttpFetcher::new(
        &config.user_agent,
        Duration::from_secs(config.crawler.request_timeout_secs),
    )?;

    let mut coordinator = Coordinator::new(config, storage, fetcher)?;
    coordinator.run().await
}

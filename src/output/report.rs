//! Crawl report data gathered from the store

use crate::index::ContentHash;
use crate::state::PageState;
use crate::storage::{RunRecord, Storage};
use crate::url::{canonicalize, is_within, CanonicalUrl};
use std::collections::{BTreeMap, BTreeSet};

/// An indexed URL whose fetch failed
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenUrl {
    pub id: u64,
    pub url: CanonicalUrl,
    pub state: PageState,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

/// URLs whose bodies hashed to the same value
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub content_hash: ContentHash,
    /// Member URLs in id order
    pub urls: Vec<CanonicalUrl>,
}

/// Everything known about the crawl, read back from storage
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// The most recent run, if any
    pub run: Option<RunRecord>,
    /// Indexed URLs in id order
    pub indexed: Vec<(u64, CanonicalUrl)>,
    pub broken: Vec<BrokenUrl>,
    /// Link and image targets outside the crawl bound, sorted
    pub out_of_bounds: Vec<CanonicalUrl>,
    /// Distinct image sources, sorted
    pub images: Vec<CanonicalUrl>,
    pub duplicate_content: Vec<DuplicateGroup>,
    pub pages_by_state: Vec<(PageState, u64)>,
    pub documents: u64,
}

impl CrawlReport {
    /// Builds the report from stored page and document records
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend containing crawl data
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Successfully built report
    /// * `Err(IndexerError)` - Failed to read from storage
    pub fn from_storage(storage: &dyn Storage) -> crate::Result<Self> {
        let run = storage.get_latest_run()?;
        let bound = run
            .as_ref()
            .and_then(|run| canonicalize(&run.bound_url).ok());

        let pages = storage.all_pages()?;

        let mut indexed = Vec::with_capacity(pages.len());
        let mut broken = Vec::new();
        let mut out_of_bounds = BTreeSet::new();
        let mut images = BTreeSet::new();
        let mut by_hash: BTreeMap<ContentHash, Vec<(u64, CanonicalUrl)>> = BTreeMap::new();
        let mut state_counts: BTreeMap<&'static str, u64> = BTreeMap::new();

        for page in pages {
            *state_counts.entry(page.state.to_db_string()).or_insert(0) += 1;

            if page.state.is_broken() {
                broken.push(BrokenUrl {
                    id: page.id,
                    url: page.url.clone(),
                    state: page.state,
                    status_code: page.status_code,
                    error: page.error_message.clone(),
                });
            }

            if let Some(bound) = &bound {
                out_of_bounds.extend(
                    page.a_hrefs
                        .iter()
                        .chain(page.img_srcs.iter())
                        .filter(|target| !is_within(target, bound))
                        .cloned(),
                );
            }
            images.extend(page.img_srcs.iter().cloned());

            if let Some(hash) = &page.content_hash {
                by_hash
                    .entry(hash.clone())
                    .or_default()
                    .push((page.id, page.url.clone()));
            }

            indexed.push((page.id, page.url));
        }

        let mut duplicate_content: Vec<DuplicateGroup> = by_hash
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(content_hash, mut members)| {
                members.sort_by_key(|(id, _)| *id);
                DuplicateGroup {
                    content_hash,
                    urls: members.into_iter().map(|(_, url)| url).collect(),
                }
            })
            .collect();
        duplicate_content.sort_by(|a, b| a.urls.first().cmp(&b.urls.first()));

        let pages_by_state = PageState::all_states()
            .into_iter()
            .map(|state| {
                let count = state_counts
                    .get(state.to_db_string())
                    .copied()
                    .unwrap_or(0);
                (state, count)
            })
            .collect();

        Ok(Self {
            run,
            indexed,
            broken,
            out_of_bounds: out_of_bounds.into_iter().collect(),
            images: images.into_iter().collect(),
            duplicate_content,
            pages_by_state,
            documents: storage.count_documents()?,
        })
    }

    /// Number of indexed pages
    pub fn total_pages(&self) -> u64 {
        self.indexed.len() as u64
    }

    /// Prints summary counts to stdout
    pub fn print_summary(&self) {
        println!("=== Crawl Report ===\n");

        if let Some(run) = &self.run {
            println!("Run {} ({})", run.id, run.status.to_db_string());
            println!("  Seed: {}", run.seed_url);
            println!("  Bound: {}", run.bound_url);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!();
        }

        println!("Overview:");
        println!("  Indexed URLs: {}", self.total_pages());
        println!("  Documents: {}", self.documents);
        println!("  Broken URLs: {}", self.broken.len());
        println!("  Out-of-bounds targets: {}", self.out_of_bounds.len());
        println!("  Images: {}", self.images.len());
        println!("  Duplicate content groups: {}", self.duplicate_content.len());
        println!();

        println!("Pages by State:");
        for (state, count) in &self.pages_by_state {
            let percentage = if self.indexed.is_empty() {
                0.0
            } else {
                (*count as f64 / self.indexed.len() as f64) * 100.0
            };
            println!("  {}: {} ({:.1}%)", state, count, percentage);
        }
    }
}

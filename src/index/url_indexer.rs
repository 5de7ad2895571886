//! URL indexer
//!
//! Answers "have we already visited this URL" and records each fetched page
//! exactly once, under the id the URL registry assigns to its canonical form.

use crate::crawler::PageSummary;
use crate::index::registry::{IdRegistry, RegistryError};
use crate::index::{Admission, RESOLVER_CHECKPOINT, URL_REGISTRY_CHECKPOINT};
use crate::storage::{PageRecord, Storage};
use crate::url::{CanonicalUrl, IdentityResolver};
use crate::UrlResult;
use std::collections::{BTreeMap, HashSet};

/// Identity resolver plus the registry of visited canonical URLs
///
/// Page records themselves live in the page store; the indexer only keeps
/// the key → id mapping in memory.
#[derive(Debug, Default)]
pub struct UrlIndexer {
    resolver: IdentityResolver,
    registry: IdRegistry<CanonicalUrl>,
}

impl UrlIndexer {
    /// Creates an empty indexer
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a raw URL through the memoized resolver
    pub fn resolve(&mut self, raw: &str) -> UrlResult<CanonicalUrl> {
        self.resolver.resolve(raw)
    }

    /// Resolves a list of raw URLs, dropping unresolvable ones
    pub fn resolve_all<I, S>(&mut self, raws: I, collapse: bool) -> Vec<CanonicalUrl>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolver.resolve_all(raws, collapse)
    }

    /// Resolves `raw` and checks whether its canonical form has been admitted
    ///
    /// Unresolvable input is never indexed.
    pub fn is_indexed(&mut self, raw: &str) -> bool {
        match self.resolver.resolve(raw) {
            Ok(canonical) => self.registry.contains(&canonical),
            Err(_) => false,
        }
    }

    /// Checks an already-resolved URL
    pub fn contains(&self, url: &CanonicalUrl) -> bool {
        self.registry.contains(url)
    }

    /// Looks up the page id of an indexed URL
    pub fn id_of(&self, url: &CanonicalUrl) -> Result<u64, RegistryError> {
        self.registry.id_of(url)
    }

    /// Keeps the URLs not yet indexed, resolved, in first-seen order, without duplicates
    pub fn filter_unindexed<I, S>(&mut self, raws: I) -> Vec<CanonicalUrl>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let resolved = self.resolver.resolve_all(raws, true);
        resolved
            .into_iter()
            .filter(|url| !self.registry.contains(url))
            .collect()
    }

    /// Records a fetched page the first time its requested URL is seen
    ///
    /// A page whose canonical URL is already indexed is a silent no-op and
    /// returns [`Admission::Duplicate`]. Otherwise the record is written under
    /// the next id before the id is committed to the registry, so a failed
    /// write leaves the registry untouched.
    ///
    /// # Arguments
    ///
    /// * `summary` - The fetch summary, keyed by its requested URL
    /// * `storage` - The page store
    ///
    /// # Returns
    ///
    /// * `Ok(Admission::Admitted(id))` - The page was new and was stored
    /// * `Ok(Admission::Duplicate)` - The page was already indexed
    /// * `Err(IndexerError)` - The requested URL was unresolvable, the write failed,
    ///   or id assignment broke monotonicity
    pub fn admit_page(
        &mut self,
        summary: &PageSummary,
        storage: &mut dyn Storage,
    ) -> crate::Result<Admission> {
        let url = self.resolver.resolve(&summary.requested_url)?;
        if self.registry.contains(&url) {
            tracing::debug!("Page {} already indexed, skipping", url);
            return Ok(Admission::Duplicate);
        }

        let id = self.registry.next_id();
        let a_hrefs = self.resolver.resolve_all(&summary.a_hrefs, true);
        let img_srcs = self.resolver.resolve_all(&summary.img_srcs, true);

        let record = PageRecord {
            id,
            url: url.clone(),
            requested_url: summary.requested_url.clone(),
            state: summary.state,
            status_code: summary.status_code,
            redirect_history: summary.redirect_history.clone(),
            content_type: summary.content_type.clone(),
            content_hash: summary.content_hash.clone(),
            a_hrefs,
            img_srcs,
            error_message: summary.error.clone(),
            visited_at: chrono::Utc::now().to_rfc3339(),
        };
        storage.put_page(&record)?;

        let assigned = self.registry.add(url);
        if assigned != id {
            return Err(RegistryError::NonMonotonic {
                expected: id,
                actual: assigned,
            }
            .into());
        }

        tracing::info!("Indexed page {} as {} ({})", record.url, id, record.state);
        Ok(Admission::Admitted(id))
    }

    /// Number of indexed pages
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Canonical URLs in id order
    pub fn indexed_urls(&self) -> Vec<CanonicalUrl> {
        self.registry
            .keys_by_id()
            .into_iter()
            .map(|(_, url)| url.clone())
            .collect()
    }

    /// Serializes the URL registry and the resolver map
    pub fn checkpoint_entries(&self) -> crate::Result<Vec<(&'static str, serde_json::Value)>> {
        Ok(vec![
            (
                URL_REGISTRY_CHECKPOINT,
                serde_json::to_value(self.registry.export())?,
            ),
            (RESOLVER_CHECKPOINT, serde_json::to_value(self.resolver.export())?),
        ])
    }

    /// Writes the URL registry and resolver checkpoints
    pub fn save(&self, storage: &mut dyn Storage) -> crate::Result<()> {
        storage.put_checkpoints(&self.checkpoint_entries()?)?;
        Ok(())
    }

    /// Restores the indexer from its checkpoints
    ///
    /// Each checkpoint is loaded independently. A missing or unreadable one
    /// is logged and replaced by an empty map. The registry is then
    /// reconciled with the page store, so a page written after the last
    /// checkpoint keeps its id instead of being admitted a second time.
    pub fn load(storage: &dyn Storage) -> crate::Result<Self> {
        let resolver = match load_checkpoint::<BTreeMap<String, CanonicalUrl>>(
            storage,
            RESOLVER_CHECKPOINT,
        ) {
            Some(mapping) => IdentityResolver::restore(mapping),
            None => IdentityResolver::new(),
        };

        let registry = match load_checkpoint::<BTreeMap<CanonicalUrl, u64>>(
            storage,
            URL_REGISTRY_CHECKPOINT,
        ) {
            Some(mapping) => match IdRegistry::restore(mapping) {
                Ok(registry) => registry,
                Err(e) => {
                    tracing::warn!("Discarding URL registry checkpoint: {}", e);
                    IdRegistry::new()
                }
            },
            None => IdRegistry::new(),
        };

        let mut indexer = Self { resolver, registry };
        indexer.reconcile(storage)?;

        tracing::info!(
            "Loaded URL index: {} pages, {} resolved spellings",
            indexer.registry.len(),
            indexer.resolver.len()
        );
        Ok(indexer)
    }

    fn reconcile(&mut self, storage: &dyn Storage) -> crate::Result<()> {
        let mut ids: HashSet<u64> = self.registry.export().into_values().collect();

        for record in storage.all_pages()? {
            if self.registry.contains(&record.url) {
                continue;
            }
            if ids.contains(&record.id) || record.id != self.registry.next_id() {
                return Err(RegistryError::NonMonotonic {
                    expected: self.registry.next_id(),
                    actual: record.id,
                }
                .into());
            }
            ids.insert(self.registry.add(record.url));
        }

        Ok(())
    }
}

/// Reads and decodes one checkpoint, logging instead of failing
pub(crate) fn load_checkpoint<T>(storage: &dyn Storage, name: &str) -> Option<T>
where
    T: serde::de::DeserializeOwned,
{
    match storage.get_checkpoint(name) {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(mapping) => Some(mapping),
            Err(e) => {
                tracing::warn!("Checkpoint {} is corrupt, starting empty: {}", name, e);
                None
            }
        },
        Ok(None) => {
            tracing::debug!("No checkpoint {} found", name);
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read checkpoint {}, starting empty: {}", name, e);
            None
        }
    }
}

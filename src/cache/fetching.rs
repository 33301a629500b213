//! Read-through cache layer that fills local misses from remote fetchers.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use color_eyre::eyre;
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use super::commands::Command;
use super::document::{Document, ResourceIdentifier, ResourceObject};
use super::error::{CacheError, Result};
use super::local::LocalCache;
use super::queries::{GetAllOfType, GetMany, GetOne, Query};
use super::traits::CacheStore;

/// How many fetch failures are kept for `take_failures`.
pub const MAX_RECORDED_FAILURES: usize = 64;

/// A boxed future resolving to a fetched document
type FetchFuture = BoxFuture<'static, eyre::Result<Document>>;

type FetchObjectFn = Arc<dyn Fn(ResourceIdentifier) -> FetchFuture + Send + Sync>;

type FetchObjectsFn = Arc<dyn Fn(Vec<ResourceIdentifier>) -> FetchFuture + Send + Sync>;

/// Counters describing how queries were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
  /// Lookups fully answered by the local store
  pub hits: u64,
  /// Lookups that needed a fetch
  pub misses: u64,
  /// Fetch function invocations
  pub fetches: u64,
  /// Fetches that failed
  pub fetch_failures: u64,
}

impl FetchStats {
  /// Share of lookups answered locally, as a percentage.
  pub fn hit_rate(&self) -> f64 {
    let total = self.hits + self.misses;
    if total == 0 {
      0.0
    } else {
      (self.hits as f64 / total as f64) * 100.0
    }
  }
}

impl fmt::Display for FetchStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "FetchStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, fetches: {}, failures: {} }}",
      self.hits,
      self.misses,
      self.hit_rate(),
      self.fetches,
      self.fetch_failures
    )
  }
}

#[derive(Debug, Default)]
struct Diagnostics {
  stats: FetchStats,
  failures: VecDeque<CacheError>,
}

/// Read-through cache over a local store.
///
/// Commands go straight to the store. Queries are answered locally first;
/// on a miss the matching fetch function is awaited, its document is pushed
/// into the store, and the query is re-run. Fetch failures are logged and
/// recorded but never returned: the query simply stays a miss.
pub struct FetchingCache<S: CacheStore = LocalCache> {
  store: Arc<S>,
  fetch_object: FetchObjectFn,
  fetch_objects: FetchObjectsFn,
  diagnostics: Arc<Mutex<Diagnostics>>,
}

impl<S: CacheStore> FetchingCache<S> {
  /// Create a fetching cache over `store`.
  ///
  /// `fetch_object` is called with a single missing identifier,
  /// `fetch_objects` with the missing subset of a batch lookup.
  pub fn new<F, FFut, G, GFut>(store: Arc<S>, fetch_object: F, fetch_objects: G) -> Self
  where
    F: Fn(ResourceIdentifier) -> FFut + Send + Sync + 'static,
    FFut: Future<Output = eyre::Result<Document>> + Send + 'static,
    G: Fn(Vec<ResourceIdentifier>) -> GFut + Send + Sync + 'static,
    GFut: Future<Output = eyre::Result<Document>> + Send + 'static,
  {
    Self {
      store,
      fetch_object: Arc::new(move |identifier| fetch_object(identifier).boxed()),
      fetch_objects: Arc::new(move |identifiers| fetch_objects(identifiers).boxed()),
      diagnostics: Arc::new(Mutex::new(Diagnostics::default())),
    }
  }

  /// The shared local store.
  pub fn store(&self) -> &Arc<S> {
    &self.store
  }

  /// Forward a command to the store.
  pub async fn perform(&self, command: Command) {
    self.store.perform(command);
  }

  /// Answer a query, fetching whatever the store is missing.
  ///
  /// Only `GetRelationship` can fail, with `CacheError::NotSupported`.
  pub async fn query(&self, query: &mut Query) -> Result<()> {
    match query {
      Query::GetOne(q) => self.query_get_one(q).await,
      Query::GetMany(q) => self.query_get_many(q).await,
      Query::GetAllOfType(q) => self.query_get_all_of_type(q),
      Query::GetRelationship(q) => return self.store.get_relationship(q),
    }
    Ok(())
  }

  pub async fn push(&self, document: Document) {
    self.perform(Command::Push(document)).await;
  }

  pub async fn unload(&self, identifier: ResourceIdentifier) {
    self.perform(Command::UnloadOne(identifier)).await;
  }

  pub async fn unload_many(&self, identifiers: Vec<ResourceIdentifier>) {
    self.perform(Command::UnloadMany(identifiers)).await;
  }

  /// Get one object, fetching it on a local miss.
  pub async fn get_one(&self, identifier: ResourceIdentifier) -> Option<Arc<ResourceObject>> {
    let mut query = GetOne::new(identifier);
    self.query_get_one(&mut query).await;
    query.result
  }

  /// Get many objects, fetching the missing subset.
  ///
  /// The returned query holds what was found and what is still missing.
  pub async fn get_many(&self, identifiers: Vec<ResourceIdentifier>) -> GetMany {
    let mut query = GetMany::new(identifiers);
    self.query_get_many(&mut query).await;
    query
  }

  /// All objects of one type currently cached. Never fetches.
  pub async fn all_of_type(&self, kind: &str) -> Vec<Arc<ResourceObject>> {
    let mut query = GetAllOfType::new(kind);
    self.query_get_all_of_type(&mut query);
    query.result
  }

  /// Snapshot of the resolution counters.
  pub fn stats(&self) -> FetchStats {
    self.diagnostics().stats
  }

  /// Drain recorded fetch failures, oldest first.
  pub fn take_failures(&self) -> Vec<CacheError> {
    self.diagnostics().failures.drain(..).collect()
  }

  async fn query_get_one(&self, query: &mut GetOne) {
    self.store.get_one(query);
    if !query.is_miss() {
      self.diagnostics().stats.hits += 1;
      return;
    }
    self.diagnostics().stats.misses += 1;

    debug!(identifier = %query.identifier, "Local miss, fetching object");
    let fetched = (self.fetch_object)(query.identifier.clone()).await;

    if self.merge(fetched, || vec![query.identifier.clone()]) {
      self.store.get_one(query);
    }
  }

  async fn query_get_many(&self, query: &mut GetMany) {
    self.store.get_many(query);
    if !query.is_miss() {
      self.diagnostics().stats.hits += 1;
      return;
    }
    self.diagnostics().stats.misses += 1;

    debug!(missing = query.missing.len(), "Local miss, fetching objects");
    let fetched = (self.fetch_objects)(query.missing.clone()).await;

    if self.merge(fetched, || query.missing.clone()) {
      self.store.get_many(query);
    }
  }

  // Type enumeration has no remote counterpart
  fn query_get_all_of_type(&self, query: &mut GetAllOfType) {
    self.store.get_all_of_type(query);
  }

  /// Push a fetched document, or record the failure.
  ///
  /// Returns true when the query should be re-run.
  fn merge<I>(&self, fetched: eyre::Result<Document>, identifiers: I) -> bool
  where
    I: FnOnce() -> Vec<ResourceIdentifier>,
  {
    self.diagnostics().stats.fetches += 1;

    match fetched {
      Ok(document) => {
        if document.is_empty() {
          // Not found remotely; no tombstone, so the next query fetches again
          debug!("Fetch returned no data");
        }
        self.store.push(document);
        true
      }
      Err(err) => {
        let identifiers = identifiers();
        warn!(
          count = identifiers.len(),
          first = ?identifiers.first(),
          error = %err,
          "Fetch failed, leaving query unresolved"
        );
        self.record_failure(CacheError::FetchFailure {
          identifiers,
          message: format!("{:#}", err),
        });
        false
      }
    }
  }

  fn record_failure(&self, failure: CacheError) {
    let mut diagnostics = self.diagnostics();
    diagnostics.stats.fetch_failures += 1;
    if diagnostics.failures.len() == MAX_RECORDED_FAILURES {
      diagnostics.failures.pop_front();
    }
    diagnostics.failures.push_back(failure);
  }

  fn diagnostics(&self) -> MutexGuard<'_, Diagnostics> {
    self
      .diagnostics
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }
}

impl<S: CacheStore> Clone for FetchingCache<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      fetch_object: Arc::clone(&self.fetch_object),
      fetch_objects: Arc::clone(&self.fetch_objects),
      diagnostics: Arc::clone(&self.diagnostics),
    }
  }
}

impl<S: CacheStore + fmt::Debug> fmt::Debug for FetchingCache<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FetchingCache")
      .field("store", &self.store)
      .field("stats", &self.stats())
      .finish_non_exhaustive()
  }
}

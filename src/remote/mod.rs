//! Host integration: wires an HTTP JSON:API source into a fetching cache.

mod client;

pub use client::RemoteSource;

use color_eyre::eyre;
use std::sync::Arc;

use crate::cache::{CacheStore, Document, FetchingCache, ResourceIdentifier};

impl RemoteSource {
  /// Build a fetching cache whose misses are served by this source.
  ///
  /// Timeouts come from the HTTP client; the cache itself imposes none.
  pub fn into_fetching_cache<S: CacheStore>(self, store: Arc<S>) -> FetchingCache<S> {
    let source = Arc::new(self);
    let one = Arc::clone(&source);
    let many = source;

    FetchingCache::new(
      store,
      move |identifier: ResourceIdentifier| {
        let source = Arc::clone(&one);
        async move { source.fetch_object(&identifier).await }
      },
      move |identifiers: Vec<ResourceIdentifier>| {
        let source = Arc::clone(&many);
        async move { source.fetch_objects(&identifiers).await }
      },
    )
  }
}

/// A fetching cache with no remote: every fetch finds nothing.
pub fn offline_cache<S: CacheStore>(store: Arc<S>) -> FetchingCache<S> {
  FetchingCache::new(
    store,
    |_| async { Ok::<_, eyre::Report>(Document::empty()) },
    |_| async { Ok::<_, eyre::Report>(Document::empty()) },
  )
}

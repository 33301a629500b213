//! # rescache
//!
//! A two-tier cache for JSON:API-style resource documents addressed by
//! `(type, id)`.
//!
//! ```no_run
//! use rescache::cache::{Document, LocalCache, ResourceIdentifier};
//! use rescache::config::RemoteConfig;
//! use rescache::remote::RemoteSource;
//! use std::sync::Arc;
//!
//! # async fn example() -> color_eyre::Result<()> {
//! let source = RemoteSource::new(&RemoteConfig {
//!   base_url: "https://api.example.com/v1/".to_string(),
//!   timeout_secs: 10,
//! })?;
//! let cache = source.into_fetching_cache(Arc::new(LocalCache::new()));
//!
//! // Served locally if cached, otherwise fetched, pushed, and re-read
//! if let Some(person) = cache.get_one(ResourceIdentifier::new("person", "123")).await {
//!   println!("{:?}", person.attribute("name"));
//! }
//!
//! cache.push(Document::empty()).await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod logging;
pub mod remote;

pub use cache::{
  CacheError, CacheStore, Command, Document, FetchStats, FetchingCache, LocalCache, Query,
  ResourceIdentifier, ResourceObject,
};

//! Two-tier cache for `(type, id)`-addressed resource documents.
//!
//! - `LocalCache` stores, unloads, and queries objects purely in memory
//! - `FetchingCache` layers read-through fetching over any `CacheStore`,
//!   filling misses from injected async fetch functions
//!
//! Both tiers speak the same protocol: `Command` values mutate, `Query`
//! values carry their own result slots.

mod commands;
mod document;
mod error;
mod fetching;
mod local;
mod queries;
mod traits;

pub use commands::Command;
pub use document::{
  Document, Linkage, ParseIdentifierError, PrimaryData, Relationship, ResourceIdentifier,
  ResourceObject,
};
pub use error::{CacheError, Result};
pub use fetching::{FetchStats, FetchingCache, MAX_RECORDED_FAILURES};
pub use local::LocalCache;
pub use queries::{GetAllOfType, GetMany, GetOne, GetRelationship, Query};
pub use traits::CacheStore;

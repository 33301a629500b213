//! Mutations accepted by the cache tiers.

use super::document::{Document, ResourceIdentifier};

/// Commands never fail and return nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  /// Insert or replace every object in the document.
  Push(Document),
  /// Remove one record if present.
  UnloadOne(ResourceIdentifier),
  /// Remove each record in order; unknown identifiers are skipped.
  UnloadMany(Vec<ResourceIdentifier>),
}

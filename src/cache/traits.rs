//! The synchronous store seam that the fetching tier is layered over.

use super::commands::Command;
use super::document::{Document, ResourceIdentifier};
use super::error::Result;
use super::queries::{GetAllOfType, GetMany, GetOne, GetRelationship, Query};

/// Trait for local cache backends.
///
/// Implementors provide one handler per command and query; `perform` and
/// `query` dispatch the tagged values to them. Handlers run to completion
/// without suspending and never perform I/O.
pub trait CacheStore: Send + Sync {
  /// Insert or replace every object in the document.
  fn push(&self, document: Document);

  /// Remove one record; no-op if absent.
  fn unload_one(&self, identifier: &ResourceIdentifier);

  /// Answer an exact-match lookup.
  fn get_one(&self, query: &mut GetOne);

  /// Partition the requested identifiers into found and missing.
  fn get_many(&self, query: &mut GetMany);

  /// Collect every object of one type.
  fn get_all_of_type(&self, query: &mut GetAllOfType);

  /// Resolve a relationship.
  fn get_relationship(&self, query: &mut GetRelationship) -> Result<()>;

  /// Remove each record in order.
  fn unload_many(&self, identifiers: &[ResourceIdentifier]) {
    for identifier in identifiers {
      self.unload_one(identifier);
    }
  }

  fn perform(&self, command: Command) {
    match command {
      Command::Push(document) => self.push(document),
      Command::UnloadOne(identifier) => self.unload_one(&identifier),
      Command::UnloadMany(identifiers) => self.unload_many(&identifiers),
    }
  }

  fn query(&self, query: &mut Query) -> Result<()> {
    match query {
      Query::GetOne(q) => self.get_one(q),
      Query::GetMany(q) => self.get_many(q),
      Query::GetAllOfType(q) => self.get_all_of_type(q),
      Query::GetRelationship(q) => return self.get_relationship(q),
    }
    Ok(())
  }
}

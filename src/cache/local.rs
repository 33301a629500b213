//! In-memory identity cache keyed by `(type, id)`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::commands::Command;
use super::document::{Document, ResourceIdentifier, ResourceObject};
use super::error::{CacheError, Result};
use super::queries::{GetAllOfType, GetMany, GetOne, GetRelationship};
use super::traits::CacheStore;

/// Two-level mapping `type -> (id -> object)`.
///
/// A type entry exists only while it holds at least one object.
#[derive(Debug, Default)]
struct Store {
  types: HashMap<String, HashMap<String, Arc<ResourceObject>>>,
}

impl Store {
  fn find(&self, identifier: &ResourceIdentifier) -> Option<&Arc<ResourceObject>> {
    self
      .types
      .get(&identifier.kind)
      .and_then(|ids| ids.get(&identifier.id))
  }

  fn insert(&mut self, object: ResourceObject) {
    self
      .types
      .entry(object.kind.clone())
      .or_default()
      .insert(object.id.clone(), Arc::new(object));
  }

  fn remove(&mut self, identifier: &ResourceIdentifier) {
    let Some(ids) = self.types.get_mut(&identifier.kind) else {
      return;
    };
    if ids.remove(&identifier.id).is_some() && ids.is_empty() {
      self.types.remove(&identifier.kind);
    }
  }
}

/// Synchronous identity cache. Knows nothing about remote fetching.
///
/// Every command and query runs as one critical section over the store, so
/// a `LocalCache` can be shared across threads behind an `Arc`.
#[derive(Debug, Default)]
pub struct LocalCache {
  store: Mutex<Store>,
}

impl LocalCache {
  pub fn new() -> Self {
    Self::default()
  }

  // Every critical section leaves the store consistent, so a poisoned lock
  // is still safe to use.
  fn store(&self) -> MutexGuard<'_, Store> {
    self.store.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Push a document.
  pub fn push_document(&self, document: Document) {
    self.perform(Command::Push(document));
  }

  /// Look up one identifier.
  pub fn find(&self, identifier: &ResourceIdentifier) -> Option<Arc<ResourceObject>> {
    let mut query = GetOne::new(identifier.clone());
    self.get_one(&mut query);
    query.result
  }

  /// Look up many identifiers, returning the completed query.
  pub fn find_many(&self, identifiers: Vec<ResourceIdentifier>) -> GetMany {
    let mut query = GetMany::new(identifiers);
    self.get_many(&mut query);
    query
  }

  /// All objects of one type.
  pub fn all_of_type(&self, kind: &str) -> Vec<Arc<ResourceObject>> {
    let mut query = GetAllOfType::new(kind);
    self.get_all_of_type(&mut query);
    query.result
  }

  /// Number of cached objects across all types.
  pub fn len(&self) -> usize {
    self.store().types.values().map(HashMap::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.store().types.is_empty()
  }

  /// Number of types with at least one cached object.
  pub fn type_count(&self) -> usize {
    self.store().types.len()
  }
}

impl CacheStore for LocalCache {
  fn push(&self, document: Document) {
    let mut store = self.store();
    for object in document.into_objects() {
      store.insert(object);
    }
  }

  fn unload_one(&self, identifier: &ResourceIdentifier) {
    self.store().remove(identifier);
  }

  fn unload_many(&self, identifiers: &[ResourceIdentifier]) {
    let mut store = self.store();
    for identifier in identifiers {
      store.remove(identifier);
    }
  }

  fn get_one(&self, query: &mut GetOne) {
    query.result = self.store().find(&query.identifier).cloned();
  }

  fn get_many(&self, query: &mut GetMany) {
    let store = self.store();
    let mut result = Vec::new();
    let mut missing = Vec::new();

    for identifier in &query.identifiers {
      match store.find(identifier) {
        Some(found) => result.push(Arc::clone(found)),
        None => missing.push(identifier.clone()),
      }
    }

    query.result = result;
    query.missing = missing;
  }

  fn get_all_of_type(&self, query: &mut GetAllOfType) {
    query.result = self
      .store()
      .types
      .get(&query.kind)
      .map(|ids| ids.values().cloned().collect())
      .unwrap_or_default();
  }

  fn get_relationship(&self, _query: &mut GetRelationship) -> Result<()> {
    Err(CacheError::NotSupported {
      operation: "get_relationship",
    })
  }
}

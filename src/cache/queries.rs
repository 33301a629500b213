//! Read requests. Each query carries its own result slots, filled in by the
//! tier that answers it.

use std::sync::Arc;

use super::document::{ResourceIdentifier, ResourceObject};

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
  GetOne(GetOne),
  GetMany(GetMany),
  GetAllOfType(GetAllOfType),
  GetRelationship(GetRelationship),
}

impl Query {
  pub fn get_one(identifier: ResourceIdentifier) -> Self {
    Query::GetOne(GetOne::new(identifier))
  }

  pub fn get_many(identifiers: Vec<ResourceIdentifier>) -> Self {
    Query::GetMany(GetMany::new(identifiers))
  }

  pub fn get_all_of_type(kind: impl Into<String>) -> Self {
    Query::GetAllOfType(GetAllOfType::new(kind))
  }

  pub fn get_relationship(identifier: ResourceIdentifier, name: impl Into<String>) -> Self {
    Query::GetRelationship(GetRelationship::new(identifier, name))
  }
}

/// Exact-match lookup of one identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct GetOne {
  pub identifier: ResourceIdentifier,
  /// `None` means "not in the local cache", not "absent remotely".
  pub result: Option<Arc<ResourceObject>>,
}

impl GetOne {
  pub fn new(identifier: ResourceIdentifier) -> Self {
    Self {
      identifier,
      result: None,
    }
  }

  pub fn is_miss(&self) -> bool {
    self.result.is_none()
  }
}

/// Batch lookup. `result` and `missing` partition `identifiers` exactly,
/// each preserving input order.
#[derive(Debug, Clone, PartialEq)]
pub struct GetMany {
  pub identifiers: Vec<ResourceIdentifier>,
  pub result: Vec<Arc<ResourceObject>>,
  pub missing: Vec<ResourceIdentifier>,
}

impl GetMany {
  pub fn new(identifiers: Vec<ResourceIdentifier>) -> Self {
    Self {
      identifiers,
      result: Vec::new(),
      missing: Vec::new(),
    }
  }

  pub fn is_miss(&self) -> bool {
    !self.missing.is_empty()
  }
}

/// Every object stored for one type, in no particular order.
#[derive(Debug, Clone, PartialEq)]
pub struct GetAllOfType {
  pub kind: String,
  pub result: Vec<Arc<ResourceObject>>,
}

impl GetAllOfType {
  pub fn new(kind: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      result: Vec::new(),
    }
  }
}

/// Relationship lookup. Not supported by either tier.
#[derive(Debug, Clone, PartialEq)]
pub struct GetRelationship {
  pub identifier: ResourceIdentifier,
  pub name: String,
  pub result: Option<Vec<ResourceIdentifier>>,
}

impl GetRelationship {
  pub fn new(identifier: ResourceIdentifier, name: impl Into<String>) -> Self {
    Self {
      identifier,
      name: name.into(),
      result: None,
    }
  }
}

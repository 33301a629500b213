//! Resource documents exchanged with the remote source and pushed into the cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Compound `(type, id)` key identifying one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
  #[serde(rename = "type")]
  pub kind: String,
  pub id: String,
}

impl ResourceIdentifier {
  pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      id: id.into(),
    }
  }
}

impl fmt::Display for ResourceIdentifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind, self.id)
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid resource identifier '{0}', expected TYPE:ID")]
pub struct ParseIdentifierError(String);

/// Parses `type:id`, splitting at the first colon.
impl FromStr for ResourceIdentifier {
  type Err = ParseIdentifierError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once(':') {
      Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(Self::new(kind, id)),
      _ => Err(ParseIdentifierError(s.to_string())),
    }
  }
}

/// Linkage carried by a relationship: one identifier, many, or none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
  One(ResourceIdentifier),
  Many(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Relationship {
  #[serde(default)]
  pub data: Option<Linkage>,
}

/// One cached record. The cache replaces these wholesale on push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
  #[serde(rename = "type")]
  pub kind: String,
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub relationships: Option<BTreeMap<String, Relationship>>,
}

impl ResourceObject {
  pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      id: id.into(),
      attributes: None,
      relationships: None,
    }
  }

  /// Builder-style attribute setter, mostly for tests and seeding.
  pub fn with_attribute(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
    self
      .attributes
      .get_or_insert_with(serde_json::Map::new)
      .insert(name.into(), value);
    self
  }

  pub fn with_relationship(mut self, name: impl Into<String>, linkage: Option<Linkage>) -> Self {
    self
      .relationships
      .get_or_insert_with(BTreeMap::new)
      .insert(name.into(), Relationship { data: linkage });
    self
  }

  pub fn identifier(&self) -> ResourceIdentifier {
    ResourceIdentifier::new(self.kind.clone(), self.id.clone())
  }

  pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
    self.attributes.as_ref().and_then(|attrs| attrs.get(name))
  }
}

/// Primary data of a document: a single object or an ordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
  One(ResourceObject),
  Many(Vec<ResourceObject>),
}

/// A document; `data` is absent when the source had nothing to return.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
  #[serde(default)]
  pub data: Option<PrimaryData>,
}

impl Document {
  pub fn empty() -> Self {
    Self { data: None }
  }

  pub fn one(object: ResourceObject) -> Self {
    Self {
      data: Some(PrimaryData::One(object)),
    }
  }

  pub fn many(objects: Vec<ResourceObject>) -> Self {
    Self {
      data: Some(PrimaryData::Many(objects)),
    }
  }

  /// True when there is nothing to push. An empty list counts as empty.
  pub fn is_empty(&self) -> bool {
    match &self.data {
      None => true,
      Some(PrimaryData::One(_)) => false,
      Some(PrimaryData::Many(objects)) => objects.is_empty(),
    }
  }

  /// Consume the document, yielding its objects in document order.
  pub fn into_objects(self) -> Vec<ResourceObject> {
    match self.data {
      None => Vec::new(),
      Some(PrimaryData::One(object)) => vec![object],
      Some(PrimaryData::Many(objects)) => objects,
    }
  }
}

//! Error types for cache operations.

use thiserror::Error;

use super::document::ResourceIdentifier;

/// Errors raised by the cache tiers.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
  /// The operation is a permanent capability gap, not a transient failure.
  #[error("Operation not supported: {operation}")]
  NotSupported { operation: &'static str },

  /// A fetch function rejected. Never returned from a query; only recorded.
  #[error("Failed to fetch {}: {message}", format_identifiers(.identifiers))]
  FetchFailure {
    identifiers: Vec<ResourceIdentifier>,
    message: String,
  },
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

fn format_identifiers(identifiers: &[ResourceIdentifier]) -> String {
  identifiers
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}

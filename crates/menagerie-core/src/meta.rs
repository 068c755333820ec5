//! Document metadata shared by every aggregate, embedded by composition.
//!
//! The store owns all four fields: `insert` stamps them, every successful
//! `save` refreshes `updated` and bumps `version` by exactly one. Callers
//! never write to them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity, timestamps, and optimistic-concurrency version of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
  pub id:      Uuid,
  pub created: DateTime<Utc>,
  pub updated: DateTime<Utc>,
  /// Monotonically increasing, starts at 0, +1 per persisted mutation.
  /// Never decremented or reused.
  pub version: i64,
}

impl DocMeta {
  /// Metadata for a document about to be inserted: fresh UUID, both
  /// timestamps set to now, version 0.
  pub fn fresh() -> Self {
    let now = Utc::now();
    Self { id: Uuid::new_v4(), created: now, updated: now, version: 0 }
  }

  /// The entity-tag form of the version, as round-tripped through the
  /// transport boundary: the stringified version in double quotes.
  pub fn etag(&self) -> String {
    format!("\"{}\"", self.version)
  }
}

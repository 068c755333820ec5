//! Storage traits and supporting query types.
//!
//! One generic [`DocumentStore`] is implemented once per aggregate kind by
//! storage backends (e.g. `menagerie-store-sqlite`). Higher layers depend on
//! these abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::{fmt, future::Future};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::StoreError,
  location::{FavoriteCount, Location},
  meta::DocMeta,
  subject::Subject,
};

/// How long a claimed idempotency key stays visible. Records older than
/// this are logically deleted: `try_claim` treats them as absent even
/// before physical garbage collection.
pub const IDEMPOTENCY_RETENTION_SECS: i64 = 86_400;

// ─── Paging ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
  Title,
  Located,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  Desc,
}

impl fmt::Display for SortField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SortField::Title => write!(f, "title"),
      SortField::Located => write!(f, "located"),
    }
  }
}

impl fmt::Display for SortOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SortOrder::Asc => write!(f, "asc"),
      SortOrder::Desc => write!(f, "desc"),
    }
  }
}

/// Parameters for a paged, sorted list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub sort:  SortField,
  pub order: SortOrder,
  pub page:  usize,
  pub size:  usize,
}

impl Default for PageRequest {
  fn default() -> Self {
    Self { sort: SortField::Title, order: SortOrder::Asc, page: 0, size: 10 }
  }
}

impl PageRequest {
  pub const MAX_SIZE: usize = 20;

  /// Clamp `size` to `MAX_SIZE`.
  pub fn clamped(mut self) -> Self {
    self.size = self.size.min(Self::MAX_SIZE);
    self
  }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub page:  usize,
  pub size:  usize,
  pub total: u64,
}

// ─── Document traits ─────────────────────────────────────────────────────────

/// An independently persisted aggregate carrying [`DocMeta`].
pub trait Document: Clone + Send + Sync + 'static {
  fn meta(&self) -> &DocMeta;
  fn meta_mut(&mut self) -> &mut DocMeta;
}

/// Generic per-aggregate storage interface.
///
/// `save` is a compare-and-swap on `meta.version`: the row is updated only
/// if the stored version still equals the document's version, and the
/// returned document carries the incremented version and refreshed
/// `updated` timestamp. A lost race surfaces as
/// [`StoreError::VersionConflict`], so concurrent conflicting writers are
/// serialized with exactly one winner per version number.
pub trait DocumentStore<E: Document>: Send + Sync {
  /// Persist a new document. Identity, timestamps, and version 0 are
  /// assigned by the store; whatever metadata the input carries is
  /// replaced.
  fn insert(
    &self,
    doc: E,
  ) -> impl Future<Output = Result<E, StoreError>> + Send;

  fn find_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<E>, StoreError>> + Send + '_;

  /// Version-conditional save. See the trait docs.
  fn save(&self, doc: E) -> impl Future<Output = Result<E, StoreError>> + Send;

  /// Returns `true` if a document was deleted.
  fn delete_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, StoreError>> + Send + '_;

  fn exists_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, StoreError>> + Send + '_;

  /// Batch lookup: the subset of `ids` that resolve, loaded. Missing ids
  /// are simply absent from the result; callers diff to find them.
  fn find_existing<'a>(
    &'a self,
    ids: &'a [Uuid],
  ) -> impl Future<Output = Result<Vec<E>, StoreError>> + Send + 'a;
}

// ─── Relational queries ──────────────────────────────────────────────────────

/// Subject queries beyond by-id access.
pub trait SubjectQueries: Send + Sync {
  /// Page through the subjects whose `location_ref` is `location_id`.
  fn find_by_location(
    &self,
    location_id: Uuid,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Subject>, StoreError>> + Send + '_;
}

/// Location queries beyond by-id access.
pub trait LocationQueries: Send + Sync {
  /// Per-location favorite totals, zero-favorite locations omitted,
  /// sorted by count descending.
  fn favorite_counts(
    &self,
  ) -> impl Future<Output = Result<Vec<FavoriteCount>, StoreError>> + Send + '_;
}

// ─── Idempotency ─────────────────────────────────────────────────────────────

/// Deduplication store for client-supplied idempotency keys.
///
/// Keys are opaque strings with no cross-resource-kind key spaces: reusing
/// one key string for two different resource kinds makes the second usage a
/// duplicate. Callers wanting independent key spaces must prefix keys
/// themselves (e.g. `subject-123` / `location-123`).
pub trait IdempotencyStore: Send + Sync {
  /// Atomically claim `key`. Returns `true` iff this call is the first to
  /// claim it within the retention window. Must be an atomic
  /// insert-if-absent at the storage boundary, never read-then-write.
  fn try_claim<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<bool, StoreError>> + Send + 'a;

  /// Physically delete expired records. Returns how many were purged.
  fn purge_expired(
    &self,
  ) -> impl Future<Output = Result<u64, StoreError>> + Send + '_;
}

// ─── Combined bound ──────────────────────────────────────────────────────────

/// Everything the service layer needs from a backend, as one bound.
pub trait Store:
  DocumentStore<Subject>
  + DocumentStore<Location>
  + SubjectQueries
  + LocationQueries
  + IdempotencyStore
{
}

impl<T> Store for T where
  T: DocumentStore<Subject>
    + DocumentStore<Location>
    + SubjectQueries
    + LocationQueries
    + IdempotencyStore
{
}

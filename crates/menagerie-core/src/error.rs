//! Error types for `menagerie-core`.

use thiserror::Error;
use uuid::Uuid;

/// Failures surfaced by the storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("document not found: {0}")]
  NotFound(Uuid),

  #[error("stale write: attempted with version {attempted}, stored version is {current}")]
  VersionConflict { attempted: i64, current: i64 },

  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Typed, recoverable-by-caller failures of the service layer.
///
/// Everything except `Store` maps to a distinct client-facing category;
/// unexpected backend failures propagate through `Store` unrecovered.
#[derive(Debug, Error)]
pub enum Error {
  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("location not found: {0}")]
  LocationNotFound(Uuid),

  /// Client token parsed but does not match the stored version. Retryable:
  /// re-fetch and retry with the current version.
  #[error("version conflict: client sent {client}, current version is {current}")]
  VersionConflict { client: i64, current: i64 },

  /// Client token is not a non-negative integer. Distinct from a conflict.
  #[error("malformed version token: {0:?}")]
  MalformedVersionToken(String),

  /// The idempotency key was already claimed: this exact request already
  /// succeeded, no retry needed.
  #[error("duplicate request: idempotency key {0:?} already used")]
  DuplicateRequest(String),

  /// One or more referenced location ids do not resolve. Carries the full
  /// missing set, not just the first.
  #[error("unknown locations: {0:?}")]
  UnknownLocations(Vec<Uuid>),

  #[error("validation error: {0}")]
  Validation(String),

  #[error(transparent)]
  Store(#[from] StoreError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

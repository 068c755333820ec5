//! Error type for `menagerie-store-sqlite`.

use menagerie_core::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted a version-conditional save against a missing row.
  #[error("document not found: {0}")]
  NotFound(Uuid),

  /// Compare-and-swap on version lost.
  #[error("stale write on {id}: attempted with version {attempted}, stored version is {current}")]
  VersionConflict { id: Uuid, attempted: i64, current: i64 },
}

impl From<Error> for StoreError {
  fn from(e: Error) -> Self {
    match e {
      Error::NotFound(id) => StoreError::NotFound(id),
      Error::VersionConflict { attempted, current, .. } => {
        StoreError::VersionConflict { attempted, current }
      }
      other => StoreError::Backend(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

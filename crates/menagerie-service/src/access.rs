//! Disambiguated helpers over the generic [`DocumentStore`].
//!
//! With one backend implementing the store for both aggregate kinds, plain
//! method calls are ambiguous; these helpers pin the aggregate and fold
//! store-level outcomes into service errors.

use menagerie_core::{
  Error, Result, StoreError,
  location::Location,
  store::{DocumentStore, Store},
  subject::Subject,
};
use uuid::Uuid;

/// A compare-and-swap loss after a passing version check means a concurrent
/// writer got in between load and save; it surfaces as the same conflict
/// the version guard would have reported.
fn lost_race(e: StoreError) -> Error {
  match e {
    StoreError::VersionConflict { attempted, current } => {
      Error::VersionConflict { client: attempted, current }
    }
    other => Error::Store(other),
  }
}

pub(crate) async fn load_subject<S: Store>(
  store: &S,
  id: Uuid,
) -> Result<Subject> {
  DocumentStore::<Subject>::find_by_id(store, id)
    .await?
    .ok_or(Error::SubjectNotFound(id))
}

pub(crate) async fn load_location<S: Store>(
  store: &S,
  id: Uuid,
) -> Result<Location> {
  DocumentStore::<Location>::find_by_id(store, id)
    .await?
    .ok_or(Error::LocationNotFound(id))
}

pub(crate) async fn save_subject<S: Store>(
  store: &S,
  subject: Subject,
) -> Result<Subject> {
  DocumentStore::<Subject>::save(store, subject)
    .await
    .map_err(lost_race)
}

pub(crate) async fn save_location<S: Store>(
  store: &S,
  location: Location,
) -> Result<Location> {
  DocumentStore::<Location>::save(store, location)
    .await
    .map_err(lost_race)
}

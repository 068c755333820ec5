//! [`RelationshipMaintainer`] keeps the favorite relation's two reverse
//! indexes consistent.
//!
//! The relation is stored redundantly: `Subject::favorites` forward,
//! `Location::favorited_by` reverse. This component owns neither aggregate
//! and holds no state; it performs the coordinated dual write. All
//! referenced locations are resolved up front in one batch, so a request
//! naming any unknown id fails before anything is written.

use std::{collections::BTreeSet, sync::Arc};

use menagerie_core::{
  Error, Result,
  location::Location,
  store::{DocumentStore, Store},
  subject::Subject,
  version,
};
use uuid::Uuid;

pub struct RelationshipMaintainer<S> {
  store: Arc<S>,
}

impl<S: Store> RelationshipMaintainer<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Add `location_ids` to the subject's favorites and the subject to each
  /// location's reverse set. Re-adding an existing favorite is a no-op.
  ///
  /// Returns the saved subject plus the ids of the locations whose reverse
  /// set actually changed (for cache invalidation).
  pub async fn assign(
    &self,
    subject_id: Uuid,
    location_ids: &BTreeSet<Uuid>,
    token: Option<&str>,
  ) -> Result<(Subject, Vec<Uuid>)> {
    let resolved = self.resolve_all(location_ids).await?;

    let mut subject = crate::access::load_subject(&*self.store, subject_id).await?;
    version::check(subject.meta.version, token).permit()?;

    subject.favorites.extend(location_ids.iter().copied());
    let subject = crate::access::save_subject(&*self.store, subject).await?;

    // Reverse-index maintenance: one independent write per location, no
    // cross-aggregate transaction. A crash between the subject save above
    // and these writes leaves the subject side ahead until a later
    // mutation converges the two.
    let mut touched = Vec::new();
    for mut location in resolved {
      if location.favorited_by.insert(subject_id) {
        let id = location.meta.id;
        crate::access::save_location(&*self.store, location).await?;
        touched.push(id);
      }
    }

    tracing::debug!(
      subject = %subject_id,
      touched = touched.len(),
      "favorites assigned"
    );
    Ok((subject, touched))
  }

  /// Mirror of [`assign`](Self::assign) with set subtraction. Removing a
  /// non-present favorite is a no-op.
  pub async fn unassign(
    &self,
    subject_id: Uuid,
    location_ids: &BTreeSet<Uuid>,
    token: Option<&str>,
  ) -> Result<(Subject, Vec<Uuid>)> {
    let resolved = self.resolve_all(location_ids).await?;

    let mut subject = crate::access::load_subject(&*self.store, subject_id).await?;
    version::check(subject.meta.version, token).permit()?;

    for id in location_ids {
      subject.favorites.remove(id);
    }
    let subject = crate::access::save_subject(&*self.store, subject).await?;

    let mut touched = Vec::new();
    for mut location in resolved {
      if location.favorited_by.remove(&subject_id) {
        let id = location.meta.id;
        crate::access::save_location(&*self.store, location).await?;
        touched.push(id);
      }
    }

    tracing::debug!(
      subject = %subject_id,
      touched = touched.len(),
      "favorites unassigned"
    );
    Ok((subject, touched))
  }

  /// Resolve every requested id in one batch lookup, failing with the full
  /// set of unresolved ids, not just the first.
  async fn resolve_all(&self, ids: &BTreeSet<Uuid>) -> Result<Vec<Location>> {
    let requested: Vec<Uuid> = ids.iter().copied().collect();
    let resolved =
      DocumentStore::<Location>::find_existing(&*self.store, &requested).await?;

    if resolved.len() != requested.len() {
      let found: BTreeSet<Uuid> = resolved.iter().map(|l| l.meta.id).collect();
      let missing: Vec<Uuid> = ids.difference(&found).copied().collect();
      return Err(Error::UnknownLocations(missing));
    }
    Ok(resolved)
  }
}

//! [`SubjectService`]: orchestration for subject operations.

use std::{collections::BTreeSet, sync::Arc};

use menagerie_cache::{CacheCoordinator, Mutation};
use menagerie_core::{
  Error, Result,
  location::Location,
  store::{DocumentStore, Page, PageRequest, Store, SubjectQueries},
  subject::{NewSubject, Subject, SubjectPatch},
  version,
};
use uuid::Uuid;

use crate::{
  access, guard::IdempotencyGuard, relation::RelationshipMaintainer,
  require_title,
};

pub struct SubjectService<S> {
  store:     Arc<S>,
  caches:    Arc<CacheCoordinator>,
  guard:     IdempotencyGuard<S>,
  relations: RelationshipMaintainer<S>,
}

impl<S: Store> SubjectService<S> {
  pub fn new(store: Arc<S>, caches: Arc<CacheCoordinator>) -> Self {
    Self {
      guard: IdempotencyGuard::new(store.clone()),
      relations: RelationshipMaintainer::new(store.clone()),
      store,
      caches,
    }
  }

  /// Create a subject. Input is validated before the idempotency key is
  /// claimed, so a rejected request does not burn its key; a claimed key
  /// means this exact request already succeeded.
  pub async fn create(
    &self,
    input: NewSubject,
    idempotency_key: &str,
  ) -> Result<Subject> {
    require_title(&input.title)?;
    self.guard.register(idempotency_key).await?;

    let subject =
      DocumentStore::<Subject>::insert(&*self.store, Subject::new(input))
        .await?;
    tracing::debug!(subject = %subject.meta.id, "subject created");
    Ok(subject)
  }

  /// Read-through: cache hit, or load and populate.
  pub async fn get(&self, id: Uuid) -> Result<Subject> {
    if let Some(hit) = self.caches.cached_subject(id) {
      return Ok(hit);
    }
    let subject = access::load_subject(&*self.store, id).await?;
    self.caches.refresh_subject(&subject);
    Ok(subject)
  }

  pub async fn update(
    &self,
    id: Uuid,
    patch: SubjectPatch,
    token: Option<&str>,
  ) -> Result<Subject> {
    let mut subject = access::load_subject(&*self.store, id).await?;
    version::check(subject.meta.version, token).permit()?;

    if let Some(title) = &patch.title {
      require_title(title)?;
    }
    patch.apply(&mut subject);

    let subject = access::save_subject(&*self.store, subject).await?;
    self.caches.apply(&Mutation::SubjectUpdated {
      id,
      location: subject.location_ref,
    });
    self.caches.refresh_subject(&subject);
    Ok(subject)
  }

  pub async fn delete(&self, id: Uuid, token: Option<&str>) -> Result<()> {
    let subject = access::load_subject(&*self.store, id).await?;
    version::check(subject.meta.version, token).permit()?;

    // Reverse favorite references on locations are not cascade-cleaned;
    // readers tolerate the dangling ids.
    DocumentStore::<Subject>::delete_by_id(&*self.store, id).await?;
    self.caches.apply(&Mutation::SubjectDeleted {
      id,
      location: subject.location_ref,
    });
    tracing::debug!(subject = %id, "subject deleted");
    Ok(())
  }

  /// Set `location_ref`, verifying the target location exists first.
  pub async fn move_to_location(
    &self,
    subject_id: Uuid,
    location_id: Uuid,
    token: Option<&str>,
  ) -> Result<Subject> {
    if !DocumentStore::<Location>::exists_by_id(&*self.store, location_id)
      .await?
    {
      return Err(Error::LocationNotFound(location_id));
    }

    let mut subject = access::load_subject(&*self.store, subject_id).await?;
    version::check(subject.meta.version, token).permit()?;

    let from = subject.location_ref;
    subject.location_ref = Some(location_id);
    let subject = access::save_subject(&*self.store, subject).await?;

    self.caches.apply(&Mutation::SubjectMoved {
      id: subject_id,
      from,
      to: Some(location_id),
    });
    self.caches.refresh_subject(&subject);
    Ok(subject)
  }

  /// Clear `location_ref`; it is an input error if the subject is not
  /// currently in `location_id`.
  pub async fn remove_from_location(
    &self,
    subject_id: Uuid,
    location_id: Uuid,
    token: Option<&str>,
  ) -> Result<Subject> {
    let mut subject = access::load_subject(&*self.store, subject_id).await?;
    version::check(subject.meta.version, token).permit()?;

    if subject.location_ref != Some(location_id) {
      return Err(Error::Validation(format!(
        "subject {subject_id} is not in location {location_id}"
      )));
    }
    subject.location_ref = None;
    let subject = access::save_subject(&*self.store, subject).await?;

    self.caches.apply(&Mutation::SubjectMoved {
      id:   subject_id,
      from: Some(location_id),
      to:   None,
    });
    self.caches.refresh_subject(&subject);
    Ok(subject)
  }

  pub async fn assign_favorites(
    &self,
    subject_id: Uuid,
    location_ids: &BTreeSet<Uuid>,
    token: Option<&str>,
  ) -> Result<Subject> {
    let (subject, touched) =
      self.relations.assign(subject_id, location_ids, token).await?;
    self.caches.apply(&Mutation::FavoritesChanged {
      subject:   subject_id,
      locations: touched,
    });
    self.caches.refresh_subject(&subject);
    Ok(subject)
  }

  pub async fn unassign_favorites(
    &self,
    subject_id: Uuid,
    location_ids: &BTreeSet<Uuid>,
    token: Option<&str>,
  ) -> Result<Subject> {
    let (subject, touched) =
      self.relations.unassign(subject_id, location_ids, token).await?;
    self.caches.apply(&Mutation::FavoritesChanged {
      subject:   subject_id,
      locations: touched,
    });
    self.caches.refresh_subject(&subject);
    Ok(subject)
  }

  /// Read-through paged listing of the subjects living in one location.
  pub async fn list_by_location(
    &self,
    location_id: Uuid,
    page: PageRequest,
  ) -> Result<Page<Subject>> {
    let page = page.clamped();
    if let Some(hit) = self.caches.cached_list(location_id, &page) {
      return Ok(hit);
    }
    let result = self.store.find_by_location(location_id, page).await?;
    self.caches.refresh_list(location_id, &page, &result);
    Ok(result)
  }
}

//! [`LocationService`]: orchestration for location operations.

use std::sync::Arc;

use menagerie_cache::{CacheCoordinator, Mutation};
use menagerie_core::{
  Result,
  location::{FavoriteCount, Location, LocationPatch, NewLocation},
  store::{DocumentStore, LocationQueries, Store},
  version,
};
use uuid::Uuid;

use crate::{access, guard::IdempotencyGuard, require_title};

pub struct LocationService<S> {
  store:  Arc<S>,
  caches: Arc<CacheCoordinator>,
  guard:  IdempotencyGuard<S>,
}

impl<S: Store> LocationService<S> {
  pub fn new(store: Arc<S>, caches: Arc<CacheCoordinator>) -> Self {
    Self { guard: IdempotencyGuard::new(store.clone()), store, caches }
  }

  /// Create a location. Input is validated before the idempotency key is
  /// claimed, so a rejected request does not burn its key.
  pub async fn create(
    &self,
    input: NewLocation,
    idempotency_key: &str,
  ) -> Result<Location> {
    require_title(&input.title)?;
    self.guard.register(idempotency_key).await?;

    let location =
      DocumentStore::<Location>::insert(&*self.store, Location::new(input))
        .await?;
    tracing::debug!(location = %location.meta.id, "location created");
    Ok(location)
  }

  /// Read-through: cache hit, or load and populate.
  pub async fn get(&self, id: Uuid) -> Result<Location> {
    if let Some(hit) = self.caches.cached_location(id) {
      return Ok(hit);
    }
    let location = access::load_location(&*self.store, id).await?;
    self.caches.refresh_location(&location);
    Ok(location)
  }

  pub async fn update(
    &self,
    id: Uuid,
    patch: LocationPatch,
    token: Option<&str>,
  ) -> Result<Location> {
    let mut location = access::load_location(&*self.store, id).await?;
    version::check(location.meta.version, token).permit()?;

    if let Some(title) = &patch.title {
      require_title(title)?;
    }
    patch.apply(&mut location);

    let location = access::save_location(&*self.store, location).await?;
    self.caches.apply(&Mutation::LocationUpdated { id });
    self.caches.refresh_location(&location);
    Ok(location)
  }

  pub async fn delete(&self, id: Uuid, token: Option<&str>) -> Result<()> {
    let location = access::load_location(&*self.store, id).await?;
    version::check(location.meta.version, token).permit()?;

    // Subjects that favorited (or live in) this location keep their ids;
    // forward references are not cascade-cleaned.
    DocumentStore::<Location>::delete_by_id(&*self.store, id).await?;
    self.caches.apply(&Mutation::LocationDeleted { id });
    tracing::debug!(location = %id, "location deleted");
    Ok(())
  }

  /// Per-location favorite totals; uncached, served straight from storage.
  pub async fn favorite_counts(&self) -> Result<Vec<FavoriteCount>> {
    Ok(self.store.favorite_counts().await?)
  }
}

//! [`CacheCoordinator`]: per-mutation cache invalidation policy.
//!
//! The policy is an explicit table ([`plan`]) from mutation kind to cache
//! actions, evaluated by ordinary code so it can be tested in isolation.
//! List invalidation is deliberately coarse: list keys are parameterized by
//! sort/order/page/size, and precisely targeting only the affected
//! combinations is not worth the bookkeeping for this working set, so any
//! mutation that could change a location's list evicts that location's
//! whole list namespace, and only that location's.

use std::time::Duration;

use menagerie_core::{
  location::Location,
  store::{Page, PageRequest},
  subject::Subject,
};
use uuid::Uuid;

use crate::TtlCache;

// ─── Policy table ────────────────────────────────────────────────────────────

/// A completed mutation, described with just enough detail to invalidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
  SubjectUpdated { id: Uuid, location: Option<Uuid> },
  SubjectDeleted { id: Uuid, location: Option<Uuid> },
  SubjectMoved { id: Uuid, from: Option<Uuid>, to: Option<Uuid> },
  /// The favorite relation between one subject and these locations changed.
  FavoritesChanged { subject: Uuid, locations: Vec<Uuid> },
  LocationUpdated { id: Uuid },
  LocationDeleted { id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
  EvictSubject(Uuid),
  EvictLocation(Uuid),
  /// Evict every list entry in one location's namespace.
  EvictSubjectLists(Uuid),
}

/// The mutation-kind → cache-action table.
pub fn plan(mutation: &Mutation) -> Vec<CacheAction> {
  use CacheAction::*;

  match mutation {
    Mutation::SubjectUpdated { id, location }
    | Mutation::SubjectDeleted { id, location } => {
      let mut actions = vec![EvictSubject(*id)];
      actions.extend(location.map(EvictSubjectLists));
      actions
    }
    Mutation::SubjectMoved { id, from, to } => {
      let mut actions = vec![EvictSubject(*id)];
      actions.extend(from.map(EvictSubjectLists));
      actions.extend(to.map(EvictSubjectLists));
      actions
    }
    Mutation::FavoritesChanged { subject, locations } => {
      let mut actions = vec![EvictSubject(*subject)];
      for l in locations {
        // The location's reverse index changed, so its entity entry is
        // stale too, not just its lists.
        actions.push(EvictLocation(*l));
        actions.push(EvictSubjectLists(*l));
      }
      actions
    }
    Mutation::LocationUpdated { id } => vec![EvictLocation(*id)],
    Mutation::LocationDeleted { id } => {
      vec![EvictLocation(*id), EvictSubjectLists(*id)]
    }
  }
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// One [`TtlCache`] per namespace, fronting reads for single entities and
/// for parameterized list queries.
pub struct CacheCoordinator {
  subjects:      TtlCache<Subject>,
  locations:     TtlCache<Location>,
  subject_lists: TtlCache<Page<Subject>>,
}

impl CacheCoordinator {
  pub fn new(capacity: usize, ttl: Duration) -> Self {
    Self {
      subjects:      TtlCache::new(capacity, ttl),
      locations:     TtlCache::new(capacity, ttl),
      subject_lists: TtlCache::new(capacity, ttl),
    }
  }

  pub fn with_defaults() -> Self {
    Self::new(crate::DEFAULT_CAPACITY, crate::DEFAULT_TTL)
  }

  fn list_key(location_id: Uuid, page: &PageRequest) -> String {
    format!(
      "{location_id}:{}:{}:{}:{}",
      page.sort, page.order, page.page, page.size
    )
  }

  // ── Read-through access ───────────────────────────────────────────────

  pub fn cached_subject(&self, id: Uuid) -> Option<Subject> {
    self.subjects.get(&id.to_string())
  }

  pub fn refresh_subject(&self, subject: &Subject) {
    self.subjects.put(subject.meta.id.to_string(), subject.clone());
  }

  pub fn cached_location(&self, id: Uuid) -> Option<Location> {
    self.locations.get(&id.to_string())
  }

  pub fn refresh_location(&self, location: &Location) {
    self
      .locations
      .put(location.meta.id.to_string(), location.clone());
  }

  pub fn cached_list(
    &self,
    location_id: Uuid,
    page: &PageRequest,
  ) -> Option<Page<Subject>> {
    self.subject_lists.get(&Self::list_key(location_id, page))
  }

  pub fn refresh_list(
    &self,
    location_id: Uuid,
    page: &PageRequest,
    result: &Page<Subject>,
  ) {
    self
      .subject_lists
      .put(Self::list_key(location_id, page), result.clone());
  }

  // ── Invalidation ──────────────────────────────────────────────────────

  /// Execute the policy table for one completed mutation.
  pub fn apply(&self, mutation: &Mutation) {
    for action in plan(mutation) {
      tracing::debug!(?action, "cache invalidation");
      match action {
        CacheAction::EvictSubject(id) => self.subjects.evict(&id.to_string()),
        CacheAction::EvictLocation(id) => {
          self.locations.evict(&id.to_string())
        }
        CacheAction::EvictSubjectLists(id) => {
          self.subject_lists.evict_prefix(&format!("{id}:"))
        }
      }
    }
  }
}

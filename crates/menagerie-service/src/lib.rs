//! Service orchestration for the Menagerie registry.
//!
//! [`SubjectService`] and [`LocationService`] are the only components
//! exposed externally. Every mutating call walks the same sequence: claim
//! the idempotency key (creates only), load, check the version token, apply
//! the mutation, persist, invalidate caches. Any step terminates the call
//! with a typed [`menagerie_core::Error`]; a failure after persist but
//! before invalidation leaves stale cache entries bounded by the TTL, and
//! nothing retries the invalidation automatically.

mod access;

pub mod guard;
pub mod locations;
pub mod relation;
pub mod subjects;

pub use guard::IdempotencyGuard;
pub use locations::LocationService;
pub use relation::RelationshipMaintainer;
pub use subjects::SubjectService;

use menagerie_core::{Error, Result};

pub(crate) fn require_title(title: &str) -> Result<()> {
  if title.trim().is_empty() {
    Err(Error::Validation("title must not be blank".to_owned()))
  } else {
    Ok(())
  }
}

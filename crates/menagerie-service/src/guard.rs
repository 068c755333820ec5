//! [`IdempotencyGuard`]: create-request deduplication.

use std::sync::Arc;

use menagerie_core::{Error, Result, store::IdempotencyStore};

/// Claims client-supplied idempotency keys exactly once per retention
/// window. The atomicity lives in the store's `try_claim`; this wrapper
/// only turns a lost claim into the typed duplicate failure.
///
/// Key spaces are not separated per resource kind; callers reusing one key
/// string across kinds must prefix it themselves (`subject-…`,
/// `location-…`).
pub struct IdempotencyGuard<S> {
  store: Arc<S>,
}

impl<S: IdempotencyStore> IdempotencyGuard<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Claim `key`, or fail with [`Error::DuplicateRequest`] if some earlier
  /// call (including a concurrent one) already claimed it.
  pub async fn register(&self, key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
      return Err(Error::Validation(
        "idempotency key must not be blank".to_owned(),
      ));
    }
    if self.store.try_claim(key).await? {
      Ok(())
    } else {
      tracing::warn!(key, "duplicate idempotency key");
      Err(Error::DuplicateRequest(key.to_owned()))
    }
  }
}

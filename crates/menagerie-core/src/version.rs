//! Optimistic-concurrency version check.
//!
//! A caller that previously read an entity echoes its version back as an
//! opaque token (a stringified integer, optionally double-quoted as an
//! entity tag). The check is a pure function over the stored version and
//! that token; the decision it produces feeds the store's
//! compare-and-swap save.

use crate::Error;

/// Outcome of comparing a client token against the stored version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
  /// No token supplied; the write proceeds regardless of version.
  Unconditional,
  /// Token matches the stored version; the write proceeds.
  Match,
  /// Token parsed but does not match. Carries both values for diagnostics.
  Conflict { client: i64, current: i64 },
  /// Token is not a non-negative integer. A client input error, not a
  /// concurrency conflict.
  Malformed(String),
}

/// Compare `token` against `current`. Deterministic, no side effects.
pub fn check(current: i64, token: Option<&str>) -> VersionCheck {
  let Some(raw) = token else {
    return VersionCheck::Unconditional;
  };

  // Accept both `"3"` (ETag form) and bare `3`.
  let bare = raw.trim().trim_matches('"');
  match bare.parse::<i64>() {
    Ok(client) if client >= 0 => {
      if client == current {
        VersionCheck::Match
      } else {
        VersionCheck::Conflict { client, current }
      }
    }
    _ => VersionCheck::Malformed(raw.to_owned()),
  }
}

impl VersionCheck {
  /// Collapse the outcome into "may the write proceed".
  pub fn permit(self) -> Result<(), Error> {
    match self {
      VersionCheck::Unconditional | VersionCheck::Match => Ok(()),
      VersionCheck::Conflict { client, current } => {
        Err(Error::VersionConflict { client, current })
      }
      VersionCheck::Malformed(token) => Err(Error::MalformedVersionToken(token)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn absent_token_is_unconditional() {
    assert_eq!(check(7, None), VersionCheck::Unconditional);
    assert!(check(7, None).permit().is_ok());
  }

  #[test]
  fn matching_token_passes() {
    assert_eq!(check(3, Some("3")), VersionCheck::Match);
  }

  #[test]
  fn quoted_token_is_accepted() {
    assert_eq!(check(3, Some("\"3\"")), VersionCheck::Match);
  }

  #[test]
  fn stale_token_conflicts_with_both_values() {
    assert_eq!(
      check(3, Some("2")),
      VersionCheck::Conflict { client: 2, current: 3 }
    );
  }

  #[test]
  fn non_numeric_token_is_malformed_not_conflict() {
    assert_eq!(
      check(3, Some("abc")),
      VersionCheck::Malformed("abc".to_owned())
    );
    assert!(matches!(
      check(3, Some("abc")).permit(),
      Err(Error::MalformedVersionToken(_))
    ));
  }

  #[test]
  fn negative_token_is_malformed() {
    assert_eq!(check(3, Some("-1")), VersionCheck::Malformed("-1".to_owned()));
  }

  #[test]
  fn empty_token_is_malformed() {
    assert!(matches!(check(0, Some("")), VersionCheck::Malformed(_)));
  }
}

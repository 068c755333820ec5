//! Location: a place subjects live in and can favorite.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{meta::DocMeta, store::Document};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
  #[serde(flatten)]
  pub meta:         DocMeta,
  pub title:        String,
  /// Reverse half of the favorite relation: ids of subjects that favorited
  /// this location. Kept symmetric with `Subject::favorites` by the
  /// relationship maintainer.
  pub favorited_by: BTreeSet<Uuid>,
}

impl Location {
  pub fn new(input: NewLocation) -> Self {
    Self {
      meta:         DocMeta::fresh(),
      title:        input.title,
      favorited_by: BTreeSet::new(),
    }
  }
}

impl Document for Location {
  fn meta(&self) -> &DocMeta {
    &self.meta
  }

  fn meta_mut(&mut self) -> &mut DocMeta {
    &mut self.meta
  }
}

/// Input for creating a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocation {
  pub title: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationPatch {
  pub title: Option<String>,
}

impl LocationPatch {
  pub fn apply(&self, location: &mut Location) {
    if let Some(title) = &self.title {
      location.title = title.clone();
    }
  }
}

/// A location's title with how many subjects favorited it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteCount {
  pub title:     String,
  pub favorites: u64,
}

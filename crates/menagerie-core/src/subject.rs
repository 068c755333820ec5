//! Subject: an exhibited resident of the menagerie.
//!
//! A subject may live in at most one location (`location_ref`) and may
//! favorite any number of locations. The favorite relation is stored
//! redundantly on both sides; `Location::favorited_by` is the reverse index.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{meta::DocMeta, store::Document};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  #[serde(flatten)]
  pub meta:         DocMeta,
  pub title:        String,
  pub located:      NaiveDate,
  /// The location this subject currently lives in, if any. Must resolve at
  /// the time it is set; not re-checked afterwards.
  pub location_ref: Option<Uuid>,
  /// Forward half of the favorite relation: location ids, deduplicated.
  pub favorites:    BTreeSet<Uuid>,
}

impl Subject {
  pub fn new(input: NewSubject) -> Self {
    Self {
      meta:         DocMeta::fresh(),
      title:        input.title,
      located:      input.located,
      location_ref: None,
      favorites:    BTreeSet::new(),
    }
  }
}

impl Document for Subject {
  fn meta(&self) -> &DocMeta {
    &self.meta
  }

  fn meta_mut(&mut self) -> &mut DocMeta {
    &mut self.meta
  }
}

/// Input for creating a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubject {
  pub title:   String,
  pub located: NaiveDate,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectPatch {
  pub title:   Option<String>,
  pub located: Option<NaiveDate>,
}

impl SubjectPatch {
  pub fn apply(&self, subject: &mut Subject) {
    if let Some(title) = &self.title {
      subject.title = title.clone();
    }
    if let Some(located) = self.located {
      subject.located = located;
    }
  }
}

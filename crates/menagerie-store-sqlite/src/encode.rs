//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, dates as `YYYY-MM-DD`, id
//! sets as compact JSON arrays. UUIDs are stored as hyphenated lowercase
//! strings.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use menagerie_core::{location::Location, meta::DocMeta, subject::Subject};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Id sets ─────────────────────────────────────────────────────────────────

pub fn encode_id_set(ids: &BTreeSet<Uuid>) -> Result<String> {
  let strings: Vec<String> = ids.iter().copied().map(encode_uuid).collect();
  Ok(serde_json::to_string(&strings)?)
}

pub fn decode_id_set(s: &str) -> Result<BTreeSet<Uuid>> {
  let strings: Vec<String> = serde_json::from_str(s)?;
  strings.iter().map(|s| decode_uuid(s)).collect()
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// A `subjects` row as read from SQLite, before decoding.
pub struct RawSubject {
  pub subject_id:   String,
  pub title:        String,
  pub located:      String,
  pub location_ref: Option<String>,
  pub favorites:    String,
  pub created:      String,
  pub updated:      String,
  pub version:      i64,
}

impl RawSubject {
  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      meta:         DocMeta {
        id:      decode_uuid(&self.subject_id)?,
        created: decode_dt(&self.created)?,
        updated: decode_dt(&self.updated)?,
        version: self.version,
      },
      title:        self.title,
      located:      decode_date(&self.located)?,
      location_ref: self.location_ref.as_deref().map(decode_uuid).transpose()?,
      favorites:    decode_id_set(&self.favorites)?,
    })
  }
}

/// A `locations` row as read from SQLite, before decoding.
pub struct RawLocation {
  pub location_id:  String,
  pub title:        String,
  pub favorited_by: String,
  pub created:      String,
  pub updated:      String,
  pub version:      i64,
}

impl RawLocation {
  pub fn into_location(self) -> Result<Location> {
    Ok(Location {
      meta:         DocMeta {
        id:      decode_uuid(&self.location_id)?,
        created: decode_dt(&self.created)?,
        updated: decode_dt(&self.updated)?,
        version: self.version,
      },
      title:        self.title,
      favorited_by: decode_id_set(&self.favorited_by)?,
    })
  }
}

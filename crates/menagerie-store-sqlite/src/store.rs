//! [`SqliteStore`]: the SQLite implementation of the storage traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use menagerie_core::{
  StoreError,
  location::{FavoriteCount, Location},
  meta::DocMeta,
  store::{
    Document, DocumentStore, IDEMPOTENCY_RETENTION_SECS, IdempotencyStore,
    LocationQueries, Page, PageRequest, SortField, SortOrder, SubjectQueries,
  },
  subject::Subject,
};

use crate::{
  Error, Result,
  encode::{
    RawLocation, RawSubject, encode_date, encode_dt, encode_id_set,
    encode_uuid,
  },
  schema::SCHEMA,
};

const SUBJECT_COLS: &str =
  "subject_id, title, located, location_ref, favorites, created, updated, version";
const LOCATION_COLS: &str =
  "location_id, title, favorited_by, created, updated, version";

fn subject_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSubject> {
  Ok(RawSubject {
    subject_id:   row.get(0)?,
    title:        row.get(1)?,
    located:      row.get(2)?,
    location_ref: row.get(3)?,
    favorites:    row.get(4)?,
    created:      row.get(5)?,
    updated:      row.get(6)?,
    version:      row.get(7)?,
  })
}

fn location_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLocation> {
  Ok(RawLocation {
    location_id:  row.get(0)?,
    title:        row.get(1)?,
    favorited_by: row.get(2)?,
    created:      row.get(3)?,
    updated:      row.get(4)?,
    version:      row.get(5)?,
  })
}

/// Outcome of a version-conditional UPDATE.
enum SaveOutcome {
  Saved,
  Conflict(i64),
  Missing,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Menagerie store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── DocumentStore<Subject> ──────────────────────────────────────────────────

impl DocumentStore<Subject> for SqliteStore {
  async fn insert(&self, mut doc: Subject) -> Result<Subject, StoreError> {
    // Identity, timestamps, and version 0 are store-assigned.
    *doc.meta_mut() = DocMeta::fresh();

    let id_str        = encode_uuid(doc.meta.id);
    let title         = doc.title.clone();
    let located_str   = encode_date(doc.located);
    let location_str  = doc.location_ref.map(encode_uuid);
    let favorites_str = encode_id_set(&doc.favorites).map_err(StoreError::from)?;
    let created_str   = encode_dt(doc.meta.created);
    let updated_str   = encode_dt(doc.meta.updated);
    let version       = doc.meta.version;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects
             (subject_id, title, located, location_ref, favorites, created, updated, version)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            title,
            located_str,
            location_str,
            favorites_str,
            created_str,
            updated_str,
            version,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from)?;

    Ok(doc)
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Subject>, StoreError> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SUBJECT_COLS} FROM subjects WHERE subject_id = ?1"),
              rusqlite::params![id_str],
              subject_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    raw
      .map(RawSubject::into_subject)
      .transpose()
      .map_err(StoreError::from)
  }

  async fn save(&self, mut doc: Subject) -> Result<Subject, StoreError> {
    let id = doc.meta.id;
    let attempted = doc.meta.version;
    doc.meta.updated = Utc::now();
    doc.meta.version = attempted + 1;

    let id_str        = encode_uuid(id);
    let title         = doc.title.clone();
    let located_str   = encode_date(doc.located);
    let location_str  = doc.location_ref.map(encode_uuid);
    let favorites_str = encode_id_set(&doc.favorites).map_err(StoreError::from)?;
    let updated_str   = encode_dt(doc.meta.updated);
    let new_version   = doc.meta.version;

    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE subjects
           SET title = ?1, located = ?2, location_ref = ?3, favorites = ?4,
               updated = ?5, version = ?6
           WHERE subject_id = ?7 AND version = ?8",
          rusqlite::params![
            title,
            located_str,
            location_str,
            favorites_str,
            updated_str,
            new_version,
            id_str,
            attempted,
          ],
        )?;
        if changed == 1 {
          return Ok(SaveOutcome::Saved);
        }
        let current: Option<i64> = conn
          .query_row(
            "SELECT version FROM subjects WHERE subject_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        Ok(match current {
          Some(v) => SaveOutcome::Conflict(v),
          None => SaveOutcome::Missing,
        })
      })
      .await
      .map_err(Error::from)?;

    match outcome {
      SaveOutcome::Saved => Ok(doc),
      SaveOutcome::Conflict(current) => {
        Err(Error::VersionConflict { id, attempted, current }.into())
      }
      SaveOutcome::Missing => Err(Error::NotFound(id).into()),
    }
  }

  async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM subjects WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await
      .map_err(Error::from)?;
    Ok(deleted == 1)
  }

  async fn exists_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
    let id_str = encode_uuid(id);
    let exists: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM subjects WHERE subject_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await
      .map_err(Error::from)?;
    Ok(exists)
  }

  async fn find_existing(&self, ids: &[Uuid]) -> Result<Vec<Subject>, StoreError> {
    if ids.is_empty() {
      return Ok(vec![]);
    }
    let id_strs: Vec<String> = ids.iter().copied().map(encode_uuid).collect();

    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; id_strs.len()].join(",");
        let sql = format!(
          "SELECT {SUBJECT_COLS} FROM subjects WHERE subject_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(id_strs.iter()), subject_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::from)?;

    raws
      .into_iter()
      .map(|r| r.into_subject().map_err(StoreError::from))
      .collect()
  }
}

// ─── DocumentStore<Location> ─────────────────────────────────────────────────

impl DocumentStore<Location> for SqliteStore {
  async fn insert(&self, mut doc: Location) -> Result<Location, StoreError> {
    *doc.meta_mut() = DocMeta::fresh();

    let id_str       = encode_uuid(doc.meta.id);
    let title        = doc.title.clone();
    let fav_by_str   = encode_id_set(&doc.favorited_by).map_err(StoreError::from)?;
    let created_str  = encode_dt(doc.meta.created);
    let updated_str  = encode_dt(doc.meta.updated);
    let version      = doc.meta.version;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO locations
             (location_id, title, favorited_by, created, updated, version)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, title, fav_by_str, created_str, updated_str, version],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from)?;

    Ok(doc)
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Location>, StoreError> {
    let id_str = encode_uuid(id);

    let raw: Option<RawLocation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {LOCATION_COLS} FROM locations WHERE location_id = ?1"),
              rusqlite::params![id_str],
              location_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    raw
      .map(RawLocation::into_location)
      .transpose()
      .map_err(StoreError::from)
  }

  async fn save(&self, mut doc: Location) -> Result<Location, StoreError> {
    let id = doc.meta.id;
    let attempted = doc.meta.version;
    doc.meta.updated = Utc::now();
    doc.meta.version = attempted + 1;

    let id_str      = encode_uuid(id);
    let title       = doc.title.clone();
    let fav_by_str  = encode_id_set(&doc.favorited_by).map_err(StoreError::from)?;
    let updated_str = encode_dt(doc.meta.updated);
    let new_version = doc.meta.version;

    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE locations
           SET title = ?1, favorited_by = ?2, updated = ?3, version = ?4
           WHERE location_id = ?5 AND version = ?6",
          rusqlite::params![title, fav_by_str, updated_str, new_version, id_str, attempted],
        )?;
        if changed == 1 {
          return Ok(SaveOutcome::Saved);
        }
        let current: Option<i64> = conn
          .query_row(
            "SELECT version FROM locations WHERE location_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        Ok(match current {
          Some(v) => SaveOutcome::Conflict(v),
          None => SaveOutcome::Missing,
        })
      })
      .await
      .map_err(Error::from)?;

    match outcome {
      SaveOutcome::Saved => Ok(doc),
      SaveOutcome::Conflict(current) => {
        Err(Error::VersionConflict { id, attempted, current }.into())
      }
      SaveOutcome::Missing => Err(Error::NotFound(id).into()),
    }
  }

  async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM locations WHERE location_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await
      .map_err(Error::from)?;
    Ok(deleted == 1)
  }

  async fn exists_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
    let id_str = encode_uuid(id);
    let exists: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM locations WHERE location_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await
      .map_err(Error::from)?;
    Ok(exists)
  }

  async fn find_existing(&self, ids: &[Uuid]) -> Result<Vec<Location>, StoreError> {
    if ids.is_empty() {
      return Ok(vec![]);
    }
    let id_strs: Vec<String> = ids.iter().copied().map(encode_uuid).collect();

    let raws: Vec<RawLocation> = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; id_strs.len()].join(",");
        let sql = format!(
          "SELECT {LOCATION_COLS} FROM locations WHERE location_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(id_strs.iter()), location_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::from)?;

    raws
      .into_iter()
      .map(|r| r.into_location().map_err(StoreError::from))
      .collect()
  }
}

// ─── Relational queries ──────────────────────────────────────────────────────

impl SubjectQueries for SqliteStore {
  async fn find_by_location(
    &self,
    location_id: Uuid,
    page: PageRequest,
  ) -> Result<Page<Subject>, StoreError> {
    let page = page.clamped();
    let loc_str = encode_uuid(location_id);
    let order_col = match page.sort {
      SortField::Title => "title",
      SortField::Located => "located",
    };
    let direction = match page.order {
      SortOrder::Asc => "ASC",
      SortOrder::Desc => "DESC",
    };
    let limit = page.size as i64;
    // `page` is unbounded caller input; saturate instead of overflowing.
    let offset = i64::try_from(page.page.saturating_mul(page.size))
      .unwrap_or(i64::MAX);

    let (raws, total): (Vec<RawSubject>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          "SELECT COUNT(*) FROM subjects WHERE location_ref = ?1",
          rusqlite::params![loc_str],
          |r| r.get(0),
        )?;

        // order_col / direction come from closed enums, not user input.
        let sql = format!(
          "SELECT {SUBJECT_COLS} FROM subjects
           WHERE location_ref = ?1
           ORDER BY {order_col} {direction}, subject_id ASC
           LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![loc_str, limit, offset], subject_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await
      .map_err(Error::from)?;

    let items = raws
      .into_iter()
      .map(|r| r.into_subject().map_err(StoreError::from))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Page { items, page: page.page, size: page.size, total: total as u64 })
  }
}

impl LocationQueries for SqliteStore {
  async fn favorite_counts(&self) -> Result<Vec<FavoriteCount>, StoreError> {
    let counts = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT title, json_array_length(favorited_by) AS favorites
           FROM locations
           WHERE json_array_length(favorited_by) > 0
           ORDER BY favorites DESC, title ASC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(FavoriteCount {
              title:     row.get(0)?,
              favorites: row.get::<_, i64>(1)? as u64,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::from)?;
    Ok(counts)
  }
}

// ─── IdempotencyStore ────────────────────────────────────────────────────────

impl IdempotencyStore for SqliteStore {
  async fn try_claim(&self, key: &str) -> Result<bool, StoreError> {
    let key = key.to_owned();
    let now = Utc::now();
    let now_str = encode_dt(now);
    let cutoff = encode_dt(
      now - chrono::Duration::seconds(IDEMPOTENCY_RETENTION_SECS),
    );

    // One transaction on the single connection thread: this is the atomic
    // insert-if-absent the whole design serializes on. An expired claim is
    // logically deleted, so it is removed first and the key can be retaken.
    let claimed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM idempotency WHERE key = ?1 AND created_at < ?2",
          rusqlite::params![key, cutoff],
        )?;
        let inserted = tx.execute(
          "INSERT OR IGNORE INTO idempotency (key, created_at) VALUES (?1, ?2)",
          rusqlite::params![key, now_str],
        )?;
        tx.commit()?;
        Ok(inserted == 1)
      })
      .await
      .map_err(Error::from)?;

    Ok(claimed)
  }

  async fn purge_expired(&self) -> Result<u64, StoreError> {
    let cutoff = encode_dt(
      Utc::now() - chrono::Duration::seconds(IDEMPOTENCY_RETENTION_SECS),
    );
    let purged = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM idempotency WHERE created_at < ?1",
          rusqlite::params![cutoff],
        )?)
      })
      .await
      .map_err(Error::from)?;
    Ok(purged as u64)
  }
}

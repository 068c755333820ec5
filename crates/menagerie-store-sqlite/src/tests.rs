//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use menagerie_core::{
  StoreError,
  location::{Location, NewLocation},
  store::{
    DocumentStore, IdempotencyStore, LocationQueries, PageRequest, SortField,
    SortOrder, SubjectQueries,
  },
  subject::{NewSubject, Subject},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_subject(title: &str) -> Subject {
  Subject::new(NewSubject {
    title:   title.to_owned(),
    located: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
  })
}

fn new_location(title: &str) -> Location {
  Location::new(NewLocation { title: title.to_owned() })
}

async fn insert_subject(s: &SqliteStore, title: &str) -> Subject {
  DocumentStore::<Subject>::insert(s, new_subject(title))
    .await
    .unwrap()
}

async fn insert_location(s: &SqliteStore, title: &str) -> Location {
  DocumentStore::<Location>::insert(s, new_location(title))
    .await
    .unwrap()
}

// ─── Insert / find ───────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_find_subject_roundtrip() {
  let s = store().await;

  let lion = insert_subject(&s, "Lion").await;
  assert_eq!(lion.meta.version, 0);

  let fetched = DocumentStore::<Subject>::find_by_id(&s, lion.meta.id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.meta.id, lion.meta.id);
  assert_eq!(fetched.title, "Lion");
  assert_eq!(fetched.located, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
  assert_eq!(fetched.meta.version, 0);
  assert!(fetched.favorites.is_empty());
  assert!(fetched.location_ref.is_none());
}

#[tokio::test]
async fn find_missing_subject_returns_none() {
  let s = store().await;
  let result = DocumentStore::<Subject>::find_by_id(&s, Uuid::new_v4())
    .await
    .unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn insert_assigns_fresh_metadata() {
  let s = store().await;
  // Whatever metadata the input carries is replaced by the store.
  let mut input = new_subject("Otter");
  input.meta.version = 42;
  let stored = DocumentStore::<Subject>::insert(&s, input.clone())
    .await
    .unwrap();
  assert_ne!(stored.meta.id, input.meta.id);
  assert_eq!(stored.meta.version, 0);
}

// ─── Version-conditional save ────────────────────────────────────────────────

#[tokio::test]
async fn save_increments_version_by_exactly_one() {
  let s = store().await;
  let mut lion = insert_subject(&s, "Lion").await;

  lion.title = "Lioness".to_owned();
  let saved = DocumentStore::<Subject>::save(&s, lion).await.unwrap();
  assert_eq!(saved.meta.version, 1);

  let fetched = DocumentStore::<Subject>::find_by_id(&s, saved.meta.id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.title, "Lioness");
  assert_eq!(fetched.meta.version, 1);
}

#[tokio::test]
async fn stale_save_loses_the_compare_and_swap() {
  let s = store().await;
  let lion = insert_subject(&s, "Lion").await;

  // Two copies loaded at version 0; the first save wins.
  let mut first = lion.clone();
  first.title = "First".to_owned();
  DocumentStore::<Subject>::save(&s, first).await.unwrap();

  let id = lion.meta.id;
  let mut second = lion;
  second.title = "Second".to_owned();
  let err = DocumentStore::<Subject>::save(&s, second).await.unwrap_err();
  assert!(matches!(
    err,
    StoreError::VersionConflict { attempted: 0, current: 1 }
  ));

  // The loser changed nothing.
  let fetched = DocumentStore::<Subject>::find_by_id(&s, id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.title, "First");
  assert_eq!(fetched.meta.version, 1);
}

#[tokio::test]
async fn racing_saves_from_one_version_have_exactly_one_winner() {
  let s = store().await;
  let lion = insert_subject(&s, "Lion").await;

  let mut tasks = Vec::new();
  for i in 0..8 {
    let s = s.clone();
    let mut copy = lion.clone();
    tasks.push(tokio::spawn(async move {
      copy.title = format!("Writer {i}");
      DocumentStore::<Subject>::save(&s, copy).await.is_ok()
    }));
  }

  let mut winners = 0;
  for task in tasks {
    if task.await.unwrap() {
      winners += 1;
    }
  }
  assert_eq!(winners, 1);

  let fetched = DocumentStore::<Subject>::find_by_id(&s, lion.meta.id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.meta.version, 1);
}

#[tokio::test]
async fn save_of_deleted_document_is_not_found() {
  let s = store().await;
  let lion = insert_subject(&s, "Lion").await;
  assert!(
    DocumentStore::<Subject>::delete_by_id(&s, lion.meta.id)
      .await
      .unwrap()
  );

  let err = DocumentStore::<Subject>::save(&s, lion).await.unwrap_err();
  assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn delete_missing_returns_false() {
  let s = store().await;
  assert!(
    !DocumentStore::<Subject>::delete_by_id(&s, Uuid::new_v4())
      .await
      .unwrap()
  );
}

// ─── Batch lookup ────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_existing_returns_only_resolving_ids() {
  let s = store().await;
  let l1 = insert_location(&s, "Savanna").await;
  let l2 = insert_location(&s, "River").await;
  let ghost = Uuid::new_v4();

  let found =
    DocumentStore::<Location>::find_existing(&s, &[l1.meta.id, ghost, l2.meta.id])
      .await
      .unwrap();
  let ids: BTreeSet<Uuid> = found.iter().map(|l| l.meta.id).collect();
  assert_eq!(ids, BTreeSet::from([l1.meta.id, l2.meta.id]));
}

#[tokio::test]
async fn find_existing_with_no_ids_is_empty() {
  let s = store().await;
  let found = DocumentStore::<Location>::find_existing(&s, &[]).await.unwrap();
  assert!(found.is_empty());
}

// ─── Location roundtrip ──────────────────────────────────────────────────────

#[tokio::test]
async fn location_favorited_by_roundtrips() {
  let s = store().await;
  let mut savanna = insert_location(&s, "Savanna").await;

  let subject_id = Uuid::new_v4();
  savanna.favorited_by.insert(subject_id);
  let saved = DocumentStore::<Location>::save(&s, savanna).await.unwrap();
  assert_eq!(saved.meta.version, 1);

  let fetched = DocumentStore::<Location>::find_by_id(&s, saved.meta.id)
    .await
    .unwrap()
    .unwrap();
  assert!(fetched.favorited_by.contains(&subject_id));
}

// ─── Paged relational listing ────────────────────────────────────────────────

async fn subject_in_location(
  s: &SqliteStore,
  title: &str,
  located: NaiveDate,
  location: Uuid,
) -> Subject {
  let mut subject = DocumentStore::<Subject>::insert(
    s,
    Subject::new(NewSubject { title: title.to_owned(), located }),
  )
  .await
  .unwrap();
  subject.location_ref = Some(location);
  DocumentStore::<Subject>::save(s, subject).await.unwrap()
}

#[tokio::test]
async fn find_by_location_pages_and_sorts() {
  let s = store().await;
  let savanna = insert_location(&s, "Savanna").await;
  let river = insert_location(&s, "River").await;

  let d = |day| NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
  subject_in_location(&s, "Zebra", d(3), savanna.meta.id).await;
  subject_in_location(&s, "Antelope", d(1), savanna.meta.id).await;
  subject_in_location(&s, "Lion", d(2), savanna.meta.id).await;
  subject_in_location(&s, "Otter", d(4), river.meta.id).await;

  let page = PageRequest { size: 2, ..Default::default() };
  let first = s.find_by_location(savanna.meta.id, page).await.unwrap();
  assert_eq!(first.total, 3);
  assert_eq!(
    first.items.iter().map(|x| x.title.as_str()).collect::<Vec<_>>(),
    ["Antelope", "Lion"]
  );

  let second = s
    .find_by_location(savanna.meta.id, PageRequest { page: 1, ..page })
    .await
    .unwrap();
  assert_eq!(
    second.items.iter().map(|x| x.title.as_str()).collect::<Vec<_>>(),
    ["Zebra"]
  );

  let by_date_desc = s
    .find_by_location(savanna.meta.id, PageRequest {
      sort: SortField::Located,
      order: SortOrder::Desc,
      page: 0,
      size: 10,
    })
    .await
    .unwrap();
  assert_eq!(
    by_date_desc.items.iter().map(|x| x.title.as_str()).collect::<Vec<_>>(),
    ["Zebra", "Lion", "Antelope"]
  );
}

#[tokio::test]
async fn find_by_location_survives_huge_page_numbers() {
  let s = store().await;
  let savanna = insert_location(&s, "Savanna").await;
  let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
  subject_in_location(&s, "Lion", d, savanna.meta.id).await;

  // The page * size offset must saturate, not overflow.
  let page = PageRequest { page: usize::MAX / 2, size: 20, ..Default::default() };
  let result = s.find_by_location(savanna.meta.id, page).await.unwrap();
  assert!(result.items.is_empty());
  assert_eq!(result.total, 1);
}

#[tokio::test]
async fn find_by_location_clamps_oversized_pages() {
  let s = store().await;
  let savanna = insert_location(&s, "Savanna").await;
  let page = PageRequest { size: 500, ..Default::default() };
  let result = s.find_by_location(savanna.meta.id, page).await.unwrap();
  assert_eq!(result.size, PageRequest::MAX_SIZE);
  assert_eq!(result.total, 0);
}

// ─── Favorite counts ─────────────────────────────────────────────────────────

#[tokio::test]
async fn favorite_counts_skip_unfavorited_and_sort_descending() {
  let s = store().await;
  let mut savanna = insert_location(&s, "Savanna").await;
  let mut river = insert_location(&s, "River").await;
  insert_location(&s, "Cave").await; // never favorited

  savanna.favorited_by.insert(Uuid::new_v4());
  DocumentStore::<Location>::save(&s, savanna).await.unwrap();
  river.favorited_by.insert(Uuid::new_v4());
  river.favorited_by.insert(Uuid::new_v4());
  DocumentStore::<Location>::save(&s, river).await.unwrap();

  let counts = s.favorite_counts().await.unwrap();
  assert_eq!(counts.len(), 2);
  assert_eq!(counts[0].title, "River");
  assert_eq!(counts[0].favorites, 2);
  assert_eq!(counts[1].title, "Savanna");
  assert_eq!(counts[1].favorites, 1);
}

// ─── Idempotency claims ──────────────────────────────────────────────────────

#[tokio::test]
async fn first_claim_wins_second_loses() {
  let s = store().await;
  assert!(s.try_claim("create-lion-1").await.unwrap());
  assert!(!s.try_claim("create-lion-1").await.unwrap());
  // A different key is unaffected.
  assert!(s.try_claim("create-lion-2").await.unwrap());
}

#[tokio::test]
async fn concurrent_claims_have_exactly_one_winner() {
  let s = store().await;

  let mut tasks = Vec::new();
  for _ in 0..16 {
    let s = s.clone();
    tasks.push(tokio::spawn(async move {
      s.try_claim("racing-key").await.unwrap()
    }));
  }

  let mut winners = 0;
  for task in tasks {
    if task.await.unwrap() {
      winners += 1;
    }
  }
  assert_eq!(winners, 1);
}

/// Backdate a claim so it falls outside the retention window.
async fn backdate_claim(s: &SqliteStore, key: &str, secs: i64) {
  let stale =
    (chrono::Utc::now() - chrono::Duration::seconds(secs)).to_rfc3339();
  let key = key.to_owned();
  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE idempotency SET created_at = ?1 WHERE key = ?2",
        rusqlite::params![stale, key],
      )?;
      Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn expired_claims_are_invisible_and_reclaimable() {
  let s = store().await;
  assert!(s.try_claim("old-key").await.unwrap());
  backdate_claim(&s, "old-key", 25 * 60 * 60).await;

  // The expired record no longer blocks a new claim.
  assert!(s.try_claim("old-key").await.unwrap());
  // And the fresh claim blocks again.
  assert!(!s.try_claim("old-key").await.unwrap());
}

#[tokio::test]
async fn purge_expired_removes_only_stale_records() {
  let s = store().await;
  s.try_claim("stale").await.unwrap();
  s.try_claim("fresh").await.unwrap();
  backdate_claim(&s, "stale", 25 * 60 * 60).await;

  assert_eq!(s.purge_expired().await.unwrap(), 1);
  // "fresh" survived the purge and still dedupes.
  assert!(!s.try_claim("fresh").await.unwrap());
}

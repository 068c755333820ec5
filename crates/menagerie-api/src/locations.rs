//! Handlers for `/locations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/locations` | Requires `Idempotency-Key` |
//! | `GET`    | `/locations/favorites` | Favorite totals, count descending |
//! | `GET`    | `/locations/:id` | 404 if not found |
//! | `PUT`    | `/locations/:id` | `If-Match` optional |
//! | `DELETE` | `/locations/:id` | `If-Match` optional |
//! | `POST`   | `/locations/:id/subjects/:subject_id` | Move subject in |
//! | `DELETE` | `/locations/:id/subjects/:subject_id` | Move subject out |
//! | `GET`    | `/locations/:id/subjects` | `?sort&order&page&size` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use menagerie_core::{
  location::{LocationPatch, NewLocation},
  store::{PageRequest, SortField, SortOrder, Store},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError, etag_header, idempotency_key, if_match};

/// `POST /locations`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<NewLocation>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let key = idempotency_key(&headers)?;
  let location = state.locations.create(body, &key).await?;
  Ok((StatusCode::CREATED, etag_header(&location.meta), Json(location)))
}

/// `GET /locations/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let location = state.locations.get(id).await?;
  Ok((etag_header(&location.meta), Json(location)))
}

/// `PUT /locations/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<LocationPatch>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let token = if_match(&headers)?;
  let location = state.locations.update(id, body, token.as_deref()).await?;
  Ok((etag_header(&location.meta), Json(location)))
}

/// `DELETE /locations/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  let token = if_match(&headers)?;
  state.locations.delete(id, token.as_deref()).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Membership ───────────────────────────────────────────────────────────────

/// `POST /locations/:id/subjects/:subject_id`
pub async fn move_subject_in<S>(
  State(state): State<AppState<S>>,
  Path((id, subject_id)): Path<(Uuid, Uuid)>,
  headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let token = if_match(&headers)?;
  let subject = state
    .subjects
    .move_to_location(subject_id, id, token.as_deref())
    .await?;
  Ok((etag_header(&subject.meta), Json(subject)))
}

/// `DELETE /locations/:id/subjects/:subject_id`
pub async fn move_subject_out<S>(
  State(state): State<AppState<S>>,
  Path((id, subject_id)): Path<(Uuid, Uuid)>,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  let token = if_match(&headers)?;
  state
    .subjects
    .remove_from_location(subject_id, id, token.as_deref())
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Listing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub sort:  Option<SortField>,
  pub order: Option<SortOrder>,
  pub page:  Option<usize>,
  pub size:  Option<usize>,
}

impl ListParams {
  fn into_page_request(self) -> PageRequest {
    let defaults = PageRequest::default();
    PageRequest {
      sort:  self.sort.unwrap_or(defaults.sort),
      order: self.order.unwrap_or(defaults.order),
      page:  self.page.unwrap_or(defaults.page),
      size:  self.size.unwrap_or(defaults.size),
    }
  }
}

/// `GET /locations/:id/subjects[?sort=&order=&page=&size=]`
pub async fn list_subjects<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let page = state
    .subjects
    .list_by_location(id, params.into_page_request())
    .await?;
  Ok(Json(page))
}

/// `GET /locations/favorites`
pub async fn favorite_counts<S>(
  State(state): State<AppState<S>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let counts = state.locations.favorite_counts().await?;
  Ok(Json(counts))
}

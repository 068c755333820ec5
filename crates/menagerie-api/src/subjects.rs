//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/subjects` | Requires `Idempotency-Key` |
//! | `GET`    | `/subjects/:id` | 404 if not found |
//! | `PUT`    | `/subjects/:id` | `If-Match` optional |
//! | `DELETE` | `/subjects/:id` | `If-Match` optional |
//! | `POST`   | `/subjects/:id/favorites` | Body: `{"location_ids":[…]}` |
//! | `DELETE` | `/subjects/:id/favorites` | Body: `{"location_ids":[…]}` |

use std::collections::BTreeSet;

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use menagerie_core::{
  store::Store,
  subject::{NewSubject, SubjectPatch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError, etag_header, idempotency_key, if_match};

/// `POST /subjects`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let key = idempotency_key(&headers)?;
  let subject = state.subjects.create(body, &key).await?;
  Ok((StatusCode::CREATED, etag_header(&subject.meta), Json(subject)))
}

/// `GET /subjects/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let subject = state.subjects.get(id).await?;
  Ok((etag_header(&subject.meta), Json(subject)))
}

/// `PUT /subjects/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<SubjectPatch>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let token = if_match(&headers)?;
  let subject = state.subjects.update(id, body, token.as_deref()).await?;
  Ok((etag_header(&subject.meta), Json(subject)))
}

/// `DELETE /subjects/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  let token = if_match(&headers)?;
  state.subjects.delete(id, token.as_deref()).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Favorites ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FavoritesBody {
  pub location_ids: BTreeSet<Uuid>,
}

/// `POST /subjects/:id/favorites`
pub async fn assign_favorites<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<FavoritesBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let token = if_match(&headers)?;
  let subject = state
    .subjects
    .assign_favorites(id, &body.location_ids, token.as_deref())
    .await?;
  Ok((etag_header(&subject.meta), Json(subject)))
}

/// `DELETE /subjects/:id/favorites`
pub async fn unassign_favorites<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<FavoritesBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let token = if_match(&headers)?;
  let subject = state
    .subjects
    .unassign_favorites(id, &body.location_ids, token.as_deref())
    .await?;
  Ok((etag_header(&subject.meta), Json(subject)))
}

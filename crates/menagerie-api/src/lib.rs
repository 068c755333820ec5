//! JSON REST API for the Menagerie registry.
//!
//! Exposes an axum [`Router`] backed by any
//! [`menagerie_core::store::Store`]. Versions travel as `ETag` /
//! `If-Match` headers (stringified integers, quotes optional), creates
//! require an `Idempotency-Key` header. Auth, TLS, and transport concerns
//! are the caller's responsibility.

pub mod error;
pub mod locations;
pub mod subjects;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  http::{HeaderMap, HeaderName, header},
  routing::{get, post},
};
use menagerie_cache::CacheCoordinator;
use menagerie_core::{meta::DocMeta, store::Store};
use menagerie_service::{LocationService, SubjectService};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`. Every
/// field has a default so the binary runs without a config file.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String {
  "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
  8080
}

fn default_store_path() -> PathBuf {
  PathBuf::from("menagerie.db")
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub subjects:  Arc<SubjectService<S>>,
  pub locations: Arc<LocationService<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      subjects:  self.subjects.clone(),
      locations: self.locations.clone(),
    }
  }
}

impl<S: Store> AppState<S> {
  pub fn new(store: Arc<S>, caches: Arc<CacheCoordinator>) -> Self {
    Self {
      subjects:  Arc::new(SubjectService::new(store.clone(), caches.clone())),
      locations: Arc::new(LocationService::new(store, caches)),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: Store + 'static,
{
  Router::new()
    // Subjects
    .route("/subjects", post(subjects::create::<S>))
    .route(
      "/subjects/{id}",
      get(subjects::get_one::<S>)
        .put(subjects::update::<S>)
        .delete(subjects::delete::<S>),
    )
    .route(
      "/subjects/{id}/favorites",
      post(subjects::assign_favorites::<S>)
        .delete(subjects::unassign_favorites::<S>),
    )
    // Locations
    .route("/locations", post(locations::create::<S>))
    .route("/locations/favorites", get(locations::favorite_counts::<S>))
    .route(
      "/locations/{id}",
      get(locations::get_one::<S>)
        .put(locations::update::<S>)
        .delete(locations::delete::<S>),
    )
    .route("/locations/{id}/subjects", get(locations::list_subjects::<S>))
    .route(
      "/locations/{id}/subjects/{subject_id}",
      post(locations::move_subject_in::<S>)
        .delete(locations::move_subject_out::<S>),
    )
    .with_state(state)
}

// ─── Header helpers ──────────────────────────────────────────────────────────

const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");

pub(crate) fn etag_header(meta: &DocMeta) -> [(HeaderName, String); 1] {
  [(header::ETAG, meta.etag())]
}

/// Extract the optional `If-Match` version token.
pub(crate) fn if_match(
  headers: &HeaderMap,
) -> Result<Option<String>, ApiError> {
  match headers.get(header::IF_MATCH) {
    None => Ok(None),
    Some(value) => value
      .to_str()
      .map(|s| Some(s.to_owned()))
      .map_err(|_| {
        ApiError::BadRequest("If-Match header is not valid UTF-8".to_owned())
      }),
  }
}

/// Extract the mandatory `Idempotency-Key` header.
pub(crate) fn idempotency_key(headers: &HeaderMap) -> Result<String, ApiError> {
  headers
    .get(&IDEMPOTENCY_KEY)
    .ok_or_else(|| {
      ApiError::BadRequest("Idempotency-Key header is required".to_owned())
    })?
    .to_str()
    .map(str::to_owned)
    .map_err(|_| {
      ApiError::BadRequest("Idempotency-Key header is not valid UTF-8".to_owned())
    })
}

// ─── Integration tests ────────────────────────────────────────────────────────

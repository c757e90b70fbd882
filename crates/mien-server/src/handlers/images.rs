//! Catalog handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/images` | Listing with rating counts and availability |
//! | `POST` | `/images` | Register an uploaded file; body: `filename=<name>` |
//!
//! Upload transport is outside this service; registration records the
//! storage path and mints the image's immutable code.

use axum::{
  Form, Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Serialize;

use mien_core::{model::FaceImage, store::StudyStore};

use crate::{
  AppState, auth::Authenticated, error::Error, forms::RegisterImageForm,
};

#[derive(Serialize)]
pub struct ImageEntry {
  #[serde(flatten)]
  pub image:        FaceImage,
  pub url:          String,
  pub rating_count: u64,
  /// Still below the active configuration's rating cap.
  pub available:    bool,
}

#[derive(Serialize)]
pub struct ImagesPage {
  pub images:                Vec<ImageEntry>,
  pub max_ratings_per_image: u32,
}

/// `GET /images`
pub async fn list<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
) -> Result<Json<ImagesPage>, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let config = state
    .store
    .ensure_active_config()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  let cap = config.max_ratings_per_image;

  let images = state
    .store
    .list_images()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .into_iter()
    .map(|record| ImageEntry {
      url:          state.config.media_url_for(&record.image.storage_path),
      available:    record.rating_count < cap as u64,
      rating_count: record.rating_count,
      image:        record.image,
    })
    .collect();

  Ok(Json(ImagesPage { images, max_ratings_per_image: cap }))
}

/// `POST /images`
pub async fn register<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Form(form): Form<RegisterImageForm>,
) -> Result<impl IntoResponse, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let storage_path = form.storage_path()?;

  let image = state
    .store
    .add_image(mien_core::model::NewImage { storage_path })
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(code = %image.code, "image registered");
  Ok((StatusCode::CREATED, Json(image)))
}

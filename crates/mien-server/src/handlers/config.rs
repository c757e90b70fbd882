//! Study-configuration handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/config` | The active configuration (lazily created) |
//! | `POST` | `/config` | Edit it; demotes every other row when active |

use axum::{Form, Json, extract::State};

use mien_core::{model::StudyConfig, store::StudyStore};

use crate::{AppState, auth::Authenticated, error::Error, forms::ConfigForm};

/// `GET /config`
pub async fn show<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
) -> Result<Json<StudyConfig>, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let config = state
    .store
    .ensure_active_config()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  Ok(Json(config))
}

/// `POST /config`
pub async fn update<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Form(form): Form<ConfigForm>,
) -> Result<Json<StudyConfig>, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  // Edit the currently active row when one exists; otherwise the write
  // creates the first row.
  let active = state
    .store
    .active_config()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  let input = form.validate(active.map(|c| c.config_id))?;

  let saved = state
    .store
    .save_config(input)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(
    min = saved.min_images,
    max = saved.max_images,
    cap = saved.max_ratings_per_image,
    active = saved.is_active,
    "study configuration saved"
  );
  Ok(Json(saved))
}

//! Emotional-state vocabulary handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/emotions` | Name-ordered listing with usage counts |
//! | `POST` | `/emotions` | Get-or-create; body: `name=<n>&description=<d>` |
//! | `POST` | `/emotions/{id}/delete` | Removes the emotion and its entries |

use axum::{
  Form, Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use mien_core::{model::EmotionalState, store::StudyStore};

use crate::{AppState, auth::Authenticated, error::Error, forms::EmotionForm};

#[derive(Serialize)]
pub struct EmotionEntry {
  #[serde(flatten)]
  pub emotion:     EmotionalState,
  /// How many ranking entries reference this emotion.
  pub usage_count: u64,
}

/// `GET /emotions`
pub async fn list<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<EmotionEntry>>, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let emotions = state
    .store
    .list_emotions()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  let mut entries = Vec::with_capacity(emotions.len());
  for emotion in emotions {
    let usage_count = state
      .store
      .emotion_usage(emotion.emotion_id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    entries.push(EmotionEntry { emotion, usage_count });
  }

  Ok(Json(entries))
}

/// `POST /emotions`
pub async fn create<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Form(form): Form<EmotionForm>,
) -> Result<impl IntoResponse, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let name = form.validated_name()?;

  let emotion = state
    .store
    .add_emotion(name, form.description.trim())
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  Ok((StatusCode::CREATED, Json(emotion)))
}

/// `POST /emotions/{id}/delete`
pub async fn delete<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let deleted = state
    .store
    .delete_emotion(id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  if !deleted {
    return Err(Error::NotFound(format!("emotional state {id}")));
  }
  Ok(StatusCode::NO_CONTENT)
}

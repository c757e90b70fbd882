//! The participant flow: session start, rating, completion.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/session/start` | Active config summary |
//! | `POST` | `/session/start` | Email intake; sets the session cookie |
//! | `GET`  | `/session/rate` | Next image + emotion form data |
//! | `POST` | `/session/rate` | One image's agreement values |
//! | `GET`  | `/session/complete` | Clears session state and cookie |
//!
//! Stale or missing session state never errors; the participant is sent
//! back to the start page.

use std::collections::HashMap;

use axum::{
  Form, Json,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use mien_core::{
  model::{EmotionalState, FaceImage, NewRating, StudyConfig},
  session::{self, NextStep, SessionState},
  store::StudyStore,
};

use crate::{
  AppState,
  browser::{
    expired_session_cookie, see_other, see_other_with_cookie, session_cookie,
    session_token,
  },
  error::Error,
  forms::{StartSessionForm, parse_rating_form},
};

// ─── Responses ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StartPage {
  pub min_images:            u32,
  pub max_images:            u32,
  pub max_ratings_per_image: u32,
}

#[derive(Serialize)]
pub struct ImageView {
  pub image_id: Uuid,
  pub code:     String,
  pub url:      String,
}

#[derive(Serialize)]
pub struct Progress {
  /// 1-based position of the image being shown.
  pub current: u32,
  pub total:   u32,
}

#[derive(Serialize)]
pub struct RatePage {
  pub image:    ImageView,
  pub emotions: Vec<EmotionalState>,
  pub progress: Progress,
}

// ─── GET /session/start ──────────────────────────────────────────────────────

/// Show the limits a prospective participant signs up for. Lazily
/// creates the default configuration on a fresh deployment.
pub async fn start_info<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<StartPage>, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let config = ensure_config(&state).await?;
  Ok(Json(StartPage {
    min_images:            config.min_images,
    max_images:            config.max_images,
    max_ratings_per_image: config.max_ratings_per_image,
  }))
}

// ─── POST /session/start ─────────────────────────────────────────────────────

/// Email intake. Draws the session's target length once, creates the
/// server-side session state, and hands the browser its token.
pub async fn start<S>(
  State(state): State<AppState<S>>,
  Form(form): Form<StartSessionForm>,
) -> Result<Response, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let email = form.validated_email()?;

  let participant = state
    .store
    .ensure_participant(&email)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  let config = ensure_config(&state).await?;

  let target_len = {
    // RNG state survives a poisoned lock.
    let mut rng = state.rng.lock().unwrap_or_else(|e| e.into_inner());
    session::draw_target_len(&mut *rng, config.min_images, config.max_images)
  };

  let session = SessionState::new(participant.participant_id, target_len);
  let token = session.token;
  state
    .store
    .create_session(session)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(%email, target_len, "session started");
  Ok(see_other_with_cookie("/session/rate", session_cookie(token)))
}

// ─── GET /session/rate ───────────────────────────────────────────────────────

/// Pick the next image for the session, or finish it.
pub async fn next_image<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let Some(session) = load_session(&state, &headers).await? else {
    return Ok(see_other("/session/start"));
  };
  let config = ensure_config(&state).await?;

  let eligible = state
    .store
    .eligible_image_ids(
      session.participant_id,
      &session.rated,
      config.max_ratings_per_image,
    )
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  let step = {
    let mut rng = state.rng.lock().unwrap_or_else(|e| e.into_inner());
    session::next_step(&session, &eligible, &mut *rng)
  };

  match step {
    NextStep::Complete => {
      finish_session(&state, &session).await?;
      Ok(see_other("/session/complete"))
    }
    NextStep::Present(image_id) => {
      let image = state
        .store
        .get_image(image_id)
        .await
        .map_err(|e| Error::Store(Box::new(e)))?
        .ok_or_else(|| Error::NotFound(format!("image {image_id}")))?;
      let emotions = state
        .store
        .list_emotions()
        .await
        .map_err(|e| Error::Store(Box::new(e)))?;

      let (current, total) = session.progress();
      Ok(
        Json(RatePage {
          image: image_view(&state, image),
          emotions,
          progress: Progress { current, total },
        })
        .into_response(),
      )
    }
  }
}

// ─── POST /session/rate ──────────────────────────────────────────────────────

/// Persist one image's rating and advance the session.
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let Some(session) = load_session(&state, &headers).await? else {
    return Ok(see_other("/session/start"));
  };

  let emotions = state
    .store
    .list_emotions()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  let (image_id, entries) = parse_rating_form(&fields, &emotions)?;

  // The rating and its entries land in one transaction.
  state
    .store
    .upsert_rating(NewRating {
      participant_id: session.participant_id,
      image_id,
      entries,
    })
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  state
    .store
    .append_session_rating(session.token, image_id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(%image_id, "rating recorded");

  let rated_count = session.rated.len() as u32 + 1;
  if rated_count >= session.target_len {
    finish_session(&state, &session).await?;
    return Ok(see_other("/session/complete"));
  }
  Ok(see_other("/session/rate"))
}

// ─── GET /session/complete ───────────────────────────────────────────────────

/// Clear the server-side session state and expire the browser's cookie.
/// Clearing an already-cleared session is a no-op.
pub async fn complete<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if let Some(token) = session_token(&headers) {
    state
      .store
      .clear_session(token)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
  }

  Ok(
    (
      StatusCode::OK,
      [(header::SET_COOKIE, expired_session_cookie())],
      Json(serde_json::json!({ "status": "complete" })),
    )
      .into_response(),
  )
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn ensure_config<S>(state: &AppState<S>) -> Result<StudyConfig, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  state
    .store
    .ensure_active_config()
    .await
    .map_err(|e| Error::Store(Box::new(e)))
}

/// The session named by the request's cookie, if the cookie is present
/// and still refers to live state.
async fn load_session<S>(
  state: &AppState<S>,
  headers: &HeaderMap,
) -> Result<Option<SessionState>, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let Some(token) = session_token(headers) else {
    return Ok(None);
  };
  state
    .store
    .get_session(token)
    .await
    .map_err(|e| Error::Store(Box::new(e)))
}

fn image_view<S>(state: &AppState<S>, image: FaceImage) -> ImageView
where
  S: StudyStore + Clone + Send + Sync + 'static,
{
  ImageView {
    image_id: image.image_id,
    url:      state.config.media_url_for(&image.storage_path),
    code:     image.code,
  }
}

async fn finish_session<S>(
  state: &AppState<S>,
  session: &SessionState,
) -> Result<(), Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  state
    .store
    .mark_session_complete(session.participant_id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  tracing::info!(participant = %session.participant_id, "session complete");
  Ok(())
}

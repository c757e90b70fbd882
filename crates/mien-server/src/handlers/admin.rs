//! Admin bulk actions: rating resets and CSV exports.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/images/{id}/reset-ratings` | Deletes an image's ratings |
//! | `GET`  | `/admin/export` | CSV; optional `?ids=<uuid>,<uuid>` |
//! | `GET`  | `/admin/export/advanced` | CSV with participant/image/date filters |

use axum::{
  Json,
  extract::{Path, Query, State},
  response::Response,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use mien_core::{model::ExportFilter, store::StudyStore};

use crate::{AppState, auth::Authenticated, error::Error, export};

// ─── Reset ratings ───────────────────────────────────────────────────────────

/// `POST /admin/images/{id}/reset-ratings`
pub async fn reset_ratings<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  state
    .store
    .get_image(id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or_else(|| Error::NotFound(format!("image {id}")))?;

  let reset = state
    .store
    .reset_image_ratings(id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(image = %id, reset, "ratings reset");
  Ok(Json(json!({ "reset": reset })))
}

// ─── Plain export ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExportParams {
  /// Comma-separated rating ids; absent means everything.
  pub ids: Option<String>,
}

/// `GET /admin/export[?ids=<uuid>,<uuid>,…]`
pub async fn export<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Query(params): Query<ExportParams>,
) -> Result<Response, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rating_ids = params
    .ids
    .as_deref()
    .map(parse_id_list)
    .transpose()?;

  let filter = ExportFilter { rating_ids, ..Default::default() };
  render_export(&state, &filter).await
}

// ─── Advanced export ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AdvancedExportParams {
  /// Exact participant email.
  pub participant: Option<String>,
  /// Exact image code, e.g. `IMG-3FA80C21`.
  pub image:       Option<String>,
  /// Inclusive RFC 3339 lower bound on rating creation.
  pub from:        Option<String>,
  /// Inclusive RFC 3339 upper bound on rating creation.
  pub to:          Option<String>,
}

/// `GET /admin/export/advanced`
pub async fn export_advanced<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Query(params): Query<AdvancedExportParams>,
) -> Result<Response, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let filter = ExportFilter {
    participant_email: params.participant.clone(),
    image_code:        params.image.clone(),
    created_after:     params.from.as_deref().map(parse_bound).transpose()?,
    created_before:    params.to.as_deref().map(parse_bound).transpose()?,
    ..Default::default()
  };
  render_export(&state, &filter).await
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn parse_id_list(raw: &str) -> Result<Vec<Uuid>, Error> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      Uuid::parse_str(s)
        .map_err(|_| Error::BadRequest(format!("not a rating id: {s:?}")))
    })
    .collect()
}

fn parse_bound(raw: &str) -> Result<DateTime<Utc>, Error> {
  DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| Error::BadRequest(format!("not an RFC 3339 timestamp: {raw:?}")))
}

async fn render_export<S>(
  state: &AppState<S>,
  filter: &ExportFilter,
) -> Result<Response, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rows = state
    .store
    .export_ratings(filter)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  let emotions = state
    .store
    .list_emotions()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(rows = rows.len(), "ratings exported");
  let csv = export::render_csv(&rows, &emotions, &state.config);
  Ok(export::csv_response(csv, Utc::now()))
}

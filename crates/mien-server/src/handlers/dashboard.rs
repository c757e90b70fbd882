//! Admin dashboard.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/` | Study-wide counters + most recent ratings |

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use mien_core::{model::StudyStats, store::StudyStore};

use crate::{AppState, auth::Authenticated, error::Error};

const RECENT_LIMIT: u32 = 10;

#[derive(Serialize)]
pub struct RecentRating {
  pub rating_id:         Uuid,
  pub participant_email: String,
  pub image_code:        String,
  pub created_at:        DateTime<Utc>,
}

#[derive(Serialize)]
pub struct DashboardPage {
  pub stats:  StudyStats,
  pub recent: Vec<RecentRating>,
}

/// `GET /`
pub async fn show<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
) -> Result<Json<DashboardPage>, Error>
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let stats = state
    .store
    .stats()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  let recent = state
    .store
    .recent_ratings(RECENT_LIMIT)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .into_iter()
    .map(|r| RecentRating {
      rating_id:         r.rating_id,
      participant_email: r.participant_email,
      image_code:        r.image_code,
      created_at:        r.created_at,
    })
    .collect();

  Ok(Json(DashboardPage { stats, recent }))
}

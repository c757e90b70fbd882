//! Error type for `mien-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] mien_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to rate or reset an image that was not found.
  #[error("image not found: {0}")]
  ImageNotFound(uuid::Uuid),

  #[error("participant not found: {0}")]
  ParticipantNotFound(uuid::Uuid),

  #[error("session not found: {0}")]
  SessionNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

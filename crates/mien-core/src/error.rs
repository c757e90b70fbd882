//! Error types for `mien-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("image not found: {0}")]
  ImageNotFound(Uuid),

  #[error("participant not found: {0}")]
  ParticipantNotFound(Uuid),

  #[error("emotional state not found: {0}")]
  EmotionNotFound(Uuid),

  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("not a decimal agreement value: {0:?}")]
  InvalidAgreement(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Agreement values are
//! stored in their canonical two-decimal form. The session rated-list is
//! stored as a compact JSON array. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use mien_core::{
  model::{
    Agreement, EmotionalState, FaceImage, Participant, Rating, StudyConfig,
  },
  session::SessionState,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Agreement ───────────────────────────────────────────────────────────────

pub fn encode_agreement(a: Agreement) -> String { a.to_string() }

pub fn decode_agreement(s: &str) -> Result<Agreement> {
  Ok(Agreement::parse(s)?)
}

// ─── Rated-image list ────────────────────────────────────────────────────────

pub fn encode_id_list(ids: &[Uuid]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_id_list(s: &str) -> Result<Vec<Uuid>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `study_configs` row.
pub struct RawConfig {
  pub config_id:             String,
  pub min_images:            u32,
  pub max_images:            u32,
  pub max_ratings_per_image: u32,
  pub is_active:             bool,
  pub created_at:            String,
}

impl RawConfig {
  pub fn into_config(self) -> Result<StudyConfig> {
    Ok(StudyConfig {
      config_id:             decode_uuid(&self.config_id)?,
      min_images:            self.min_images,
      max_images:            self.max_images,
      max_ratings_per_image: self.max_ratings_per_image,
      is_active:             self.is_active,
      created_at:            decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `images` row.
pub struct RawImage {
  pub image_id:     String,
  pub code:         String,
  pub storage_path: String,
  pub uploaded_at:  String,
}

impl RawImage {
  pub fn into_image(self) -> Result<FaceImage> {
    Ok(FaceImage {
      image_id:     decode_uuid(&self.image_id)?,
      code:         self.code,
      storage_path: self.storage_path,
      uploaded_at:  decode_dt(&self.uploaded_at)?,
    })
  }
}

/// Raw strings read directly from an `emotions` row.
pub struct RawEmotion {
  pub emotion_id:  String,
  pub name:        String,
  pub description: String,
  pub created_at:  String,
}

impl RawEmotion {
  pub fn into_emotion(self) -> Result<EmotionalState> {
    Ok(EmotionalState {
      emotion_id:  decode_uuid(&self.emotion_id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `participants` row.
pub struct RawParticipant {
  pub participant_id:  String,
  pub email:           String,
  pub created_at:      String,
  pub last_session_at: Option<String>,
}

impl RawParticipant {
  pub fn into_participant(self) -> Result<Participant> {
    Ok(Participant {
      participant_id:  decode_uuid(&self.participant_id)?,
      email:           self.email,
      created_at:      decode_dt(&self.created_at)?,
      last_session_at: self
        .last_session_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
    })
  }
}

/// Raw strings read directly from a `ratings` row.
pub struct RawRating {
  pub rating_id:      String,
  pub participant_id: String,
  pub image_id:       String,
  pub created_at:     String,
}

impl RawRating {
  pub fn into_rating(self) -> Result<Rating> {
    Ok(Rating {
      rating_id:      decode_uuid(&self.rating_id)?,
      participant_id: decode_uuid(&self.participant_id)?,
      image_id:       decode_uuid(&self.image_id)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `sessions` row.
pub struct RawSession {
  pub token:          String,
  pub participant_id: String,
  pub target_len:     u32,
  pub rated:          String,
  pub started_at:     String,
}

impl RawSession {
  pub fn into_session(self) -> Result<SessionState> {
    Ok(SessionState {
      token:          decode_uuid(&self.token)?,
      participant_id: decode_uuid(&self.participant_id)?,
      target_len:     self.target_len,
      rated:          decode_id_list(&self.rated)?,
      started_at:     decode_dt(&self.started_at)?,
    })
  }
}

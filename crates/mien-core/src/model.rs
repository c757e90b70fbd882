//! Study domain types — configuration, catalog, participants, and ratings.
//!
//! Every persisted type carries a server-assigned UUID and creation
//! timestamp. The `New*` structs are the caller-supplied inputs; ids and
//! timestamps are never accepted from outside the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Limits governing session length and per-image rating capacity.
/// At most one row is active at any time; the store demotes all other
/// rows whenever an active row is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
  pub config_id:             Uuid,
  /// Lower bound (inclusive) for the per-session target length.
  pub min_images:            u32,
  /// Upper bound (inclusive) for the per-session target length.
  pub max_images:            u32,
  /// An image with this many ratings stops being offered to participants.
  pub max_ratings_per_image: u32,
  pub is_active:             bool,
  pub created_at:            DateTime<Utc>,
}

impl StudyConfig {
  pub const DEFAULT_MIN_IMAGES: u32 = 5;
  pub const DEFAULT_MAX_IMAGES: u32 = 10;
  pub const DEFAULT_MAX_RATINGS: u32 = 5;
}

/// Input to [`crate::store::StudyStore::save_config`]. With a `config_id`
/// the write updates that row; without one it inserts a new row.
#[derive(Debug, Clone)]
pub struct ConfigInput {
  pub config_id:             Option<Uuid>,
  pub min_images:            u32,
  pub max_images:            u32,
  pub max_ratings_per_image: u32,
  pub is_active:             bool,
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// A face photograph under study. The binary lives outside the store;
/// only its storage path is recorded. `code` is generated once at
/// registration and never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceImage {
  pub image_id:     Uuid,
  /// Stable public identifier, e.g. `IMG-3FA80C21`.
  pub code:         String,
  /// Path below the media root, e.g. `faces/9f2c….jpg`.
  pub storage_path: String,
  pub uploaded_at:  DateTime<Utc>,
}

/// Input to [`crate::store::StudyStore::add_image`].
#[derive(Debug, Clone)]
pub struct NewImage {
  pub storage_path: String,
}

/// Derive the immutable public code for a freshly-registered image.
pub fn image_code(image_id: Uuid) -> String {
  let hex = image_id.simple().to_string();
  format!("IMG-{}", hex[..8].to_uppercase())
}

/// A catalog row joined with its live rating count — what the admin
/// listing shows to judge remaining capacity.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
  #[serde(flatten)]
  pub image:        FaceImage,
  pub rating_count: u64,
}

/// An emotion participants score, e.g. "joy" or "contempt".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalState {
  pub emotion_id:  Uuid,
  pub name:        String,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}

// ─── Participants ────────────────────────────────────────────────────────────

/// One row per unique email. `last_session_at` is stamped each time a
/// session of theirs completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
  pub participant_id:  Uuid,
  pub email:           String,
  pub created_at:      DateTime<Utc>,
  pub last_session_at: Option<DateTime<Utc>>,
}

// ─── Agreement ───────────────────────────────────────────────────────────────

/// A participant's agreement that an image expresses an emotion, on a
/// closed [0.00, 1.00] scale with two-decimal resolution.
///
/// Construction clamps and rounds, so an out-of-range or over-precise
/// value can never be stored: `1.50` becomes `1.00`, `-0.3` becomes
/// `0.00`, `0.333` becomes `0.33`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Agreement(f64);

impl Agreement {
  pub fn new(value: f64) -> Self {
    let clamped = value.clamp(0.0, 1.0);
    Self((clamped * 100.0).round() / 100.0)
  }

  /// Parse decimal text from a submitted form field.
  ///
  /// Non-numeric text is an error — the participant typed something and
  /// dropping it would lose their input.
  pub fn parse(text: &str) -> Result<Self> {
    let value: f64 = text
      .trim()
      .parse()
      .map_err(|_| Error::InvalidAgreement(text.to_string()))?;
    if !value.is_finite() {
      return Err(Error::InvalidAgreement(text.to_string()));
    }
    Ok(Self::new(value))
  }

  pub fn value(&self) -> f64 { self.0 }
}

impl std::fmt::Display for Agreement {
  /// Canonical two-decimal form, e.g. `0.33` — the form stored in the
  /// database and written to CSV exports.
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:.2}", self.0)
  }
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

/// One participant's complete assessment of one image. Unique per
/// (participant, image); re-submission replaces the ranking entries but
/// keeps the row and its `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
  pub rating_id:      Uuid,
  pub participant_id: Uuid,
  pub image_id:       Uuid,
  pub created_at:     DateTime<Utc>,
}

/// A single emotion's agreement within a rating. Unique per
/// (rating, emotion).
#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
  pub emotion_id: Uuid,
  pub agreement:  Agreement,
}

/// Input to [`crate::store::StudyStore::upsert_rating`] — the whole form
/// submission for one image, persisted as a unit.
#[derive(Debug, Clone)]
pub struct NewRating {
  pub participant_id: Uuid,
  pub image_id:       Uuid,
  pub entries:        Vec<RankingEntry>,
}

// ─── Reporting views ─────────────────────────────────────────────────────────

/// A rating denormalised for export: identity columns resolved to their
/// human-readable forms, entries resolved to emotion names.
#[derive(Debug, Clone)]
pub struct ExportRating {
  pub rating_id:         Uuid,
  pub participant_email: String,
  pub image_code:        String,
  pub image_path:        String,
  pub created_at:        DateTime<Utc>,
  /// (emotion name, agreement) pairs — only the emotions this rating
  /// actually recorded.
  pub entries:           Vec<(String, Agreement)>,
}

/// Filter for [`crate::store::StudyStore::export_ratings`]. Every field
/// is optional; an empty filter selects everything.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
  pub rating_ids:        Option<Vec<Uuid>>,
  pub image_ids:         Option<Vec<Uuid>>,
  pub participant_email: Option<String>,
  pub image_code:        Option<String>,
  pub created_after:     Option<DateTime<Utc>>,
  pub created_before:    Option<DateTime<Utc>>,
}

/// Dashboard counters.
#[derive(Debug, Clone, Serialize)]
pub struct StudyStats {
  pub total_images:       u64,
  pub total_participants: u64,
  pub total_ratings:      u64,
  pub emotional_states:   u64,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn agreement_clamps_above_one() {
    assert_eq!(Agreement::parse("1.50").unwrap(), Agreement::new(1.0));
    assert_eq!(Agreement::parse("1.50").unwrap().to_string(), "1.00");
  }

  #[test]
  fn agreement_clamps_below_zero() {
    assert_eq!(Agreement::parse("-0.3").unwrap(), Agreement::new(0.0));
    assert_eq!(Agreement::parse("-0.3").unwrap().to_string(), "0.00");
  }

  #[test]
  fn agreement_rounds_to_two_decimals() {
    assert_eq!(Agreement::parse("0.333").unwrap().to_string(), "0.33");
    assert_eq!(Agreement::parse("0.335").unwrap().to_string(), "0.34");
  }

  #[test]
  fn agreement_in_range_passes_through() {
    assert_eq!(Agreement::parse("0.5").unwrap().value(), 0.5);
    assert_eq!(Agreement::parse(" 0.75 ").unwrap().value(), 0.75);
  }

  #[test]
  fn agreement_rejects_malformed_text() {
    assert!(matches!(
      Agreement::parse("abc"),
      Err(Error::InvalidAgreement(_))
    ));
    assert!(matches!(Agreement::parse(""), Err(Error::InvalidAgreement(_))));
    assert!(matches!(
      Agreement::parse("NaN"),
      Err(Error::InvalidAgreement(_))
    ));
  }

  #[test]
  fn image_code_is_prefixed_upper_hex() {
    let id = Uuid::parse_str("3fa80c21-0000-4000-8000-000000000000").unwrap();
    assert_eq!(image_code(id), "IMG-3FA80C21");
  }
}

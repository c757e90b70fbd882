//! CSV export of ratings.
//!
//! One row per rating, one column per emotion known at export time —
//! deterministic pairing, not sparse serialization: a rating that never
//! recorded an emotion still gets that emotion's (empty) cell. Quoting
//! per RFC 4180.

use axum::{
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use mien_core::model::{EmotionalState, ExportRating};

use crate::ServerConfig;

// ─── Field quoting ────────────────────────────────────────────────────────────

/// Quote a field when it contains a separator, quote, or line break;
/// embedded quotes are doubled.
fn csv_field(s: &str) -> String {
  if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r')
  {
    format!("\"{}\"", s.replace('"', "\"\""))
  } else {
    s.to_string()
  }
}

fn write_row(out: &mut String, fields: &[String]) {
  let mut first = true;
  for field in fields {
    if !first {
      out.push(',');
    }
    out.push_str(&csv_field(field));
    first = false;
  }
  out.push_str("\r\n");
}

// ─── Column derivation ────────────────────────────────────────────────────────

/// Header name for an emotion column: lower-cased, spaces as underscores.
pub fn emotion_column(name: &str) -> String {
  format!("emotion_{}", name.to_lowercase().replace(' ', "_"))
}

/// The filename component of a storage path.
fn path_filename(path: &str) -> &str {
  path.rsplit('/').next().unwrap_or(path)
}

// ─── Document assembly ────────────────────────────────────────────────────────

/// Render the full CSV document. `emotions` must be the complete known
/// set at export time; its (name-sorted) order fixes the column order.
pub fn render_csv(
  rows: &[ExportRating],
  emotions: &[EmotionalState],
  config: &ServerConfig,
) -> String {
  let mut out = String::new();

  let mut header: Vec<String> = vec![
    "rating_id".to_string(),
    "participant_email".to_string(),
    "image_code".to_string(),
    "image_filename".to_string(),
    "rating_created_at".to_string(),
  ];
  header.extend(emotions.iter().map(|e| emotion_column(&e.name)));
  header.push("image_url".to_string());
  write_row(&mut out, &header);

  for rating in rows {
    let mut row: Vec<String> = vec![
      rating.rating_id.to_string(),
      rating.participant_email.clone(),
      rating.image_code.clone(),
      path_filename(&rating.image_path).to_string(),
      rating.created_at.to_rfc3339(),
    ];
    for emotion in emotions {
      let cell = rating
        .entries
        .iter()
        .find(|(name, _)| *name == emotion.name)
        .map(|(_, agreement)| agreement.to_string())
        .unwrap_or_default();
      row.push(cell);
    }
    row.push(config.media_url_for(&rating.image_path));
    write_row(&mut out, &row);
  }

  out
}

/// Wrap a rendered document as a timestamped attachment download.
pub fn csv_response(csv: String, generated_at: DateTime<Utc>) -> Response {
  let filename =
    format!("ratings_export_{}.csv", generated_at.format("%Y%m%d_%H%M%S"));
  (
    StatusCode::OK,
    [
      (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
      (
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{filename}\""),
      ),
    ],
    csv,
  )
    .into_response()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use mien_core::model::Agreement;
  use uuid::Uuid;

  fn emotion(name: &str) -> EmotionalState {
    EmotionalState {
      emotion_id:  Uuid::new_v4(),
      name:        name.to_string(),
      description: String::new(),
      created_at:  Utc::now(),
    }
  }

  fn server_config() -> ServerConfig {
    ServerConfig {
      host:               "127.0.0.1".to_string(),
      port:               8600,
      base_url:           "http://localhost:8600".to_string(),
      media_url:          "/media/".to_string(),
      store_path:         std::path::PathBuf::from(":memory:"),
      auth_username:      "admin".to_string(),
      auth_password_hash: String::new(),
      rng_seed:           None,
    }
  }

  fn export_rating(
    email: &str,
    entries: Vec<(String, Agreement)>,
  ) -> ExportRating {
    ExportRating {
      rating_id: Uuid::new_v4(),
      participant_email: email.to_string(),
      image_code: "IMG-AAAA1111".to_string(),
      image_path: "faces/abc123.jpg".to_string(),
      created_at: Utc::now(),
      entries,
    }
  }

  #[test]
  fn quoting_follows_rfc_4180() {
    assert_eq!(csv_field("plain"), "plain");
    assert_eq!(csv_field("a,b"), "\"a,b\"");
    assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
  }

  #[test]
  fn emotion_columns_are_lowercased_with_underscores() {
    assert_eq!(emotion_column("Joy"), "emotion_joy");
    assert_eq!(emotion_column("Mild Surprise"), "emotion_mild_surprise");
  }

  #[test]
  fn every_known_emotion_gets_a_column_regardless_of_entries() {
    let emotions = vec![emotion("anger"), emotion("fear"), emotion("joy")];
    let rows = vec![
      export_rating("a@x.com", vec![("joy".to_string(), Agreement::new(0.9))]),
      export_rating("b@x.com", vec![]),
    ];

    let csv = render_csv(&rows, &emotions, &server_config());
    let mut lines = csv.lines();

    let header = lines.next().unwrap();
    assert_eq!(
      header,
      "rating_id,participant_email,image_code,image_filename,\
       rating_created_at,emotion_anger,emotion_fear,emotion_joy,image_url"
    );

    // 2 data rows, each with exactly 9 fields (none of them need quoting).
    let data: Vec<&str> = lines.collect();
    assert_eq!(data.len(), 2);
    for line in &data {
      assert_eq!(line.split(',').count(), 9, "{line}");
    }

    // The recorded emotion lands in its column; the others stay empty.
    let first: Vec<&str> = data[0].split(',').collect();
    assert_eq!(first[5], "");
    assert_eq!(first[6], "");
    assert_eq!(first[7], "0.90");
  }

  #[test]
  fn rows_carry_filename_and_media_url() {
    let rows = vec![export_rating("a@x.com", vec![])];
    let csv = render_csv(&rows, &[], &server_config());
    let data_line = csv.lines().nth(1).unwrap();
    assert!(data_line.contains("abc123.jpg"));
    assert!(
      data_line.ends_with("http://localhost:8600/media/faces/abc123.jpg")
    );
  }

  #[test]
  fn attachment_filename_is_timestamped() {
    let generated_at = DateTime::parse_from_rfc3339("2026-02-03T04:05:06Z")
      .unwrap()
      .with_timezone(&Utc);
    let response = csv_response(String::new(), generated_at);
    let disposition = response
      .headers()
      .get(header::CONTENT_DISPOSITION)
      .unwrap()
      .to_str()
      .unwrap();
    assert_eq!(
      disposition,
      "attachment; filename=\"ratings_export_20260203_040506.csv\""
    );
  }
}

//! Form payloads and validation.
//!
//! Validation failures collect per-field messages into
//! [`Error::Validation`] so the rendering layer can re-show the form with
//! errors next to each input. Out-of-range agreement values are clamped
//! (a slider nudged past its end is not an error); text that does not
//! parse as a decimal at all is — dropping it would silently lose the
//! participant's input.

use std::collections::{BTreeMap, HashMap};

use mien_core::model::{Agreement, ConfigInput, EmotionalState, RankingEntry};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Error;

// ─── Session start ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartSessionForm {
  pub email: String,
}

impl StartSessionForm {
  /// Validated, trimmed, lower-cased email.
  pub fn validated_email(&self) -> Result<String, Error> {
    let email = self.email.trim().to_lowercase();
    if !is_plausible_email(&email) {
      return Err(Error::field("email", "enter a valid email address"));
    }
    Ok(email)
  }
}

/// Minimal structural check: `local@domain.tld`, no whitespace.
fn is_plausible_email(s: &str) -> bool {
  if s.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = s.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.is_empty()
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
}

// ─── Study configuration ─────────────────────────────────────────────────────

pub const IMAGES_PER_SESSION_MAX: u32 = 50;
pub const RATINGS_PER_IMAGE_MAX: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ConfigForm {
  pub min_images:            u32,
  pub max_images:            u32,
  pub max_ratings_per_image: u32,
  /// Checkbox field: present means active.
  #[serde(default)]
  pub is_active:             Option<String>,
}

impl ConfigForm {
  pub fn validate(&self, config_id: Option<Uuid>) -> Result<ConfigInput, Error> {
    let mut fields = BTreeMap::new();

    if !(1..=IMAGES_PER_SESSION_MAX).contains(&self.min_images) {
      fields.insert(
        "min_images".to_string(),
        format!("must be between 1 and {IMAGES_PER_SESSION_MAX}"),
      );
    }
    if !(1..=IMAGES_PER_SESSION_MAX).contains(&self.max_images) {
      fields.insert(
        "max_images".to_string(),
        format!("must be between 1 and {IMAGES_PER_SESSION_MAX}"),
      );
    }
    if !(1..=RATINGS_PER_IMAGE_MAX).contains(&self.max_ratings_per_image) {
      fields.insert(
        "max_ratings_per_image".to_string(),
        format!("must be between 1 and {RATINGS_PER_IMAGE_MAX}"),
      );
    }
    if fields.is_empty() && self.min_images > self.max_images {
      fields.insert(
        "min_images".to_string(),
        "minimum images per session cannot exceed the maximum".to_string(),
      );
    }

    if !fields.is_empty() {
      return Err(Error::Validation { fields });
    }

    Ok(ConfigInput {
      config_id,
      min_images:            self.min_images,
      max_images:            self.max_images,
      max_ratings_per_image: self.max_ratings_per_image,
      is_active:             self.is_active.is_some(),
    })
  }
}

// ─── Image registration ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterImageForm {
  pub filename: String,
}

impl RegisterImageForm {
  /// Storage path below the media root: a fresh opaque name keeping only
  /// the original extension.
  pub fn storage_path(&self) -> Result<String, Error> {
    let filename = self.filename.trim();
    if filename.is_empty() {
      return Err(Error::field("filename", "a filename is required"));
    }
    let ext = filename
      .rsplit_once('.')
      .map(|(_, ext)| ext.to_lowercase())
      .filter(|ext| !ext.is_empty() && ext.len() <= 8)
      .unwrap_or_else(|| "bin".to_string());
    let name = &Uuid::new_v4().simple().to_string()[..16];
    Ok(format!("faces/{name}.{ext}"))
  }
}

// ─── Emotional states ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EmotionForm {
  pub name:        String,
  #[serde(default)]
  pub description: String,
}

impl EmotionForm {
  pub fn validated_name(&self) -> Result<&str, Error> {
    let name = self.name.trim();
    if name.is_empty() {
      return Err(Error::field("name", "a name is required"));
    }
    Ok(name)
  }
}

// ─── Rating submission ───────────────────────────────────────────────────────

/// Parse one rating form: the `image_id` field plus one
/// `emotion_<uuid>` decimal per currently-known emotion.
///
/// Every known emotion must carry a value. Field errors are collected
/// across the whole form so the participant sees them all at once.
pub fn parse_rating_form(
  fields: &HashMap<String, String>,
  emotions: &[EmotionalState],
) -> Result<(Uuid, Vec<RankingEntry>), Error> {
  let image_id = fields
    .get("image_id")
    .and_then(|v| Uuid::parse_str(v.trim()).ok())
    .ok_or_else(|| Error::BadRequest("missing or invalid image_id".into()))?;

  let mut entries = Vec::with_capacity(emotions.len());
  let mut errors = BTreeMap::new();

  for emotion in emotions {
    let key = format!("emotion_{}", emotion.emotion_id);
    match fields.get(&key) {
      None => {
        errors.insert(key, format!("a value for {} is required", emotion.name));
      }
      Some(raw) => match Agreement::parse(raw) {
        Ok(agreement) => entries.push(RankingEntry {
          emotion_id: emotion.emotion_id,
          agreement,
        }),
        Err(_) => {
          errors.insert(
            key,
            format!("{:?} is not a decimal between 0 and 1", raw),
          );
        }
      },
    }
  }

  if !errors.is_empty() {
    return Err(Error::Validation { fields: errors });
  }
  Ok((image_id, entries))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn emotion(name: &str) -> EmotionalState {
    EmotionalState {
      emotion_id:  Uuid::new_v4(),
      name:        name.to_string(),
      description: String::new(),
      created_at:  Utc::now(),
    }
  }

  #[test]
  fn email_validation_accepts_and_rejects() {
    for good in ["a@x.com", "first.last@lab.example.org"] {
      let form = StartSessionForm { email: good.to_string() };
      assert!(form.validated_email().is_ok(), "{good}");
    }
    for bad in ["", "plain", "@x.com", "a@", "a@nodot", "a b@x.com", "a@.com"] {
      let form = StartSessionForm { email: bad.to_string() };
      assert!(form.validated_email().is_err(), "{bad}");
    }
  }

  #[test]
  fn email_is_normalised() {
    let form = StartSessionForm { email: "  A@X.Com ".to_string() };
    assert_eq!(form.validated_email().unwrap(), "a@x.com");
  }

  #[test]
  fn config_form_rejects_inverted_range_with_a_field_error() {
    let form = ConfigForm {
      min_images: 9,
      max_images: 4,
      max_ratings_per_image: 5,
      is_active: Some("on".to_string()),
    };
    let err = form.validate(None).unwrap_err();
    match err {
      Error::Validation { fields } => {
        assert!(fields.contains_key("min_images"));
      }
      other => panic!("expected validation error, got {other:?}"),
    }
  }

  #[test]
  fn config_form_rejects_out_of_bounds_values() {
    let form = ConfigForm {
      min_images: 0,
      max_images: 51,
      max_ratings_per_image: 101,
      is_active: None,
    };
    let Error::Validation { fields } = form.validate(None).unwrap_err() else {
      panic!("expected validation error");
    };
    assert_eq!(fields.len(), 3);
  }

  #[test]
  fn config_form_checkbox_presence_means_active() {
    let form = ConfigForm {
      min_images: 2,
      max_images: 4,
      max_ratings_per_image: 5,
      is_active: Some("on".to_string()),
    };
    assert!(form.validate(None).unwrap().is_active);

    let form = ConfigForm { is_active: None, ..form };
    assert!(!form.validate(None).unwrap().is_active);
  }

  #[test]
  fn storage_path_keeps_the_extension_only() {
    let form = RegisterImageForm { filename: "Portrait Two.JPG".to_string() };
    let path = form.storage_path().unwrap();
    assert!(path.starts_with("faces/"), "{path}");
    assert!(path.ends_with(".jpg"), "{path}");
    assert!(!path.contains("Portrait"));
  }

  #[test]
  fn rating_form_parses_and_clamps() {
    let joy = emotion("joy");
    let fear = emotion("fear");
    let image_id = Uuid::new_v4();

    let mut fields = HashMap::new();
    fields.insert("image_id".to_string(), image_id.to_string());
    fields.insert(format!("emotion_{}", joy.emotion_id), "1.50".to_string());
    fields.insert(format!("emotion_{}", fear.emotion_id), "0.333".to_string());

    let (parsed_image, entries) =
      parse_rating_form(&fields, &[joy, fear]).unwrap();
    assert_eq!(parsed_image, image_id);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].agreement, Agreement::new(1.0));
    assert_eq!(entries[1].agreement, Agreement::new(0.33));
  }

  #[test]
  fn rating_form_surfaces_malformed_values() {
    let joy = emotion("joy");
    let mut fields = HashMap::new();
    fields.insert("image_id".to_string(), Uuid::new_v4().to_string());
    fields.insert(format!("emotion_{}", joy.emotion_id), "lots".to_string());

    let Error::Validation { fields: errors } =
      parse_rating_form(&fields, &[joy]).unwrap_err()
    else {
      panic!("expected validation error");
    };
    assert_eq!(errors.len(), 1);
  }

  #[test]
  fn rating_form_requires_every_known_emotion() {
    let joy = emotion("joy");
    let fear = emotion("fear");
    let mut fields = HashMap::new();
    fields.insert("image_id".to_string(), Uuid::new_v4().to_string());
    fields.insert(format!("emotion_{}", joy.emotion_id), "0.5".to_string());

    assert!(parse_rating_form(&fields, &[joy, fear]).is_err());
  }

  #[test]
  fn rating_form_rejects_a_missing_image_id() {
    let fields = HashMap::new();
    assert!(matches!(
      parse_rating_form(&fields, &[]),
      Err(Error::BadRequest(_))
    ));
  }
}

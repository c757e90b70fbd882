//! [`SqliteStore`] — the SQLite implementation of [`StudyStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use mien_core::{
  model::{
    ConfigInput, EmotionalState, ExportFilter, ExportRating, FaceImage,
    ImageRecord, NewImage, NewRating, Participant, Rating, StudyConfig,
    StudyStats, image_code,
  },
  session::SessionState,
  store::StudyStore,
};

use crate::{
  Error, Result,
  encode::{
    RawConfig, RawEmotion, RawImage, RawParticipant, RawSession,
    decode_agreement, decode_uuid, encode_agreement, encode_dt,
    encode_id_list, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mien study store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Denormalised export rows plus their entries, with the SQL-side part
  /// of `filter` applied. Each row is paired with its image id so the
  /// caller can apply id-set restrictions.
  async fn export_rows(
    &self,
    filter: &ExportFilter,
  ) -> Result<Vec<(Uuid, ExportRating)>> {
    let email_param = filter.participant_email.clone();
    let code_param  = filter.image_code.clone();
    let after_param  = filter.created_after.map(encode_dt);
    let before_param = filter.created_before.map(encode_dt);

    type RawRow = (String, String, String, String, String, String);

    let (raw_rows, raw_entries): (Vec<RawRow>, Vec<(String, String, String)>) =
      self
        .conn
        .call(move |conn| {
          // Build WHERE clause dynamically.
          let mut conds: Vec<&'static str> = vec![];
          if email_param.is_some() {
            conds.push("p.email = ?1");
          }
          if code_param.is_some() {
            conds.push("i.code = ?2");
          }
          if after_param.is_some() {
            conds.push("r.created_at >= ?3");
          }
          if before_param.is_some() {
            conds.push("r.created_at <= ?4");
          }

          let where_clause = if conds.is_empty() {
            String::new()
          } else {
            format!("WHERE {}", conds.join(" AND "))
          };

          let sql = format!(
            "SELECT r.rating_id, r.image_id, p.email, i.code,
                    i.storage_path, r.created_at
             FROM ratings r
             JOIN participants p ON p.participant_id = r.participant_id
             JOIN images i       ON i.image_id       = r.image_id
             {where_clause}
             ORDER BY r.created_at"
          );

          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(
              rusqlite::params![
                email_param.as_deref(),
                code_param.as_deref(),
                after_param.as_deref(),
                before_param.as_deref(),
              ],
              |row| {
                Ok((
                  row.get(0)?,
                  row.get(1)?,
                  row.get(2)?,
                  row.get(3)?,
                  row.get(4)?,
                  row.get(5)?,
                ))
              },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

          let mut stmt = conn.prepare(
            "SELECT e.rating_id, em.name, e.agreement
             FROM ranking_entries e
             JOIN emotions em ON em.emotion_id = e.emotion_id",
          )?;
          let entries = stmt
            .query_map([], |row| {
              Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

          Ok((rows, entries))
        })
        .await?;

    let mut entries_by_rating: HashMap<String, Vec<(String, String)>> =
      HashMap::new();
    for (rating_id, name, agreement) in raw_entries {
      entries_by_rating
        .entry(rating_id)
        .or_default()
        .push((name, agreement));
    }

    let mut out = Vec::with_capacity(raw_rows.len());
    for (rating_id_str, image_id_str, email, code, storage_path, created_at) in
      raw_rows
    {
      let mut entries = Vec::new();
      for (name, agreement_str) in
        entries_by_rating.remove(&rating_id_str).unwrap_or_default()
      {
        entries.push((name, decode_agreement(&agreement_str)?));
      }
      entries.sort_by(|a, b| a.0.cmp(&b.0));

      out.push((
        decode_uuid(&image_id_str)?,
        ExportRating {
          rating_id:         decode_uuid(&rating_id_str)?,
          participant_email: email,
          image_code:        code,
          image_path:        storage_path,
          created_at:        crate::encode::decode_dt(&created_at)?,
          entries,
        },
      ));
    }

    Ok(out)
  }
}

// ─── StudyStore impl ─────────────────────────────────────────────────────────

impl StudyStore for SqliteStore {
  type Error = Error;

  // ── Configuration ─────────────────────────────────────────────────────────

  async fn active_config(&self) -> Result<Option<StudyConfig>> {
    let raw: Option<RawConfig> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT config_id, min_images, max_images,
                      max_ratings_per_image, is_active, created_at
               FROM study_configs
               WHERE is_active = 1
               ORDER BY created_at DESC
               LIMIT 1",
              [],
              |row| {
                Ok(RawConfig {
                  config_id:             row.get(0)?,
                  min_images:            row.get(1)?,
                  max_images:            row.get(2)?,
                  max_ratings_per_image: row.get(3)?,
                  is_active:             row.get(4)?,
                  created_at:            row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawConfig::into_config).transpose()
  }

  async fn ensure_active_config(&self) -> Result<StudyConfig> {
    if let Some(config) = self.active_config().await? {
      return Ok(config);
    }

    let config = StudyConfig {
      config_id:             Uuid::new_v4(),
      min_images:            StudyConfig::DEFAULT_MIN_IMAGES,
      max_images:            StudyConfig::DEFAULT_MAX_IMAGES,
      max_ratings_per_image: StudyConfig::DEFAULT_MAX_RATINGS,
      is_active:             true,
      created_at:            Utc::now(),
    };

    let id_str = encode_uuid(config.config_id);
    let at_str = encode_dt(config.created_at);
    let (min, max, cap) = (
      config.min_images,
      config.max_images,
      config.max_ratings_per_image,
    );

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO study_configs
             (config_id, min_images, max_images, max_ratings_per_image,
              is_active, created_at)
           VALUES (?1, ?2, ?3, ?4, 1, ?5)",
          rusqlite::params![id_str, min, max, cap, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(config)
  }

  async fn save_config(&self, input: ConfigInput) -> Result<StudyConfig> {
    // Self-correct an inverted range rather than persisting it.
    let (min, max) = if input.min_images <= input.max_images {
      (input.min_images, input.max_images)
    } else {
      (input.max_images, input.min_images)
    };
    let cap = input.max_ratings_per_image;
    let is_active = input.is_active;

    let config_id = input.config_id.unwrap_or_else(Uuid::new_v4);
    let id_str = encode_uuid(config_id);
    let now_str = encode_dt(Utc::now());

    let raw: RawConfig = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if is_active {
          tx.execute(
            "UPDATE study_configs SET is_active = 0 WHERE config_id != ?1",
            rusqlite::params![id_str],
          )?;
        }

        tx.execute(
          "INSERT INTO study_configs
             (config_id, min_images, max_images, max_ratings_per_image,
              is_active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(config_id) DO UPDATE SET
             min_images            = excluded.min_images,
             max_images            = excluded.max_images,
             max_ratings_per_image = excluded.max_ratings_per_image,
             is_active             = excluded.is_active",
          rusqlite::params![id_str, min, max, cap, is_active, now_str],
        )?;

        let raw = tx.query_row(
          "SELECT config_id, min_images, max_images, max_ratings_per_image,
                  is_active, created_at
           FROM study_configs WHERE config_id = ?1",
          rusqlite::params![id_str],
          |row| {
            Ok(RawConfig {
              config_id:             row.get(0)?,
              min_images:            row.get(1)?,
              max_images:            row.get(2)?,
              max_ratings_per_image: row.get(3)?,
              is_active:             row.get(4)?,
              created_at:            row.get(5)?,
            })
          },
        )?;

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_config()
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn add_image(&self, input: NewImage) -> Result<FaceImage> {
    let image_id = Uuid::new_v4();
    let image = FaceImage {
      image_id,
      code: image_code(image_id),
      storage_path: input.storage_path,
      uploaded_at: Utc::now(),
    };

    let id_str   = encode_uuid(image.image_id);
    let code     = image.code.clone();
    let path     = image.storage_path.clone();
    let at_str   = encode_dt(image.uploaded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO images (image_id, code, storage_path, uploaded_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, code, path, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(image)
  }

  async fn get_image(&self, id: Uuid) -> Result<Option<FaceImage>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawImage> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT image_id, code, storage_path, uploaded_at
               FROM images WHERE image_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawImage {
                  image_id:     row.get(0)?,
                  code:         row.get(1)?,
                  storage_path: row.get(2)?,
                  uploaded_at:  row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawImage::into_image).transpose()
  }

  async fn list_images(&self) -> Result<Vec<ImageRecord>> {
    let raws: Vec<(RawImage, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT i.image_id, i.code, i.storage_path, i.uploaded_at,
                  (SELECT COUNT(*) FROM ratings r
                   WHERE r.image_id = i.image_id) AS rating_count
           FROM images i
           ORDER BY i.uploaded_at DESC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((
              RawImage {
                image_id:     row.get(0)?,
                code:         row.get(1)?,
                storage_path: row.get(2)?,
                uploaded_at:  row.get(3)?,
              },
              row.get(4)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, count)| {
        Ok(ImageRecord { image: raw.into_image()?, rating_count: count as u64 })
      })
      .collect()
  }

  // ── Emotional states ──────────────────────────────────────────────────────

  async fn add_emotion(
    &self,
    name: &str,
    description: &str,
  ) -> Result<EmotionalState> {
    let id_str   = encode_uuid(Uuid::new_v4());
    let name_own = name.to_owned();
    let desc_own = description.to_owned();
    let at_str   = encode_dt(Utc::now());

    let raw: RawEmotion = self
      .conn
      .call(move |conn| {
        // Get-or-create: the UNIQUE(name) constraint makes the insert a
        // no-op when the emotion already exists.
        conn.execute(
          "INSERT OR IGNORE INTO emotions
             (emotion_id, name, description, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name_own, desc_own, at_str],
        )?;

        let raw = conn.query_row(
          "SELECT emotion_id, name, description, created_at
           FROM emotions WHERE name = ?1",
          rusqlite::params![name_own],
          |row| {
            Ok(RawEmotion {
              emotion_id:  row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
              created_at:  row.get(3)?,
            })
          },
        )?;
        Ok(raw)
      })
      .await?;

    raw.into_emotion()
  }

  async fn list_emotions(&self) -> Result<Vec<EmotionalState>> {
    let raws: Vec<RawEmotion> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT emotion_id, name, description, created_at
           FROM emotions ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawEmotion {
              emotion_id:  row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
              created_at:  row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEmotion::into_emotion).collect()
  }

  async fn delete_emotion(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM emotions WHERE emotion_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn emotion_usage(&self, id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(id);
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM ranking_entries WHERE emotion_id = ?1",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }

  // ── Participants ──────────────────────────────────────────────────────────

  async fn ensure_participant(&self, email: &str) -> Result<Participant> {
    let id_str    = encode_uuid(Uuid::new_v4());
    let email_own = email.to_owned();
    let at_str    = encode_dt(Utc::now());

    let raw: RawParticipant = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO participants
             (participant_id, email, created_at, last_session_at)
           VALUES (?1, ?2, ?3, NULL)",
          rusqlite::params![id_str, email_own, at_str],
        )?;

        let raw = conn.query_row(
          "SELECT participant_id, email, created_at, last_session_at
           FROM participants WHERE email = ?1",
          rusqlite::params![email_own],
          |row| {
            Ok(RawParticipant {
              participant_id:  row.get(0)?,
              email:           row.get(1)?,
              created_at:      row.get(2)?,
              last_session_at: row.get(3)?,
            })
          },
        )?;
        Ok(raw)
      })
      .await?;

    raw.into_participant()
  }

  async fn get_participant(&self, id: Uuid) -> Result<Option<Participant>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawParticipant> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT participant_id, email, created_at, last_session_at
               FROM participants WHERE participant_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawParticipant {
                  participant_id:  row.get(0)?,
                  email:           row.get(1)?,
                  created_at:      row.get(2)?,
                  last_session_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawParticipant::into_participant).transpose()
  }

  async fn mark_session_complete(&self, participant_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(participant_id);
    let at_str = encode_dt(Utc::now());

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE participants SET last_session_at = ?1
           WHERE participant_id = ?2",
          rusqlite::params![at_str, id_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::ParticipantNotFound(participant_id));
    }
    Ok(())
  }

  // ── Ratings ───────────────────────────────────────────────────────────────

  async fn upsert_rating(&self, input: NewRating) -> Result<Rating> {
    let participant_str = encode_uuid(input.participant_id);
    let image_str       = encode_uuid(input.image_id);
    let fresh_id_str    = encode_uuid(Uuid::new_v4());
    let now_str         = encode_dt(Utc::now());
    let entries: Vec<(String, String)> = input
      .entries
      .iter()
      .map(|e| (encode_uuid(e.emotion_id), encode_agreement(e.agreement)))
      .collect();

    let participant_id = input.participant_id;
    let image_id = input.image_id;

    let raw: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let image_exists: bool = tx
          .query_row(
            "SELECT 1 FROM images WHERE image_id = ?1",
            rusqlite::params![image_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !image_exists {
          return Ok(None);
        }

        // Update-in-place: an existing (participant, image) rating keeps
        // its row and created_at; only the entries are replaced.
        let existing: Option<(String, String)> = tx
          .query_row(
            "SELECT rating_id, created_at FROM ratings
             WHERE participant_id = ?1 AND image_id = ?2",
            rusqlite::params![participant_str, image_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let (rating_id_str, created_at_str) = match existing {
          Some((id, at)) => {
            tx.execute(
              "DELETE FROM ranking_entries WHERE rating_id = ?1",
              rusqlite::params![id],
            )?;
            (id, at)
          }
          None => {
            tx.execute(
              "INSERT INTO ratings
                 (rating_id, participant_id, image_id, created_at)
               VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![
                fresh_id_str,
                participant_str,
                image_str,
                now_str
              ],
            )?;
            (fresh_id_str, now_str)
          }
        };

        for (emotion_str, agreement_str) in &entries {
          tx.execute(
            "INSERT INTO ranking_entries (rating_id, emotion_id, agreement)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![rating_id_str, emotion_str, agreement_str],
          )?;
        }

        tx.commit()?;
        Ok(Some((rating_id_str, created_at_str)))
      })
      .await?;

    let (rating_id_str, created_at_str) =
      raw.ok_or(Error::ImageNotFound(image_id))?;

    Ok(Rating {
      rating_id:  decode_uuid(&rating_id_str)?,
      participant_id,
      image_id,
      created_at: crate::encode::decode_dt(&created_at_str)?,
    })
  }

  async fn eligible_image_ids(
    &self,
    participant_id: Uuid,
    exclude: &[Uuid],
    max_ratings: u32,
  ) -> Result<Vec<Uuid>> {
    let participant_str = encode_uuid(participant_id);

    let id_strs: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT i.image_id
           FROM images i
           WHERE (SELECT COUNT(*) FROM ratings r
                  WHERE r.image_id = i.image_id) < ?1
             AND i.image_id NOT IN
                 (SELECT image_id FROM ratings WHERE participant_id = ?2)
           ORDER BY i.image_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![max_ratings, participant_str], |row| {
            row.get(0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut ids = id_strs
      .iter()
      .map(|s| decode_uuid(s))
      .collect::<Result<Vec<_>>>()?;
    ids.retain(|id| !exclude.contains(id));
    Ok(ids)
  }

  async fn reset_image_ratings(&self, image_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(image_id);
    let deleted: usize = self
      .conn
      .call(move |conn| {
        // ranking_entries go with their ratings via ON DELETE CASCADE.
        Ok(conn.execute(
          "DELETE FROM ratings WHERE image_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted as u64)
  }

  // ── Reporting ─────────────────────────────────────────────────────────────

  async fn export_ratings(
    &self,
    filter: &ExportFilter,
  ) -> Result<Vec<ExportRating>> {
    let mut rows = self.export_rows(filter).await?;

    if let Some(rating_ids) = &filter.rating_ids {
      rows.retain(|(_, r)| rating_ids.contains(&r.rating_id));
    }
    if let Some(image_ids) = &filter.image_ids {
      rows.retain(|(image_id, _)| image_ids.contains(image_id));
    }

    Ok(rows.into_iter().map(|(_, r)| r).collect())
  }

  async fn stats(&self) -> Result<StudyStats> {
    let (images, participants, ratings, emotions): (i64, i64, i64, i64) = self
      .conn
      .call(|conn| {
        let count = |conn: &rusqlite::Connection, sql: &str| {
          conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        };
        Ok((
          count(conn, "SELECT COUNT(*) FROM images")?,
          count(conn, "SELECT COUNT(*) FROM participants")?,
          count(conn, "SELECT COUNT(*) FROM ratings")?,
          count(conn, "SELECT COUNT(*) FROM emotions")?,
        ))
      })
      .await?;

    Ok(StudyStats {
      total_images:       images as u64,
      total_participants: participants as u64,
      total_ratings:      ratings as u64,
      emotional_states:   emotions as u64,
    })
  }

  async fn recent_ratings(&self, limit: u32) -> Result<Vec<ExportRating>> {
    let mut all = self.export_rows(&ExportFilter::default()).await?;
    all.reverse();
    all.truncate(limit as usize);
    Ok(all.into_iter().map(|(_, r)| r).collect())
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, state: SessionState) -> Result<()> {
    let token_str       = encode_uuid(state.token);
    let participant_str = encode_uuid(state.participant_id);
    let target_len      = state.target_len;
    let rated_str       = encode_id_list(&state.rated)?;
    let at_str          = encode_dt(state.started_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions
             (token, participant_id, target_len, rated, started_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            token_str,
            participant_str,
            target_len,
            rated_str,
            at_str
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_session(&self, token: Uuid) -> Result<Option<SessionState>> {
    let token_str = encode_uuid(token);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT token, participant_id, target_len, rated, started_at
               FROM sessions WHERE token = ?1",
              rusqlite::params![token_str],
              |row| {
                Ok(RawSession {
                  token:          row.get(0)?,
                  participant_id: row.get(1)?,
                  target_len:     row.get(2)?,
                  rated:          row.get(3)?,
                  started_at:     row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn append_session_rating(
    &self,
    token: Uuid,
    image_id: Uuid,
  ) -> Result<()> {
    let mut state = self
      .get_session(token)
      .await?
      .ok_or(Error::SessionNotFound(token))?;
    state.rated.push(image_id);

    let token_str = encode_uuid(token);
    let rated_str = encode_id_list(&state.rated)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE sessions SET rated = ?1 WHERE token = ?2",
          rusqlite::params![rated_str, token_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear_session(&self, token: Uuid) -> Result<bool> {
    let token_str = encode_uuid(token);
    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token = ?1",
          rusqlite::params![token_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }
}

//! The `StudyStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `mien-store-sqlite`).
//! The HTTP layer (`mien-server`) depends on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  model::{
    ConfigInput, EmotionalState, ExportFilter, ExportRating, FaceImage,
    ImageRecord, NewImage, NewRating, Participant, Rating, StudyConfig,
    StudyStats,
  },
  session::SessionState,
};

/// Abstraction over a Mien study store backend.
///
/// Two write paths carry invariants the backend must keep atomic:
/// [`save_config`](Self::save_config) demotes every other active row in
/// the same transaction, and [`upsert_rating`](Self::upsert_rating) writes
/// a rating with all its ranking entries as one unit so a partially
/// recorded rating is never visible.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait StudyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Configuration ─────────────────────────────────────────────────────

  /// The currently active configuration, if any row is marked active.
  fn active_config(
    &self,
  ) -> impl Future<Output = Result<Option<StudyConfig>, Self::Error>> + Send + '_;

  /// The active configuration, lazily creating a default active row when
  /// none exists. Absence is never surfaced to callers.
  fn ensure_active_config(
    &self,
  ) -> impl Future<Output = Result<StudyConfig, Self::Error>> + Send + '_;

  /// Insert or update a configuration row. When the written row is
  /// active, every other row is demoted in the same transaction, so at
  /// most one row is ever active. An inverted `min/max` range is stored
  /// swapped.
  fn save_config(
    &self,
    input: ConfigInput,
  ) -> impl Future<Output = Result<StudyConfig, Self::Error>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// Register an uploaded face image. The public code is generated here,
  /// once, and never changes.
  fn add_image(
    &self,
    input: NewImage,
  ) -> impl Future<Output = Result<FaceImage, Self::Error>> + Send + '_;

  fn get_image(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<FaceImage>, Self::Error>> + Send + '_;

  /// All images, newest first, each with its live rating count.
  fn list_images(
    &self,
  ) -> impl Future<Output = Result<Vec<ImageRecord>, Self::Error>> + Send + '_;

  // ── Emotional states ──────────────────────────────────────────────────

  /// Get-or-create by name; a second add with the same name returns the
  /// existing row untouched.
  fn add_emotion<'a>(
    &'a self,
    name: &'a str,
    description: &'a str,
  ) -> impl Future<Output = Result<EmotionalState, Self::Error>> + Send + 'a;

  /// All emotional states, ordered by name.
  fn list_emotions(
    &self,
  ) -> impl Future<Output = Result<Vec<EmotionalState>, Self::Error>> + Send + '_;

  /// Returns `false` when no such emotion exists.
  fn delete_emotion(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// How many ranking entries reference this emotion.
  fn emotion_usage(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Participants ──────────────────────────────────────────────────────

  /// Get-or-create by email — the session-start intake path.
  fn ensure_participant<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Participant, Self::Error>> + Send + 'a;

  fn get_participant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Participant>, Self::Error>> + Send + '_;

  /// Stamp `last_session_at` — called on every session-completion path.
  fn mark_session_complete(
    &self,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Ratings ───────────────────────────────────────────────────────────

  /// Persist one rating with its ranking entries atomically. A second
  /// submission for the same (participant, image) pair replaces the
  /// entries in place; the rating row and its `created_at` survive.
  fn upsert_rating(
    &self,
    input: NewRating,
  ) -> impl Future<Output = Result<Rating, Self::Error>> + Send + '_;

  /// Images still open for this participant: live rating count below
  /// `max_ratings`, never rated by the participant (any session), and not
  /// in `exclude` (the current session's list).
  fn eligible_image_ids<'a>(
    &'a self,
    participant_id: Uuid,
    exclude: &'a [Uuid],
    max_ratings: u32,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + 'a;

  /// Delete all ratings (and their entries) for an image; returns the
  /// number of ratings removed.
  fn reset_image_ratings(
    &self,
    image_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Reporting ─────────────────────────────────────────────────────────

  /// Ratings matching `filter`, denormalised for export and ordered by
  /// creation time.
  fn export_ratings<'a>(
    &'a self,
    filter: &'a ExportFilter,
  ) -> impl Future<Output = Result<Vec<ExportRating>, Self::Error>> + Send + 'a;

  fn stats(
    &self,
  ) -> impl Future<Output = Result<StudyStats, Self::Error>> + Send + '_;

  /// The most recent ratings, newest first — dashboard material.
  fn recent_ratings(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<ExportRating>, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    state: SessionState,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_session(
    &self,
    token: Uuid,
  ) -> impl Future<Output = Result<Option<SessionState>, Self::Error>> + Send + '_;

  /// Append an image to the session's rated list.
  fn append_session_rating(
    &self,
    token: Uuid,
    image_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` when no such session exists — clearing twice is
  /// harmless.
  fn clear_session(
    &self,
    token: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

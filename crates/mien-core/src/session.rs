//! Session state and the image-assignment engine.
//!
//! A session is a bounded run of rating interactions by one participant,
//! with a target length drawn once at session start. The engine is pure:
//! it takes the session state, the store's eligibility answer, and an
//! injected random source, so tests can seed the randomness and the HTTP
//! layer stays free of selection logic.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Session state ───────────────────────────────────────────────────────────

/// Server-side state for one browser session, keyed by the token the
/// browser carries in its cookie.
///
/// Lifecycle: created at `POST /session/start`, appended to on each
/// rating submission, cleared at `GET /session/complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
  pub token:          Uuid,
  pub participant_id: Uuid,
  /// Drawn once at session start; never redrawn.
  pub target_len:     u32,
  /// Images rated within this session, in presentation order.
  pub rated:          Vec<Uuid>,
  pub started_at:     DateTime<Utc>,
}

impl SessionState {
  pub fn new(participant_id: Uuid, target_len: u32) -> Self {
    Self {
      token: Uuid::new_v4(),
      participant_id,
      target_len,
      rated: Vec::new(),
      started_at: Utc::now(),
    }
  }

  /// Progress counters for the rating page: 1-based current position and
  /// the drawn total.
  pub fn progress(&self) -> (u32, u32) {
    (self.rated.len() as u32 + 1, self.target_len)
  }

  pub fn is_full(&self) -> bool { self.rated.len() as u32 >= self.target_len }
}

// ─── Assignment engine ───────────────────────────────────────────────────────

/// What the rating page should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
  /// Present this image for rating.
  Present(Uuid),
  /// The session is over: target reached, or no eligible image remains.
  Complete,
}

/// Draw the session's target length, uniform over `[min, max]`.
/// An inverted range is tolerated by swapping the bounds.
pub fn draw_target_len<R: Rng + ?Sized>(rng: &mut R, min: u32, max: u32) -> u32 {
  let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
  rng.gen_range(lo..=hi)
}

/// Choose uniformly among the eligible images. `None` when the pool is
/// empty.
pub fn pick_next<R: Rng + ?Sized>(rng: &mut R, eligible: &[Uuid]) -> Option<Uuid> {
  if eligible.is_empty() {
    return None;
  }
  Some(eligible[rng.gen_range(0..eligible.len())])
}

/// Decide the next step for a session.
///
/// `eligible` must already exclude images this participant has ever rated
/// and images rated within this session — the store's eligibility query
/// guarantees both.
pub fn next_step<R: Rng + ?Sized>(
  state: &SessionState,
  eligible: &[Uuid],
  rng: &mut R,
) -> NextStep {
  if state.is_full() {
    return NextStep::Complete;
  }
  match pick_next(rng, eligible) {
    Some(image_id) => NextStep::Present(image_id),
    None => NextStep::Complete,
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

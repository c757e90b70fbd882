//! HTTP layer for the Mien face-emotion perception study.
//!
//! Exposes an axum [`Router`] over any [`StudyStore`]: participant-facing
//! session routes, admin catalog/config management, and CSV export.
//! HTML rendering is a client concern — handlers return the data a
//! template layer would consume, and browser form posts arrive
//! URL-encoded.

pub mod auth;
pub mod browser;
pub mod error;
pub mod export;
pub mod forms;
pub mod handlers;

pub use error::Error;

use std::{
  path::PathBuf,
  sync::{Arc, Mutex},
};

use axum::{
  Router,
  routing::{get, post},
};
use rand::{SeedableRng as _, rngs::StdRng};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use mien_core::store::StudyStore;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  /// Public origin used when building absolute media URLs.
  pub base_url:           String,
  /// Prefix under which uploaded images are served; must start and end
  /// with `/`.
  #[serde(default = "default_media_url")]
  pub media_url:          String,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  /// Fixed seed for the image/length draws — deterministic test runs.
  #[serde(default)]
  pub rng_seed:           Option<u64>,
}

fn default_media_url() -> String { "/media/".to_string() }

impl ServerConfig {
  /// Absolute URL for an image's storage path.
  pub fn media_url_for(&self, storage_path: &str) -> String {
    format!(
      "{}{}{}",
      self.base_url.trim_end_matches('/'),
      self.media_url,
      storage_path
    )
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: StudyStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
  /// The injectable random source behind session-length and image draws.
  pub rng:    Arc<Mutex<StdRng>>,
}

impl<S: StudyStore> AppState<S> {
  pub fn new(
    store: Arc<S>,
    config: Arc<ServerConfig>,
    auth: Arc<AuthConfig>,
  ) -> Self {
    let rng = match config.rng_seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    Self { store, config, auth, rng: Arc::new(Mutex::new(rng)) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the study server.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: StudyStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Admin
    .route("/", get(handlers::dashboard::show::<S>))
    .route(
      "/images",
      get(handlers::images::list::<S>).post(handlers::images::register::<S>),
    )
    .route(
      "/emotions",
      get(handlers::emotions::list::<S>).post(handlers::emotions::create::<S>),
    )
    .route("/emotions/{id}/delete", post(handlers::emotions::delete::<S>))
    .route(
      "/config",
      get(handlers::config::show::<S>).post(handlers::config::update::<S>),
    )
    .route(
      "/admin/images/{id}/reset-ratings",
      post(handlers::admin::reset_ratings::<S>),
    )
    .route("/admin/export", get(handlers::admin::export::<S>))
    .route(
      "/admin/export/advanced",
      get(handlers::admin::export_advanced::<S>),
    )
    // Participant flow
    .route(
      "/session/start",
      get(handlers::study::start_info::<S>).post(handlers::study::start::<S>),
    )
    .route(
      "/session/rate",
      get(handlers::study::next_image::<S>).post(handlers::study::submit::<S>),
    )
    .route("/session/complete", get(handlers::study::complete::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use mien_core::model::{
    Agreement, ConfigInput, NewImage, NewRating, RankingEntry,
  };
  use mien_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  const FORM: &str = "application/x-www-form-urlencoded";

  async fn make_state(password: &str) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let salt  = SaltString::generate(&mut OsRng);
    let hash  = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();

    let config = ServerConfig {
      host:               "127.0.0.1".to_string(),
      port:               8600,
      base_url:           "http://localhost:8600".to_string(),
      media_url:          "/media/".to_string(),
      store_path:         PathBuf::from(":memory:"),
      auth_username:      "admin".to_string(),
      auth_password_hash: hash.clone(),
      rng_seed:           Some(7),
    };
    let auth = AuthConfig {
      username:      "admin".to_string(),
      password_hash: hash,
    };

    AppState::new(Arc::new(store), Arc::new(config), Arc::new(auth))
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn oneshot_raw(
    state:   AppState<SqliteStore>,
    method:  &str,
    uri:     &str,
    headers: Vec<(header::HeaderName, &str)>,
    body:    &str,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn location(resp: &axum::response::Response) -> &str {
    resp
      .headers()
      .get(header::LOCATION)
      .unwrap()
      .to_str()
      .unwrap()
  }

  /// The `mien_session=<token>` pair from a Set-Cookie header.
  fn cookie_pair(resp: &axum::response::Response) -> String {
    resp
      .headers()
      .get(header::SET_COOKIE)
      .unwrap()
      .to_str()
      .unwrap()
      .split(';')
      .next()
      .unwrap()
      .to_string()
  }

  async fn fixed_config(state: &AppState<SqliteStore>, min: u32, max: u32) {
    state
      .store
      .save_config(ConfigInput {
        config_id: None,
        min_images: min,
        max_images: max,
        max_ratings_per_image: 5,
        is_active: true,
      })
      .await
      .unwrap();
  }

  async fn seed_images(state: &AppState<SqliteStore>, n: usize) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for i in 0..n {
      let image = state
        .store
        .add_image(NewImage { storage_path: format!("faces/{i}.jpg") })
        .await
        .unwrap();
      ids.push(image.image_id);
    }
    ids
  }

  // ── Participant flow ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn start_sets_cookie_and_redirects_to_rate() {
    let state = make_state("secret").await;
    fixed_config(&state, 2, 2).await;

    let resp = oneshot_raw(
      state,
      "POST",
      "/session/start",
      vec![(header::CONTENT_TYPE, FORM)],
      "email=a%40x.com",
    )
    .await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/session/rate");
    assert!(cookie_pair(&resp).starts_with("mien_session="));
  }

  #[tokio::test]
  async fn start_rejects_an_invalid_email() {
    let state = make_state("secret").await;

    let resp = oneshot_raw(
      state,
      "POST",
      "/session/start",
      vec![(header::CONTENT_TYPE, FORM)],
      "email=not-an-email",
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["fields"]["email"].is_string());
  }

  #[tokio::test]
  async fn rate_without_a_session_redirects_to_start() {
    let state = make_state("secret").await;

    let resp =
      oneshot_raw(state.clone(), "GET", "/session/rate", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/session/start");

    // A stale token reads the same as no token.
    let stale = format!("mien_session={}", Uuid::new_v4());
    let resp = oneshot_raw(
      state,
      "GET",
      "/session/rate",
      vec![(header::COOKIE, stale.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/session/start");
  }

  #[tokio::test]
  async fn fixed_length_session_completes_after_exactly_two_submissions() {
    let state = make_state("secret").await;
    fixed_config(&state, 2, 2).await;
    seed_images(&state, 3).await;
    let joy = state.store.add_emotion("joy", "").await.unwrap();
    let fear = state.store.add_emotion("fear", "").await.unwrap();

    let resp = oneshot_raw(
      state.clone(),
      "POST",
      "/session/start",
      vec![(header::CONTENT_TYPE, FORM)],
      "email=a%40x.com",
    )
    .await;
    let cookie = cookie_pair(&resp);

    let mut seen = Vec::new();
    for round in 0..2u32 {
      let resp = oneshot_raw(
        state.clone(),
        "GET",
        "/session/rate",
        vec![(header::COOKIE, cookie.as_str())],
        "",
      )
      .await;
      assert_eq!(resp.status(), StatusCode::OK, "round {round}");
      let page = json_body(resp).await;

      assert_eq!(page["progress"]["current"], round + 1);
      assert_eq!(page["progress"]["total"], 2);

      let image_id = page["image"]["image_id"].as_str().unwrap().to_string();
      assert!(!seen.contains(&image_id), "image repeated within a session");
      seen.push(image_id.clone());

      let body = format!(
        "image_id={image_id}&emotion_{}=0.9&emotion_{}=0.25",
        joy.emotion_id, fear.emotion_id
      );
      let resp = oneshot_raw(
        state.clone(),
        "POST",
        "/session/rate",
        vec![
          (header::CONTENT_TYPE, FORM),
          (header::COOKIE, cookie.as_str()),
        ],
        &body,
      )
      .await;
      assert_eq!(resp.status(), StatusCode::SEE_OTHER, "round {round}");
      let expected =
        if round == 0 { "/session/rate" } else { "/session/complete" };
      assert_eq!(location(&resp), expected, "round {round}");
    }

    // The session is full; a further visit also redirects to completion.
    let resp = oneshot_raw(
      state.clone(),
      "GET",
      "/session/rate",
      vec![(header::COOKIE, cookie.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/session/complete");

    // Completion clears the state; the cookie now points at nothing.
    let resp = oneshot_raw(
      state.clone(),
      "GET",
      "/session/complete",
      vec![(header::COOKIE, cookie.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = oneshot_raw(
      state,
      "GET",
      "/session/rate",
      vec![(header::COOKIE, cookie.as_str())],
      "",
    )
    .await;
    assert_eq!(location(&resp), "/session/start");
  }

  #[tokio::test]
  async fn session_ends_early_when_no_eligible_image_remains() {
    let state = make_state("secret").await;
    fixed_config(&state, 5, 5).await;
    seed_images(&state, 1).await;
    let joy = state.store.add_emotion("joy", "").await.unwrap();

    let resp = oneshot_raw(
      state.clone(),
      "POST",
      "/session/start",
      vec![(header::CONTENT_TYPE, FORM)],
      "email=a%40x.com",
    )
    .await;
    let cookie = cookie_pair(&resp);

    let resp = oneshot_raw(
      state.clone(),
      "GET",
      "/session/rate",
      vec![(header::COOKIE, cookie.as_str())],
      "",
    )
    .await;
    let page = json_body(resp).await;
    let image_id = page["image"]["image_id"].as_str().unwrap().to_string();

    let body = format!("image_id={image_id}&emotion_{}=0.5", joy.emotion_id);
    let resp = oneshot_raw(
      state.clone(),
      "POST",
      "/session/rate",
      vec![
        (header::CONTENT_TYPE, FORM),
        (header::COOKIE, cookie.as_str()),
      ],
      &body,
    )
    .await;
    // Only one image existed; the pool is dry well before the target.
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/session/rate");

    let resp = oneshot_raw(
      state,
      "GET",
      "/session/rate",
      vec![(header::COOKIE, cookie.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/session/complete");
  }

  #[tokio::test]
  async fn malformed_agreement_text_is_a_field_error() {
    let state = make_state("secret").await;
    fixed_config(&state, 2, 2).await;
    let images = seed_images(&state, 2).await;
    let joy = state.store.add_emotion("joy", "").await.unwrap();

    let resp = oneshot_raw(
      state.clone(),
      "POST",
      "/session/start",
      vec![(header::CONTENT_TYPE, FORM)],
      "email=a%40x.com",
    )
    .await;
    let cookie = cookie_pair(&resp);

    let body = format!("image_id={}&emotion_{}=lots", images[0], joy.emotion_id);
    let resp = oneshot_raw(
      state,
      "POST",
      "/session/rate",
      vec![
        (header::CONTENT_TYPE, FORM),
        (header::COOKIE, cookie.as_str()),
      ],
      &body,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors = json_body(resp).await;
    assert_eq!(errors["error"], "validation failed");
  }

  // ── Admin auth ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_routes_require_credentials() {
    let state = make_state("secret").await;

    for uri in ["/", "/images", "/emotions", "/config", "/admin/export"] {
      let resp = oneshot_raw(state.clone(), "GET", uri, vec![], "").await;
      assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
      assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE), "{uri}");
    }

    let auth = auth_header("admin", "secret");
    let resp = oneshot_raw(
      state,
      "GET",
      "/",
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  // ── Catalog & config ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn image_registration_returns_a_code() {
    let state = make_state("secret").await;
    let auth = auth_header("admin", "secret");

    let resp = oneshot_raw(
      state,
      "POST",
      "/images",
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, FORM),
      ],
      "filename=portrait.PNG",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let image = json_body(resp).await;
    assert!(image["code"].as_str().unwrap().starts_with("IMG-"));
    assert!(image["storage_path"].as_str().unwrap().ends_with(".png"));
  }

  #[tokio::test]
  async fn config_update_round_trips_and_validates() {
    let state = make_state("secret").await;
    let auth = auth_header("admin", "secret");

    let resp = oneshot_raw(
      state.clone(),
      "POST",
      "/config",
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, FORM),
      ],
      "min_images=3&max_images=6&max_ratings_per_image=4&is_active=on",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let saved = json_body(resp).await;
    assert_eq!(saved["min_images"], 3);
    assert_eq!(saved["max_images"], 6);

    let active = state.store.active_config().await.unwrap().unwrap();
    assert_eq!(active.max_ratings_per_image, 4);

    let resp = oneshot_raw(
      state,
      "POST",
      "/config",
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, FORM),
      ],
      "min_images=9&max_images=2&max_ratings_per_image=4&is_active=on",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn reset_ratings_on_an_unknown_image_is_404() {
    let state = make_state("secret").await;
    let auth = auth_header("admin", "secret");

    let resp = oneshot_raw(
      state,
      "POST",
      &format!("/admin/images/{}/reset-ratings", Uuid::new_v4()),
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── CSV export ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn export_emits_one_column_per_known_emotion() {
    let state = make_state("secret").await;
    let auth = auth_header("admin", "secret");
    let images = seed_images(&state, 2).await;

    let anger = state.store.add_emotion("anger", "").await.unwrap();
    state.store.add_emotion("fear", "").await.unwrap();
    let joy = state.store.add_emotion("joy", "").await.unwrap();

    let p1 = state.store.ensure_participant("p1@x.com").await.unwrap();
    let p2 = state.store.ensure_participant("p2@x.com").await.unwrap();

    // Two ratings with different (and incomplete) emotion subsets.
    state
      .store
      .upsert_rating(NewRating {
        participant_id: p1.participant_id,
        image_id: images[0],
        entries: vec![RankingEntry {
          emotion_id: joy.emotion_id,
          agreement:  Agreement::new(0.9),
        }],
      })
      .await
      .unwrap();
    state
      .store
      .upsert_rating(NewRating {
        participant_id: p2.participant_id,
        image_id: images[1],
        entries: vec![RankingEntry {
          emotion_id: anger.emotion_id,
          agreement:  Agreement::new(0.4),
        }],
      })
      .await
      .unwrap();

    let resp = oneshot_raw(
      state,
      "GET",
      "/admin/export",
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp
      .headers()
      .get(header::CONTENT_TYPE)
      .unwrap()
      .to_str()
      .unwrap();
    assert!(ct.starts_with("text/csv"), "Content-Type: {ct}");
    let disposition = resp
      .headers()
      .get(header::CONTENT_DISPOSITION)
      .unwrap()
      .to_str()
      .unwrap();
    assert!(disposition.contains("ratings_export_"), "{disposition}");

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let csv = std::str::from_utf8(&bytes).unwrap();
    let mut lines = csv.lines();

    let header_line = lines.next().unwrap();
    let emotion_cols: Vec<&str> = header_line
      .split(',')
      .filter(|c| c.starts_with("emotion_"))
      .collect();
    assert_eq!(emotion_cols, ["emotion_anger", "emotion_fear", "emotion_joy"]);
    assert_eq!(lines.count(), 2);
  }
}

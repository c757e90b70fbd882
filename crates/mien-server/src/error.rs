//! Server error type and axum `IntoResponse` implementation.

use std::collections::BTreeMap;

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A form failed validation; `fields` maps field name to message and is
  /// what a template layer would render next to each input.
  #[error("validation failed")]
  Validation { fields: BTreeMap<String, String> },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Single-field validation failure.
  pub fn field(name: &str, message: &str) -> Self {
    let mut fields = BTreeMap::new();
    fields.insert(name.to_string(), message.to_string());
    Self::Validation { fields }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "unauthorized" })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"mien\""),
        );
        res
      }
      Error::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
      }
      Error::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      Error::Validation { fields } => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "validation failed", "fields": fields })),
      )
        .into_response(),
      Error::Store(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
      )
        .into_response(),
    }
  }
}

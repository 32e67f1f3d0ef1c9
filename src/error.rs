//! Error taxonomy of the service and its HTTP rendering.
//!
//! Three families: validation failures (field-level, caught before any write),
//! backend/integration failures (surfaced as received, already logged at the call
//! site) and the fixed "not implemented" sentinel for placeholder operations.

use std::collections::BTreeMap;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;

/// Field path → messages. Paths use the camelCase payload names, with indices for
/// list entries (`options[1].text`).
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.entry(field.into()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn contains(&self, field: &str) -> bool {
    self.0.contains_key(field)
  }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  pub fn fields(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn into_result(self) -> Result<(), FieldErrors> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl From<validator::ValidationErrors> for FieldErrors {
  fn from(errors: validator::ValidationErrors) -> Self {
    let mut out = FieldErrors::default();
    for (field, errs) in errors.field_errors() {
      for e in errs.iter() {
        let msg = e
          .message
          .as_ref()
          .map(|m| m.to_string())
          .unwrap_or_else(|| e.code.to_string());
        out.push(to_camel_case(&field.to_string()), msg);
      }
    }
    out
  }
}

/// `question_text` → `questionText`; validator reports Rust field names.
fn to_camel_case(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut upper = false;
  for ch in s.chars() {
    if ch == '_' {
      upper = true;
    } else if upper {
      out.extend(ch.to_uppercase());
      upper = false;
    } else {
      out.push(ch);
    }
  }
  out
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation failed")]
  Validation(FieldErrors),

  #[error("Backend error: {0}")]
  Backend(#[from] BackendError),

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  #[error("Not implemented: {0}")]
  NotImplemented(&'static str),

  #[error("AI integration is not configured")]
  AiUnavailable,

  #[error("AI error: {0}")]
  Ai(String),

  #[error("Object storage is not configured")]
  StorageUnavailable,

  #[error("Storage error: {0}")]
  Storage(String),

  #[error("Invalid storage URL: {0}")]
  StorageUrl(String),

  #[error("Bad request: {0}")]
  BadRequest(String),

  #[error("Export error: {0}")]
  Export(String),

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Serialization error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),
}

impl From<FieldErrors> for AppError {
  fn from(e: FieldErrors) -> Self {
    AppError::Validation(e)
  }
}

impl AppError {
  pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
    AppError::NotFound { entity, id: id.into() }
  }

  fn kind(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "validation",
      AppError::Backend(_) => "backend",
      AppError::NotFound { .. } => "not_found",
      AppError::NotImplemented(_) => "not_implemented",
      AppError::AiUnavailable | AppError::Ai(_) => "ai",
      AppError::StorageUnavailable | AppError::Storage(_) | AppError::StorageUrl(_) => "storage",
      AppError::BadRequest(_) => "bad_request",
      AppError::Export(_) | AppError::Csv(_) => "export",
      AppError::Http(_) => "http",
      AppError::Json(_) => "serialization",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::Backend(e) if e.is_not_found() => StatusCode::NOT_FOUND,
      AppError::Backend(_) => StatusCode::BAD_GATEWAY,
      AppError::NotFound { .. } => StatusCode::NOT_FOUND,
      AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
      AppError::AiUnavailable | AppError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Ai(_) | AppError::Storage(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
      AppError::StorageUrl(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::Export(_) | AppError::Csv(_) | AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    let mut body = json!({ "error": self.kind(), "message": self.to_string() });
    match &self {
      AppError::Validation(fields) => {
        body["fields"] = json!(fields);
      }
      AppError::Backend(e) => {
        body["message"] = json!(e.message);
        body["details"] = json!(e.details);
        body["hint"] = json!(e.hint);
        body["code"] = json!(e.code);
      }
      _ => {}
    }
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use validator::Validate;

  #[derive(Validate)]
  struct Sample {
    #[validate(length(min = 3, message = "too short"))]
    question_text: String,
  }

  #[test]
  fn validator_errors_become_camel_case_fields() {
    let errs = Sample { question_text: "ab".into() }.validate().unwrap_err();
    let fields = FieldErrors::from(errs);
    assert_eq!(fields.get("questionText"), Some(&["too short".to_string()][..]));
  }

  #[test]
  fn statuses_follow_error_family() {
    let not_found = BackendError { code: Some("PGRST116".into()), ..Default::default() };
    assert_eq!(AppError::Backend(not_found).status(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::Backend(BackendError::default()).status(), StatusCode::BAD_GATEWAY);
    assert_eq!(AppError::NotImplemented("get_exams").status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(AppError::Validation(FieldErrors::default()).status(), StatusCode::UNPROCESSABLE_ENTITY);
  }
}

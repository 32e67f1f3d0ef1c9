//! Object storage endpoints and the placeholder entities that are not served yet.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use base64::Engine;
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::protocol::{DeleteObjectIn, UploadIn, UploadOut};
use crate::state::AppState;
use crate::storage::object_path;

/// Accepts raw base64 or a `data:<mime>;base64,<payload>` URL.
fn decode_payload(data: &str) -> Result<Vec<u8>, AppError> {
  let payload = match data.split_once(";base64,") {
    Some((prefix, rest)) if prefix.starts_with("data:") => rest,
    _ => data,
  };
  let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
  base64::engine::general_purpose::STANDARD
    .decode(compact)
    .map_err(|e| AppError::BadRequest(format!("invalid base64 payload: {e}")))
}

#[instrument(level = "info", skip(state, body), fields(bucket = ?body.bucket, file = ?body.file_name, content_type = %body.content_type))]
pub async fn http_storage_upload(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UploadIn>,
) -> Result<(StatusCode, Json<UploadOut>), AppError> {
  let storage = state.object_storage()?;
  let bytes = decode_payload(&body.data_base64)?;
  if bytes.is_empty() {
    return Err(AppError::BadRequest("empty file".into()));
  }
  let bucket = body.bucket.unwrap_or_else(|| state.default_bucket.clone());
  let path = match body.path.filter(|p| !p.trim().is_empty()) {
    Some(p) => p.trim().trim_start_matches('/').to_string(),
    None => object_path(body.folder.as_deref().unwrap_or(""), body.file_name.as_deref().unwrap_or("file")),
  };

  let url = storage.upload(&bucket, &path, bytes, &body.content_type).await?;
  info!(target: "storage", %bucket, %path, "Upload served");
  Ok((StatusCode::CREATED, Json(UploadOut { bucket, path, url })))
}

/// A non-blank url wins over a non-blank path.
fn delete_target<'a>(url: Option<&'a str>, path: Option<&'a str>) -> Result<&'a str, AppError> {
  let present = |v: Option<&'a str>| v.map(str::trim).filter(|t| !t.is_empty());
  present(url)
    .or_else(|| present(path))
    .ok_or_else(|| AppError::BadRequest("either `path` or `url` is required".into()))
}

#[instrument(level = "info", skip(state, body), fields(bucket = ?body.bucket))]
pub async fn http_storage_delete(
  State(state): State<Arc<AppState>>,
  Json(body): Json<DeleteObjectIn>,
) -> Result<StatusCode, AppError> {
  let storage = state.object_storage()?;
  let target = delete_target(body.url.as_deref(), body.path.as_deref())?;
  let bucket = body.bucket.unwrap_or_else(|| state.default_bucket.clone());
  storage.delete(&bucket, target).await?;
  Ok(StatusCode::NO_CONTENT)
}

// --- placeholders (always 501) ---

pub async fn http_list_exams(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Value>>, AppError> {
  Ok(Json(state.store.get_exams().await?))
}

pub async fn http_create_exam(
  State(state): State<Arc<AppState>>,
  Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
  Ok(Json(state.store.add_exam(body).await?))
}

pub async fn http_list_news(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Value>>, AppError> {
  Ok(Json(state.store.get_news_articles().await?))
}

pub async fn http_list_activation_codes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Value>>, AppError> {
  Ok(Json(state.store.get_activation_codes().await?))
}

pub async fn http_questions_batch(
  State(state): State<Arc<AppState>>,
  Json(body): Json<Vec<Value>>,
) -> Result<Json<usize>, AppError> {
  Ok(Json(state.store.add_questions_batch(body).await?))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn payload_accepts_data_urls_and_line_breaks() {
    assert_eq!(decode_payload("aGVsbG8=").unwrap(), b"hello");
    assert_eq!(decode_payload("data:image/png;base64,aGVs\nbG8=").unwrap(), b"hello");
    assert!(matches!(decode_payload("***"), Err(AppError::BadRequest(_))));
  }

  #[test]
  fn blank_url_does_not_hide_the_path() {
    assert_eq!(delete_target(Some(""), Some("a.png")).unwrap(), "a.png");
    assert_eq!(delete_target(Some(" https://x/a.png "), Some("b.png")).unwrap(), "https://x/a.png");
    assert!(matches!(delete_target(Some(" "), None), Err(AppError::BadRequest(_))));
  }
}

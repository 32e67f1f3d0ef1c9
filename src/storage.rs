//! Object storage for question images and lesson files.
//!
//! Objects live at `{base}/storage/v1/object/{bucket}/{path}` and are served publicly
//! from `{public_base}/storage/v1/object/public/{bucket}/{path}`. Uploads overwrite an
//! existing object at the same path.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};
use url::Url;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Clone)]
pub struct ObjectStorage {
  client: reqwest::Client,
  base_url: String,
  api_key: String,
  public_base: String,
}

impl ObjectStorage {
  pub fn new(base_url: &str, api_key: &str, public_base: Option<&str>) -> Result<Self, AppError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()?;
    let base_url = base_url.trim_end_matches('/').to_string();
    let public_base = public_base
      .map(|b| b.trim_end_matches('/').to_string())
      .unwrap_or_else(|| base_url.clone());
    Ok(Self { client, base_url, api_key: api_key.to_string(), public_base })
  }

  pub fn public_url(&self, bucket: &str, path: &str) -> String {
    format!("{}/storage/v1/object/public/{}/{}", self.public_base, bucket, encode_path(path))
  }

  /// Object path inside `bucket` for one of our public URLs.
  pub fn path_from_public_url(&self, bucket: &str, public_url: &str) -> Result<String, AppError> {
    let foreign = || AppError::StorageUrl(public_url.to_string());
    let url = Url::parse(public_url).map_err(|_| foreign())?;
    let base = Url::parse(&self.public_base).map_err(|_| foreign())?;
    if url.origin() != base.origin() {
      return Err(foreign());
    }
    let prefix = format!("{}/storage/v1/object/public/{}/", base.path().trim_end_matches('/'), bucket);
    let rest = url.path().strip_prefix(prefix.as_str()).ok_or_else(foreign)?;
    let path = urlencoding::decode(rest).map_err(|_| foreign())?.into_owned();
    if path.is_empty() {
      return Err(foreign());
    }
    Ok(path)
  }

  /// Upload (or replace) an object and return its public URL.
  #[instrument(level = "info", skip(self, bytes), fields(%bucket, %path, size = bytes.len()))]
  pub async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
      return Err(AppError::BadRequest("object path is empty".into()));
    }
    let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, encode_path(path));
    let res = self.client.post(&url)
      .header(USER_AGENT, "exam-prep-backend/0.1")
      .header(CONTENT_TYPE, content_type)
      .header("apikey", &self.api_key)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .header("x-upsert", "true")
      .body(bytes)
      .send().await
      .map_err(|e| storage_failure("upload", e.to_string()))?;
    check(res, "upload").await?;

    let public = self.public_url(bucket, path);
    info!(target: "storage", %public, "Object uploaded");
    Ok(public)
  }

  /// Delete an object given its path or its public URL.
  #[instrument(level = "info", skip(self), fields(%bucket))]
  pub async fn delete(&self, bucket: &str, path_or_url: &str) -> Result<(), AppError> {
    let path = if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
      self.path_from_public_url(bucket, path_or_url)?
    } else {
      path_or_url.trim_start_matches('/').to_string()
    };
    if path.is_empty() {
      return Err(AppError::BadRequest("object path is empty".into()));
    }

    let url = format!("{}/storage/v1/object/{}", self.base_url, bucket);
    let res = self.client.delete(&url)
      .header(USER_AGENT, "exam-prep-backend/0.1")
      .header("apikey", &self.api_key)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&json!({ "prefixes": [path] }))
      .send().await
      .map_err(|e| storage_failure("delete", e.to_string()))?;
    check(res, "delete").await?;
    info!(target: "storage", %path, "Object deleted");
    Ok(())
  }
}

/// `{folder}/{uuid}-{name}` with the name reduced to its last path component.
pub fn object_path(folder: &str, file_name: &str) -> String {
  let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name).trim();
  let name = if name.is_empty() { "file" } else { name };
  let folder = folder.trim_matches('/');
  if folder.is_empty() {
    format!("{}-{}", Uuid::new_v4(), name)
  } else {
    format!("{}/{}-{}", folder, Uuid::new_v4(), name)
  }
}

fn encode_path(path: &str) -> String {
  path.split('/').map(|seg| urlencoding::encode(seg).into_owned()).collect::<Vec<_>>().join("/")
}

fn storage_failure(op: &str, message: String) -> AppError {
  error!(target: "storage", %op, error = %message, "Storage request failed");
  AppError::Storage(message)
}

async fn check(res: reqwest::Response, op: &str) -> Result<(), AppError> {
  #[derive(Deserialize)]
  struct Body {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
  }
  if res.status().is_success() {
    return Ok(());
  }
  let status = res.status();
  let body = res.text().await.unwrap_or_default();
  let msg = serde_json::from_str::<Body>(&body)
    .ok()
    .and_then(|b| b.message.or(b.error))
    .unwrap_or(body);
  Err(storage_failure(op, format!("HTTP {}: {}", status, msg)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::Matcher;

  fn storage(base: &str) -> ObjectStorage {
    ObjectStorage::new(base, "anon-key", None).unwrap()
  }

  #[test]
  fn public_url_round_trips_through_path_parsing() {
    let s = storage("https://proj.example.co/");
    let url = s.public_url("question-images", "grammar/صورة 1.png");
    assert!(url.starts_with("https://proj.example.co/storage/v1/object/public/question-images/grammar/"));
    assert!(!url.contains(' '));
    assert_eq!(s.path_from_public_url("question-images", &url).unwrap(), "grammar/صورة 1.png");
  }

  #[test]
  fn foreign_urls_are_rejected() {
    let s = storage("https://proj.example.co");
    for bad in [
      "https://other.example.co/storage/v1/object/public/question-images/a.png",
      "https://proj.example.co/storage/v1/object/public/other-bucket/a.png",
      "https://proj.example.co/storage/v1/object/public/question-images/",
      "not a url",
    ] {
      assert!(matches!(s.path_from_public_url("question-images", bad), Err(AppError::StorageUrl(_))), "{bad}");
    }
  }

  #[test]
  fn cdn_base_is_used_for_public_urls() {
    let s = ObjectStorage::new("https://proj.example.co", "k", Some("https://cdn.example.co/")).unwrap();
    let url = s.public_url("b", "x.png");
    assert_eq!(url, "https://cdn.example.co/storage/v1/object/public/b/x.png");
    assert_eq!(s.path_from_public_url("b", &url).unwrap(), "x.png");
  }

  #[test]
  fn object_paths_keep_only_the_file_name() {
    let p = object_path("/lessons/", "C:\\docs\\notes.pdf");
    assert!(p.starts_with("lessons/"));
    assert!(p.ends_with("-notes.pdf"));
  }

  #[tokio::test]
  async fn upload_posts_bytes_with_upsert() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/storage/v1/object/question-images/q/a.png")
      .match_header("x-upsert", "true")
      .match_header("authorization", "Bearer anon-key")
      .match_header("content-type", "image/png")
      .match_body(Matcher::Exact("PNGDATA".into()))
      .with_status(200)
      .with_body(r#"{"Key":"question-images/q/a.png"}"#)
      .create_async()
      .await;

    let s = storage(&server.url());
    let url = s.upload("question-images", "q/a.png", b"PNGDATA".to_vec(), "image/png").await.unwrap();
    assert_eq!(url, format!("{}/storage/v1/object/public/question-images/q/a.png", server.url()));
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn delete_accepts_public_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("DELETE", "/storage/v1/object/question-images")
      .match_body(Matcher::Json(json!({ "prefixes": ["q/a.png"] })))
      .with_status(200)
      .with_body("[]")
      .create_async()
      .await;

    let s = storage(&server.url());
    let public = s.public_url("question-images", "q/a.png");
    s.delete("question-images", &public).await.unwrap();
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn storage_errors_carry_the_message() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/storage/v1/object/b/x.png")
      .with_status(400)
      .with_body(r#"{"statusCode":"400","error":"Bad Request","message":"Bucket not found"}"#)
      .create_async()
      .await;

    let s = storage(&server.url());
    match s.upload("b", "x.png", vec![1], "image/png").await {
      Err(AppError::Storage(msg)) => assert!(msg.contains("Bucket not found")),
      other => panic!("unexpected: {other:?}"),
    }
  }
}

//! Persistence boundary: a small row-level API over the hosted relational backend.
//!
//! Rows travel as JSON objects with snake_case columns. `RestBackend` talks to a
//! PostgREST-style endpoint (`/rest/v1/{table}`); `MemoryBackend` keeps tables in
//! process and mimics the hosted defaults (generated ids, timestamps, not-found code).
//!
//! Errors are returned exactly as the backend reports them (`message`, `details`,
//! `hint`, `code`); callers log them and pass them on.

use std::{cmp::Ordering, collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgREST code for "no (or more than one) row where exactly one was requested".
pub const NO_ROWS_CODE: &str = "PGRST116";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub details: Option<String>,
  #[serde(default)]
  pub hint: Option<String>,
  #[serde(default)]
  pub code: Option<String>,
  /// HTTP status of the failed call; 0 when the request never got a response.
  #[serde(skip)]
  pub status: u16,
}

impl BackendError {
  pub fn no_rows(table: &str, id: &str) -> Self {
    Self {
      message: "JSON object requested, multiple (or no) rows returned".into(),
      details: Some(format!("{table}: no row with id {id}")),
      hint: None,
      code: Some(NO_ROWS_CODE.into()),
      status: 406,
    }
  }

  pub fn is_not_found(&self) -> bool {
    self.code.as_deref() == Some(NO_ROWS_CODE)
  }

  /// Emit the structured diagnostic fields for a failed operation.
  pub fn log(&self, op: &str, table: &str) {
    error!(
      target: "store",
      %op,
      %table,
      message = %self.message,
      details = ?self.details,
      hint = ?self.hint,
      code = ?self.code,
      status = self.status,
      "Backend call failed"
    );
  }
}

impl From<reqwest::Error> for BackendError {
  fn from(e: reqwest::Error) -> Self {
    Self {
      message: e.to_string(),
      status: e.status().map(|s| s.as_u16()).unwrap_or_default(),
      ..Default::default()
    }
  }
}

/// Equality filters and an optional ordering for `select`.
#[derive(Clone, Debug, Default)]
pub struct Query {
  pub filters: Vec<(String, String)>,
  pub order: Option<(String, bool)>,
}

impl Query {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
    self.filters.push((column.to_string(), value.into()));
    self
  }

  pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
    self.order = Some((column.to_string(), ascending));
    self
  }
}

#[async_trait]
pub trait Backend: Send + Sync {
  /// Short name for logs ("rest" / "memory").
  fn name(&self) -> &'static str;

  async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError>;

  /// Insert one row and return it as stored (with generated columns).
  async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError>;

  /// Patch the row with the given id and return it as stored.
  async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, BackendError>;

  async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError>;
}

// --- Hosted backend over HTTP ---

#[derive(Clone)]
pub struct RestBackend {
  client: reqwest::Client,
  base_url: String,
  api_key: String,
}

impl RestBackend {
  pub fn new(base_url: &str, api_key: &str) -> Result<Self, BackendError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
    })
  }

  fn table_url(&self, table: &str) -> String {
    format!("{}/rest/v1/{}", self.base_url, table)
  }

  fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
    self.client
      .request(method, self.table_url(table))
      .header(USER_AGENT, "exam-prep-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("apikey", &self.api_key)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
  }

  /// Turn a non-2xx response into the backend's own error body.
  async fn check(res: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if res.status().is_success() {
      return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    let mut err = serde_json::from_str::<BackendError>(&body)
      .unwrap_or_else(|_| BackendError { message: body, ..Default::default() });
    err.status = status;
    Err(err)
  }

  async fn single_row(res: reqwest::Response, table: &str, id: &str) -> Result<Value, BackendError> {
    let rows: Vec<Value> = Self::check(res).await?.json().await?;
    rows.into_iter().next().ok_or_else(|| BackendError::no_rows(table, id))
  }
}

#[async_trait]
impl Backend for RestBackend {
  fn name(&self) -> &'static str {
    "rest"
  }

  #[instrument(level = "debug", skip(self, query), fields(%table))]
  async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError> {
    let mut params: Vec<(String, String)> = vec![("select".into(), "*".into())];
    for (col, val) in &query.filters {
      params.push((col.clone(), format!("eq.{val}")));
    }
    if let Some((col, asc)) = &query.order {
      let dir = if *asc { "asc" } else { "desc" };
      params.push(("order".into(), format!("{col}.{dir}")));
    }
    let res = self.request(reqwest::Method::GET, table).query(&params).send().await?;
    let rows: Vec<Value> = Self::check(res).await?.json().await?;
    debug!(target: "store", %table, rows = rows.len(), "select");
    Ok(rows)
  }

  #[instrument(level = "debug", skip(self, row), fields(%table))]
  async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
    let res = self
      .request(reqwest::Method::POST, table)
      .header("Prefer", "return=representation")
      .json(&row)
      .send()
      .await?;
    Self::single_row(res, table, "<new>").await
  }

  #[instrument(level = "debug", skip(self, patch), fields(%table, %id))]
  async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, BackendError> {
    let res = self
      .request(reqwest::Method::PATCH, table)
      .header("Prefer", "return=representation")
      .query(&[("id", format!("eq.{id}"))])
      .json(&patch)
      .send()
      .await?;
    Self::single_row(res, table, id).await
  }

  #[instrument(level = "debug", skip(self), fields(%table, %id))]
  async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
    let res = self
      .request(reqwest::Method::DELETE, table)
      .query(&[("id", format!("eq.{id}"))])
      .send()
      .await?;
    Self::check(res).await?;
    Ok(())
  }
}

// --- In-process backend ---

#[derive(Default)]
pub struct MemoryBackend {
  tables: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }
}

/// Filter values arrive as strings, like URL query parameters do.
fn matches_filter(row: &Value, column: &str, expected: &str) -> bool {
  match row.get(column) {
    Some(Value::String(s)) => s == expected,
    Some(Value::Null) | None => expected == "null",
    Some(other) => other.to_string() == expected,
  }
}

/// Nulls sort first; numbers numerically; everything else by its text.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  match (a, b) {
    (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
    (None | Some(Value::Null), _) => Ordering::Less,
    (_, None | Some(Value::Null)) => Ordering::Greater,
    (Some(Value::Number(x)), Some(Value::Number(y))) => x
      .as_f64()
      .partial_cmp(&y.as_f64())
      .unwrap_or(Ordering::Equal),
    (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
    (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
  }
}

fn as_object(row: Value) -> Result<Map<String, Value>, BackendError> {
  match row {
    Value::Object(map) => Ok(map),
    other => Err(BackendError {
      message: format!("expected a JSON object row, got {other}"),
      code: Some("PGRST102".into()),
      status: 400,
      ..Default::default()
    }),
  }
}

#[async_trait]
impl Backend for MemoryBackend {
  fn name(&self) -> &'static str {
    "memory"
  }

  async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError> {
    let tables = self.tables.read().await;
    let mut rows: Vec<Value> = tables
      .get(table)
      .map(|rows| {
        rows.iter()
          .filter(|row| query.filters.iter().all(|(c, v)| matches_filter(row, c, v)))
          .cloned()
          .collect()
      })
      .unwrap_or_default();
    if let Some((col, asc)) = &query.order {
      rows.sort_by(|a, b| {
        let ord = compare_values(a.get(col), b.get(col));
        if *asc { ord } else { ord.reverse() }
      });
    }
    Ok(rows)
  }

  async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
    let mut map = as_object(row)?;
    let missing_id = !matches!(map.get("id"), Some(Value::String(s)) if !s.is_empty());
    if missing_id {
      map.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    }
    let now = Value::String(Utc::now().to_rfc3339());
    for col in ["created_at", "updated_at"] {
      if matches!(map.get(col), None | Some(Value::Null)) {
        map.insert(col.into(), now.clone());
      }
    }
    let stored = Value::Object(map);
    self.tables
      .write()
      .await
      .entry(table.to_string())
      .or_default()
      .push(stored.clone());
    Ok(stored)
  }

  async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, BackendError> {
    let patch = as_object(patch)?;
    let mut tables = self.tables.write().await;
    let row = tables
      .get_mut(table)
      .and_then(|rows| rows.iter_mut().find(|r| matches_filter(r, "id", id)))
      .ok_or_else(|| BackendError::no_rows(table, id))?;
    if let Value::Object(map) = row {
      for (k, v) in patch {
        if k != "id" {
          map.insert(k, v);
        }
      }
      map.insert("updated_at".into(), Value::String(Utc::now().to_rfc3339()));
    }
    Ok(row.clone())
  }

  async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
    if let Some(rows) = self.tables.write().await.get_mut(table) {
      rows.retain(|r| !matches_filter(r, "id", id));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::Matcher;
  use serde_json::json;

  #[tokio::test]
  async fn memory_backend_generates_ids_and_filters() {
    let db = MemoryBackend::new();
    let a = db.insert("tags", json!({ "name": "نحو" })).await.unwrap();
    db.insert("tags", json!({ "id": "t2", "name": "صرف" })).await.unwrap();

    assert!(a["id"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(a["created_at"].is_string());

    let only = db.select("tags", &Query::new().eq("id", "t2")).await.unwrap();
    assert_eq!(only.len(), 1);
    assert_eq!(only[0]["name"], json!("صرف"));

    let sorted = db.select("tags", &Query::new().order_by("name", true)).await.unwrap();
    assert_eq!(sorted[0]["name"], json!("صرف"));
  }

  #[tokio::test]
  async fn memory_backend_update_missing_row_is_no_rows() {
    let db = MemoryBackend::new();
    let err = db.update("questions", "nope", json!({ "tag_ids": [] })).await.unwrap_err();
    assert!(err.is_not_found());
  }

  #[tokio::test]
  async fn memory_backend_orders_nulls_first_and_numbers_numerically() {
    let db = MemoryBackend::new();
    db.insert("subjects", json!({ "id": "a", "order": 10 })).await.unwrap();
    db.insert("subjects", json!({ "id": "b", "order": 2 })).await.unwrap();
    db.insert("subjects", json!({ "id": "c", "order": null })).await.unwrap();
    let rows = db.select("subjects", &Query::new().order_by("order", true)).await.unwrap();
    let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "a"]);
  }

  #[tokio::test]
  async fn rest_backend_sends_postgrest_filters() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/rest/v1/lessons")
      .match_header("apikey", "k")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("section_id".into(), "eq.sec1".into()),
        Matcher::UrlEncoded("order".into(), "order.asc".into()),
      ]))
      .with_status(200)
      .with_body(r#"[{"id":"l1","section_id":"sec1","title":"الدرس الأول"}]"#)
      .create_async()
      .await;

    let be = RestBackend::new(&server.url(), "k").unwrap();
    let rows = be
      .select("lessons", &Query::new().eq("section_id", "sec1").order_by("order", true))
      .await
      .unwrap();
    assert_eq!(rows.len(), 1);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn rest_backend_surfaces_error_body_unmodified() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/rest/v1/questions")
      .with_status(409)
      .with_body(r#"{"message":"duplicate key value violates unique constraint","details":"Key (id)=(q1) already exists.","hint":null,"code":"23505"}"#)
      .create_async()
      .await;

    let be = RestBackend::new(&server.url(), "k").unwrap();
    let err = be.insert("questions", json!({ "id": "q1" })).await.unwrap_err();
    assert_eq!(err.code.as_deref(), Some("23505"));
    assert_eq!(err.details.as_deref(), Some("Key (id)=(q1) already exists."));
    assert_eq!(err.status, 409);
  }

  #[tokio::test]
  async fn rest_backend_update_with_no_rows_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("PATCH", "/rest/v1/tags")
      .match_query(Matcher::UrlEncoded("id".into(), "eq.t9".into()))
      .with_status(200)
      .with_body("[]")
      .create_async()
      .await;

    let be = RestBackend::new(&server.url(), "k").unwrap();
    let err = be.update("tags", "t9", json!({ "name": "x" })).await.unwrap_err();
    assert!(err.is_not_found());
  }
}

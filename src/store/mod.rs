//! Data-access layer: the single seam between domain values and backend rows.
//!
//! One group of functions per entity (`add_*` / `get_*` / `update_*` / `delete_*`).
//! Every failing backend call is logged with its diagnostic fields and the backend
//! error is returned as-is inside `AppError::Backend`.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::backend::{Backend, BackendError, Query};
use crate::error::AppError;

mod curriculum;
mod placeholders;
mod questions;
mod tags;

pub const QUESTIONS: &str = "questions";
pub const SUBJECTS: &str = "subjects";
pub const SECTIONS: &str = "subject_sections";
pub const LESSONS: &str = "lessons";
pub const TAGS: &str = "tags";

#[derive(Clone)]
pub struct Store {
  backend: Arc<dyn Backend>,
}

impl Store {
  pub fn new(backend: Arc<dyn Backend>) -> Self {
    Self { backend }
  }

  pub fn backend_name(&self) -> &'static str {
    self.backend.name()
  }

  async fn select_rows<R: DeserializeOwned>(&self, op: &str, table: &str, query: Query) -> Result<Vec<R>, AppError> {
    let rows = self
      .backend
      .select(table, &query)
      .await
      .map_err(|e| logged(e, op, table))?;
    rows.into_iter()
      .map(|v| serde_json::from_value(v).map_err(AppError::from))
      .collect()
  }

  async fn select_one<R: DeserializeOwned>(
    &self,
    op: &str,
    table: &str,
    entity: &'static str,
    id: &str,
  ) -> Result<R, AppError> {
    self.select_rows::<R>(op, table, Query::new().eq("id", id))
      .await?
      .into_iter()
      .next()
      .ok_or_else(|| AppError::not_found(entity, id))
  }

  async fn insert_row<W: Serialize, R: DeserializeOwned>(&self, op: &str, table: &str, row: &W) -> Result<R, AppError> {
    let stored = self
      .backend
      .insert(table, serde_json::to_value(row)?)
      .await
      .map_err(|e| logged(e, op, table))?;
    Ok(serde_json::from_value(stored)?)
  }

  async fn update_row<R: DeserializeOwned>(&self, op: &str, table: &str, id: &str, patch: Value) -> Result<R, AppError> {
    let stored = self
      .backend
      .update(table, id, patch)
      .await
      .map_err(|e| logged(e, op, table))?;
    Ok(serde_json::from_value(stored)?)
  }

  async fn delete_row(&self, op: &str, table: &str, id: &str) -> Result<(), AppError> {
    self.backend
      .delete(table, id)
      .await
      .map_err(|e| logged(e, op, table))?;
    Ok(())
  }
}

fn logged(e: BackendError, op: &str, table: &str) -> AppError {
  e.log(op, table);
  AppError::Backend(e)
}

/// Serialize a row for an update. `id` is the filter and the timestamps belong to the
/// backend, so none of them are part of the patch.
fn patch_of<W: Serialize>(row: &W) -> Result<Value, AppError> {
  let mut v = serde_json::to_value(row)?;
  if let Value::Object(map) = &mut v {
    for key in ["id", "created_at", "updated_at"] {
      map.remove(key);
    }
  }
  Ok(v)
}

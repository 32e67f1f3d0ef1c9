use serde_json::json;
use tracing::instrument;

use super::{Store, TAGS};
use crate::backend::Query;
use crate::domain::Tag;
use crate::error::AppError;

impl Store {
  #[instrument(level = "debug", skip(self))]
  pub async fn get_tags(&self) -> Result<Vec<Tag>, AppError> {
    self.select_rows("get_tags", TAGS, Query::new().order_by("name", true)).await
  }

  #[instrument(level = "info", skip(self))]
  pub async fn add_tag(&self, name: &str) -> Result<Tag, AppError> {
    self.insert_row("add_tag", TAGS, &json!({ "name": name.trim() })).await
  }

  #[instrument(level = "info", skip(self))]
  pub async fn update_tag(&self, id: &str, name: &str) -> Result<Tag, AppError> {
    self.update_row("update_tag", TAGS, id, json!({ "name": name.trim() })).await
  }

  /// Questions keep the id in their `tag_ids`; references are soft.
  #[instrument(level = "info", skip(self))]
  pub async fn delete_tag(&self, id: &str) -> Result<(), AppError> {
    self.delete_row("delete_tag", TAGS, id).await
  }
}

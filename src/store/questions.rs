use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{patch_of, Store, QUESTIONS};
use crate::backend::Query;
use crate::domain::{NewQuestion, Question, SanityCheck};
use crate::error::AppError;
use crate::rows::{question_from_row, QuestionRow};

impl Store {
  /// All questions, newest first.
  #[instrument(level = "debug", skip(self))]
  pub async fn get_questions(&self) -> Result<Vec<Question>, AppError> {
    let rows: Vec<QuestionRow> = self
      .select_rows("get_questions", QUESTIONS, Query::new().order_by("created_at", false))
      .await?;
    Ok(rows.into_iter().map(question_from_row).collect())
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn get_questions_by_lesson(&self, lesson_id: &str) -> Result<Vec<Question>, AppError> {
    let rows: Vec<QuestionRow> = self
      .select_rows(
        "get_questions_by_lesson",
        QUESTIONS,
        Query::new().eq("lesson_id", lesson_id).order_by("created_at", true),
      )
      .await?;
    Ok(rows.into_iter().map(question_from_row).collect())
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn get_question_by_id(&self, id: &str) -> Result<Question, AppError> {
    let row: QuestionRow = self.select_one("get_question_by_id", QUESTIONS, "question", id).await?;
    Ok(question_from_row(row))
  }

  #[instrument(level = "info", skip(self, new), fields(question_type = %new.kind.question_type().as_str(), subject_id = %new.subject_id))]
  pub async fn add_question(&self, new: NewQuestion) -> Result<Question, AppError> {
    let q = new.into_question(Uuid::new_v4().to_string());
    let stored: QuestionRow = self.insert_row("add_question", QUESTIONS, &QuestionRow::from(&q)).await?;
    let stored = question_from_row(stored);
    info!(target: "store", id = %stored.id, "Question created");
    Ok(stored)
  }

  /// Full-record write of an existing question.
  #[instrument(level = "info", skip(self, q), fields(id = %q.id))]
  pub async fn update_question(&self, q: &Question) -> Result<Question, AppError> {
    let patch = patch_of(&QuestionRow::from(q))?;
    let stored: QuestionRow = self.update_row("update_question", QUESTIONS, &q.id, patch).await?;
    Ok(question_from_row(stored))
  }

  /// Writes only the tag-id list.
  #[instrument(level = "info", skip(self, tag_ids), fields(%id, tags = tag_ids.len()))]
  pub async fn update_question_tags(&self, id: &str, tag_ids: &[String]) -> Result<Question, AppError> {
    let stored: QuestionRow = self
      .update_row("update_question_tags", QUESTIONS, id, json!({ "tag_ids": tag_ids }))
      .await?;
    Ok(question_from_row(stored))
  }

  #[instrument(level = "info", skip(self, result), fields(%id, is_sane = result.is_sane))]
  pub async fn update_question_sanity(&self, id: &str, result: &SanityCheck) -> Result<Question, AppError> {
    let patch = json!({ "is_sane": result.is_sane, "sanity_explanation": result.explanation });
    let stored: QuestionRow = self.update_row("update_question_sanity", QUESTIONS, id, patch).await?;
    Ok(question_from_row(stored))
  }

  #[instrument(level = "info", skip(self))]
  pub async fn delete_question(&self, id: &str) -> Result<(), AppError> {
    self.delete_row("delete_question", QUESTIONS, id).await
  }
}

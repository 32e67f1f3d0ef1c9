//! Operations the relational backend does not serve yet. Each one fails with the
//! fixed "not implemented" error, whatever the input.

use serde_json::Value;

use super::Store;
use crate::error::AppError;

impl Store {
  pub async fn get_exams(&self) -> Result<Vec<Value>, AppError> {
    Err(AppError::NotImplemented("get_exams"))
  }

  pub async fn add_exam(&self, _exam: Value) -> Result<Value, AppError> {
    Err(AppError::NotImplemented("add_exam"))
  }

  pub async fn get_news_articles(&self) -> Result<Vec<Value>, AppError> {
    Err(AppError::NotImplemented("get_news_articles"))
  }

  pub async fn get_activation_codes(&self) -> Result<Vec<Value>, AppError> {
    Err(AppError::NotImplemented("get_activation_codes"))
  }

  pub async fn add_questions_batch(&self, _questions: Vec<Value>) -> Result<usize, AppError> {
    Err(AppError::NotImplemented("add_questions_batch"))
  }
}

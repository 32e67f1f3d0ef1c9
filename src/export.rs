//! Snapshot export of a (filtered) question list as JSON or CSV.
//!
//! Both formats flatten the variant fields into named columns. JSON keeps tag ids as
//! ids; CSV resolves them to tag names (unknown ids are written as-is).

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::{AnswerOption, Question, QuestionKind, Subject, Tag};
use crate::error::AppError;
use crate::listing::subject_name_for;

const LIST_SEPARATOR: &str = " | ";

/// UTF-8 byte order mark so spreadsheet apps detect the encoding of Arabic text.
const UTF8_BOM: &str = "\u{feff}";

const CSV_HEADER: [&str; 15] = [
  "id",
  "subject",
  "lesson_id",
  "question_type",
  "question_text",
  "difficulty",
  "image_url",
  "image_hint",
  "tags",
  "options",
  "correct_option",
  "correct_answers",
  "model_answer",
  "is_sane",
  "sanity_explanation",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
  Json,
  Csv,
}

impl ExportFormat {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "json" => Some(Self::Json),
      "csv" => Some(Self::Csv),
      _ => None,
    }
  }

  pub fn filename(&self) -> &'static str {
    match self {
      Self::Json => "questions-export.json",
      Self::Csv => "questions-export.csv",
    }
  }

  pub fn content_type(&self) -> &'static str {
    match self {
      Self::Json => "application/json; charset=utf-8",
      Self::Csv => "text/csv; charset=utf-8",
    }
  }
}

#[derive(Clone, Debug)]
pub struct ExportFile {
  pub filename: &'static str,
  pub content_type: &'static str,
  pub body: Vec<u8>,
}

/// One flattened question.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
  pub id: String,
  pub subject_id: Option<String>,
  pub subject_name: Option<String>,
  pub lesson_id: Option<String>,
  pub question_type: Option<&'static str>,
  pub question_text: String,
  pub difficulty: &'static str,
  pub image_url: Option<String>,
  pub image_hint: Option<String>,
  pub tag_ids: Vec<String>,
  pub options: Vec<AnswerOption>,
  pub correct_option_id: Option<String>,
  pub correct_answers: Vec<String>,
  pub model_answer: Option<String>,
  pub is_sane: Option<bool>,
  pub sanity_explanation: Option<String>,
}

impl ExportRecord {
  pub fn from_question(q: &Question, subjects: &[Subject]) -> Self {
    let (correct_answers, model_answer) = match &q.kind {
      Some(QuestionKind::FillInTheBlanks { correct_answers }) => (correct_answers.clone(), None),
      Some(QuestionKind::ShortAnswer { model_answer }) => (Vec::new(), model_answer.clone()),
      _ => (Vec::new(), None),
    };
    Self {
      id: q.id.clone(),
      subject_id: q.subject_id.clone(),
      subject_name: subject_name_for(q, subjects).map(str::to_string),
      lesson_id: q.lesson_id.clone(),
      question_type: q.question_type().map(|t| t.as_str()),
      question_text: q.question_text.clone(),
      difficulty: q.difficulty.as_str(),
      image_url: q.image_url.clone(),
      image_hint: q.image_hint.clone(),
      tag_ids: q.tag_ids.clone(),
      options: q.options(),
      correct_option_id: q.correct_option_id().map(str::to_string),
      correct_answers,
      model_answer,
      is_sane: q.sanity_check.as_ref().map(|s| s.is_sane),
      sanity_explanation: q.sanity_check.as_ref().map(|s| s.explanation.clone()),
    }
  }
}

#[instrument(level = "info", skip_all, fields(count = questions.len(), ?format))]
pub fn export_questions(
  questions: &[Question],
  format: ExportFormat,
  subjects: &[Subject],
  tags: &[Tag],
) -> Result<ExportFile, AppError> {
  let body = match format {
    ExportFormat::Json => to_json(questions, subjects)?,
    ExportFormat::Csv => to_csv(questions, subjects, tags)?,
  };
  info!(target: "exam_prep_backend", bytes = body.len(), filename = format.filename(), "Export built");
  Ok(ExportFile { filename: format.filename(), content_type: format.content_type(), body })
}

pub fn to_json(questions: &[Question], subjects: &[Subject]) -> Result<Vec<u8>, AppError> {
  let records: Vec<ExportRecord> = questions.iter().map(|q| ExportRecord::from_question(q, subjects)).collect();
  Ok(serde_json::to_vec_pretty(&records)?)
}

pub fn to_csv(questions: &[Question], subjects: &[Subject], tags: &[Tag]) -> Result<Vec<u8>, AppError> {
  let tag_names: HashMap<&str, &str> = tags.iter().map(|t| (t.id.as_str(), t.name.as_str())).collect();

  let mut out = UTF8_BOM.as_bytes().to_vec();
  {
    let mut w = csv::Writer::from_writer(&mut out);
    w.write_record(CSV_HEADER)?;
    for q in questions {
      let r = ExportRecord::from_question(q, subjects);
      let tags = r
        .tag_ids
        .iter()
        .map(|id| tag_names.get(id.as_str()).copied().unwrap_or(id.as_str()))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR);
      let options = r.options.iter().map(|o| o.text.as_str()).collect::<Vec<_>>().join(LIST_SEPARATOR);
      let correct_option = r
        .correct_option_id
        .as_deref()
        .and_then(|id| r.options.iter().find(|o| o.id == id))
        .map(|o| o.text.clone())
        .unwrap_or_default();
      let is_sane = r.is_sane.map(|b| b.to_string()).unwrap_or_default();

      w.write_record([
        r.id.as_str(),
        r.subject_name.as_deref().unwrap_or(""),
        r.lesson_id.as_deref().unwrap_or(""),
        r.question_type.unwrap_or(""),
        r.question_text.as_str(),
        r.difficulty,
        r.image_url.as_deref().unwrap_or(""),
        r.image_hint.as_deref().unwrap_or(""),
        tags.as_str(),
        options.as_str(),
        correct_option.as_str(),
        r.correct_answers.join(LIST_SEPARATOR).as_str(),
        r.model_answer.as_deref().unwrap_or(""),
        is_sane.as_str(),
        r.sanity_explanation.as_deref().unwrap_or(""),
      ])?;
    }
    w.flush().map_err(|e| AppError::Export(e.to_string()))?;
  }
  Ok(out)
}

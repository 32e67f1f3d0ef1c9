//! Question and AI endpoints. Handlers are thin: they map the request onto the form
//! controller, the store or the AI client and log the outcome.

use std::sync::Arc;

use axum::{
  extract::{Path, Query, State},
  http::{header, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::domain::Question;
use crate::error::{AppError, FieldErrors};
use crate::export::{export_questions, ExportFormat};
use crate::form::{FormMode, QuestionForm, QuestionSubmission};
use crate::listing::{filter_questions, group_by_subject};
use crate::protocol::*;
use crate::state::AppState;
use crate::tagging::apply_tag_suggestions;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut {
    ok: true,
    backend: state.store.backend_name(),
    ai: state.openai.is_some(),
    storage: state.storage.is_some(),
  })
}

/// Questions narrowed by the text filter; subjects and tags are only read when needed.
async fn filtered_questions(state: &AppState, questions: Vec<Question>, q: Option<&str>) -> Result<Vec<Question>, AppError> {
  match q.map(str::trim).filter(|q| !q.is_empty()) {
    Some(q) => {
      let subjects = state.store.get_subjects().await?;
      let tags = state.store.get_tags().await?;
      Ok(filter_questions(questions, q, &subjects, &tags))
    }
    None => Ok(questions),
  }
}

#[instrument(level = "info", skip(state, params), fields(q = ?params.q, grouped = ?params.grouped, lesson = ?params.lesson_id))]
pub async fn http_list_questions(
  State(state): State<Arc<AppState>>,
  Query(params): Query<QuestionListQuery>,
) -> Result<Response, AppError> {
  let questions = match params.lesson_id.as_deref() {
    Some(lesson_id) => state.store.get_questions_by_lesson(lesson_id).await?,
    None => state.store.get_questions().await?,
  };
  let questions = filtered_questions(&state, questions, params.q.as_deref()).await?;
  info!(target: "http", count = questions.len(), "Questions listed");

  if params.grouped.unwrap_or(false) {
    let subjects = state.store.get_subjects().await?;
    Ok(Json(group_by_subject(questions, &subjects)).into_response())
  } else {
    Ok(Json(questions).into_response())
  }
}

#[instrument(level = "info", skip(state, body), fields(question_type = %body.question_type))]
pub async fn http_create_question(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuestionSubmission>,
) -> Result<(StatusCode, Json<Question>), AppError> {
  let new = QuestionForm::from_submission(FormMode::Create, body)?.submit()?;
  let q = state.store.add_question(new).await?;
  info!(target: "http", id = %q.id, "Question created");
  Ok((StatusCode::CREATED, Json(q)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<Question>, AppError> {
  Ok(Json(state.store.get_question_by_id(&id).await?))
}

/// Full-record edit through the edit form.
#[instrument(level = "info", skip(state, body), fields(question_type = %body.question_type))]
pub async fn http_update_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<QuestionSubmission>,
) -> Result<Json<Question>, AppError> {
  let existing = state.store.get_question_by_id(&id).await?;
  let edit = QuestionForm::from_submission(FormMode::Edit { question_id: id.clone() }, body)?.submit()?;
  let q = state.store.update_question(&existing.with_edit(edit)).await?;
  info!(target: "http", id = %q.id, "Question updated");
  Ok(Json(q))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
  state.store.delete_question(&id).await?;
  info!(target: "http", %id, "Question deleted");
  Ok(StatusCode::NO_CONTENT)
}

/// Tag dialog on a stored question: writes only the tag list.
#[instrument(level = "info", skip(state, body), fields(count = body.tag_ids.len()))]
pub async fn http_put_question_tags(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<TagIdsIn>,
) -> Result<Json<Question>, AppError> {
  let mut tag_ids: Vec<String> = Vec::with_capacity(body.tag_ids.len());
  for t in body.tag_ids.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
    if !tag_ids.contains(&t) {
      tag_ids.push(t);
    }
  }
  Ok(Json(state.store.update_question_tags(&id, &tag_ids).await?))
}

/// Runs the AI review on a stored question and records the verdict on it.
#[instrument(level = "info", skip(state))]
pub async fn http_question_sanity_check(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<Question>, AppError> {
  let ai = state.ai()?;
  let q = state.store.get_question_by_id(&id).await?;
  let result = ai.sanity_check(&state.prompts, &q.question_text).await?;
  let q = state.store.update_question_sanity(&id, &result).await?;
  info!(target: "http", %id, is_sane = result.is_sane, "Sanity check stored");
  Ok(Json(q))
}

/// Suggests tags for a stored question, creating missing tags and attaching all of them.
#[instrument(level = "info", skip(state))]
pub async fn http_question_suggest_tags(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuestionTagsOut>, AppError> {
  let ai = state.ai()?;
  let q = state.store.get_question_by_id(&id).await?;
  let suggested_tags = ai.suggest_tags(&state.prompts, &q.question_text).await?;
  let merge = apply_tag_suggestions(&state.store, &q.tag_ids, &suggested_tags).await?;
  let question = state.store.update_question_tags(&id, &merge.selected_tag_ids).await?;
  Ok(Json(QuestionTagsOut { suggested_tags, created_tags: merge.created_tags, question }))
}

#[instrument(level = "info", skip(state, params), fields(format = ?params.format, q = ?params.q))]
pub async fn http_export_questions(
  State(state): State<Arc<AppState>>,
  Query(params): Query<ExportQuery>,
) -> Result<Response, AppError> {
  let raw = params.format.as_deref().unwrap_or("json");
  let format = ExportFormat::parse(raw)
    .ok_or_else(|| AppError::BadRequest(format!("unsupported export format: {raw}")))?;

  let questions = state.store.get_questions().await?;
  let subjects = state.store.get_subjects().await?;
  let tags = state.store.get_tags().await?;
  let visible = match params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
    Some(q) => filter_questions(questions, q, &subjects, &tags),
    None => questions,
  };

  let file = export_questions(&visible, format, &subjects, &tags)?;
  let disposition = format!("attachment; filename=\"{}\"", file.filename);
  Ok((
    [(header::CONTENT_TYPE, file.content_type.to_string()), (header::CONTENT_DISPOSITION, disposition)],
    file.body,
  )
    .into_response())
}

/// Inline "add question" on a lesson page: lesson and subject come from the lesson.
#[instrument(level = "info", skip(state, body), fields(question_type = %body.question_type))]
pub async fn http_add_lesson_question(
  State(state): State<Arc<AppState>>,
  Path(lesson_id): Path<String>,
  Json(body): Json<QuestionSubmission>,
) -> Result<(StatusCode, Json<Question>), AppError> {
  let lesson = state.store.get_lesson_by_id(&lesson_id).await?;
  let mode = FormMode::LessonInline { lesson_id: lesson.id.clone(), subject_id: lesson.subject_id.clone() };
  let new = QuestionForm::from_submission(mode, body)?.submit()?;
  let q = state.store.add_question(new).await?;
  info!(target: "http", id = %q.id, lesson = %lesson.id, "Lesson question created");
  Ok((StatusCode::CREATED, Json(q)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_lesson_questions(
  State(state): State<Arc<AppState>>,
  Path(lesson_id): Path<String>,
) -> Result<Json<Vec<Question>>, AppError> {
  Ok(Json(state.store.get_questions_by_lesson(&lesson_id).await?))
}

fn require_question_text(text: &str) -> Result<(), AppError> {
  if text.trim().is_empty() {
    let mut errors = FieldErrors::default();
    errors.push("questionText", "نص السؤال مطلوب");
    return Err(errors.into());
  }
  Ok(())
}

/// Form helper: review a question that has not been saved yet.
#[instrument(level = "info", skip(state, body), fields(text_len = body.question_text.len()))]
pub async fn http_ai_sanity_check(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SanityCheckIn>,
) -> Result<Json<crate::domain::SanityCheck>, AppError> {
  require_question_text(&body.question_text)?;
  let ai = state.ai()?;
  Ok(Json(ai.sanity_check(&state.prompts, &body.question_text).await?))
}

/// Form helper: suggest tags and merge them into the form's current selection.
#[instrument(level = "info", skip(state, body), fields(text_len = body.question_text.len(), selected = body.selected_tag_ids.len()))]
pub async fn http_ai_suggest_tags(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SuggestTagsIn>,
) -> Result<Json<SuggestTagsOut>, AppError> {
  require_question_text(&body.question_text)?;
  let ai = state.ai()?;
  let suggested_tags = ai.suggest_tags(&state.prompts, &body.question_text).await?;
  let merge = apply_tag_suggestions(&state.store, &body.selected_tag_ids, &suggested_tags).await?;
  Ok(Json(SuggestTagsOut { suggested_tags, merge }))
}

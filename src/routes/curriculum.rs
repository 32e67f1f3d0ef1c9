//! Subjects, sections, lessons and tags: plain CRUD over the store.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use tracing::{info, instrument};

use crate::domain::{Lesson, Subject, SubjectSection, Tag};
use crate::error::{AppError, FieldErrors};
use crate::protocol::TagNameIn;
use crate::state::AppState;
use crate::tagging::select_or_create_tag;

fn required(errors: &mut FieldErrors, field: &str, value: &str, message: &str) {
  if value.trim().is_empty() {
    errors.push(field, message);
  }
}

fn check_subject(s: &Subject) -> Result<(), AppError> {
  let mut errors = FieldErrors::default();
  required(&mut errors, "name", &s.name, "اسم المادة مطلوب");
  errors.into_result().map_err(AppError::from)
}

fn check_section(s: &SubjectSection) -> Result<(), AppError> {
  let mut errors = FieldErrors::default();
  required(&mut errors, "subjectId", &s.subject_id, "المادة مطلوبة");
  required(&mut errors, "title", &s.title, "عنوان القسم مطلوب");
  errors.into_result().map_err(AppError::from)
}

fn check_lesson(l: &Lesson) -> Result<(), AppError> {
  let mut errors = FieldErrors::default();
  required(&mut errors, "sectionId", &l.section_id, "القسم مطلوب");
  required(&mut errors, "title", &l.title, "عنوان الدرس مطلوب");
  errors.into_result().map_err(AppError::from)
}

fn check_tag_name(name: &str) -> Result<(), AppError> {
  let mut errors = FieldErrors::default();
  required(&mut errors, "name", name, "اسم الوسم مطلوب");
  errors.into_result().map_err(AppError::from)
}

// --- subjects ---

#[instrument(level = "info", skip(state))]
pub async fn http_list_subjects(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Subject>>, AppError> {
  Ok(Json(state.store.get_subjects().await?))
}

#[instrument(level = "info", skip(state, body), fields(name = %body.name))]
pub async fn http_create_subject(
  State(state): State<Arc<AppState>>,
  Json(mut body): Json<Subject>,
) -> Result<(StatusCode, Json<Subject>), AppError> {
  check_subject(&body)?;
  body.id.clear();
  let s = state.store.add_subject(&body).await?;
  info!(target: "http", id = %s.id, "Subject created");
  Ok((StatusCode::CREATED, Json(s)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_subject(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<Subject>, AppError> {
  Ok(Json(state.store.get_subject_by_id(&id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_update_subject(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(mut body): Json<Subject>,
) -> Result<Json<Subject>, AppError> {
  check_subject(&body)?;
  body.id = id;
  Ok(Json(state.store.update_subject(&body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_subject(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
  state.store.delete_subject(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// --- sections ---

#[instrument(level = "info", skip(state))]
pub async fn http_subject_sections(
  State(state): State<Arc<AppState>>,
  Path(subject_id): Path<String>,
) -> Result<Json<Vec<SubjectSection>>, AppError> {
  Ok(Json(state.store.get_sections_by_subject(&subject_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(subject = %body.subject_id))]
pub async fn http_create_section(
  State(state): State<Arc<AppState>>,
  Json(mut body): Json<SubjectSection>,
) -> Result<(StatusCode, Json<SubjectSection>), AppError> {
  check_section(&body)?;
  body.id.clear();
  let s = state.store.add_section(&body).await?;
  info!(target: "http", id = %s.id, "Section created");
  Ok((StatusCode::CREATED, Json(s)))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_update_section(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(mut body): Json<SubjectSection>,
) -> Result<Json<SubjectSection>, AppError> {
  check_section(&body)?;
  body.id = id;
  Ok(Json(state.store.update_section(&body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_section(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
  state.store.delete_section(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// --- lessons ---

#[instrument(level = "info", skip(state))]
pub async fn http_section_lessons(
  State(state): State<Arc<AppState>>,
  Path(section_id): Path<String>,
) -> Result<Json<Vec<Lesson>>, AppError> {
  Ok(Json(state.store.get_lessons_by_section(&section_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(section = %body.section_id))]
pub async fn http_create_lesson(
  State(state): State<Arc<AppState>>,
  Json(mut body): Json<Lesson>,
) -> Result<(StatusCode, Json<Lesson>), AppError> {
  check_lesson(&body)?;
  body.id.clear();
  let l = state.store.add_lesson(&body).await?;
  info!(target: "http", id = %l.id, "Lesson created");
  Ok((StatusCode::CREATED, Json(l)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_lesson(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<Lesson>, AppError> {
  Ok(Json(state.store.get_lesson_by_id(&id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_update_lesson(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(mut body): Json<Lesson>,
) -> Result<Json<Lesson>, AppError> {
  check_lesson(&body)?;
  body.id = id;
  Ok(Json(state.store.update_lesson(&body).await?))
}

/// Questions linked to the lesson are left in place.
#[instrument(level = "info", skip(state))]
pub async fn http_delete_lesson(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
  state.store.delete_lesson(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// --- tags ---

#[instrument(level = "info", skip(state))]
pub async fn http_list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, AppError> {
  Ok(Json(state.store.get_tags().await?))
}

/// Same rule as suggestions: a name matching an existing tag selects it (200).
#[instrument(level = "info", skip(state, body), fields(name = %body.name))]
pub async fn http_create_tag(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TagNameIn>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
  check_tag_name(&body.name)?;
  let (tag, created) = select_or_create_tag(&state.store, body.name.trim()).await?;
  let status = if created { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, Json(tag)))
}

#[instrument(level = "info", skip(state, body), fields(name = %body.name))]
pub async fn http_update_tag(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<TagNameIn>,
) -> Result<Json<Tag>, AppError> {
  check_tag_name(&body.name)?;
  Ok(Json(state.store.update_tag(&id, body.name.trim()).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_tag(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
  state.store.delete_tag(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

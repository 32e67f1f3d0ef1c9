//! Subjects, their sections and the lessons inside them.

use tracing::instrument;

use super::{patch_of, Store, LESSONS, SECTIONS, SUBJECTS};
use crate::backend::Query;
use crate::domain::{Lesson, Subject, SubjectSection};
use crate::error::AppError;
use crate::rows::{LessonRow, SectionRow, SubjectRow};

impl Store {
  // --- subjects ---

  #[instrument(level = "debug", skip(self))]
  pub async fn get_subjects(&self) -> Result<Vec<Subject>, AppError> {
    let rows: Vec<SubjectRow> = self
      .select_rows("get_subjects", SUBJECTS, Query::new().order_by("order", true))
      .await?;
    Ok(rows.into_iter().map(Subject::from).collect())
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn get_subject_by_id(&self, id: &str) -> Result<Subject, AppError> {
    let row: SubjectRow = self.select_one("get_subject_by_id", SUBJECTS, "subject", id).await?;
    Ok(row.into())
  }

  #[instrument(level = "info", skip(self, subject), fields(name = %subject.name))]
  pub async fn add_subject(&self, subject: &Subject) -> Result<Subject, AppError> {
    let row: SubjectRow = self.insert_row("add_subject", SUBJECTS, &SubjectRow::from(subject)).await?;
    Ok(row.into())
  }

  #[instrument(level = "info", skip(self, subject), fields(id = %subject.id))]
  pub async fn update_subject(&self, subject: &Subject) -> Result<Subject, AppError> {
    let patch = patch_of(&SubjectRow::from(subject))?;
    let row: SubjectRow = self.update_row("update_subject", SUBJECTS, &subject.id, patch).await?;
    Ok(row.into())
  }

  #[instrument(level = "info", skip(self))]
  pub async fn delete_subject(&self, id: &str) -> Result<(), AppError> {
    self.delete_row("delete_subject", SUBJECTS, id).await
  }

  // --- sections ---

  #[instrument(level = "debug", skip(self))]
  pub async fn get_sections_by_subject(&self, subject_id: &str) -> Result<Vec<SubjectSection>, AppError> {
    let rows: Vec<SectionRow> = self
      .select_rows(
        "get_sections_by_subject",
        SECTIONS,
        Query::new().eq("subject_id", subject_id).order_by("order", true),
      )
      .await?;
    Ok(rows.into_iter().map(SubjectSection::from).collect())
  }

  #[instrument(level = "info", skip(self, section), fields(subject_id = %section.subject_id))]
  pub async fn add_section(&self, section: &SubjectSection) -> Result<SubjectSection, AppError> {
    let row: SectionRow = self.insert_row("add_section", SECTIONS, &SectionRow::from(section)).await?;
    Ok(row.into())
  }

  #[instrument(level = "info", skip(self, section), fields(id = %section.id))]
  pub async fn update_section(&self, section: &SubjectSection) -> Result<SubjectSection, AppError> {
    let patch = patch_of(&SectionRow::from(section))?;
    let row: SectionRow = self.update_row("update_section", SECTIONS, &section.id, patch).await?;
    Ok(row.into())
  }

  #[instrument(level = "info", skip(self))]
  pub async fn delete_section(&self, id: &str) -> Result<(), AppError> {
    self.delete_row("delete_section", SECTIONS, id).await
  }

  // --- lessons ---

  #[instrument(level = "debug", skip(self))]
  pub async fn get_lessons_by_section(&self, section_id: &str) -> Result<Vec<Lesson>, AppError> {
    let rows: Vec<LessonRow> = self
      .select_rows(
        "get_lessons_by_section",
        LESSONS,
        Query::new().eq("section_id", section_id).order_by("order", true),
      )
      .await?;
    Ok(rows.into_iter().map(Lesson::from).collect())
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn get_lesson_by_id(&self, id: &str) -> Result<Lesson, AppError> {
    let row: LessonRow = self.select_one("get_lesson_by_id", LESSONS, "lesson", id).await?;
    Ok(row.into())
  }

  #[instrument(level = "info", skip(self, lesson), fields(section_id = %lesson.section_id))]
  pub async fn add_lesson(&self, lesson: &Lesson) -> Result<Lesson, AppError> {
    let row: LessonRow = self.insert_row("add_lesson", LESSONS, &LessonRow::from(lesson)).await?;
    Ok(row.into())
  }

  #[instrument(level = "info", skip(self, lesson), fields(id = %lesson.id))]
  pub async fn update_lesson(&self, lesson: &Lesson) -> Result<Lesson, AppError> {
    let patch = patch_of(&LessonRow::from(lesson))?;
    let row: LessonRow = self.update_row("update_lesson", LESSONS, &lesson.id, patch).await?;
    Ok(row.into())
  }

  /// Questions linked to the lesson are left untouched.
  #[instrument(level = "info", skip(self))]
  pub async fn delete_lesson(&self, id: &str) -> Result<(), AppError> {
    self.delete_row("delete_lesson", LESSONS, id).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::backend::MemoryBackend;
  use crate::domain::{Difficulty, NewQuestion, QuestionKind, SectionType};

  fn store() -> Store {
    Store::new(Arc::new(MemoryBackend::new()))
  }

  #[tokio::test]
  async fn subjects_are_listed_in_order() {
    let s = store();
    s.add_subject(&Subject { name: "الفيزياء".into(), branch: "علمي".into(), order: Some(2), ..Default::default() })
      .await
      .unwrap();
    s.add_subject(&Subject { name: "العربية".into(), branch: "مشترك".into(), order: Some(1), ..Default::default() })
      .await
      .unwrap();
    let names: Vec<String> = s.get_subjects().await.unwrap().into_iter().map(|x| x.name).collect();
    assert_eq!(names, vec!["العربية", "الفيزياء"]);
  }

  #[tokio::test]
  async fn subject_update_and_delete() {
    let s = store();
    let mut subj = s.add_subject(&Subject { name: "الكيمياء".into(), ..Default::default() }).await.unwrap();
    subj.description = Some("مادة الصف الثالث".into());
    let updated = s.update_subject(&subj).await.unwrap();
    assert_eq!(updated.description.as_deref(), Some("مادة الصف الثالث"));
    assert_eq!(s.get_subject_by_id(&subj.id).await.unwrap(), updated);
    s.delete_subject(&subj.id).await.unwrap();
    assert!(s.get_subjects().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn sections_belong_to_their_subject() {
    let s = store();
    let sec = s
      .add_section(&SubjectSection {
        subject_id: "s1".into(),
        title: "الجزء العملي".into(),
        section_type: SectionType::Practical,
        ..Default::default()
      })
      .await
      .unwrap();
    s.add_section(&SubjectSection { subject_id: "s2".into(), title: "x".into(), ..Default::default() })
      .await
      .unwrap();

    let list = s.get_sections_by_subject("s1").await.unwrap();
    assert_eq!(list, vec![sec.clone()]);
    assert_eq!(list[0].section_type, SectionType::Practical);

    let locked = s.update_section(&SubjectSection { is_locked: true, ..sec.clone() }).await.unwrap();
    assert!(locked.is_locked);
    s.delete_section(&sec.id).await.unwrap();
    assert!(s.get_sections_by_subject("s1").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn deleting_a_lesson_keeps_its_questions() {
    let s = store();
    let lesson = s
      .add_lesson(&Lesson { section_id: "sec1".into(), title: "الدرس الأول".into(), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(s.get_lessons_by_section("sec1").await.unwrap().len(), 1);

    s.add_question(NewQuestion {
      subject_id: "s1".into(),
      lesson_id: Some(lesson.id.clone()),
      question_text: "سؤال مرتبط بالدرس الأول".into(),
      image_url: None,
      image_hint: None,
      difficulty: Difficulty::Medium,
      tag_ids: vec![],
      sanity_check: None,
      kind: QuestionKind::ShortAnswer { model_answer: None },
    })
    .await
    .unwrap();

    s.delete_lesson(&lesson.id).await.unwrap();
    assert!(matches!(s.get_lesson_by_id(&lesson.id).await, Err(AppError::NotFound { .. })));
    assert_eq!(s.get_questions_by_lesson(&lesson.id).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn lesson_update_keeps_teachers() {
    let s = store();
    let mut lesson = s
      .add_lesson(&Lesson { section_id: "sec1".into(), title: "t".into(), ..Default::default() })
      .await
      .unwrap();
    lesson.teachers = vec![crate::domain::LessonTeacher { name: "أ. ليلى".into(), youtube_channel_url: None }];
    let updated = s.update_lesson(&lesson).await.unwrap();
    assert_eq!(updated.teachers.len(), 1);
    assert_eq!(s.get_lesson_by_id(&lesson.id).await.unwrap(), updated);
  }
}

//! Storage shapes: one snake_case row struct per table and the conversions between
//! rows and domain values.
//!
//! The serde derives on these structs are the field map between the two schemas
//! (`imageHint` ↔ `image_hint`, `tagIds` ↔ `tag_ids`, ...). Keep every rename here;
//! the store never builds column names by hand except for partial patches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{
  true_false_options, AnswerOption, Difficulty, Lesson, LessonFile, LessonTeacher, Question,
  QuestionKind, QuestionType, SanityCheck, SectionType, Subject, SubjectSection, TrueFalseAnswer,
};

/// A row of the `questions` table. Variant columns not used by the row's type are null.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct QuestionRow {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default)]
  pub subject_id: Option<String>,
  /// Legacy denormalized subject name; only written back when present.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subject: Option<String>,
  #[serde(default)]
  pub lesson_id: Option<String>,
  #[serde(default)]
  pub question_text: String,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub image_hint: Option<String>,
  #[serde(default)]
  pub difficulty: Option<String>,
  #[serde(default)]
  pub tag_ids: Option<Vec<String>>,
  #[serde(default)]
  pub question_type: Option<String>,
  #[serde(default)]
  pub options: Option<Vec<AnswerOption>>,
  #[serde(default)]
  pub correct_option_id: Option<String>,
  #[serde(default)]
  pub correct_answers: Option<Vec<String>>,
  #[serde(default)]
  pub model_answer: Option<String>,
  #[serde(default)]
  pub is_sane: Option<bool>,
  #[serde(default)]
  pub sanity_explanation: Option<String>,
  #[serde(default)]
  pub is_locked: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Question> for QuestionRow {
  fn from(q: &Question) -> Self {
    let mut row = QuestionRow {
      id: Some(q.id.clone()).filter(|id| !id.is_empty()),
      subject_id: q.subject_id.clone(),
      subject: q.subject_name.clone(),
      lesson_id: q.lesson_id.clone(),
      question_text: q.question_text.clone(),
      image_url: q.image_url.clone(),
      image_hint: q.image_hint.clone(),
      difficulty: Some(q.difficulty.as_str().to_string()),
      tag_ids: Some(q.tag_ids.clone()),
      is_sane: q.sanity_check.as_ref().map(|s| s.is_sane),
      sanity_explanation: q.sanity_check.as_ref().map(|s| s.explanation.clone()),
      is_locked: Some(q.is_locked),
      created_at: q.created_at,
      updated_at: q.updated_at,
      ..Default::default()
    };

    match &q.kind {
      Some(QuestionKind::Mcq { options, correct_option_id }) => {
        row.question_type = Some(QuestionType::Mcq.as_str().into());
        row.options = Some(options.clone());
        row.correct_option_id = Some(correct_option_id.clone());
      }
      Some(QuestionKind::TrueFalse { correct_option_id, .. }) => {
        row.question_type = Some(QuestionType::TrueFalse.as_str().into());
        row.options = Some(true_false_options());
        row.correct_option_id = Some(correct_option_id.as_str().into());
      }
      Some(QuestionKind::FillInTheBlanks { correct_answers }) => {
        row.question_type = Some(QuestionType::FillInTheBlanks.as_str().into());
        row.correct_answers = Some(correct_answers.clone());
      }
      Some(QuestionKind::ShortAnswer { model_answer }) => {
        row.question_type = Some(QuestionType::ShortAnswer.as_str().into());
        row.model_answer = model_answer.clone();
      }
      None => {}
    }
    row
  }
}

/// Rebuild the tagged question from a flat row. Only the active variant's columns are
/// read; an unknown or missing discriminant yields the base shape (`kind: None`).
pub fn question_from_row(row: QuestionRow) -> Question {
  let id = row.id.clone().unwrap_or_default();

  let difficulty = match row.difficulty.as_deref() {
    None => Difficulty::default(),
    Some(raw) => Difficulty::parse(raw).unwrap_or_else(|| {
      warn!(target: "store", %id, difficulty = %raw, "Unrecognized difficulty; using default");
      Difficulty::default()
    }),
  };

  let kind = match row.question_type.as_deref().map(|t| (t, QuestionType::parse(t))) {
    Some((_, Some(QuestionType::Mcq))) => Some(QuestionKind::Mcq {
      options: row.options.unwrap_or_default(),
      correct_option_id: row.correct_option_id.unwrap_or_default(),
    }),
    Some((_, Some(QuestionType::TrueFalse))) => {
      match row.correct_option_id.as_deref().and_then(TrueFalseAnswer::parse) {
        Some(answer) => Some(QuestionKind::true_false(answer)),
        None => {
          warn!(target: "store", %id, correct_option_id = ?row.correct_option_id, "True/false row without a valid answer; returning base shape");
          None
        }
      }
    }
    Some((_, Some(QuestionType::FillInTheBlanks))) => Some(QuestionKind::FillInTheBlanks {
      correct_answers: row.correct_answers.unwrap_or_default(),
    }),
    Some((_, Some(QuestionType::ShortAnswer))) => Some(QuestionKind::ShortAnswer {
      model_answer: row.model_answer,
    }),
    Some((raw, None)) => {
      warn!(target: "store", %id, question_type = %raw, "Unrecognized question type; returning base shape");
      None
    }
    None => {
      warn!(target: "store", %id, "Question row without question_type; returning base shape");
      None
    }
  };

  Question {
    id,
    subject_id: row.subject_id.filter(|s| !s.is_empty()),
    subject_name: row.subject,
    lesson_id: row.lesson_id,
    question_text: row.question_text,
    image_url: row.image_url,
    image_hint: row.image_hint,
    difficulty,
    tag_ids: row.tag_ids.unwrap_or_default(),
    sanity_check: row.is_sane.map(|is_sane| SanityCheck {
      is_sane,
      explanation: row.sanity_explanation.unwrap_or_default(),
    }),
    is_locked: row.is_locked.unwrap_or(false),
    created_at: row.created_at,
    updated_at: row.updated_at,
    kind,
  }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SubjectRow {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub name: String,
  #[serde(default)]
  pub branch: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub icon: Option<String>,
  #[serde(default)]
  pub order: Option<i32>,
}

impl From<&Subject> for SubjectRow {
  fn from(s: &Subject) -> Self {
    Self {
      id: Some(s.id.clone()).filter(|id| !id.is_empty()),
      name: s.name.clone(),
      branch: Some(s.branch.clone()),
      description: s.description.clone(),
      image: s.image.clone(),
      icon: s.icon.clone(),
      order: s.order,
    }
  }
}

impl From<SubjectRow> for Subject {
  fn from(r: SubjectRow) -> Self {
    Self {
      id: r.id.unwrap_or_default(),
      name: r.name,
      branch: r.branch.unwrap_or_default(),
      description: r.description,
      image: r.image,
      icon: r.icon,
      order: r.order,
    }
  }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SectionRow {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub subject_id: String,
  pub title: String,
  #[serde(default, rename = "type")]
  pub section_type: Option<SectionType>,
  #[serde(default)]
  pub order: Option<i32>,
  #[serde(default)]
  pub is_locked: Option<bool>,
}

impl From<&SubjectSection> for SectionRow {
  fn from(s: &SubjectSection) -> Self {
    Self {
      id: Some(s.id.clone()).filter(|id| !id.is_empty()),
      subject_id: s.subject_id.clone(),
      title: s.title.clone(),
      section_type: Some(s.section_type),
      order: s.order,
      is_locked: Some(s.is_locked),
    }
  }
}

impl From<SectionRow> for SubjectSection {
  fn from(r: SectionRow) -> Self {
    Self {
      id: r.id.unwrap_or_default(),
      subject_id: r.subject_id,
      title: r.title,
      section_type: r.section_type.unwrap_or_default(),
      order: r.order,
      is_locked: r.is_locked.unwrap_or(false),
    }
  }
}

/// `lessons` row. `files` and `teachers` are jsonb columns.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LessonRow {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub section_id: String,
  #[serde(default)]
  pub subject_id: Option<String>,
  pub title: String,
  #[serde(default)]
  pub video_url: Option<String>,
  #[serde(default)]
  pub content: Option<String>,
  #[serde(default)]
  pub files: Option<Vec<LessonFile>>,
  #[serde(default)]
  pub teachers: Option<Vec<LessonTeacher>>,
  #[serde(default)]
  pub linked_exam_ids: Option<Vec<String>>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub order: Option<i32>,
  #[serde(default)]
  pub is_locked: Option<bool>,
}

impl From<&Lesson> for LessonRow {
  fn from(l: &Lesson) -> Self {
    Self {
      id: Some(l.id.clone()).filter(|id| !id.is_empty()),
      section_id: l.section_id.clone(),
      subject_id: l.subject_id.clone(),
      title: l.title.clone(),
      video_url: l.video_url.clone(),
      content: l.content.clone(),
      files: Some(l.files.clone()),
      teachers: Some(l.teachers.clone()),
      linked_exam_ids: Some(l.linked_exam_ids.clone()),
      notes: l.notes.clone(),
      order: l.order,
      is_locked: Some(l.is_locked),
    }
  }
}

impl From<LessonRow> for Lesson {
  fn from(r: LessonRow) -> Self {
    Self {
      id: r.id.unwrap_or_default(),
      section_id: r.section_id,
      subject_id: r.subject_id,
      title: r.title,
      video_url: r.video_url,
      content: r.content,
      files: r.files.unwrap_or_default(),
      teachers: r.teachers.unwrap_or_default(),
      linked_exam_ids: r.linked_exam_ids.unwrap_or_default(),
      notes: r.notes,
      order: r.order,
      is_locked: r.is_locked.unwrap_or(false),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use serde_json::json;

  fn base(kind: Option<QuestionKind>) -> Question {
    Question {
      id: "q1".into(),
      subject_id: Some("s1".into()),
      subject_name: None,
      lesson_id: Some("l1".into()),
      question_text: "ما إعراب كلمة الطالبُ في الجملة؟".into(),
      image_url: Some("https://cdn.example.com/q1.png".into()),
      image_hint: Some("رسم توضيحي".into()),
      difficulty: Difficulty::Hard,
      tag_ids: vec!["t1".into(), "t2".into()],
      sanity_check: Some(SanityCheck { is_sane: true, explanation: "سليم".into() }),
      is_locked: true,
      created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
      updated_at: Some(Utc.with_ymd_and_hms(2024, 3, 2, 11, 30, 0).unwrap()),
      kind,
    }
  }

  fn through_json(q: &Question) -> Question {
    // Go through the wire form, as the backend would.
    let v = serde_json::to_value(QuestionRow::from(q)).unwrap();
    question_from_row(serde_json::from_value(v).unwrap())
  }

  #[test]
  fn every_variant_survives_the_storage_round_trip() {
    let kinds = [
      QuestionKind::Mcq {
        options: vec![
          AnswerOption { id: "o1".into(), text: "مبتدأ".into() },
          AnswerOption { id: "o2".into(), text: "خبر".into() },
        ],
        correct_option_id: "o1".into(),
      },
      QuestionKind::true_false(TrueFalseAnswer::True),
      QuestionKind::FillInTheBlanks { correct_answers: vec!["فاعل".into(), "الفاعل".into()] },
      QuestionKind::ShortAnswer { model_answer: Some("مرفوع بالضمة".into()) },
      QuestionKind::ShortAnswer { model_answer: None },
    ];
    for kind in kinds {
      let q = base(Some(kind));
      assert_eq!(through_json(&q), q);
    }
  }

  #[test]
  fn write_nulls_columns_of_other_variants() {
    let q = base(Some(QuestionKind::FillInTheBlanks { correct_answers: vec!["x".into()] }));
    let v = serde_json::to_value(QuestionRow::from(&q)).unwrap();
    assert_eq!(v["question_type"], json!("fill_in_the_blanks"));
    assert_eq!(v["options"], json!(null));
    assert_eq!(v["correct_option_id"], json!(null));
    assert_eq!(v["model_answer"], json!(null));
    assert_eq!(v["image_hint"], json!("رسم توضيحي"));
    assert_eq!(v["tag_ids"], json!(["t1", "t2"]));
  }

  #[test]
  fn true_false_row_always_stores_fixed_pair() {
    let q = base(Some(QuestionKind::true_false(TrueFalseAnswer::False)));
    let row = QuestionRow::from(&q);
    assert_eq!(row.options, Some(true_false_options()));
    assert_eq!(row.correct_option_id.as_deref(), Some("false"));
  }

  #[test]
  fn unknown_type_degrades_to_base_shape() {
    let row: QuestionRow = serde_json::from_value(json!({
      "id": "legacy-1",
      "subject": "اللغة العربية",
      "question_text": "سؤال قديم من المخزن السابق",
      "question_type": "matching",
      "difficulty": "easy",
      "options": [{ "id": "a", "text": "x" }],
      "tag_ids": null
    }))
    .unwrap();
    let q = question_from_row(row);
    assert_eq!(q.kind, None);
    assert_eq!(q.subject_id, None);
    assert_eq!(q.subject_name.as_deref(), Some("اللغة العربية"));
    assert_eq!(q.difficulty, Difficulty::Easy);
    assert!(q.tag_ids.is_empty());
  }

  #[test]
  fn read_ignores_columns_of_other_variants() {
    let row: QuestionRow = serde_json::from_value(json!({
      "id": "q9",
      "subject_id": "s1",
      "question_text": "أكمل الفراغ: ذهب ___ إلى المدرسة",
      "question_type": "fill_in_the_blanks",
      "correct_answers": ["الولد"],
      "options": [{ "id": "stale", "text": "stale" }],
      "correct_option_id": "stale"
    }))
    .unwrap();
    let q = question_from_row(row);
    assert_eq!(q.kind, Some(QuestionKind::FillInTheBlanks { correct_answers: vec!["الولد".into()] }));
    assert!(q.options().is_empty());
  }

  #[test]
  fn lesson_round_trip_keeps_files_and_teachers() {
    let lesson = Lesson {
      id: "l1".into(),
      section_id: "sec1".into(),
      subject_id: Some("s1".into()),
      title: "المعادلات التربيعية".into(),
      video_url: None,
      content: Some("الحل: $$x = \\frac{-b \\pm \\sqrt{b^2-4ac}}{2a}$$".into()),
      files: vec![LessonFile { name: "ملخص.pdf".into(), url: "https://x/y.pdf".into(), file_type: "pdf".into() }],
      teachers: vec![LessonTeacher { name: "أ. سامر".into(), youtube_channel_url: None }],
      linked_exam_ids: vec!["e1".into()],
      notes: None,
      order: Some(3),
      is_locked: false,
    };
    let v = serde_json::to_value(LessonRow::from(&lesson)).unwrap();
    assert!(v.get("video_url").is_some());
    let back: Lesson = serde_json::from_value::<LessonRow>(v).unwrap().into();
    assert_eq!(back, lesson);
  }
}

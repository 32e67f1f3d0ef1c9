//! Domain models used by the backend: the question family (a tagged union over four
//! question types), the curriculum hierarchy (subject → section → lesson) and tags.
//!
//! These types serialize as camelCase JSON for the API. The snake_case storage shape
//! lives in `rows`.

use chrono::{DateTime, Utc};
use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// How hard a question is.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

  pub fn parse(s: &str) -> Option<Self> {
    match s.trim() {
      "easy" => Some(Difficulty::Easy),
      "medium" => Some(Difficulty::Medium),
      "hard" => Some(Difficulty::Hard),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }
}

/// The discriminant of `QuestionKind`, stored in the `question_type` column.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  #[default]
  Mcq,
  TrueFalse,
  FillInTheBlanks,
  ShortAnswer,
}

impl QuestionType {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim() {
      "mcq" => Some(QuestionType::Mcq),
      "true_false" => Some(QuestionType::TrueFalse),
      "fill_in_the_blanks" => Some(QuestionType::FillInTheBlanks),
      "short_answer" => Some(QuestionType::ShortAnswer),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      QuestionType::Mcq => "mcq",
      QuestionType::TrueFalse => "true_false",
      QuestionType::FillInTheBlanks => "fill_in_the_blanks",
      QuestionType::ShortAnswer => "short_answer",
    }
  }
}

/// One selectable option of a multiple-choice (or true/false) question.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerOption {
  pub id: String,
  pub text: String,
}

impl AnswerOption {
  /// New option with a freshly generated id.
  pub fn generated(text: impl Into<String>) -> Self {
    Self { id: Uuid::new_v4().to_string(), text: text.into() }
  }
}

/// The answer of a true/false question. Doubles as the option id.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrueFalseAnswer {
  True,
  False,
}

impl TrueFalseAnswer {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim() {
      "true" => Some(TrueFalseAnswer::True),
      "false" => Some(TrueFalseAnswer::False),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      TrueFalseAnswer::True => "true",
      TrueFalseAnswer::False => "false",
    }
  }
}

/// The fixed option pair every true/false question carries.
pub fn true_false_options() -> Vec<AnswerOption> {
  vec![
    AnswerOption { id: "true".into(), text: "صحيح".into() },
    AnswerOption { id: "false".into(), text: "خطأ".into() },
  ]
}

/// The `options` field of a true/false question. Always written as the fixed pair;
/// whatever a client sends in its place is ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedOptions;

impl Serialize for FixedOptions {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    true_false_options().serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for FixedOptions {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    IgnoredAny::deserialize(deserializer)?;
    Ok(FixedOptions)
  }
}

/// Variant-specific part of a question, tagged by `questionType`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "questionType", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum QuestionKind {
  Mcq {
    options: Vec<AnswerOption>,
    correct_option_id: String,
  },
  TrueFalse {
    correct_option_id: TrueFalseAnswer,
    #[serde(default)]
    options: FixedOptions,
  },
  FillInTheBlanks {
    correct_answers: Vec<String>,
  },
  /// Reference answer only; never auto-graded.
  ShortAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_answer: Option<String>,
  },
}

impl QuestionKind {
  pub fn true_false(answer: TrueFalseAnswer) -> Self {
    QuestionKind::TrueFalse { correct_option_id: answer, options: FixedOptions }
  }

  pub fn question_type(&self) -> QuestionType {
    match self {
      QuestionKind::Mcq { .. } => QuestionType::Mcq,
      QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
      QuestionKind::FillInTheBlanks { .. } => QuestionType::FillInTheBlanks,
      QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
    }
  }
}

/// Result of the Arabic grammar/vocabulary plausibility check.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SanityCheck {
  pub is_sane: bool,
  #[serde(default)]
  pub explanation: String,
}

/// A stored question.
///
/// `kind` is `None` when the stored discriminant was missing or unrecognized; such
/// rows still list and export with their base fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: String,
  pub subject_id: Option<String>,
  /// Denormalized subject name carried by legacy rows.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subject_name: Option<String>,
  #[serde(default)]
  pub lesson_id: Option<String>,
  pub question_text: String,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub image_hint: Option<String>,
  #[serde(default)]
  pub difficulty: Difficulty,
  #[serde(default)]
  pub tag_ids: Vec<String>,
  #[serde(default)]
  pub sanity_check: Option<SanityCheck>,
  #[serde(default)]
  pub is_locked: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub kind: Option<QuestionKind>,
}

impl Question {
  pub fn question_type(&self) -> Option<QuestionType> {
    self.kind.as_ref().map(QuestionKind::question_type)
  }

  /// Options shown to the student: the mcq list, the fixed pair for true/false,
  /// nothing for the other types.
  pub fn options(&self) -> Vec<AnswerOption> {
    match &self.kind {
      Some(QuestionKind::Mcq { options, .. }) => options.clone(),
      Some(QuestionKind::TrueFalse { .. }) => true_false_options(),
      _ => Vec::new(),
    }
  }

  pub fn correct_option_id(&self) -> Option<&str> {
    match &self.kind {
      Some(QuestionKind::Mcq { correct_option_id, .. }) => Some(correct_option_id.as_str()),
      Some(QuestionKind::TrueFalse { correct_option_id, .. }) => Some(correct_option_id.as_str()),
      _ => None,
    }
  }

  /// Full-record edit: the submitted fields replace the stored ones while identity,
  /// creation time, lock flag and legacy subject name are kept.
  pub fn with_edit(&self, edit: NewQuestion) -> Question {
    let mut q = edit.into_question(self.id.clone());
    q.created_at = self.created_at;
    q.updated_at = self.updated_at;
    q.is_locked = self.is_locked;
    q.subject_name = self.subject_name.clone();
    q
  }
}

/// A validated question payload, ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct NewQuestion {
  pub subject_id: String,
  pub lesson_id: Option<String>,
  pub question_text: String,
  pub image_url: Option<String>,
  pub image_hint: Option<String>,
  pub difficulty: Difficulty,
  pub tag_ids: Vec<String>,
  pub sanity_check: Option<SanityCheck>,
  pub kind: QuestionKind,
}

impl NewQuestion {
  pub fn into_question(self, id: String) -> Question {
    Question {
      id,
      subject_id: Some(self.subject_id),
      subject_name: None,
      lesson_id: self.lesson_id,
      question_text: self.question_text,
      image_url: self.image_url,
      image_hint: self.image_hint,
      difficulty: self.difficulty,
      tag_ids: self.tag_ids,
      sanity_check: self.sanity_check,
      is_locked: false,
      created_at: None,
      updated_at: None,
      kind: Some(self.kind),
    }
  }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
  #[serde(default)]
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub branch: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub icon: Option<String>,
  #[serde(default)]
  pub order: Option<i32>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
  #[default]
  Theory,
  Practical,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSection {
  #[serde(default)]
  pub id: String,
  pub subject_id: String,
  pub title: String,
  #[serde(default, rename = "type")]
  pub section_type: SectionType,
  #[serde(default)]
  pub order: Option<i32>,
  #[serde(default)]
  pub is_locked: bool,
}

/// A file attached to a lesson.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LessonFile {
  pub name: String,
  pub url: String,
  #[serde(default, rename = "type")]
  pub file_type: String,
}

/// A teacher presenting a lesson, optionally with an external video channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonTeacher {
  pub name: String,
  #[serde(default)]
  pub youtube_channel_url: Option<String>,
}

/// A lesson inside a section. `content` is rich text that may embed `$…$` / `$$…$$`
/// math markup; it is stored verbatim.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
  #[serde(default)]
  pub id: String,
  pub section_id: String,
  #[serde(default)]
  pub subject_id: Option<String>,
  pub title: String,
  #[serde(default)]
  pub video_url: Option<String>,
  #[serde(default)]
  pub content: Option<String>,
  #[serde(default)]
  pub files: Vec<LessonFile>,
  #[serde(default)]
  pub teachers: Vec<LessonTeacher>,
  #[serde(default)]
  pub linked_exam_ids: Vec<String>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub order: Option<i32>,
  #[serde(default)]
  pub is_locked: bool,
}

/// A free-form label attachable to many questions. Same shape in the API and the
/// `tags` table.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
  #[serde(default)]
  pub id: String,
  pub name: String,
}

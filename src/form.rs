//! Question form controller shared by the three entry points: new question, edit
//! question and the inline "add question" on a lesson.
//!
//! The controller owns a `QuestionDraft`. Shared fields stay put across type switches;
//! the active type's fields live in `VariantFields` and are replaced when the type
//! changes. List fields enforce their bounds here (the UI disables/hides the matching
//! buttons using `can_*`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{NewQuestion, Question, QuestionKind, QuestionType, SanityCheck};
use crate::error::FieldErrors;
use crate::schema::{
  OptionField, QuestionDraft, VariantFields, MAX_OPTIONS, MIN_ANSWERS, MIN_OPTIONS,
};

/// Which page the form lives on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormMode {
  Create,
  Edit { question_id: String },
  /// Inline add on a lesson page: lesson and subject come from the lesson.
  LessonInline { lesson_id: String, subject_id: Option<String> },
}

/// Flat JSON body posted by the question forms. Only the fields of `questionType`
/// are read; anything else in the body is ignored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSubmission {
  pub question_type: String,
  #[serde(default)]
  pub subject_id: String,
  #[serde(default)]
  pub lesson_id: Option<String>,
  #[serde(default)]
  pub question_text: String,
  #[serde(default)]
  pub difficulty: String,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub image_hint: Option<String>,
  #[serde(default)]
  pub tag_ids: Vec<String>,
  #[serde(default)]
  pub options: Vec<OptionField>,
  /// Radio groups post the index as a string; numbers are accepted too.
  #[serde(default, deserialize_with = "string_or_number")]
  pub correct_option_index: Option<String>,
  #[serde(default)]
  pub correct_answer: Option<String>,
  #[serde(default)]
  pub correct_answers: Vec<String>,
  #[serde(default)]
  pub model_answer: Option<String>,
  #[serde(default)]
  pub sanity_check: Option<SanityCheck>,
}

fn string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Option::<Value>::deserialize(de)? {
    Some(Value::String(s)) => Some(s),
    Some(Value::Number(n)) => Some(n.to_string()),
    Some(Value::Bool(b)) => Some(b.to_string()),
    _ => None,
  })
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuestionForm {
  mode: FormMode,
  draft: QuestionDraft,
}

impl QuestionForm {
  pub fn new(mode: FormMode) -> Self {
    let mut draft = QuestionDraft::default();
    if let FormMode::LessonInline { lesson_id, subject_id } = &mode {
      draft.base.lesson_id = Some(lesson_id.clone());
      draft.base.subject_id = subject_id.clone().unwrap_or_default();
    }
    Self { mode, draft }
  }

  /// Edit form pre-filled from a stored question.
  pub fn from_question(q: &Question) -> Self {
    let mut form = Self::new(FormMode::Edit { question_id: q.id.clone() });
    let base = &mut form.draft.base;
    base.subject_id = q.subject_id.clone().unwrap_or_default();
    base.lesson_id = q.lesson_id.clone();
    base.question_text = q.question_text.clone();
    base.difficulty = q.difficulty.as_str().to_string();
    base.image_url = q.image_url.clone().unwrap_or_default();
    base.image_hint = q.image_hint.clone().unwrap_or_default();
    base.tag_ids = q.tag_ids.clone();
    form.draft.sanity_check = q.sanity_check.clone();

    form.draft.variant = match &q.kind {
      Some(QuestionKind::Mcq { options, correct_option_id }) => VariantFields::Mcq {
        options: options
          .iter()
          .map(|o| OptionField { id: Some(o.id.clone()), text: o.text.clone() })
          .collect(),
        correct_option_index: options
          .iter()
          .position(|o| &o.id == correct_option_id)
          .map(|i| i.to_string()),
      },
      Some(QuestionKind::TrueFalse { correct_option_id, .. }) => VariantFields::TrueFalse {
        answer: Some(correct_option_id.as_str().to_string()),
      },
      Some(QuestionKind::FillInTheBlanks { correct_answers }) => VariantFields::FillInTheBlanks {
        answers: correct_answers.clone(),
      },
      Some(QuestionKind::ShortAnswer { model_answer }) => VariantFields::ShortAnswer {
        model_answer: model_answer.clone().unwrap_or_default(),
      },
      None => VariantFields::empty(QuestionType::Mcq),
    };
    form
  }

  /// Map a posted body onto a form for `mode`.
  pub fn from_submission(mode: FormMode, s: QuestionSubmission) -> Result<Self, FieldErrors> {
    let Some(question_type) = QuestionType::parse(&s.question_type) else {
      let mut errors = FieldErrors::default();
      errors.push("questionType", "نوع السؤال غير معروف");
      return Err(errors);
    };

    let mut form = Self::new(mode);
    form.set_question_type(question_type);

    let base = &mut form.draft.base;
    if !s.subject_id.trim().is_empty() || base.subject_id.is_empty() {
      base.subject_id = s.subject_id.trim().to_string();
    }
    if !matches!(form.mode, FormMode::LessonInline { .. }) {
      base.lesson_id = s.lesson_id;
    }
    base.question_text = s.question_text;
    base.difficulty = s.difficulty;
    base.image_url = s.image_url.unwrap_or_default();
    base.image_hint = s.image_hint.unwrap_or_default();
    base.tag_ids = s.tag_ids;
    form.draft.sanity_check = s.sanity_check;

    form.draft.variant = match question_type {
      QuestionType::Mcq => VariantFields::Mcq {
        options: s.options,
        correct_option_index: s.correct_option_index,
      },
      QuestionType::TrueFalse => VariantFields::TrueFalse { answer: s.correct_answer },
      QuestionType::FillInTheBlanks => VariantFields::FillInTheBlanks { answers: s.correct_answers },
      QuestionType::ShortAnswer => VariantFields::ShortAnswer {
        model_answer: s.model_answer.unwrap_or_default(),
      },
    };
    Ok(form)
  }

  pub fn mode(&self) -> &FormMode {
    &self.mode
  }

  pub fn draft(&self) -> &QuestionDraft {
    &self.draft
  }

  pub fn question_type(&self) -> QuestionType {
    self.draft.variant.question_type()
  }

  /// Select a question type. Re-selecting the active type keeps its fields;
  /// any other type starts from blank fields.
  pub fn set_question_type(&mut self, t: QuestionType) {
    if self.question_type() != t {
      self.draft.variant = VariantFields::empty(t);
    }
  }

  pub fn set_question_text(&mut self, text: impl Into<String>) {
    self.draft.base.question_text = text.into();
  }

  pub fn set_subject(&mut self, subject_id: impl Into<String>) {
    self.draft.base.subject_id = subject_id.into();
  }

  pub fn set_difficulty(&mut self, difficulty: impl Into<String>) {
    self.draft.base.difficulty = difficulty.into();
  }

  pub fn set_image(&mut self, url: impl Into<String>, hint: impl Into<String>) {
    self.draft.base.image_url = url.into();
    self.draft.base.image_hint = hint.into();
  }

  pub fn tag_ids(&self) -> &[String] {
    &self.draft.base.tag_ids
  }

  /// Replace the tag selection (tag suggestion or the tag picker).
  pub fn apply_tag_selection(&mut self, tag_ids: Vec<String>) {
    self.draft.base.tag_ids = tag_ids;
  }

  pub fn apply_sanity_check(&mut self, result: SanityCheck) {
    self.draft.sanity_check = Some(result);
  }

  pub fn can_add_option(&self) -> bool {
    matches!(&self.draft.variant, VariantFields::Mcq { options, .. } if options.len() < MAX_OPTIONS)
  }

  pub fn can_remove_option(&self) -> bool {
    matches!(&self.draft.variant, VariantFields::Mcq { options, .. } if options.len() > MIN_OPTIONS)
  }

  pub fn can_remove_answer(&self) -> bool {
    matches!(&self.draft.variant, VariantFields::FillInTheBlanks { answers } if answers.len() > MIN_ANSWERS)
  }

  /// Append a blank option. Refused (false) at the ceiling or for non-mcq types.
  pub fn add_option(&mut self) -> bool {
    if !self.can_add_option() {
      return false;
    }
    if let VariantFields::Mcq { options, .. } = &mut self.draft.variant {
      options.push(OptionField::blank());
    }
    true
  }

  /// Remove an option, keeping the selected answer pointing at the same option.
  pub fn remove_option(&mut self, index: usize) -> bool {
    if !self.can_remove_option() {
      return false;
    }
    let VariantFields::Mcq { options, correct_option_index } = &mut self.draft.variant else {
      return false;
    };
    if index >= options.len() {
      return false;
    }
    options.remove(index);
    let selected = correct_option_index.as_deref().and_then(|s| s.trim().parse::<usize>().ok());
    *correct_option_index = match selected {
      Some(i) if i == index => None,
      Some(i) if i > index => Some((i - 1).to_string()),
      other => other.map(|i| i.to_string()),
    };
    true
  }

  pub fn set_option_text(&mut self, index: usize, text: impl Into<String>) -> bool {
    match &mut self.draft.variant {
      VariantFields::Mcq { options, .. } => match options.get_mut(index) {
        Some(opt) => {
          opt.text = text.into();
          true
        }
        None => false,
      },
      _ => false,
    }
  }

  pub fn select_correct_option(&mut self, index: usize) -> bool {
    match &mut self.draft.variant {
      VariantFields::Mcq { options, correct_option_index } if index < options.len() => {
        *correct_option_index = Some(index.to_string());
        true
      }
      _ => false,
    }
  }

  pub fn set_true_false(&mut self, answer: bool) -> bool {
    match &mut self.draft.variant {
      VariantFields::TrueFalse { answer: slot } => {
        *slot = Some(answer.to_string());
        true
      }
      _ => false,
    }
  }

  pub fn add_answer(&mut self) -> bool {
    match &mut self.draft.variant {
      VariantFields::FillInTheBlanks { answers } => {
        answers.push(String::new());
        true
      }
      _ => false,
    }
  }

  pub fn remove_answer(&mut self, index: usize) -> bool {
    if !self.can_remove_answer() {
      return false;
    }
    match &mut self.draft.variant {
      VariantFields::FillInTheBlanks { answers } if index < answers.len() => {
        answers.remove(index);
        true
      }
      _ => false,
    }
  }

  pub fn set_answer_text(&mut self, index: usize, text: impl Into<String>) -> bool {
    match &mut self.draft.variant {
      VariantFields::FillInTheBlanks { answers } => match answers.get_mut(index) {
        Some(a) => {
          *a = text.into();
          true
        }
        None => false,
      },
      _ => false,
    }
  }

  pub fn set_model_answer(&mut self, text: impl Into<String>) -> bool {
    match &mut self.draft.variant {
      VariantFields::ShortAnswer { model_answer } => {
        *model_answer = text.into();
        true
      }
      _ => false,
    }
  }

  /// Validate and produce the write payload.
  pub fn submit(&self) -> Result<NewQuestion, FieldErrors> {
    self.draft.clone().into_new_question()
  }
}

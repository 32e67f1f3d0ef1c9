//! Question submission schema: one tagged-union draft shared by every question form.
//!
//! `DraftBase` carries the fields common to all question types and is checked with
//! `validator`; `VariantFields` carries the fields of the active type only and is
//! checked by hand. Both report into the same `FieldErrors`.

use serde::{Deserialize, Serialize};
use url::Url;
use validator::{Validate, ValidationError};

use crate::domain::{
  AnswerOption, Difficulty, NewQuestion, QuestionKind, QuestionType, SanityCheck, TrueFalseAnswer,
};
use crate::error::FieldErrors;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;
pub const MIN_ANSWERS: usize = 1;
pub const MIN_QUESTION_TEXT: usize = 10;

fn validate_difficulty(value: &str) -> Result<(), ValidationError> {
  if Difficulty::parse(value).is_some() {
    return Ok(());
  }
  let mut err = ValidationError::new("difficulty");
  let allowed: Vec<&str> = Difficulty::ALL.iter().map(Difficulty::as_str).collect();
  err.message = Some(format!("يرجى اختيار مستوى الصعوبة ({})", allowed.join(" / ")).into());
  Err(err)
}

/// Counted on the trimmed text, since that is what gets stored.
fn validate_question_text(value: &str) -> Result<(), ValidationError> {
  if value.trim().chars().count() >= MIN_QUESTION_TEXT {
    return Ok(());
  }
  let mut err = ValidationError::new("length");
  err.message = Some(format!("يجب أن يتكون نص السؤال من {MIN_QUESTION_TEXT} أحرف على الأقل").into());
  Err(err)
}

/// Empty is allowed; anything else must be an absolute URL.
fn validate_image_url(value: &str) -> Result<(), ValidationError> {
  let value = value.trim();
  if value.is_empty() || Url::parse(value).is_ok() {
    return Ok(());
  }
  let mut err = ValidationError::new("url");
  err.message = Some("رابط الصورة غير صالح".into());
  Err(err)
}

/// Fields shared by all question types.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DraftBase {
  #[validate(length(min = 1, message = "يرجى اختيار المادة"))]
  pub subject_id: String,
  #[serde(default)]
  pub lesson_id: Option<String>,
  #[validate(custom(function = "validate_question_text"))]
  pub question_text: String,
  #[validate(custom(function = "validate_difficulty"))]
  pub difficulty: String,
  #[serde(default)]
  #[validate(custom(function = "validate_image_url"))]
  pub image_url: String,
  #[serde(default)]
  #[validate(length(max = 50, message = "يجب ألا يتجاوز وصف الصورة 50 حرفاً"))]
  pub image_hint: String,
  #[serde(default)]
  pub tag_ids: Vec<String>,
}

/// An editable mcq option; `id` is kept for options that already exist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionField {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub text: String,
}

impl OptionField {
  pub fn blank() -> Self {
    Self::default()
  }
}

/// Fields owned by the active question type. Switching type replaces the whole value,
/// so fields of another type can never ride along into a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariantFields {
  Mcq {
    options: Vec<OptionField>,
    /// Index into `options`, as the form's radio group reports it.
    correct_option_index: Option<String>,
  },
  TrueFalse {
    answer: Option<String>,
  },
  FillInTheBlanks {
    answers: Vec<String>,
  },
  ShortAnswer {
    model_answer: String,
  },
}

impl VariantFields {
  /// Blank fields for a freshly selected type.
  pub fn empty(t: QuestionType) -> Self {
    match t {
      QuestionType::Mcq => VariantFields::Mcq {
        options: vec![OptionField::blank(); MIN_OPTIONS],
        correct_option_index: None,
      },
      QuestionType::TrueFalse => VariantFields::TrueFalse { answer: None },
      QuestionType::FillInTheBlanks => VariantFields::FillInTheBlanks {
        answers: vec![String::new(); MIN_ANSWERS],
      },
      QuestionType::ShortAnswer => VariantFields::ShortAnswer { model_answer: String::new() },
    }
  }

  pub fn question_type(&self) -> QuestionType {
    match self {
      VariantFields::Mcq { .. } => QuestionType::Mcq,
      VariantFields::TrueFalse { .. } => QuestionType::TrueFalse,
      VariantFields::FillInTheBlanks { .. } => QuestionType::FillInTheBlanks,
      VariantFields::ShortAnswer { .. } => QuestionType::ShortAnswer,
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuestionDraft {
  pub base: DraftBase,
  pub variant: VariantFields,
  pub sanity_check: Option<SanityCheck>,
}

impl Default for QuestionDraft {
  fn default() -> Self {
    Self {
      base: DraftBase { difficulty: Difficulty::default().as_str().into(), ..Default::default() },
      variant: VariantFields::empty(QuestionType::Mcq),
      sanity_check: None,
    }
  }
}

fn parse_index(raw: Option<&str>) -> Option<usize> {
  raw.map(str::trim).filter(|s| !s.is_empty()).and_then(|s| s.parse().ok())
}

/// Check a draft. All problems are collected, not just the first one.
pub fn validate(draft: &QuestionDraft) -> Result<(), FieldErrors> {
  let mut errors = match draft.base.validate() {
    Ok(()) => FieldErrors::default(),
    Err(e) => FieldErrors::from(e),
  };

  if draft.base.subject_id.trim().is_empty() && !errors.contains("subjectId") {
    errors.push("subjectId", "يرجى اختيار المادة");
  }

  match &draft.variant {
    VariantFields::Mcq { options, correct_option_index } => {
      if options.len() < MIN_OPTIONS {
        errors.push("options", format!("يجب إضافة {MIN_OPTIONS} خيارات على الأقل"));
      }
      if options.len() > MAX_OPTIONS {
        errors.push("options", format!("لا يمكن إضافة أكثر من {MAX_OPTIONS} خيارات"));
      }
      let mut seen: Vec<&str> = Vec::with_capacity(options.len());
      for (i, opt) in options.iter().enumerate() {
        if opt.text.trim().is_empty() {
          errors.push(format!("options[{i}].text"), "نص الخيار مطلوب");
        }
        if let Some(id) = opt.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
          if seen.contains(&id) {
            errors.push(format!("options[{i}].id"), "معرّف الخيار مكرر");
          }
          seen.push(id);
        }
      }
      let raw = correct_option_index.as_deref();
      match parse_index(raw) {
        Some(i) if i < options.len() => {}
        _ if raw.map(str::trim).unwrap_or_default().is_empty() => {
          errors.push("correctOptionIndex", "يرجى تحديد الإجابة الصحيحة");
        }
        _ => errors.push("correctOptionIndex", "الإجابة الصحيحة المحددة غير صالحة"),
      }
    }
    VariantFields::TrueFalse { answer } => {
      if answer.as_deref().and_then(TrueFalseAnswer::parse).is_none() {
        errors.push("correctAnswer", "يرجى اختيار صح أو خطأ");
      }
    }
    VariantFields::FillInTheBlanks { answers } => {
      if answers.len() < MIN_ANSWERS {
        errors.push("correctAnswers", "يجب إضافة إجابة واحدة على الأقل");
      }
      for (i, a) in answers.iter().enumerate() {
        if a.trim().is_empty() {
          errors.push(format!("correctAnswers[{i}]"), "الإجابة مطلوبة");
        }
      }
    }
    VariantFields::ShortAnswer { .. } => {}
  }

  errors.into_result()
}

fn non_empty(s: &str) -> Option<String> {
  let t = s.trim();
  if t.is_empty() { None } else { Some(t.to_string()) }
}

impl QuestionDraft {
  /// Validate and build the write payload. New mcq options get generated ids and the
  /// selected index becomes `correctOptionId`.
  pub fn into_new_question(self) -> Result<NewQuestion, FieldErrors> {
    validate(&self)?;

    let kind = match self.variant {
      VariantFields::Mcq { options, correct_option_index } => {
        let options: Vec<AnswerOption> = options
          .into_iter()
          .map(|o| match o.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => AnswerOption { id: id.to_string(), text: o.text.trim().to_string() },
            None => AnswerOption::generated(o.text.trim()),
          })
          .collect();
        let index = parse_index(correct_option_index.as_deref()).unwrap_or_default();
        let correct_option_id = options[index].id.clone();
        QuestionKind::Mcq { options, correct_option_id }
      }
      VariantFields::TrueFalse { answer } => QuestionKind::true_false(
        answer
          .as_deref()
          .and_then(TrueFalseAnswer::parse)
          .unwrap_or(TrueFalseAnswer::True),
      ),
      VariantFields::FillInTheBlanks { answers } => QuestionKind::FillInTheBlanks {
        correct_answers: answers.iter().map(|a| a.trim().to_string()).collect(),
      },
      VariantFields::ShortAnswer { model_answer } => QuestionKind::ShortAnswer {
        model_answer: non_empty(&model_answer),
      },
    };

    let mut tag_ids: Vec<String> = Vec::with_capacity(self.base.tag_ids.len());
    for id in self.base.tag_ids {
      if !id.is_empty() && !tag_ids.contains(&id) {
        tag_ids.push(id);
      }
    }

    Ok(NewQuestion {
      subject_id: self.base.subject_id.trim().to_string(),
      lesson_id: self.base.lesson_id.as_deref().and_then(non_empty),
      question_text: self.base.question_text.trim().to_string(),
      image_url: non_empty(&self.base.image_url),
      image_hint: non_empty(&self.base.image_hint),
      difficulty: Difficulty::parse(&self.base.difficulty).unwrap_or_default(),
      tag_ids,
      sanity_check: self.sanity_check,
      kind,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn draft(variant: VariantFields) -> QuestionDraft {
    QuestionDraft {
      base: DraftBase {
        subject_id: "s1".into(),
        question_text: "What is 2+2? (10+ chars)".into(),
        difficulty: "easy".into(),
        ..Default::default()
      },
      variant,
      sanity_check: None,
    }
  }

  fn opts(texts: &[&str]) -> Vec<OptionField> {
    texts.iter().map(|t| OptionField { id: None, text: t.to_string() }).collect()
  }

  #[test]
  fn mcq_selected_index_becomes_correct_option_id() {
    let d = draft(VariantFields::Mcq { options: opts(&["3", "4"]), correct_option_index: Some("1".into()) });
    let q = d.into_new_question().unwrap();
    match q.kind {
      QuestionKind::Mcq { options, correct_option_id } => {
        assert_eq!(options.len(), 2);
        assert!(options.iter().all(|o| !o.id.is_empty()));
        assert_ne!(options[0].id, options[1].id);
        assert_eq!(correct_option_id, options[1].id);
      }
      other => panic!("unexpected kind {other:?}"),
    }
  }

  #[test]
  fn mcq_existing_option_ids_are_kept() {
    let mut options = opts(&["أ", "ب", "ج"]);
    options[2].id = Some("keep-me".into());
    let d = draft(VariantFields::Mcq { options, correct_option_index: Some("2".into()) });
    let q = d.into_new_question().unwrap();
    assert!(matches!(q.kind, QuestionKind::Mcq { ref correct_option_id, .. } if correct_option_id == "keep-me"));
  }

  #[test]
  fn duplicate_option_ids_are_rejected() {
    let options = vec![
      OptionField { id: Some("a".into()), text: "3".into() },
      OptionField { id: Some(" a ".into()), text: "4".into() },
      OptionField { id: None, text: "5".into() },
    ];
    let d = draft(VariantFields::Mcq { options, correct_option_index: Some("1".into()) });
    let errs = validate(&d).unwrap_err();
    assert!(errs.contains("options[1].id"), "{errs:?}");
    assert!(!errs.contains("options[0].id"));
    assert!(d.into_new_question().is_err());
  }

  #[test]
  fn padded_text_is_measured_after_trimming() {
    let mut d = draft(VariantFields::ShortAnswer { model_answer: String::new() });
    d.base.question_text = "   abc       ".into();
    assert!(validate(&d).unwrap_err().contains("questionText"));

    d.base.question_text = "  ابتثجحخدذر  ".into();
    let q = d.into_new_question().unwrap();
    assert_eq!(q.question_text, "ابتثجحخدذر");
  }

  #[test]
  fn base_rules_report_each_field() {
    let mut d = draft(VariantFields::ShortAnswer { model_answer: String::new() });
    d.base.subject_id = String::new();
    d.base.question_text = "قصير".into();
    d.base.difficulty = "extreme".into();
    d.base.image_url = "not a url".into();
    d.base.image_hint = "و".repeat(51);

    let errs = validate(&d).unwrap_err();
    for f in ["subjectId", "questionText", "difficulty", "imageUrl", "imageHint"] {
      assert!(errs.contains(f), "missing error for {f}: {errs:?}");
    }
  }

  #[test]
  fn text_length_counts_characters_not_bytes() {
    // 10 Arabic letters are 20 bytes; they must pass the 10-character floor.
    let mut d = draft(VariantFields::ShortAnswer { model_answer: String::new() });
    d.base.question_text = "ابتثجحخدذر".into();
    assert!(validate(&d).is_ok());
    d.base.image_hint = "ص".repeat(50);
    assert!(validate(&d).is_ok());
  }

  #[test]
  fn empty_image_url_is_allowed() {
    let mut d = draft(VariantFields::ShortAnswer { model_answer: String::new() });
    d.base.image_url = "   ".into();
    assert!(validate(&d).is_ok());
    d.base.image_url = "https://cdn.example.com/a.png".into();
    assert!(validate(&d).is_ok());
  }

  #[test]
  fn mcq_bounds_and_option_text() {
    let d = draft(VariantFields::Mcq { options: opts(&["only"]), correct_option_index: Some("0".into()) });
    assert!(validate(&d).unwrap_err().contains("options"));

    let d = draft(VariantFields::Mcq {
      options: opts(&["1", "2", "3", "4", "5", "6", "7"]),
      correct_option_index: Some("0".into()),
    });
    assert!(validate(&d).unwrap_err().contains("options"));

    let d = draft(VariantFields::Mcq { options: opts(&["ok", " "]), correct_option_index: Some("0".into()) });
    assert!(validate(&d).unwrap_err().contains("options[1].text"));
  }

  #[test]
  fn mcq_index_must_point_at_an_option() {
    for bad in [None, Some(""), Some("2"), Some("x"), Some("-1")] {
      let d = draft(VariantFields::Mcq {
        options: opts(&["a", "b"]),
        correct_option_index: bad.map(String::from),
      });
      assert!(validate(&d).unwrap_err().contains("correctOptionIndex"), "accepted {bad:?}");
    }
  }

  #[test]
  fn true_false_requires_an_answer() {
    let d = draft(VariantFields::TrueFalse { answer: None });
    assert!(validate(&d).unwrap_err().contains("correctAnswer"));
    let d = draft(VariantFields::TrueFalse { answer: Some("false".into()) });
    let q = d.into_new_question().unwrap();
    assert_eq!(q.kind, QuestionKind::true_false(TrueFalseAnswer::False));
  }

  #[test]
  fn fill_in_the_blanks_needs_one_non_empty_answer() {
    let d = draft(VariantFields::FillInTheBlanks { answers: vec![] });
    assert!(validate(&d).unwrap_err().contains("correctAnswers"));
    let d = draft(VariantFields::FillInTheBlanks { answers: vec!["".into()] });
    assert!(validate(&d).unwrap_err().contains("correctAnswers[0]"));
    let d = draft(VariantFields::FillInTheBlanks { answers: vec![" ذهب ".into()] });
    let q = d.into_new_question().unwrap();
    assert_eq!(q.kind, QuestionKind::FillInTheBlanks { correct_answers: vec!["ذهب".into()] });
  }

  #[test]
  fn payload_trims_and_dedupes() {
    let mut d = draft(VariantFields::ShortAnswer { model_answer: "  ".into() });
    d.base.tag_ids = vec!["t1".into(), "t1".into(), "t2".into()];
    d.base.image_hint = "  ".into();
    d.base.lesson_id = Some(" ".into());
    let q = d.into_new_question().unwrap();
    assert_eq!(q.tag_ids, vec!["t1", "t2"]);
    assert_eq!(q.image_hint, None);
    assert_eq!(q.lesson_id, None);
    assert_eq!(q.kind, QuestionKind::ShortAnswer { model_answer: None });
  }
}

//! In-memory grouping and text filtering of question lists.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{Question, Subject, Tag};
use crate::util::fold_key;

pub const UNCATEGORIZED_LABEL: &str = "غير مصنف";

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectGroup {
  /// `None` for the uncategorized bucket.
  pub subject_id: Option<String>,
  pub subject_name: String,
  pub questions: Vec<Question>,
}

/// Subject id of a question, treating an empty id as missing.
fn subject_key(q: &Question) -> Option<&str> {
  q.subject_id.as_deref().filter(|s| !s.trim().is_empty())
}

/// Display name of a question's subject: the subject table first, then the legacy
/// denormalized name.
pub fn subject_name_for<'a>(q: &'a Question, subjects: &'a [Subject]) -> Option<&'a str> {
  subject_key(q)
    .and_then(|id| subjects.iter().find(|s| s.id == id))
    .map(|s| s.name.as_str())
    .or(q.subject_name.as_deref())
}

/// Bucket questions by subject. Groups follow the subject order, then subject ids that
/// are not in the subject list (first-seen order), then the uncategorized bucket.
/// Empty groups are omitted; question order inside a group is kept.
pub fn group_by_subject(questions: Vec<Question>, subjects: &[Subject]) -> Vec<SubjectGroup> {
  let mut by_subject: HashMap<String, Vec<Question>> = HashMap::new();
  let mut unknown_order: Vec<String> = Vec::new();
  let mut uncategorized: Vec<Question> = Vec::new();

  for q in questions {
    match subject_key(&q).map(str::to_string) {
      Some(id) => {
        if !subjects.iter().any(|s| s.id == id) && !unknown_order.contains(&id) {
          unknown_order.push(id.clone());
        }
        by_subject.entry(id).or_default().push(q);
      }
      None => uncategorized.push(q),
    }
  }

  let mut groups = Vec::new();
  for s in subjects {
    if let Some(qs) = by_subject.remove(&s.id) {
      groups.push(SubjectGroup { subject_id: Some(s.id.clone()), subject_name: s.name.clone(), questions: qs });
    }
  }
  for id in unknown_order {
    if let Some(qs) = by_subject.remove(&id) {
      let name = qs
        .iter()
        .find_map(|q| q.subject_name.clone())
        .unwrap_or_else(|| id.clone());
      groups.push(SubjectGroup { subject_id: Some(id), subject_name: name, questions: qs });
    }
  }
  if !uncategorized.is_empty() {
    groups.push(SubjectGroup {
      subject_id: None,
      subject_name: UNCATEGORIZED_LABEL.to_string(),
      questions: uncategorized,
    });
  }
  groups
}

/// Keep questions whose text, subject name or any tag name contains `query`
/// (case-insensitive, whitespace-normalized). A blank query keeps everything.
pub fn filter_questions(questions: Vec<Question>, query: &str, subjects: &[Subject], tags: &[Tag]) -> Vec<Question> {
  let needle = fold_key(query);
  if needle.is_empty() {
    return questions;
  }
  let tag_names: HashMap<&str, String> = tags.iter().map(|t| (t.id.as_str(), fold_key(&t.name))).collect();

  questions
    .into_iter()
    .filter(|q| {
      fold_key(&q.question_text).contains(&needle)
        || subject_name_for(q, subjects).is_some_and(|n| fold_key(n).contains(&needle))
        || q.tag_ids.iter().any(|id| tag_names.get(id.as_str()).is_some_and(|n| n.contains(&needle)))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, QuestionKind};

  fn question(id: &str, subject: Option<&str>, text: &str, tags: &[&str]) -> Question {
    Question {
      id: id.into(),
      subject_id: subject.map(str::to_string),
      subject_name: None,
      lesson_id: None,
      question_text: text.into(),
      image_url: None,
      image_hint: None,
      difficulty: Difficulty::Medium,
      tag_ids: tags.iter().map(|t| t.to_string()).collect(),
      sanity_check: None,
      is_locked: false,
      created_at: None,
      updated_at: None,
      kind: Some(QuestionKind::ShortAnswer { model_answer: None }),
    }
  }

  fn subject(id: &str, name: &str) -> Subject {
    Subject { id: id.into(), name: name.into(), ..Default::default() }
  }

  #[test]
  fn groups_follow_subject_order_then_unknown_then_uncategorized() {
    let subjects = vec![subject("s1", "الرياضيات"), subject("s2", "اللغة العربية")];
    let mut legacy = question("q4", Some("old"), "legacy question text", &[]);
    legacy.subject_name = Some("فيزياء".into());
    let qs = vec![
      question("q1", Some("s2"), "first arabic question", &[]),
      question("q2", None, "no subject at all here", &[]),
      question("q3", Some("s1"), "first math question", &[]),
      legacy,
      question("q5", Some(""), "blank subject id here", &[]),
      question("q6", Some("s2"), "second arabic question", &[]),
    ];

    let groups = group_by_subject(qs, &subjects);
    let summary: Vec<(Option<&str>, &str, usize)> = groups
      .iter()
      .map(|g| (g.subject_id.as_deref(), g.subject_name.as_str(), g.questions.len()))
      .collect();
    assert_eq!(
      summary,
      vec![
        (Some("s1"), "الرياضيات", 1),
        (Some("s2"), "اللغة العربية", 2),
        (Some("old"), "فيزياء", 1),
        (None, UNCATEGORIZED_LABEL, 2),
      ]
    );
    assert_eq!(groups[1].questions[0].id, "q1");
    assert_eq!(groups[1].questions[1].id, "q6");
  }

  #[test]
  fn filter_matches_text_subject_and_tags() {
    let subjects = vec![subject("s1", "Mathematics")];
    let tags = vec![Tag { id: "t1".into(), name: "Algebra".into() }];
    let qs = vec![
      question("q1", Some("s1"), "What is 2+2 exactly?", &[]),
      question("q2", None, "Solve for x: x + 1 = 3", &["t1"]),
      question("q3", None, "ما هو الفاعل في الجملة؟", &[]),
    ];

    let ids = |v: Vec<Question>| v.into_iter().map(|q| q.id).collect::<Vec<_>>();
    assert_eq!(ids(filter_questions(qs.clone(), "MATHEMATICS", &subjects, &tags)), vec!["q1"]);
    assert_eq!(ids(filter_questions(qs.clone(), "algebra", &subjects, &tags)), vec!["q2"]);
    assert_eq!(ids(filter_questions(qs.clone(), "الفاعل", &subjects, &tags)), vec!["q3"]);
    assert_eq!(filter_questions(qs.clone(), "   ", &subjects, &tags).len(), 3);
    assert!(filter_questions(qs, "chemistry", &subjects, &tags).is_empty());
  }

  #[test]
  fn legacy_subject_name_is_searchable() {
    let mut q = question("q1", None, "some legacy question", &[]);
    q.subject_name = Some("Physics".into());
    assert_eq!(filter_questions(vec![q], "phys", &[], &[]).len(), 1);
  }
}

//! Merging suggested tag names into a question's tag selection.
//!
//! A suggested name selects the existing tag with the same name (case-insensitive,
//! surrounding whitespace ignored) or, if there is none, a new tag is created and
//! selected. Selected ids are never duplicated, and a name never produces two tags.
//! There is no rollback: tags created before a later failure stay created.

use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::Tag;
use crate::error::AppError;
use crate::store::Store;
use crate::util::fold_key;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagMergePlan {
  /// Selection after merging the existing tags that matched.
  pub selected_ids: Vec<String>,
  /// Names with no existing tag, in suggestion order, deduplicated.
  pub to_create: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagMergeOutcome {
  pub selected_tag_ids: Vec<String>,
  pub created_tags: Vec<Tag>,
}

pub fn plan_tag_merge(existing: &[Tag], selected: &[String], suggested: &[String]) -> TagMergePlan {
  let mut plan = TagMergePlan::default();
  for id in selected {
    if !plan.selected_ids.contains(id) {
      plan.selected_ids.push(id.clone());
    }
  }

  let mut pending_keys: Vec<String> = Vec::new();
  for name in suggested {
    let key = fold_key(name);
    if key.is_empty() {
      continue;
    }
    match existing.iter().find(|t| fold_key(&t.name) == key) {
      Some(tag) => {
        if !plan.selected_ids.contains(&tag.id) {
          plan.selected_ids.push(tag.id.clone());
        }
      }
      None => {
        if !pending_keys.contains(&key) {
          pending_keys.push(key);
          plan.to_create.push(name.trim().to_string());
        }
      }
    }
  }
  plan
}

/// Read the current tags, create the missing ones and return the merged selection.
#[instrument(level = "info", skip(store, selected, suggested), fields(selected = selected.len(), suggested = suggested.len()))]
pub async fn apply_tag_suggestions(
  store: &Store,
  selected: &[String],
  suggested: &[String],
) -> Result<TagMergeOutcome, AppError> {
  let existing = store.get_tags().await?;
  let plan = plan_tag_merge(&existing, selected, suggested);

  let mut outcome = TagMergeOutcome { selected_tag_ids: plan.selected_ids, created_tags: Vec::new() };
  for name in &plan.to_create {
    let tag = store.add_tag(name).await?;
    if !outcome.selected_tag_ids.contains(&tag.id) {
      outcome.selected_tag_ids.push(tag.id.clone());
    }
    outcome.created_tags.push(tag);
  }
  info!(target: "store", created = outcome.created_tags.len(), selected = outcome.selected_tag_ids.len(), "Tag suggestions merged");
  Ok(outcome)
}

/// The tag a typed name refers to: the existing one with the same name, else a new one.
/// The flag is true when the tag was created.
#[instrument(level = "info", skip(store))]
pub async fn select_or_create_tag(store: &Store, name: &str) -> Result<(Tag, bool), AppError> {
  let key = fold_key(name);
  if let Some(tag) = store.get_tags().await?.into_iter().find(|t| fold_key(&t.name) == key) {
    info!(target: "store", id = %tag.id, "Typed tag matched an existing one");
    return Ok((tag, false));
  }
  Ok((store.add_tag(name).await?, true))
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::backend::MemoryBackend;

  fn tag(id: &str, name: &str) -> Tag {
    Tag { id: id.into(), name: name.into() }
  }

  fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn existing_names_match_case_insensitively() {
    let existing = vec![tag("t1", "Algebra"), tag("t2", "النحو")];
    let plan = plan_tag_merge(&existing, &[], &names(&[" algebra ", "النحو", "Geometry"]));
    assert_eq!(plan.selected_ids, vec!["t1", "t2"]);
    assert_eq!(plan.to_create, vec!["Geometry"]);
  }

  #[test]
  fn already_selected_tags_are_not_duplicated() {
    let existing = vec![tag("t1", "Algebra")];
    let selected = names(&["t1"]);
    let plan = plan_tag_merge(&existing, &selected, &names(&["ALGEBRA", "algebra"]));
    assert_eq!(plan.selected_ids, vec!["t1"]);
    assert!(plan.to_create.is_empty());
  }

  #[test]
  fn new_names_are_created_once() {
    let plan = plan_tag_merge(&[], &[], &names(&["Physics", "physics ", "", "  "]));
    assert_eq!(plan.to_create, vec!["Physics"]);
  }

  #[tokio::test]
  async fn applying_twice_is_idempotent() {
    let store = Store::new(Arc::new(MemoryBackend::new()));
    store.add_tag("الصرف").await.unwrap();

    let first = apply_tag_suggestions(&store, &[], &names(&["الصرف", "البلاغة"])).await.unwrap();
    assert_eq!(first.created_tags.len(), 1);
    assert_eq!(first.selected_tag_ids.len(), 2);

    let second = apply_tag_suggestions(&store, &first.selected_tag_ids, &names(&["البلاغة", "الصرف"]))
      .await
      .unwrap();
    assert!(second.created_tags.is_empty());
    assert_eq!(second.selected_tag_ids, first.selected_tag_ids);
    assert_eq!(store.get_tags().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn typed_name_reuses_existing_tag() {
    let store = Store::new(Arc::new(MemoryBackend::new()));
    let (first, created) = select_or_create_tag(&store, "Algebra").await.unwrap();
    assert!(created);
    let (again, created) = select_or_create_tag(&store, "  algebra ").await.unwrap();
    assert!(!created);
    assert_eq!(again.id, first.id);
    assert_eq!(store.get_tags().await.unwrap().len(), 1);
  }
}

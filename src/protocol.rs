//! Request/response bodies of the HTTP API that are not domain types themselves.
//! Domain values (`Question`, `Subject`, ...) travel as-is in camelCase.

use serde::{Deserialize, Serialize};

use crate::domain::{Question, Tag};
use crate::tagging::TagMergeOutcome;

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub backend: &'static str,
    pub ai: bool,
    pub storage: bool,
}

/// `GET /api/v1/questions?q=&grouped=&lessonId=`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub grouped: Option<bool>,
    #[serde(default)]
    pub lesson_id: Option<String>,
}

/// `GET /api/v1/questions/export?format=json|csv&q=`
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagIdsIn {
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TagNameIn {
    pub name: String,
}

/// Sanity check of a question that is still being edited.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityCheckIn {
    #[serde(alias = "question")]
    pub question_text: String,
}

/// Tag suggestion for a question being edited; the current selection is merged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestTagsIn {
    pub question_text: String,
    #[serde(default)]
    pub selected_tag_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestTagsOut {
    pub suggested_tags: Vec<String>,
    #[serde(flatten)]
    pub merge: TagMergeOutcome,
}

/// Tag suggestion applied to a stored question.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTagsOut {
    pub suggested_tags: Vec<String>,
    pub created_tags: Vec<Tag>,
    pub question: Question,
}

/// Upload body. Either `path` or `fileName` (optionally under `folder`) names the object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadIn {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Raw base64 or a `data:<mime>;base64,` URL.
    pub data_base64: String,
}

fn default_content_type() -> String {
    "application/octet-stream".into()
}

#[derive(Debug, Serialize)]
pub struct UploadOut {
    pub bucket: String,
    pub path: String,
    pub url: String,
}

/// Delete body: a bucket-relative `path` or a public `url`.
#[derive(Debug, Deserialize)]
pub struct DeleteObjectIn {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

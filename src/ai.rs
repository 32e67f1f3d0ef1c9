//! Chat-completions client for the two AI helpers: question sanity review and tag
//! suggestion.
//!
//! Both calls request a strict JSON object and fail as a whole: no retries, no partial
//! results. Calls log model name, latency and response sizes; never contents or the key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::{AiConfig, Prompts};
use crate::domain::SanityCheck;
use crate::error::AppError;
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedTags {
  #[serde(default)]
  suggested_tags: Vec<String>,
}

impl OpenAI {
  /// Construct the client when an API key is configured; otherwise None.
  pub fn from_config(cfg: &AiConfig) -> Option<Self> {
    let api_key = cfg.api_key.clone().filter(|k| !k.trim().is_empty())?;
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.timeout_secs))
      .build()
      .ok()?;
    Some(Self {
      client,
      api_key,
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      model: cfg.model.clone(),
    })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, AppError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "exam-prep-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| AppError::Ai(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(AppError::Ai(format!("OpenAI HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| AppError::Ai(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(target: "ai", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text).map_err(|e| AppError::Ai(format!("JSON parse error: {}", e)))
  }

  /// Grammar/spelling/vocabulary review of an Arabic question text.
  #[instrument(level = "info", skip(self, prompts, question_text), fields(text_len = question_text.len()))]
  pub async fn sanity_check(&self, prompts: &Prompts, question_text: &str) -> Result<SanityCheck, AppError> {
    let user = fill_template(&prompts.sanity_user_template, &[("question", question_text)]);
    let start = Instant::now();
    let result = self.chat_json::<SanityCheck>(&prompts.sanity_system, &user, 0.0).await;
    let elapsed = start.elapsed();

    match result {
      Ok(check) => {
        info!(target: "ai", ?elapsed, is_sane = check.is_sane, explanation_len = check.explanation.len(), "Sanity check completed");
        Ok(check)
      }
      Err(e) => {
        error!(target: "ai", ?elapsed, error = %e, "Model call failed during sanity check");
        Err(e)
      }
    }
  }

  /// Topic tag names for a question; trimmed, empties dropped, order kept.
  #[instrument(level = "info", skip(self, prompts, question_text), fields(text_len = question_text.len()))]
  pub async fn suggest_tags(&self, prompts: &Prompts, question_text: &str) -> Result<Vec<String>, AppError> {
    let user = fill_template(&prompts.tags_user_template, &[("question", question_text)]);
    let start = Instant::now();
    let result = self.chat_json::<SuggestedTags>(&prompts.tags_system, &user, 0.2).await;
    let elapsed = start.elapsed();

    let raw = match result {
      Ok(r) => r.suggested_tags,
      Err(e) => {
        error!(target: "ai", ?elapsed, error = %e, "Model call failed during tag suggestion");
        return Err(e);
      }
    };
    let tags: Vec<String> = raw
      .into_iter()
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
      .collect();
    info!(target: "ai", ?elapsed, count = tags.len(), "Tag suggestions received");
    Ok(tags)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn client_for(server: &mockito::ServerGuard) -> OpenAI {
    OpenAI::from_config(&AiConfig {
      api_key: Some("sk-test".into()),
      base_url: server.url(),
      model: "gpt-4o-mini".into(),
      timeout_secs: 5,
    })
    .unwrap()
  }

  fn completion(content: serde_json::Value) -> String {
    json!({
      "choices": [{ "message": { "content": content.to_string() } }],
      "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
    .to_string()
  }

  #[test]
  fn missing_key_disables_client() {
    assert!(OpenAI::from_config(&AiConfig::default()).is_none());
    let blank = AiConfig { api_key: Some("  ".into()), ..AiConfig::default() };
    assert!(OpenAI::from_config(&blank).is_none());
  }

  #[tokio::test]
  async fn sanity_check_parses_verdict() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .match_header("authorization", "Bearer sk-test")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(completion(json!({ "isSane": false, "explanation": "خطأ إملائي في كلمة الفاعل" })))
      .create_async()
      .await;

    let ai = client_for(&server);
    let check = ai.sanity_check(&Prompts::default(), "ما هو الفاعل في الجملة التالية؟").await.unwrap();
    assert!(!check.is_sane);
    assert_eq!(check.explanation, "خطأ إملائي في كلمة الفاعل");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn suggest_tags_drops_blank_names() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/chat/completions")
      .with_status(200)
      .with_body(completion(json!({ "suggestedTags": [" النحو ", "", "الإعراب", "  "] })))
      .create_async()
      .await;

    let ai = client_for(&server);
    let tags = ai.suggest_tags(&Prompts::default(), "أعرب ما تحته خط").await.unwrap();
    assert_eq!(tags, vec!["النحو", "الإعراب"]);
  }

  #[tokio::test]
  async fn provider_error_message_is_surfaced() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/chat/completions")
      .with_status(429)
      .with_body(json!({ "error": { "message": "Rate limit reached" } }).to_string())
      .create_async()
      .await;

    let ai = client_for(&server);
    let err = ai.sanity_check(&Prompts::default(), "نص السؤال هنا للاختبار").await.unwrap_err();
    match err {
      AppError::Ai(msg) => assert!(msg.contains("Rate limit reached")),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn malformed_model_output_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/chat/completions")
      .with_status(200)
      .with_body(json!({ "choices": [{ "message": { "content": "not json" } }] }).to_string())
      .create_async()
      .await;

    let ai = client_for(&server);
    assert!(matches!(
      ai.suggest_tags(&Prompts::default(), "سؤال").await,
      Err(AppError::Ai(_))
    ));
  }
}

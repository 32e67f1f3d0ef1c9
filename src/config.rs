//! Service configuration: optional TOML file plus connection credentials from env.
//!
//! `APP_CONFIG_PATH` points at the TOML file (every section is optional). Env variables
//! override the file for credentials and endpoints only:
//!   PORT, BACKEND_URL, BACKEND_API_KEY, STORAGE_PUBLIC_BASE,
//!   OPENAI_API_KEY, OPENAI_BASE_URL, OPENAI_MODEL

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub backend: BackendConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub ai: AiConfig,
  #[serde(default)]
  pub prompts: Prompts,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_port")]
  pub port: u16,
  #[serde(default = "default_static_dir")]
  pub static_dir: String,
}

fn default_port() -> u16 { 3000 }
fn default_static_dir() -> String { "./static".into() }

impl Default for ServerConfig {
  fn default() -> Self {
    Self { port: default_port(), static_dir: default_static_dir() }
  }
}

/// Hosted backend. Without a URL the service keeps its tables in memory.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct BackendConfig {
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub api_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
  #[serde(default = "default_bucket")]
  pub default_bucket: String,
  /// Base of public object URLs when it differs from the backend URL (CDN).
  #[serde(default)]
  pub public_base: Option<String>,
}

fn default_bucket() -> String { "question-images".into() }

impl Default for StorageConfig {
  fn default() -> Self {
    Self { default_bucket: default_bucket(), public_base: None }
  }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AiConfig {
  #[serde(default)]
  pub api_key: Option<String>,
  #[serde(default = "default_ai_base_url")]
  pub base_url: String,
  #[serde(default = "default_ai_model")]
  pub model: String,
  #[serde(default = "default_ai_timeout")]
  pub timeout_secs: u64,
}

fn default_ai_base_url() -> String { "https://api.openai.com/v1".into() }
fn default_ai_model() -> String { "gpt-4o-mini".into() }
fn default_ai_timeout() -> u64 { 20 }

impl Default for AiConfig {
  fn default() -> Self {
    Self {
      api_key: None,
      base_url: default_ai_base_url(),
      model: default_ai_model(),
      timeout_secs: default_ai_timeout(),
    }
  }
}

/// Prompts for the two AI flows. `{question}` is replaced with the question text.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub sanity_system: String,
  pub sanity_user_template: String,
  pub tags_system: String,
  pub tags_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      sanity_system: "You are an expert reviewer of Arabic exam questions. Check grammar, spelling and vocabulary only, not whether the answer is correct. Respond ONLY with strict JSON.".into(),
      sanity_user_template: "Question (Arabic): {question}\nReturn JSON {\"isSane\": boolean, \"explanation\": string}. The explanation must be in Arabic, one or two short sentences naming any problem found.".into(),
      tags_system: "You label questions of an Arabic exam-prep platform with short topic tags. Respond ONLY with strict JSON.".into(),
      tags_user_template: "Question: {question}\nReturn JSON {\"suggestedTags\": string[]} with 1 to 5 short tags (one to three words each), in the language of the question.".into(),
    }
  }
}

/// Read the TOML file named by APP_CONFIG_PATH (if any), then apply env overrides.
/// A missing or broken file is logged and the defaults are used.
pub fn load_config_from_env() -> AppConfig {
  let mut cfg = match std::env::var("APP_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match toml::from_str::<AppConfig>(&s) {
        Ok(cfg) => {
          info!(target: "exam_prep_backend", %path, "Loaded config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "exam_prep_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
          AppConfig::default()
        }
      },
      Err(e) => {
        error!(target: "exam_prep_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
        AppConfig::default()
      }
    },
    Err(_) => AppConfig::default(),
  };
  apply_env(&mut cfg, |k| std::env::var(k).ok());
  cfg
}

fn apply_env(cfg: &mut AppConfig, get: impl Fn(&str) -> Option<String>) {
  if let Some(port) = get("PORT").and_then(|p| p.parse::<u16>().ok()) {
    cfg.server.port = port;
  }
  if let Some(v) = get("BACKEND_URL") { cfg.backend.url = Some(v); }
  if let Some(v) = get("BACKEND_API_KEY") { cfg.backend.api_key = Some(v); }
  if let Some(v) = get("STORAGE_PUBLIC_BASE") { cfg.storage.public_base = Some(v); }
  if let Some(v) = get("OPENAI_API_KEY") { cfg.ai.api_key = Some(v); }
  if let Some(v) = get("OPENAI_BASE_URL") { cfg.ai.base_url = v; }
  if let Some(v) = get("OPENAI_MODEL") { cfg.ai.model = v; }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg: AppConfig = toml::from_str(
      r#"
      [backend]
      url = "https://db.example.com"

      [prompts]
      sanity_system = "custom"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.backend.url.as_deref(), Some("https://db.example.com"));
    assert_eq!(cfg.server.port, 3000);
    assert_eq!(cfg.storage.default_bucket, "question-images");
    assert_eq!(cfg.prompts.sanity_system, "custom");
    assert!(cfg.prompts.tags_user_template.contains("{question}"));
  }

  #[test]
  fn env_overrides_credentials() {
    let env: HashMap<&str, &str> = HashMap::from([
      ("PORT", "8080"),
      ("BACKEND_URL", "https://env.example.com"),
      ("OPENAI_API_KEY", "sk-test"),
      ("OPENAI_MODEL", "gpt-4o"),
    ]);
    let mut cfg = AppConfig::default();
    apply_env(&mut cfg, |k| env.get(k).map(|v| v.to_string()));
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.backend.url.as_deref(), Some("https://env.example.com"));
    assert_eq!(cfg.ai.api_key.as_deref(), Some("sk-test"));
    assert_eq!(cfg.ai.model, "gpt-4o");
    assert_eq!(cfg.ai.base_url, "https://api.openai.com/v1");
  }
}

//! Application state shared by all handlers.
//!
//! This module owns:
//!   - the data-access layer over the configured backend (hosted REST or in-memory)
//!   - the optional object storage client (only with a hosted backend)
//!   - the optional OpenAI client and the prompts for it

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::ai::OpenAI;
use crate::backend::{Backend, MemoryBackend, RestBackend};
use crate::config::{AppConfig, Prompts};
use crate::error::AppError;
use crate::storage::ObjectStorage;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub openai: Option<OpenAI>,
    pub storage: Option<ObjectStorage>,
    pub prompts: Prompts,
    pub default_bucket: String,
}

impl AppState {
    /// Build state from config. Without a backend URL, tables live in memory and
    /// object storage is disabled.
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: &AppConfig) -> Result<Self, AppError> {
        let (backend, storage): (Arc<dyn Backend>, Option<ObjectStorage>) = match &cfg.backend.url {
            Some(url) if !url.trim().is_empty() => {
                let key = cfg.backend.api_key.clone().unwrap_or_default();
                if key.is_empty() {
                    warn!(target: "exam_prep_backend", "BACKEND_API_KEY is empty; requests will be anonymous");
                }
                let backend = RestBackend::new(url, &key)?;
                let storage = ObjectStorage::new(url, &key, cfg.storage.public_base.as_deref())?;
                (Arc::new(backend) as Arc<dyn Backend>, Some(storage))
            }
            _ => {
                warn!(target: "exam_prep_backend", "No BACKEND_URL configured; using in-memory tables (data is lost on restart)");
                (Arc::new(MemoryBackend::new()) as Arc<dyn Backend>, None)
            }
        };

        let openai = OpenAI::from_config(&cfg.ai);
        info!(
            target: "exam_prep_backend",
            backend = backend.name(),
            storage = storage.is_some(),
            openai = openai.is_some(),
            model = %cfg.ai.model,
            "Application state initialized"
        );

        Ok(Self {
            store: Store::new(backend),
            openai,
            storage,
            prompts: cfg.prompts.clone(),
            default_bucket: cfg.storage.default_bucket.clone(),
        })
    }

    /// State over an explicit backend with AI and storage disabled.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        let cfg = AppConfig::default();
        Self {
            store: Store::new(backend),
            openai: None,
            storage: None,
            prompts: cfg.prompts,
            default_bucket: cfg.storage.default_bucket,
        }
    }

    pub fn ai(&self) -> Result<&OpenAI, AppError> {
        self.openai.as_ref().ok_or(AppError::AiUnavailable)
    }

    pub fn object_storage(&self) -> Result<&ObjectStorage, AppError> {
        self.storage.as_ref().ok_or(AppError::StorageUnavailable)
    }
}

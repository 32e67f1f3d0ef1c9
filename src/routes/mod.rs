//! Router assembly: HTTP API, static admin SPA, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod curriculum;
pub mod files;
pub mod http;

/// Build the application router with:
/// - REST API under `/api/v1/...`
/// - Static SPA from `static_dir` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>, static_dir: &str) -> Router {
    let static_service = ServeDir::new(static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(format!("{}/index.html", static_dir.trim_end_matches('/'))));

    api_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

/// API routes only, with state applied.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Questions
        .route("/api/v1/questions", get(http::http_list_questions).post(http::http_create_question))
        .route("/api/v1/questions/export", get(http::http_export_questions))
        .route("/api/v1/questions/batch", post(files::http_questions_batch))
        .route(
            "/api/v1/questions/:id",
            get(http::http_get_question)
                .put(http::http_update_question)
                .delete(http::http_delete_question),
        )
        .route("/api/v1/questions/:id/tags", put(http::http_put_question_tags))
        .route("/api/v1/questions/:id/sanity-check", post(http::http_question_sanity_check))
        .route("/api/v1/questions/:id/suggest-tags", post(http::http_question_suggest_tags))
        // Form helpers (unsaved questions)
        .route("/api/v1/ai/sanity-check", post(http::http_ai_sanity_check))
        .route("/api/v1/ai/suggest-tags", post(http::http_ai_suggest_tags))
        // Curriculum
        .route("/api/v1/subjects", get(curriculum::http_list_subjects).post(curriculum::http_create_subject))
        .route(
            "/api/v1/subjects/:id",
            get(curriculum::http_get_subject)
                .put(curriculum::http_update_subject)
                .delete(curriculum::http_delete_subject),
        )
        .route("/api/v1/subjects/:id/sections", get(curriculum::http_subject_sections))
        .route("/api/v1/sections", post(curriculum::http_create_section))
        .route(
            "/api/v1/sections/:id",
            put(curriculum::http_update_section).delete(curriculum::http_delete_section),
        )
        .route("/api/v1/sections/:id/lessons", get(curriculum::http_section_lessons))
        .route("/api/v1/lessons", post(curriculum::http_create_lesson))
        .route(
            "/api/v1/lessons/:id",
            get(curriculum::http_get_lesson)
                .put(curriculum::http_update_lesson)
                .delete(curriculum::http_delete_lesson),
        )
        .route(
            "/api/v1/lessons/:id/questions",
            get(http::http_lesson_questions).post(http::http_add_lesson_question),
        )
        .route("/api/v1/tags", get(curriculum::http_list_tags).post(curriculum::http_create_tag))
        .route(
            "/api/v1/tags/:id",
            put(curriculum::http_update_tag).delete(curriculum::http_delete_tag),
        )
        // Object storage
        .route("/api/v1/storage/upload", post(files::http_storage_upload))
        .route("/api/v1/storage/delete", post(files::http_storage_delete))
        // Not served yet
        .route("/api/v1/exams", get(files::http_list_exams).post(files::http_create_exam))
        .route("/api/v1/news", get(files::http_list_news))
        .route("/api/v1/activation-codes", get(files::http_list_activation_codes))
        .with_state(state)
}

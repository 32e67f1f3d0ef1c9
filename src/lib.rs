//! Exam-prep content backend: question bank, curriculum and tags for an Arabic
//! exam-preparation platform, served over HTTP.

pub mod ai;
pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod form;
pub mod listing;
pub mod protocol;
pub mod routes;
pub mod rows;
pub mod schema;
pub mod state;
pub mod storage;
pub mod store;
pub mod tagging;
pub mod telemetry;
pub mod util;

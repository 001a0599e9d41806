pub mod config;
pub mod encoder;
pub mod error;
pub mod gemini_service;
pub mod models;
pub mod orchestrator;
pub mod question_store;
pub mod reconciler;
pub mod request_builder;

pub use config::AppConfig;
pub use error::{AnalysisError, Result};
pub use gemini_service::{AnalysisClient, GeminiService};
pub use models::*;
pub use orchestrator::{AnalysisOrchestrator, RunPhase, WorkspaceView};
pub use question_store::{default_questions, QuestionStore};
pub use request_builder::ExtractionRequestBuilder;

mod handlers;
mod payloads;

use handlers::AppState;
use pdf_query::{AnalysisOrchestrator, AppConfig, GeminiService, QuestionStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;

    let gemini_service = match GeminiService::new(&config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to initialize Gemini client: {}", e);
            std::process::exit(1);
        }
    };

    let store = QuestionStore::new(&config.store_dir);
    let orchestrator = AnalysisOrchestrator::new(Arc::new(gemini_service), store.load_questions());
    let state = Arc::new(AppState { orchestrator, store });

    let app = handlers::router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    println!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

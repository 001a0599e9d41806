use anyhow::Result;
use clap::Parser;
use pdf_query::{AnalysisOrchestrator, AppConfig, GeminiService, QuestionStore, SelectedDocument};
use std::path::PathBuf;
use std::sync::Arc;

/// Ask the saved question list against one PDF and print the answers.
#[derive(Debug, Parser)]
#[command(name = "pdf_query", version)]
struct Cli {
    /// PDF document to analyze
    pdf: PathBuf,

    /// Directory of the question store (defaults to QUESTION_STORE_DIR or .pdf_query)
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Use the default question list instead of the saved one
    #[arg(long)]
    reset: bool,

    /// Save the question list after a successful run
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let store = QuestionStore::new(cli.store_dir.unwrap_or_else(|| config.store_dir.clone()));

    let gemini_service = Arc::new(GeminiService::new(&config)?);
    let orchestrator = AnalysisOrchestrator::new(gemini_service, store.load_questions());
    if cli.reset {
        orchestrator.reset_questions().await?;
    }

    orchestrator
        .select_document(SelectedDocument::from_path(&cli.pdf, pdf_query::encoder::PDF_MIME_TYPE))
        .await;

    let answered = orchestrator.analyze().await?;

    for question in answered.questions() {
        println!("{}\n  → {}\n", question.question, question.answer);
    }

    if cli.save {
        if let Err(e) = store.save_questions(&answered) {
            eprintln!("No se pudieron guardar las preguntas: {}", e);
        }
    }

    Ok(())
}

use crate::encoder::{self, is_pdf_mime_type};
use crate::error::{AnalysisError, Result, BLANK_QUESTION, MISSING_DOCUMENT, NO_QUESTIONS, SAVE_FAILED};
use crate::gemini_service::AnalysisClient;
use crate::models::*;
use crate::question_store::{default_questions, QuestionStore};
use crate::reconciler;
use crate::request_builder::ExtractionRequestBuilder;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const SAVED_NOTIFICATION: &str = "¡Preguntas guardadas!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Everything the user is working on. Only the orchestrator writes to it.
#[derive(Debug)]
struct Workspace {
    questions: QuestionSet,
    document: Option<SelectedDocument>,
    phase: RunPhase,
    last_outcome: Option<RunPhase>,
    error: Option<String>,
    /// Transient message about a storage action, cleared once it has been viewed.
    notification: Option<String>,
}

impl Workspace {
    fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    fn check_ready(&self) -> Result<SelectedDocument> {
        let document = self
            .document
            .clone()
            .ok_or_else(|| AnalysisError::Validation(MISSING_DOCUMENT.to_string()))?;

        if self.questions.is_empty() {
            return Err(AnalysisError::Validation(NO_QUESTIONS.to_string()));
        }
        if self.questions.has_blank() {
            return Err(AnalysisError::Validation(BLANK_QUESTION.to_string()));
        }

        Ok(document)
    }

    /// Passes through the terminal state and lands back in `Idle`.
    fn settle(&mut self, outcome: RunPhase) {
        self.phase = outcome;
        log::info!("Analysis run finished: {:?}", outcome);
        self.last_outcome = Some(outcome);
        self.phase = RunPhase::Idle;
    }
}

/// Read-only copy of the workspace for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceView {
    pub questions: QuestionSet,
    pub phase: RunPhase,
    pub is_loading: bool,
    pub last_outcome: Option<RunPhase>,
    pub has_document: bool,
    pub document_name: Option<String>,
    pub error: Option<String>,
    pub notification: Option<String>,
    /// Mirrors the analyze trigger: a document, at least one question, no run in flight.
    pub can_analyze: bool,
}

pub struct AnalysisOrchestrator {
    client: Arc<dyn AnalysisClient>,
    workspace: Arc<RwLock<Workspace>>,
}

impl AnalysisOrchestrator {
    pub fn new(client: Arc<dyn AnalysisClient>, questions: QuestionSet) -> Self {
        Self {
            client,
            workspace: Arc::new(RwLock::new(Workspace {
                questions,
                document: None,
                phase: RunPhase::Idle,
                last_outcome: None,
                error: None,
                notification: None,
            })),
        }
    }

    /// Takes the pending notification, so each one is shown once.
    pub async fn view(&self) -> WorkspaceView {
        let mut ws = self.workspace.write().await;
        let notification = ws.notification.take();
        WorkspaceView {
            questions: ws.questions.clone(),
            phase: ws.phase,
            is_loading: ws.is_running(),
            last_outcome: ws.last_outcome,
            has_document: ws.document.is_some(),
            document_name: ws.document.as_ref().map(|d| d.name.clone()),
            error: ws.error.clone(),
            notification,
            can_analyze: ws.document.is_some() && !ws.questions.is_empty() && !ws.is_running(),
        }
    }

    pub async fn questions(&self) -> QuestionSet {
        self.workspace.read().await.questions.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.workspace.read().await.is_running()
    }

    /// File-picker selection: any media type is accepted.
    pub async fn select_document(&self, document: SelectedDocument) {
        log::info!("Selected document {} ({})", document.name, document.mime_type);
        let mut ws = self.workspace.write().await;
        ws.document = Some(document);
        ws.error = None;
    }

    /// Drag-and-drop selection: only PDFs are accepted.
    pub async fn select_dropped_document(&self, document: SelectedDocument) -> Result<()> {
        if !is_pdf_mime_type(&document.mime_type) {
            log::warn!("Ignoring dropped file {} ({})", document.name, document.mime_type);
            return Err(AnalysisError::UnsupportedMediaType(document.mime_type));
        }
        self.select_document(document).await;
        Ok(())
    }

    async fn edit_questions<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut QuestionSet) -> Result<T>,
    {
        let mut ws = self.workspace.write().await;
        if ws.is_running() {
            return Err(AnalysisError::AlreadyRunning);
        }
        f(&mut ws.questions)
    }

    pub async fn add_question(&self, text: impl Into<String>) -> Result<Question> {
        let question = Question::new(text);
        self.edit_questions(|set| {
            set.push(question.clone());
            Ok(question)
        })
        .await
    }

    pub async fn update_question(&self, id: &str, text: impl Into<String>) -> Result<()> {
        self.edit_questions(|set| {
            if set.set_text(id, text) {
                Ok(())
            } else {
                Err(AnalysisError::QuestionNotFound(id.to_string()))
            }
        })
        .await
    }

    pub async fn remove_question(&self, id: &str) -> Result<()> {
        self.edit_questions(|set| {
            if set.remove(id) {
                Ok(())
            } else {
                Err(AnalysisError::QuestionNotFound(id.to_string()))
            }
        })
        .await
    }

    pub async fn reset_questions(&self) -> Result<QuestionSet> {
        self.replace_questions(default_questions()).await
    }

    /// Bulk replacement, used by reset and load-from-storage.
    pub async fn replace_questions(&self, questions: QuestionSet) -> Result<QuestionSet> {
        self.edit_questions(|set| {
            *set = questions;
            Ok(set.clone())
        })
        .await
    }

    /// Saves the current list. The outcome is also left as the workspace
    /// notification; a failure never touches the run state.
    pub async fn save_questions(&self, store: &QuestionStore) -> Result<()> {
        let questions = self.questions().await;
        let result = store.save_questions(&questions);

        let mut ws = self.workspace.write().await;
        match result {
            Ok(()) => {
                ws.notification = Some(SAVED_NOTIFICATION.to_string());
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to save questions: {}", e);
                ws.notification = Some(SAVE_FAILED.to_string());
                Err(AnalysisError::Persistence(SAVE_FAILED.to_string()))
            }
        }
    }

    /// Replaces the list with the stored one (or the defaults).
    pub async fn load_questions(&self, store: &QuestionStore) -> Result<QuestionSet> {
        self.replace_questions(store.load_questions()).await
    }

    /// Runs one analysis: encode, build, call, reconcile.
    ///
    /// Returns [`AnalysisError::AlreadyRunning`] without touching anything when
    /// a run is in flight. Every other error is also recorded as the workspace
    /// error. On success the reconciled questions replace the current ones.
    ///
    /// The run itself lives on its own task: dropping this future does not
    /// cancel it, and the workspace still settles back to `Idle`.
    pub async fn analyze(&self) -> Result<QuestionSet> {
        let (document, snapshot) = {
            let mut ws = self.workspace.write().await;
            if ws.is_running() {
                log::warn!("Analyze requested while a run is in flight, ignoring");
                return Err(AnalysisError::AlreadyRunning);
            }

            let document = match ws.check_ready() {
                Ok(document) => document,
                Err(e) => {
                    log::warn!("Analysis not started: {}", e);
                    ws.error = Some(e.to_string());
                    return Err(e);
                }
            };

            ws.error = None;
            ws.phase = RunPhase::Running;
            ws.questions.clear_answers();
            (document, ws.questions.clone())
        };

        log::info!(
            "Analyzing {} with {} questions",
            document.name,
            snapshot.len()
        );

        let client = self.client.clone();
        let workspace = self.workspace.clone();
        let run = tokio::spawn(async move {
            let result = tokio::spawn(run_pipeline(client, document, snapshot))
                .await
                .unwrap_or_else(|e| Err(AnalysisError::Internal(e.to_string())));

            let mut ws = workspace.write().await;
            match result {
                Ok(reconciled) => {
                    ws.questions = QuestionSet::new(reconciled);
                    ws.settle(RunPhase::Succeeded);
                    Ok(ws.questions.clone())
                }
                Err(e) => {
                    log::error!("Analysis failed: {}", e);
                    ws.error = Some(e.to_string());
                    ws.settle(RunPhase::Failed);
                    Err(e)
                }
            }
        });

        run.await
            .unwrap_or_else(|e| Err(AnalysisError::Internal(e.to_string())))
    }
}

async fn run_pipeline(
    client: Arc<dyn AnalysisClient>,
    document: SelectedDocument,
    snapshot: QuestionSet,
) -> Result<Vec<Question>> {
    let payload = encoder::encode(&document).await?;
    let request = ExtractionRequestBuilder::build(payload, &snapshot.texts());
    let raw_text = client.call(&request).await?;
    reconciler::reconcile(&raw_text, snapshot.questions())
}

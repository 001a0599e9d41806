use thiserror::Error;

pub const MISSING_DOCUMENT: &str = "Por favor, seleccione un archivo PDF primero.";
pub const NO_QUESTIONS: &str = "Añada al menos una pregunta antes de analizar.";
pub const SAVE_FAILED: &str = "No se pudieron guardar las preguntas.";
pub const BLANK_QUESTION: &str = "Asegúrese de que todas las preguntas tengan texto antes de analizar.";

/// Every failure the pipeline and its collaborators can report. The `Display`
/// text is what the user sees.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Validation(String),

    #[error("Could not convert file to base64: {0}")]
    Encoding(String),

    #[error("Failed to analyze PDF: {0}")]
    Transport(String),

    #[error("Failed to analyze PDF: response is not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("Failed to analyze PDF: API did not return a valid array.")]
    InvalidShape,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Persistence(String),

    #[error("an analysis is already running")]
    AlreadyRunning,

    #[error("only PDF files can be dropped here (got '{0}')")]
    UnsupportedMediaType(String),

    #[error("question not found: {0}")]
    QuestionNotFound(String),

    #[error("Ocurrió un error desconocido: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

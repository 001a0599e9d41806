use crate::error::{AnalysisError, Result};
use crate::models::QuestionSet;
use std::fs;
use std::path::PathBuf;

pub const QUESTIONS_KEY: &str = "pdf_scrapping_questions";

pub const DEFAULT_QUESTIONS: [&str; 13] = [
    "Título del contrato",
    "Plazo de ejecución",
    "Duración de la Prórroga",
    "Presupuesto base de licitación",
    "Presupuesto base de licitación (con IVA)",
    "Presupuesto Capítulo 1",
    "Presupuesto Capítulos 2 a 5 y 7",
    "Importe (sin iva) de las anualidades por años, y total.",
    "Puntuación de criterios cualitativos que dependen de un juicio de valor.",
    "Puntuación de criterios evaluables mediante fórmulas",
    "Umbral de temeridad para Capítulo 1",
    "Umbral de temeridad para Capítulo 2 a 5 y 7",
    "Revisión de precios y fórmula si procede",
];

/// Fresh default question list with new ids and empty answers.
pub fn default_questions() -> QuestionSet {
    QuestionSet::from_texts(DEFAULT_QUESTIONS)
}

/// Flat key/value store on disk: one JSON file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct QuestionStore {
    dir: PathBuf,
}

impl QuestionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AnalysisError::Persistence(format!("storage error: {}: {}", path.display(), e))),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| AnalysisError::Persistence(format!("storage error: {}: {}", self.dir.display(), e)))?;

        let path = self.key_path(key);
        fs::write(&path, value)
            .map_err(|e| AnalysisError::Persistence(format!("storage error: {}: {}", path.display(), e)))
    }

    pub fn save_questions(&self, questions: &QuestionSet) -> Result<()> {
        let json = serde_json::to_string(questions)
            .map_err(|e| AnalysisError::Persistence(format!("storage error: {}", e)))?;
        self.set(QUESTIONS_KEY, &json)?;

        log::info!("Saved {} questions to {}", questions.len(), self.dir.display());
        Ok(())
    }

    /// Loads the saved list. Absence or any read/parse failure falls back to
    /// [`default_questions`].
    pub fn load_questions(&self) -> QuestionSet {
        match self.try_load_questions() {
            Ok(Some(questions)) => {
                log::info!("Loaded {} saved questions", questions.len());
                questions
            }
            Ok(None) => {
                log::info!("No saved questions, using defaults");
                default_questions()
            }
            Err(e) => {
                log::error!("Failed to load questions, using defaults: {}", e);
                default_questions()
            }
        }
    }

    fn try_load_questions(&self) -> Result<Option<QuestionSet>> {
        match self.get(QUESTIONS_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| AnalysisError::Persistence(format!("storage error: {}", e))),
            None => Ok(None),
        }
    }
}

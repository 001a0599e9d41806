use crate::error::{AnalysisError, Result};
use crate::models::Question;
use serde_json::Value;

/// Substituted when the response has no usable entry for a question.
pub const MISSING_ANSWER: &str = "No se recibió respuesta para esta pregunta.";

/// Merges the raw service response onto the questions that were sent.
///
/// Matching is by position only. The `question` text echoed by the service is
/// never compared, since the service is bound to keep the order but not the
/// wording. Extra entries are dropped, missing or malformed ones get
/// [`MISSING_ANSWER`].
pub fn reconcile(raw_text: &str, original: &[Question]) -> Result<Vec<Question>> {
    let parsed: Value = serde_json::from_str(raw_text.trim())
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    let entries = match parsed {
        Value::Array(entries) => entries,
        _ => return Err(AnalysisError::InvalidShape),
    };

    if entries.len() != original.len() {
        log::warn!(
            "Response has {} entries for {} questions",
            entries.len(),
            original.len()
        );
    }

    Ok(original
        .iter()
        .enumerate()
        .map(|(index, question)| Question {
            answer: usable_answer(entries.get(index))
                .unwrap_or(MISSING_ANSWER)
                .to_string(),
            ..question.clone()
        })
        .collect())
}

fn usable_answer(entry: Option<&Value>) -> Option<&str> {
    entry?
        .get("answer")?
        .as_str()
        .filter(|answer| !answer.is_empty())
}

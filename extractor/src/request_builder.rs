use crate::models::{AnalysisRequest, DocumentPayload, Schema, SchemaType};
use std::collections::BTreeMap;

/// Answer the service must give when the document does not contain the information.
pub const NOT_FOUND_ANSWER: &str = "Información no encontrada en el documento.";

pub struct ExtractionRequestBuilder;

impl ExtractionRequestBuilder {
    /// Builds the request for one run. Callers must have rejected empty lists
    /// and blank questions already.
    pub fn build(document: DocumentPayload, question_texts: &[String]) -> AnalysisRequest {
        AnalysisRequest {
            document,
            question_texts: question_texts.to_vec(),
            prompt: Self::build_prompt(question_texts),
            schema: Self::build_schema(question_texts.len()),
        }
    }

    fn build_schema(expected: usize) -> Schema {
        let mut properties = BTreeMap::new();
        properties.insert("question".to_string(), Schema::of(SchemaType::String));
        properties.insert("answer".to_string(), Schema::of(SchemaType::String));

        let fields = vec!["question".to_string(), "answer".to_string()];
        let item = Schema {
            properties: Some(properties),
            required: Some(fields.clone()),
            property_ordering: Some(fields),
            ..Schema::of(SchemaType::Object)
        };

        Schema {
            items: Some(Box::new(item)),
            min_items: Some(expected),
            max_items: Some(expected),
            ..Schema::of(SchemaType::Array)
        }
    }

    fn build_prompt(question_texts: &[String]) -> String {
        let question_list = serde_json::to_string(question_texts).unwrap_or_else(|_| "[]".to_string());

        format!(
            r#"You are an expert legal and contract analyst. Analyze the attached PDF, which is a contract or a public tender document, and extract the information requested by each question below.

INSTRUCTIONS:
1. The document is the first part of the input
2. Answer every question using ONLY the content of the document
3. Keep each answer concise and specific
4. If the document does not contain the information for a question, the answer MUST be exactly "{NOT_FOUND_ANSWER}"
5. Respond with a JSON array of objects, each with the keys "question" and "answer"
6. The array MUST contain one object per question, in EXACTLY the same order as the list below

QUESTIONS (JSON array, {count} items):
{question_list}

Respond only with the JSON array."#,
            count = question_texts.len(),
        )
    }
}

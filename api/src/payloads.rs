use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct NewQuestionPayload {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionTextPayload {
    pub question: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentParams {
    /// Drag-and-drop selections only accept PDFs.
    #[serde(default)]
    pub dropped: bool,
}

/// A document read in the browser with `FileReader.readAsDataURL`.
#[derive(Debug, Deserialize)]
pub struct DataUriDocumentPayload {
    pub name: String,
    pub data_uri: String,
    #[serde(default)]
    pub dropped: bool,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub name: String,
    pub mime_type: String,
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub notification: String,
}

use crate::error::{AnalysisError, Result};
use crate::models::{DocumentPayload, DocumentSource, SelectedDocument};
use base64::{engine::general_purpose::STANDARD, Engine};
use regex::Regex;
use std::sync::OnceLock;

pub const PDF_MIME_TYPE: &str = "application/pdf";
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

fn data_uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:([^;,]*)((?:;[^;,]*)*),").expect("data URI pattern is valid")
    })
}

/// Reads the selected document and returns it as a base64 payload tagged with
/// its media type.
pub async fn encode(document: &SelectedDocument) -> Result<DocumentPayload> {
    let (data, envelope_mime) = match &document.source {
        DocumentSource::Memory(bytes) => (encode_bytes(bytes)?, None),
        DocumentSource::Path(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| AnalysisError::Encoding(format!("{}: {}", path.display(), e)))?;
            (encode_bytes(&bytes)?, None)
        }
        DocumentSource::DataUri(uri) => strip_data_uri(uri)?,
    };

    let mime_type = if !document.mime_type.trim().is_empty() {
        document.mime_type.trim().to_string()
    } else if let Some(mime) = envelope_mime.filter(|m| !m.is_empty()) {
        mime
    } else {
        sniff_mime_type(&data)
    };

    log::info!("Encoded {} ({}, {} base64 chars)", document.name, mime_type, data.len());

    Ok(DocumentPayload { mime_type, data })
}

fn encode_bytes(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(AnalysisError::Encoding("the file is empty".to_string()));
    }
    Ok(STANDARD.encode(bytes))
}

/// Splits a base64 data URI into its payload and the media type named in
/// its header. The payload must decode to at least one byte.
fn strip_data_uri(uri: &str) -> Result<(String, Option<String>)> {
    let uri = uri.trim();
    let caps = data_uri_pattern()
        .captures(uri)
        .ok_or_else(|| AnalysisError::Encoding("not a data URI".to_string()))?;

    let is_base64 = caps
        .get(2)
        .map(|params| params.as_str().split(';').any(|p| p.eq_ignore_ascii_case("base64")))
        .unwrap_or(false);
    if !is_base64 {
        return Err(AnalysisError::Encoding("the data URI is not base64-encoded".to_string()));
    }

    let header_len = caps.get(0).map(|m| m.end()).unwrap_or(0);
    let mime = caps.get(1).map(|m| m.as_str().to_string());
    let payload = &uri[header_len..];

    let decoded = STANDARD
        .decode(payload)
        .map_err(|e| AnalysisError::Encoding(format!("invalid base64 payload: {}", e)))?;
    if decoded.is_empty() {
        return Err(AnalysisError::Encoding("the file produced no data".to_string()));
    }

    Ok((payload.to_string(), mime))
}

/// Media type named in a data URI header, if the string has one.
pub fn data_uri_media_type(uri: &str) -> Option<String> {
    data_uri_pattern()
        .captures(uri.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|m| !m.is_empty())
}

/// Used only when no media type was declared.
fn sniff_mime_type(base64_data: &str) -> String {
    // "%PDF-" encodes to "JVBERi0" at the start of a base64 stream.
    if base64_data.starts_with("JVBERi0") {
        PDF_MIME_TYPE.to_string()
    } else {
        FALLBACK_MIME_TYPE.to_string()
    }
}

pub fn is_pdf_mime_type(mime_type: &str) -> bool {
    mime_type.trim().eq_ignore_ascii_case(PDF_MIME_TYPE)
}

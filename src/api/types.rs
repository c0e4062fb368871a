//! Wire types for the session service

use serde::Deserialize;

/// One assistant turn as returned by the service.
///
/// The transcription endpoint historically used `text` instead of `message`;
/// the alias accepts both.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnResponse {
    /// Assistant message for this turn
    #[serde(alias = "text")]
    pub message: String,

    /// Whether the service expects a document upload next
    #[serde(default)]
    pub awaiting_followup: bool,

    /// Whether the onboarding flow is complete
    #[serde(default)]
    pub done: bool,

    /// Index of the question this turn refers to
    #[serde(default)]
    pub current_question_index: u32,

    /// Synthesized speech for this turn, service-root-relative until the
    /// client resolves it
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Response to a document upload: extraction results plus the inline next turn
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    /// Extraction payload, arbitrary nested structure
    #[serde(default)]
    pub extracted_data: serde_json::Value,

    /// Server-assigned filename of the stored upload
    pub filename: String,

    /// Document categories detected by the service
    #[serde(default)]
    pub document_types: Vec<String>,

    /// Next assistant message
    pub message: String,

    #[serde(default)]
    pub awaiting_followup: bool,

    #[serde(default)]
    pub done: bool,

    #[serde(default)]
    pub current_question_index: u32,

    #[serde(default)]
    pub audio_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionCreated {
    pub session_id: String,
}

/// One file staged for upload
#[derive(Debug, Clone)]
pub struct DocumentPayload {
    /// Display filename sent in the multipart part
    pub filename: String,

    /// MIME type of the content
    pub mime_type: String,

    /// Raw file bytes
    pub bytes: Vec<u8>,
}

impl DocumentPayload {
    /// Build a payload from a filename and raw bytes, inferring the MIME type
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = mime_for_filename(&filename).to_string();
        Self {
            filename,
            mime_type,
            bytes,
        }
    }
}

/// Infer a MIME type from a filename extension
#[must_use]
pub fn mime_for_filename(filename: &str) -> &'static str {
    let ext = filename
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

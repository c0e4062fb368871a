//! Session service client
//!
//! Typed surface over the remote onboarding service. The controller talks to
//! the [`SessionApi`] trait so tests can script responses; [`HttpSessionClient`]
//! is the real HTTP implementation.

mod client;
mod types;

pub use client::HttpSessionClient;
pub use types::{mime_for_filename, DocumentPayload, TurnResponse, UploadResponse};

use async_trait::async_trait;

use crate::Result;

/// Remote session service surface.
///
/// Implementations resolve any relative `audio_url` in responses to an
/// absolute URL before returning, so callers treat it as opaque.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Create a new onboarding session, returning its identifier
    async fn create_session(&self) -> Result<String>;

    /// Fetch the current assistant turn for a session
    async fn current_turn(&self, session_id: &str) -> Result<TurnResponse>;

    /// Submit a text answer (skip is the literal answer `"skip"`)
    async fn submit_answer(&self, session_id: &str, answer: &str) -> Result<TurnResponse>;

    /// Submit recorded speech (WAV bytes); the service transcribes it and
    /// treats the transcript as the answer
    async fn submit_audio(&self, session_id: &str, wav: Vec<u8>) -> Result<TurnResponse>;

    /// Upload a batch of documents for the current followup
    async fn upload_documents(
        &self,
        session_id: &str,
        documents: Vec<DocumentPayload>,
    ) -> Result<UploadResponse>;

    /// Discard a session on the service side
    async fn reset_session(&self, session_id: &str) -> Result<()>;

    /// Download a synthesized-speech artifact
    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>>;
}

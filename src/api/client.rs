//! HTTP implementation of the session service client

use async_trait::async_trait;
use reqwest::multipart;
use url::Url;

use super::types::SessionCreated;
use super::{DocumentPayload, SessionApi, TurnResponse, UploadResponse};
use crate::{Error, Result};

/// HTTP client for the onboarding session service
pub struct HttpSessionClient {
    client: reqwest::Client,
    base: Url,
}

impl HttpSessionClient {
    /// Create a client for the given service base URL
    ///
    /// # Errors
    ///
    /// Returns error if the base URL cannot be parsed.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        // join() treats a path without a trailing slash as a file
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    /// Resolve a possibly-relative audio path against the service base
    fn absolutize(&self, audio_url: Option<String>) -> Option<String> {
        let raw = audio_url?;
        match self.base.join(raw.trim_start_matches('/')) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, url = %raw, "unresolvable audio url, dropping");
                None
            }
        }
    }

    fn absolutize_turn(&self, mut turn: TurnResponse) -> TurnResponse {
        turn.audio_url = self.absolutize(turn.audio_url.take());
        turn
    }

    async fn read_turn(response: reqwest::Response) -> Result<TurnResponse> {
        Self::check(response).await?.json().await.map_err(Into::into)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "session service error");
        Err(Error::Service(format!("{status}: {body}")))
    }
}

#[async_trait]
impl SessionApi for HttpSessionClient {
    async fn create_session(&self) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint("session")?)
            .send()
            .await?;
        let created: SessionCreated = Self::check(response).await?.json().await?;
        tracing::debug!(session_id = %created.session_id, "session created");
        Ok(created.session_id)
    }

    async fn current_turn(&self, session_id: &str) -> Result<TurnResponse> {
        let response = self
            .client
            .get(self.endpoint(&format!("questions/{session_id}"))?)
            .send()
            .await?;
        Ok(self.absolutize_turn(Self::read_turn(response).await?))
    }

    async fn submit_answer(&self, session_id: &str, answer: &str) -> Result<TurnResponse> {
        let response = self
            .client
            .post(self.endpoint(&format!("answer/{session_id}"))?)
            .json(&serde_json::json!({ "answer": answer }))
            .send()
            .await?;
        Ok(self.absolutize_turn(Self::read_turn(response).await?))
    }

    async fn submit_audio(&self, session_id: &str, wav: Vec<u8>) -> Result<TurnResponse> {
        let part = multipart::Part::bytes(wav)
            .file_name("answer.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Service(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint(&format!("transcribe/{session_id}"))?)
            .multipart(form)
            .send()
            .await?;
        Ok(self.absolutize_turn(Self::read_turn(response).await?))
    }

    async fn upload_documents(
        &self,
        session_id: &str,
        documents: Vec<DocumentPayload>,
    ) -> Result<UploadResponse> {
        let mut form = multipart::Form::new();
        for doc in documents {
            let part = multipart::Part::bytes(doc.bytes)
                .file_name(doc.filename)
                .mime_str(&doc.mime_type)
                .map_err(|e| Error::Service(e.to_string()))?;
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(self.endpoint(&format!("documents/{session_id}"))?)
            .multipart(form)
            .send()
            .await?;
        let mut upload: UploadResponse = Self::check(response).await?.json().await?;
        upload.audio_url = self.absolutize(upload.audio_url.take());
        Ok(upload)
    }

    async fn reset_session(&self, session_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.endpoint(&format!("session/{session_id}"))?)
            .send()
            .await?;
        Self::check(response).await?;
        tracing::debug!(session_id = %session_id, "session reset");
        Ok(())
    }

    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let bytes = Self::check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        assert!(HttpSessionClient::new("not a url").is_err());
    }

    #[test]
    fn absolutizes_relative_audio_paths() {
        let client = HttpSessionClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.absolutize(Some("/audio/turn1.mp3".into())),
            Some("http://localhost:8000/audio/turn1.mp3".into())
        );
        assert_eq!(
            client.absolutize(Some("audio/turn1.mp3".into())),
            Some("http://localhost:8000/audio/turn1.mp3".into())
        );
        assert_eq!(client.absolutize(None), None);
    }

    #[test]
    fn absolute_audio_urls_pass_through() {
        let client = HttpSessionClient::new("http://localhost:8000/api").unwrap();
        assert_eq!(
            client.absolutize(Some("http://cdn.example/x.mp3".into())),
            Some("http://cdn.example/x.mp3".into())
        );
    }
}

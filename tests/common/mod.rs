//! Scripted session service double for controller tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use intake_console::api::{DocumentPayload, SessionApi, TurnResponse, UploadResponse};
use intake_console::{Error, Result};

/// Build a scripted turn response
pub fn turn(message: &str, awaiting_followup: bool, done: bool, index: u32) -> TurnResponse {
    TurnResponse {
        message: message.to_string(),
        awaiting_followup,
        done,
        current_question_index: index,
        audio_url: None,
    }
}

/// Two-sided gate: the mock signals `entered` when a call arrives, then waits
/// for `release` before answering
#[derive(Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Scripted mock of the session service
#[derive(Default)]
pub struct MockSessionApi {
    /// Responses for `current_turn` / `submit_answer` / `submit_audio`
    pub turns: Mutex<VecDeque<TurnResponse>>,

    /// Responses for `upload_documents`
    pub uploads: Mutex<VecDeque<UploadResponse>>,

    /// Human-readable record of every network call, in order
    pub calls: Mutex<Vec<String>>,

    /// When true, the next turn-producing call fails once
    pub fail_next: Mutex<bool>,

    /// Optional gate applied to `submit_answer`
    pub gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,

    sessions_created: AtomicUsize,
}

impl MockSessionApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_turn(&self, response: TurnResponse) {
        self.turns.lock().unwrap().push_back(response);
    }

    pub fn script_upload(&self, response: UploadResponse) {
        self.uploads.lock().unwrap().push_back(response);
    }

    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    pub fn install_gate(&self) -> Gate {
        let gate = Gate::default();
        *self.gate.lock().unwrap() =
            Some((Arc::clone(&gate.entered), Arc::clone(&gate.release)));
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn take_failure(&self) -> bool {
        std::mem::take(&mut *self.fail_next.lock().unwrap())
    }

    fn next_turn(&self) -> Result<TurnResponse> {
        if self.take_failure() {
            return Err(Error::Service("injected failure".to_string()));
        }
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Service("mock script exhausted".to_string()))
    }
}

#[async_trait]
impl SessionApi for MockSessionApi {
    async fn create_session(&self) -> Result<String> {
        self.record("create_session".to_string());
        if self.take_failure() {
            return Err(Error::Service("injected failure".to_string()));
        }
        let n = self.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("sess-{n}"))
    }

    async fn current_turn(&self, session_id: &str) -> Result<TurnResponse> {
        self.record(format!("current_turn:{session_id}"));
        self.next_turn()
    }

    async fn submit_answer(&self, session_id: &str, answer: &str) -> Result<TurnResponse> {
        self.record(format!("submit_answer:{session_id}:{answer}"));

        let gate = self.gate.lock().unwrap().clone();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }

        self.next_turn()
    }

    async fn submit_audio(&self, session_id: &str, wav: Vec<u8>) -> Result<TurnResponse> {
        self.record(format!("submit_audio:{session_id}:{}b", wav.len()));
        self.next_turn()
    }

    async fn upload_documents(
        &self,
        session_id: &str,
        documents: Vec<DocumentPayload>,
    ) -> Result<UploadResponse> {
        self.record(format!("upload_documents:{session_id}:{}", documents.len()));
        if self.take_failure() {
            return Err(Error::Service("injected failure".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Service("mock script exhausted".to_string()))
    }

    async fn reset_session(&self, session_id: &str) -> Result<()> {
        self.record(format!("reset_session:{session_id}"));
        Ok(())
    }

    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>> {
        self.record(format!("fetch_audio:{url}"));
        Ok(vec![0u8; 4])
    }
}

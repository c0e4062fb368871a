//! Session controller
//!
//! Root of the orchestration core. At most one session-service request is in
//! flight at any time; concurrent submissions are rejected, not queued. All
//! network failures are caught here and turned into log notices - nothing
//! propagates past the controller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::{DocumentPayload, SessionApi, TurnResponse};
use crate::conversation::{ConversationLog, ExtractedDocument, Turn};
use crate::voice::{RecordedAudio, SpeechPlayer};
use crate::{Error, Result};

use super::{PendingUploads, Phase, TurnState};

/// Distinguished answer value submitted when the user skips a followup upload
pub const SKIP_ANSWER: &str = "skip";

const INIT_FAILURE_NOTICE: &str =
    "Something went wrong starting your onboarding session. Please restart and try again.";

fn submission_failure_notice(e: &Error) -> String {
    format!("I couldn't process that ({e}). Please try again.")
}

/// Mutable controller state; the mutex is never held across an await
struct Inner {
    phase: Phase,
    session_id: Option<String>,
    turn_state: TurnState,
    log: ConversationLog,
    latest_extraction: Option<ExtractedDocument>,
    pending: PendingUploads,
    busy: bool,
}

/// Orchestrates one onboarding conversation against the session service
pub struct SessionController {
    api: Arc<dyn SessionApi>,
    player: Option<Arc<SpeechPlayer>>,
    inner: Mutex<Inner>,
}

impl SessionController {
    #[must_use]
    pub fn new(api: Arc<dyn SessionApi>, player: Option<Arc<SpeechPlayer>>) -> Self {
        Self {
            api,
            player,
            inner: Mutex::new(Inner {
                phase: Phase::Initializing,
                session_id: None,
                turn_state: TurnState::default(),
                log: ConversationLog::new(),
                latest_extraction: None,
                pending: PendingUploads::new(),
                busy: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the session and fetch the first turn.
    ///
    /// Idempotent: a second invocation while initialization is in flight or
    /// after it completed is a no-op. Initialization failure is fatal to the
    /// attempt - the controller enters `Failed` and surfaces a single
    /// assistant-style notice instead of returning an error.
    ///
    /// # Errors
    ///
    /// None at present; the signature leaves room for rejection.
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.phase != Phase::Initializing || inner.busy {
                tracing::debug!("duplicate initialize call ignored");
                return Ok(());
            }
            inner.busy = true;
        }

        let result = self.create_and_fetch().await;

        let audio_url = {
            let mut inner = self.lock();
            inner.busy = false;
            match result {
                Ok((session_id, turn)) => {
                    tracing::info!(session_id = %session_id, "session initialized");
                    inner.session_id = Some(session_id);
                    let audio = turn.audio_url.clone();
                    Self::apply_turn(&mut inner, None, turn, None);
                    audio
                }
                Err(e) => {
                    tracing::error!(error = %e, "session initialization failed");
                    inner.phase = Phase::Failed;
                    inner.log.push_assistant(INIT_FAILURE_NOTICE, None, None);
                    None
                }
            }
        };

        self.speak(audio_url).await;
        Ok(())
    }

    async fn create_and_fetch(&self) -> Result<(String, TurnResponse)> {
        let session_id = self.api.create_session().await?;
        let turn = self.api.current_turn(&session_id).await?;
        Ok((session_id, turn))
    }

    /// Submit a text answer. Rejects empty/whitespace-only input and
    /// submissions outside `AwaitingText` without touching the network.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] if a request is in flight, [`Error::Session`] for
    /// rejected input. Network failures are absorbed into the log.
    pub async fn submit_text(&self, text: &str) -> Result<()> {
        let answer = text.trim();
        if answer.is_empty() {
            return Err(Error::Session("answer cannot be empty".to_string()));
        }

        let session_id = self.begin(Phase::AwaitingText, "a text answer")?;
        let result = self.api.submit_answer(&session_id, answer).await;
        self.finish(answer.to_string(), result).await;
        Ok(())
    }

    /// Submit a recorded spoken answer; the service transcribes it.
    ///
    /// # Errors
    ///
    /// Same rejection rules as [`Self::submit_text`].
    pub async fn submit_audio(&self, recording: RecordedAudio) -> Result<()> {
        let session_id = self.begin(Phase::AwaitingText, "a text answer")?;
        let secs = recording.duration_secs;
        let result = self.api.submit_audio(&session_id, recording.wav).await;
        self.finish(format!("(voice answer, {secs}s)"), result).await;
        Ok(())
    }

    /// Skip the pending followup upload. Goes through the same endpoint as a
    /// plain text answer of `"skip"`.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] or [`Error::Session`] if not awaiting an upload.
    pub async fn submit_skip(&self) -> Result<()> {
        let session_id = self.begin(Phase::AwaitingUpload, "a document upload or skip")?;
        let result = self.api.submit_answer(&session_id, SKIP_ANSWER).await;
        self.finish(SKIP_ANSWER.to_string(), result).await;
        Ok(())
    }

    /// Stage a document for the next upload submission
    ///
    /// # Errors
    ///
    /// Rejected outside `AwaitingUpload` or while a request is in flight.
    pub fn stage_document(&self, document: DocumentPayload) -> Result<()> {
        let mut inner = self.lock();
        if inner.busy {
            return Err(Error::Busy);
        }
        if inner.phase != Phase::AwaitingUpload {
            return Err(Error::Session(
                "not expecting a document upload right now".to_string(),
            ));
        }
        inner.pending.stage(document);
        Ok(())
    }

    /// Remove a staged document by position
    ///
    /// # Errors
    ///
    /// Returns error if the index is out of range or a request is in flight.
    pub fn unstage_document(&self, index: usize) -> Result<()> {
        let mut inner = self.lock();
        if inner.busy {
            return Err(Error::Busy);
        }
        inner.pending.unstage(index).map(|_| ())
    }

    /// Filenames currently staged for upload
    #[must_use]
    pub fn staged_filenames(&self) -> Vec<String> {
        self.lock().pending.filenames()
    }

    /// Submit the staged batch. The batch is cleared on submission; a failed
    /// request surfaces a notice and the user restages.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`], or [`Error::Session`] if not awaiting an upload or
    /// nothing is staged.
    pub async fn submit_documents(&self) -> Result<()> {
        let (session_id, batch) = {
            let mut inner = self.lock();
            if inner.busy {
                return Err(Error::Busy);
            }
            if inner.phase != Phase::AwaitingUpload {
                return Err(Error::Session(
                    "not expecting a document upload right now".to_string(),
                ));
            }
            if inner.pending.is_empty() {
                return Err(Error::Session("no documents staged".to_string()));
            }
            let session_id = inner
                .session_id
                .clone()
                .ok_or_else(|| Error::Session("no active session".to_string()))?;
            inner.busy = true;
            (session_id, inner.pending.take_all())
        };

        let count = batch.len();
        let names = batch
            .iter()
            .map(|d| d.filename.clone())
            .collect::<Vec<_>>()
            .join(", ");
        let user_text = format!("Uploaded {count} document(s): {names}");

        let result = self.api.upload_documents(&session_id, batch).await;

        let audio_url = {
            let mut inner = self.lock();
            inner.busy = false;
            match result {
                Ok(upload) => {
                    let extracted = ExtractedDocument {
                        filename: upload.filename,
                        document_types: upload.document_types,
                        data: upload.extracted_data,
                    };
                    let turn = TurnResponse {
                        message: upload.message,
                        awaiting_followup: upload.awaiting_followup,
                        done: upload.done,
                        current_question_index: upload.current_question_index,
                        audio_url: upload.audio_url,
                    };
                    let audio = turn.audio_url.clone();
                    Self::apply_turn(&mut inner, Some(user_text), turn, Some(extracted));
                    audio
                }
                Err(e) => {
                    tracing::warn!(error = %e, "document upload failed");
                    inner.log.push_user(user_text);
                    inner
                        .log
                        .push_assistant(submission_failure_notice(&e), None, None);
                    None
                }
            }
        };

        self.speak(audio_url).await;
        Ok(())
    }

    /// Discard the session and start over with a fresh one.
    ///
    /// The log, extraction snapshot, and staged uploads are cleared before
    /// the new session's first turn can be appended. Server-side reset
    /// failure is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] if a request is in flight.
    pub async fn reset(&self) -> Result<()> {
        let old_session = {
            let mut inner = self.lock();
            if inner.busy {
                return Err(Error::Busy);
            }
            let old = inner.session_id.take();
            inner.log.clear();
            inner.latest_extraction = None;
            inner.pending.clear();
            inner.turn_state = TurnState::default();
            inner.phase = Phase::Initializing;
            old
        };

        if let Some(session_id) = old_session {
            tracing::info!(session_id = %session_id, "resetting session");
            if let Err(e) = self.api.reset_session(&session_id).await {
                tracing::warn!(error = %e, "server-side reset failed, continuing");
            }
        }

        self.initialize().await
    }

    /// Current lifecycle phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Turn state from the most recent service response
    #[must_use]
    pub fn turn_state(&self) -> TurnState {
        self.lock().turn_state
    }

    /// Active session identifier, if initialized
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.lock().session_id.clone()
    }

    /// Whether a request is currently in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Number of turns in the conversation log
    #[must_use]
    pub fn log_len(&self) -> usize {
        self.lock().log.len()
    }

    /// Clone of the turn at `index`, if present
    #[must_use]
    pub fn turn(&self, index: usize) -> Option<Turn> {
        self.lock().log.get(index).cloned()
    }

    /// Render log turns from `start` onward as display lines
    #[must_use]
    pub fn render_from(&self, start: usize) -> Vec<String> {
        self.lock().log.render_lines().skip(start).collect()
    }

    /// The most recent extraction snapshot (single slot, overwritten per
    /// upload)
    #[must_use]
    pub fn latest_extraction(&self) -> Option<ExtractedDocument> {
        self.lock().latest_extraction.clone()
    }

    /// Acquire the busy slot and validate the expected input mode
    fn begin(&self, expected: Phase, expecting: &str) -> Result<String> {
        let mut inner = self.lock();
        if inner.busy {
            return Err(Error::Busy);
        }
        if inner.phase != expected {
            return Err(Error::Session(format!(
                "not expecting {expecting} right now"
            )));
        }
        let session_id = inner
            .session_id
            .clone()
            .ok_or_else(|| Error::Session("no active session".to_string()))?;
        inner.busy = true;
        Ok(session_id)
    }

    /// Apply the outcome of a simple (non-upload) submission
    async fn finish(&self, user_text: String, result: Result<TurnResponse>) {
        let audio_url = {
            let mut inner = self.lock();
            inner.busy = false;
            match result {
                Ok(turn) => {
                    let audio = turn.audio_url.clone();
                    Self::apply_turn(&mut inner, Some(user_text), turn, None);
                    audio
                }
                Err(e) => {
                    tracing::warn!(error = %e, "submission failed");
                    inner.log.push_user(user_text);
                    inner
                        .log
                        .push_assistant(submission_failure_notice(&e), None, None);
                    None
                }
            }
        };

        self.speak(audio_url).await;
    }

    /// Append turns and advance the state machine from a service response.
    /// The response fields alone decide the next phase.
    fn apply_turn(
        inner: &mut Inner,
        user_text: Option<String>,
        turn: TurnResponse,
        extracted: Option<ExtractedDocument>,
    ) {
        if let Some(text) = user_text {
            inner.log.push_user(text);
        }
        inner
            .log
            .push_assistant(&turn.message, extracted.clone(), turn.audio_url.clone());

        if let Some(doc) = extracted {
            inner.latest_extraction = Some(doc);
        }

        inner.turn_state = TurnState {
            awaiting_followup: turn.awaiting_followup,
            done: turn.done,
            question_index: turn.current_question_index,
        };
        inner.phase = if turn.done {
            Phase::Done
        } else if turn.awaiting_followup {
            Phase::AwaitingUpload
        } else {
            Phase::AwaitingText
        };

        tracing::debug!(
            phase = ?inner.phase,
            question_index = inner.turn_state.question_index,
            "turn applied"
        );
    }

    /// Fetch and hand the turn's speech artifact to the playback manager.
    /// Failures here are never surfaced.
    async fn speak(&self, audio_url: Option<String>) {
        let Some(player) = &self.player else {
            return;
        };
        let Some(url) = audio_url else {
            return;
        };
        match self.api.fetch_audio(&url).await {
            Ok(bytes) => player.set_latest(bytes),
            Err(e) => tracing::debug!(error = %e, "could not fetch speech audio, skipping"),
        }
    }
}

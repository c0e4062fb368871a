//! Controller scenarios against a scripted service

mod common;

use std::sync::Arc;

use common::{turn, MockSessionApi};
use intake_console::api::{DocumentPayload, UploadResponse};
use intake_console::session::SKIP_ANSWER;
use intake_console::voice::RecordedAudio;
use intake_console::{Error, Phase, SessionController};

fn controller_with(api: Arc<MockSessionApi>) -> SessionController {
    SessionController::new(api, None)
}

fn upload_done(message: &str) -> UploadResponse {
    UploadResponse {
        extracted_data: serde_json::json!({"member_id": "XYZ-123"}),
        filename: "stored_card.jpg".to_string(),
        document_types: vec!["InsuranceCard".to_string()],
        message: message.to_string(),
        awaiting_followup: false,
        done: true,
        current_question_index: 2,
        audio_url: None,
    }
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("What is your full name?", false, false, 0));
    let controller = controller_with(Arc::clone(&api));

    controller.initialize().await.unwrap();
    controller.initialize().await.unwrap();

    assert_eq!(api.sessions_created(), 1);
    assert_eq!(controller.log_len(), 1);
    assert_eq!(controller.phase(), Phase::AwaitingText);
    assert_eq!(controller.session_id().as_deref(), Some("sess-1"));
}

#[tokio::test]
async fn initialization_failure_is_fatal_but_not_an_error() {
    let api = Arc::new(MockSessionApi::new());
    api.fail_next();
    let controller = controller_with(Arc::clone(&api));

    controller.initialize().await.unwrap();

    assert_eq!(controller.phase(), Phase::Failed);
    assert_eq!(controller.log_len(), 1);
    let notice = controller.turn(0).unwrap();
    assert!(notice.is_assistant());
    assert!(notice.text().contains("restart"));

    // everything but reset is rejected now
    assert!(matches!(
        controller.submit_text("Jane").await,
        Err(Error::Session(_))
    ));
}

#[tokio::test]
async fn accepted_submissions_append_exactly_two_turns() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("What is your full name?", false, false, 0));
    api.script_turn(turn("What is your date of birth?", false, false, 1));
    api.script_turn(turn("Do you take any medications?", false, false, 2));
    let controller = controller_with(Arc::clone(&api));

    controller.initialize().await.unwrap();
    controller.submit_text("Jane Doe").await.unwrap();
    controller.submit_text("1990-04-01").await.unwrap();

    // one seeded turn plus two per accepted submission
    assert_eq!(controller.log_len(), 1 + 2 * 2);
    assert_eq!(controller.turn(1).unwrap().text(), "Jane Doe");
    assert!(controller.turn(2).unwrap().is_assistant());
    assert_eq!(controller.turn_state().question_index, 2);
}

#[tokio::test]
async fn empty_answers_are_rejected_without_a_network_call() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("What is your full name?", false, false, 0));
    let controller = controller_with(Arc::clone(&api));
    controller.initialize().await.unwrap();
    let before = api.call_count();

    assert!(matches!(
        controller.submit_text("   ").await,
        Err(Error::Session(_))
    ));

    assert_eq!(api.call_count(), before);
    assert_eq!(controller.log_len(), 1);
}

#[tokio::test]
async fn skip_goes_through_the_answer_endpoint() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("Please upload your insurance card.", true, false, 1));
    api.script_turn(turn("Do you take any medications?", false, false, 2));
    let controller = controller_with(Arc::clone(&api));
    controller.initialize().await.unwrap();
    assert_eq!(controller.phase(), Phase::AwaitingUpload);

    controller.submit_skip().await.unwrap();

    // identical call shape to typing the word as a text answer
    let calls = api.calls();
    assert!(calls.contains(&format!("submit_answer:sess-1:{SKIP_ANSWER}")));
    assert_eq!(controller.turn(1).unwrap().text(), SKIP_ANSWER);
    assert_eq!(controller.phase(), Phase::AwaitingText);
}

#[tokio::test]
async fn busy_rejection_makes_no_network_call() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("What is your full name?", false, false, 0));
    api.script_turn(turn("What is your date of birth?", false, false, 1));
    let controller = Arc::new(controller_with(Arc::clone(&api)));
    controller.initialize().await.unwrap();

    let gate = api.install_gate();
    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit_text("Jane Doe").await })
    };

    // wait until the first request is inside the service call
    gate.entered.notified().await;
    assert!(controller.is_busy());
    let in_flight = api.call_count();

    let second = controller.submit_text("Janet Doe").await;
    assert!(matches!(second, Err(Error::Busy)));
    assert_eq!(api.call_count(), in_flight);

    gate.release.notify_one();
    first.await.unwrap().unwrap();

    assert!(!controller.is_busy());
    assert_eq!(controller.log_len(), 3);
    assert_eq!(controller.turn(1).unwrap().text(), "Jane Doe");
}

#[tokio::test]
async fn submission_failure_leaves_turn_state_unchanged() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("What is your full name?", false, false, 0));
    api.script_turn(turn("What is your date of birth?", false, false, 1));
    let controller = controller_with(Arc::clone(&api));
    controller.initialize().await.unwrap();
    let state_before = controller.turn_state();

    api.fail_next();
    controller.submit_text("Jane Doe").await.unwrap();

    // user turn plus inline failure notice, no phase change
    assert_eq!(controller.log_len(), 3);
    assert!(controller.turn(2).unwrap().text().contains("try again"));
    assert_eq!(controller.phase(), Phase::AwaitingText);
    assert_eq!(controller.turn_state(), state_before);
    assert!(!controller.is_busy());

    // the retry goes through normally
    controller.submit_text("Jane Doe").await.unwrap();
    assert_eq!(controller.log_len(), 5);
    assert_eq!(controller.turn_state().question_index, 1);
}

#[tokio::test]
async fn voice_answers_log_a_duration_placeholder() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("What is your full name?", false, false, 0));
    api.script_turn(turn("What is your date of birth?", false, false, 1));
    let controller = controller_with(Arc::clone(&api));
    controller.initialize().await.unwrap();

    let recording = RecordedAudio {
        wav: vec![0u8; 64],
        duration_secs: 3,
    };
    controller.submit_audio(recording).await.unwrap();

    assert_eq!(controller.turn(1).unwrap().text(), "(voice answer, 3s)");
    assert!(api.calls().contains(&"submit_audio:sess-1:64b".to_string()));
}

#[tokio::test]
async fn upload_batch_appends_one_turn_pair() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("Please upload your insurance card.", true, false, 1));
    api.script_upload(upload_done("Thanks, that's everything we need."));
    let controller = controller_with(Arc::clone(&api));
    controller.initialize().await.unwrap();

    controller
        .stage_document(DocumentPayload::new("front.jpg", vec![1, 2, 3]))
        .unwrap();
    controller
        .stage_document(DocumentPayload::new("back.jpg", vec![4, 5, 6]))
        .unwrap();
    assert_eq!(controller.staged_filenames().len(), 2);

    controller.submit_documents().await.unwrap();

    // one pair for the whole batch, and the batch went in a single request
    assert_eq!(controller.log_len(), 3);
    assert!(api.calls().contains(&"upload_documents:sess-1:2".to_string()));
    assert!(controller.staged_filenames().is_empty());
    assert_eq!(controller.phase(), Phase::Done);

    let extraction = controller.latest_extraction().unwrap();
    assert_eq!(extraction.filename, "stored_card.jpg");
    assert_eq!(extraction.document_types, vec!["InsuranceCard".to_string()]);
}

#[tokio::test]
async fn staging_is_rejected_outside_upload_phase() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("What is your full name?", false, false, 0));
    let controller = controller_with(Arc::clone(&api));
    controller.initialize().await.unwrap();

    assert!(matches!(
        controller.stage_document(DocumentPayload::new("card.jpg", vec![1])),
        Err(Error::Session(_))
    ));
    assert!(matches!(
        controller.submit_documents().await,
        Err(Error::Session(_))
    ));
}

#[tokio::test]
async fn end_to_end_onboarding() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("What is your full name?", false, false, 0));
    api.script_turn(turn("Please upload your insurance card.", true, false, 1));
    api.script_upload(upload_done("Thank you, your onboarding is complete."));
    let controller = controller_with(Arc::clone(&api));

    controller.initialize().await.unwrap();
    assert_eq!(controller.phase(), Phase::AwaitingText);

    controller.submit_text("Jane Doe").await.unwrap();
    assert_eq!(controller.phase(), Phase::AwaitingUpload);

    controller
        .stage_document(DocumentPayload::new("card.jpg", vec![0xFF, 0xD8]))
        .unwrap();
    controller.submit_documents().await.unwrap();

    assert_eq!(controller.phase(), Phase::Done);
    assert_eq!(controller.log_len(), 5);
    assert!(controller.turn(4).unwrap().text().contains("complete"));

    // terminal: no further input is accepted
    assert!(controller.submit_text("hello?").await.is_err());
    assert!(controller.submit_skip().await.is_err());
}

#[tokio::test]
async fn reset_clears_everything_before_the_new_first_turn() {
    let api = Arc::new(MockSessionApi::new());
    api.script_turn(turn("Please upload your insurance card.", true, false, 1));
    api.script_upload(upload_done("All done."));
    api.script_turn(turn("What is your full name?", false, false, 0));
    let controller = controller_with(Arc::clone(&api));

    controller.initialize().await.unwrap();
    controller
        .stage_document(DocumentPayload::new("card.jpg", vec![1]))
        .unwrap();
    controller.submit_documents().await.unwrap();
    assert_eq!(controller.phase(), Phase::Done);
    assert!(controller.latest_extraction().is_some());

    controller.reset().await.unwrap();

    assert_eq!(controller.phase(), Phase::AwaitingText);
    assert_eq!(controller.log_len(), 1);
    assert_eq!(controller.turn(0).unwrap().text(), "What is your full name?");
    assert!(controller.latest_extraction().is_none());
    assert!(controller.staged_filenames().is_empty());
    assert_eq!(controller.session_id().as_deref(), Some("sess-2"));
    assert!(api.calls().contains(&"reset_session:sess-1".to_string()));
}

#[tokio::test]
async fn reset_recovers_from_a_failed_start() {
    let api = Arc::new(MockSessionApi::new());
    api.fail_next();
    let controller = controller_with(Arc::clone(&api));
    controller.initialize().await.unwrap();
    assert_eq!(controller.phase(), Phase::Failed);

    api.script_turn(turn("What is your full name?", false, false, 0));
    controller.reset().await.unwrap();

    assert_eq!(controller.phase(), Phase::AwaitingText);
    assert_eq!(controller.log_len(), 1);
}

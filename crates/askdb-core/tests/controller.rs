use askdb_core::api::TransportFailureKind;
use askdb_core::notice::Silent;
use askdb_core::shape::transport_failure_payload;
use askdb_core::{
    classify, Message, Notice, NoticeLevel, Notifier, PresentationShape, QueryClient,
    SubmissionController, SubmissionState, TransitionError, TransportFailure,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Replays canned replies in order and records every question it was asked
#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<Value, TransportFailure>>>,
    asked: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<Value, TransportFailure>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    fn gated(replies: Vec<Result<Value, TransportFailure>>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(replies)
        }
    }

    fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryClient for ScriptedClient {
    async fn ask(&self, text: &str) -> Result<Value, TransportFailure> {
        self.asked.lock().unwrap().push(text.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure::network("no scripted reply")))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

fn rows(n: i64) -> Value {
    json!({"success": true, "results": {"data": [{"n": n}]}})
}

#[tokio::test]
async fn questions_and_answers_stay_in_order() {
    let controller = SubmissionController::new(
        ScriptedClient::new(vec![Ok(rows(1)), Ok(rows(2))]),
        Arc::new(Silent),
    );
    let view = controller.view();

    controller.submit("Q1", || {}).await.unwrap();
    controller.submit("Q2", || {}).await.unwrap();

    assert_eq!(
        view.snapshot().as_slice(),
        &[
            Message::question("Q1"),
            Message::answer(rows(1)),
            Message::question("Q2"),
            Message::answer(rows(2)),
        ]
    );
    assert_eq!(view.state(), SubmissionState::Idle);
    assert_eq!(controller.client().asked(), vec!["Q1", "Q2"]);
}

#[tokio::test]
async fn question_text_is_trimmed_before_sending() {
    let controller =
        SubmissionController::new(ScriptedClient::new(vec![Ok(rows(1))]), Arc::new(Silent));

    controller.submit("  touros reprodutores \n", || {}).await.unwrap();

    assert_eq!(controller.client().asked(), vec!["touros reprodutores"]);
    assert_eq!(
        controller.view().snapshot()[0],
        Message::question("touros reprodutores")
    );
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = SubmissionController::new(ScriptedClient::default(), notifier.clone());
    let view = controller.view();
    let mut cleared = false;

    for text in ["", "   "] {
        let result = controller.submit(text, || cleared = true).await;
        assert_eq!(result, Err(TransitionError::EmptyQuestion));
    }

    assert!(!cleared);
    assert!(view.snapshot().is_empty());
    assert_eq!(view.state(), SubmissionState::Idle);
    assert!(controller.client().asked().is_empty());
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn accepted_callback_runs_before_the_answer_arrives() {
    let controller =
        SubmissionController::new(ScriptedClient::new(vec![Ok(rows(1))]), Arc::new(Silent));
    let view = controller.view();
    let mut seen = None;

    controller
        .submit("Q1", || seen = Some((view.snapshot().len(), view.state())))
        .await
        .unwrap();

    assert_eq!(seen, Some((1, SubmissionState::Submitting)));
}

#[tokio::test]
async fn second_submit_while_in_flight_is_rejected() {
    let gate = Arc::new(Notify::new());
    let controller = Arc::new(SubmissionController::new(
        ScriptedClient::gated(vec![Ok(rows(1)), Ok(rows(2))], gate.clone()),
        Arc::new(Silent),
    ));
    let view = controller.view();

    let first = controller.begin("Q1").unwrap();
    let in_flight = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.complete(first).await }
    });

    assert_eq!(view.state(), SubmissionState::Submitting);
    assert_eq!(controller.begin("Q2").unwrap_err(), TransitionError::Busy);
    assert_eq!(view.snapshot().as_slice(), &[Message::question("Q1")]);

    gate.notify_one();
    in_flight.await.unwrap();

    assert_eq!(view.state(), SubmissionState::Idle);
    assert_eq!(
        view.snapshot().as_slice(),
        &[Message::question("Q1"), Message::answer(rows(1))]
    );

    // Accepted again once the first cycle resolved
    let second = controller.begin("Q2").unwrap();
    assert_eq!(second.question(), "Q2");
}

#[tokio::test]
async fn cancelled_submit_answers_the_question_and_frees_the_controller() {
    let gate = Arc::new(Notify::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = SubmissionController::new(
        ScriptedClient::gated(vec![Ok(rows(2))], gate.clone()),
        notifier.clone(),
    );
    let view = controller.view();

    // The service never answers Q1 in time
    let outcome =
        tokio::time::timeout(Duration::from_millis(50), controller.submit("Q1", || {})).await;
    assert!(outcome.is_err());

    assert_eq!(view.state(), SubmissionState::Idle);
    assert_eq!(
        view.snapshot().as_slice(),
        &[Message::question("Q1"), Message::answer(transport_failure_payload())]
    );
    assert!(notifier.notices().is_empty());

    gate.notify_one();
    controller.submit("Q2", || {}).await.unwrap();

    assert_eq!(view.snapshot().len(), 4);
    assert_eq!(view.snapshot()[3], Message::answer(rows(2)));
    assert_eq!(controller.client().asked(), vec!["Q1", "Q2"]);
}

#[test]
fn dropped_pending_submission_is_answered() {
    let controller = SubmissionController::new(ScriptedClient::default(), Arc::new(Silent));
    let view = controller.view();

    let pending = controller.begin("Q1").unwrap();
    assert_eq!(controller.begin("Q2").unwrap_err(), TransitionError::Busy);
    drop(pending);

    assert_eq!(view.state(), SubmissionState::Idle);
    assert_eq!(
        view.snapshot().as_slice(),
        &[Message::question("Q1"), Message::answer(transport_failure_payload())]
    );
    assert!(controller.begin("Q2").is_ok());
}

#[tokio::test]
async fn completed_submission_is_answered_once() {
    let controller =
        SubmissionController::new(ScriptedClient::new(vec![Ok(rows(1))]), Arc::new(Silent));
    let view = controller.view();

    let pending = controller.begin("Q1").unwrap();
    controller.complete(pending).await;

    assert_eq!(
        view.snapshot().as_slice(),
        &[Message::question("Q1"), Message::answer(rows(1))]
    );
}

#[tokio::test]
async fn transport_failure_becomes_error_answer_and_one_notice() {
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = SubmissionController::new(
        ScriptedClient::new(vec![Err(TransportFailure::status(502, "Query service returned 502"))]),
        notifier.clone(),
    );
    let view = controller.view();

    controller.submit("Q1", || {}).await.unwrap();

    let history = view.snapshot();
    assert_eq!(history.len(), 2);
    let Message::Answer { raw } = &history[1] else {
        panic!("expected an answer");
    };
    assert_eq!(
        raw,
        &json!({"success": false, "message": "Sorry, I could not process your question."})
    );
    assert_eq!(
        classify(raw),
        PresentationShape::Error {
            message: "Sorry, I could not process your question.".to_string()
        }
    );

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, "Query service returned 502");
    assert_eq!(view.state(), SubmissionState::Idle);
}

#[tokio::test]
async fn logical_failure_is_kept_verbatim_without_notice() {
    let payload = json!({"success": false, "sql": "SELECT nope", "error": "column does not exist"});
    let notifier = Arc::new(RecordingNotifier::default());
    let controller =
        SubmissionController::new(ScriptedClient::new(vec![Ok(payload.clone())]), notifier.clone());

    controller.submit("Q1", || {}).await.unwrap();

    assert_eq!(controller.view().snapshot()[1], Message::answer(payload));
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn subscribers_are_told_about_each_step() {
    let controller =
        SubmissionController::new(ScriptedClient::new(vec![Ok(rows(1))]), Arc::new(Silent));
    let mut changes = controller.view().subscribe();

    let pending = controller.begin("Q1").unwrap();
    assert!(changes.has_changed().unwrap());
    let revision = *changes.borrow_and_update();
    assert_eq!(revision.messages, 1);
    assert_eq!(revision.state, SubmissionState::Submitting);

    controller.complete(pending).await;
    let revision = *changes.borrow_and_update();
    assert_eq!(revision.messages, 2);
    assert_eq!(revision.state, SubmissionState::Idle);
}

#[test]
fn failure_kinds_are_distinguishable() {
    assert_eq!(
        TransportFailure::status(500, "x").kind,
        TransportFailureKind::Status { status: 500 }
    );
    assert_eq!(TransportFailure::decode("x").kind, TransportFailureKind::Decode);
}

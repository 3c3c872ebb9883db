//! Property tests for classification and the submission state machine

use crate::message::Message;
use crate::shape::{classify, PresentationShape};
use crate::store::ConversationStore;
use crate::submission::{apply, transition, SubmissionEvent, SubmissionState, TransitionError};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        // Quarters print and parse back exactly
        (-4000i32..4000).prop_map(|n| Value::from(f64::from(n) / 4.0)),
        ".{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z_]{1,6}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Payloads shaped like the service's answers, so the specific branches are
/// reached often.
fn arb_payload() -> impl Strategy<Value = Value> {
    prop_oneof![
        arb_json(),
        (
            prop::option::of(any::<bool>()),
            prop::option::of(".{0,4}"),
            prop::option::of(".{0,4}"),
            prop::collection::vec(arb_json(), 0..4),
        )
            .prop_map(|(success, sql, error, data)| {
                let mut payload = Map::new();
                if let Some(success) = success {
                    payload.insert("success".into(), json!(success));
                }
                if let Some(sql) = sql {
                    payload.insert("sql".into(), json!(sql));
                }
                if let Some(error) = error {
                    payload.insert("error".into(), json!(error));
                }
                payload.insert("results".into(), json!({ "data": data }));
                Value::Object(payload)
            }),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Submit(String),
    Resolve(Value),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop_oneof![Just(String::new()), Just("   ".to_string()), " ?[a-z]{1,6} ?"]
            .prop_map(Op::Submit),
        arb_payload().prop_map(Op::Resolve),
    ]
}

proptest! {
    #[test]
    fn classify_is_total_and_idempotent(raw in arb_payload()) {
        let first = classify(&raw);
        let second = classify(&raw);
        prop_assert_eq!(&first, &second);
        // Rendering is total as well
        prop_assert_eq!(first.render(None), second.render(None));
    }

    #[test]
    fn classify_follows_check_order(raw in arb_payload()) {
        let success = raw.get("success").and_then(Value::as_bool);
        let has_rows = raw
            .get("results")
            .and_then(|r| r.get("data"))
            .and_then(Value::as_array)
            .is_some_and(|data| !data.is_empty());

        match classify(&raw) {
            PresentationShape::Error { message } => {
                prop_assert_eq!(success, Some(false));
                prop_assert!(!message.is_empty());
            }
            PresentationShape::Tabular { records, .. } => {
                prop_assert_eq!(success, Some(true));
                prop_assert!(has_rows);
                prop_assert!(!records.is_empty());
            }
            PresentationShape::Raw { text } => {
                prop_assert!(success != Some(false));
                prop_assert!(!(success == Some(true) && has_rows));
                let reparsed: Value = serde_json::from_str(&text).unwrap();
                prop_assert_eq!(reparsed, raw);
            }
        }
    }

    #[test]
    fn history_invariants_hold(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut store = ConversationStore::new();

        for op in ops {
            let before = store.snapshot();
            let state = store.state();
            let event = match op {
                Op::Submit(text) => SubmissionEvent::Submit { text },
                Op::Resolve(raw) => SubmissionEvent::Resolved { raw },
            };
            let is_submit = matches!(event, SubmissionEvent::Submit { .. });

            match transition(state, event) {
                Ok(step) => {
                    apply(&mut store, step);
                    let after = store.snapshot();
                    prop_assert_eq!(after.len(), before.len() + 1);
                    prop_assert_eq!(&after[..before.len()], &before[..]);
                }
                Err(err) => {
                    // Rejected events change nothing
                    prop_assert_eq!(store.snapshot(), before);
                    prop_assert_eq!(store.state(), state);
                    if is_submit && err == TransitionError::Busy {
                        prop_assert_eq!(state, SubmissionState::Submitting);
                    }
                }
            }

            // Questions and answers alternate, starting with a question, and
            // only the last question can be unanswered.
            let history = store.snapshot();
            for (i, message) in history.iter().enumerate() {
                prop_assert_eq!(message.is_question(), i % 2 == 0);
                prop_assert_eq!(message.is_answer(), i % 2 == 1);
            }
            let open = history.last().is_some_and(Message::is_question);
            prop_assert_eq!(open, store.state() == SubmissionState::Submitting);
        }
    }
}

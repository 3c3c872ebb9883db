//! Submission lifecycle
//!
//! [`transition`] is the pure state machine: given the current state and an
//! event it yields the next state and the effects to perform, with no I/O.
//! [`SubmissionController`] applies those effects against the shared store
//! and performs the one suspension point of a cycle, the request to the
//! query service.

use crate::api::QueryClient;
use crate::message::Message;
use crate::notice::{Notice, Notifier};
use crate::shape::{classify, transport_failure_payload};
use crate::store::{lock, ConversationStore, StoreView};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
}

#[derive(Debug, Clone)]
pub enum SubmissionEvent {
    /// The user asked to submit the input buffer
    Submit { text: String },
    /// The in-flight request resolved, successfully or not
    Resolved { raw: Value },
}

/// Effects to be executed after a transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AppendQuestion { text: String },
    RequestAnswer { text: String },
    AppendAnswer { raw: Value },
}

#[derive(Debug)]
pub struct Transition {
    pub next: SubmissionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn new(next: SubmissionState) -> Self {
        Self {
            next,
            effects: vec![],
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Question is empty")]
    EmptyQuestion,
    #[error("A question is already in flight")]
    Busy,
    #[error("No question is in flight")]
    NotSubmitting,
}

/// Pure transition function
pub fn transition(
    state: SubmissionState,
    event: SubmissionEvent,
) -> Result<Transition, TransitionError> {
    match (state, event) {
        (SubmissionState::Idle, SubmissionEvent::Submit { text }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyQuestion);
            }
            Ok(Transition::new(SubmissionState::Submitting)
                .with_effect(Effect::AppendQuestion {
                    text: text.to_string(),
                })
                .with_effect(Effect::RequestAnswer {
                    text: text.to_string(),
                }))
        }

        // Blank input is rejected before the busy check so that it never
        // reports anything but "empty".
        (SubmissionState::Submitting, SubmissionEvent::Submit { text }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyQuestion)
        }
        (SubmissionState::Submitting, SubmissionEvent::Submit { .. }) => Err(TransitionError::Busy),

        (SubmissionState::Submitting, SubmissionEvent::Resolved { raw }) => {
            Ok(Transition::new(SubmissionState::Idle).with_effect(Effect::AppendAnswer { raw }))
        }
        (SubmissionState::Idle, SubmissionEvent::Resolved { .. }) => {
            Err(TransitionError::NotSubmitting)
        }
    }
}

/// An accepted question whose answer has not arrived yet.
///
/// Only [`SubmissionController::begin`] creates one and
/// [`SubmissionController::complete`] consumes it, so each accepted question
/// gets exactly one answer. Dropping it unresolved (a cancelled `complete`,
/// an aborted task) answers the question with the transport-failure payload
/// and returns the store to idle.
#[must_use = "dropping a pending submission answers it with a failure"]
#[derive(Debug)]
pub struct PendingSubmission {
    question: String,
    /// `None` once the answer has been recorded
    store: Option<Arc<Mutex<ConversationStore>>>,
}

impl PendingSubmission {
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Record `raw` as the answer. Only the first call has an effect.
    fn resolve(&mut self, raw: Value) {
        let Some(store) = self.store.take() else {
            return;
        };
        let mut store = lock(&store);
        match transition(store.state(), SubmissionEvent::Resolved { raw }) {
            Ok(step) => {
                apply(&mut store, step);
                tracing::info!(history_len = store.len(), "answer appended");
            }
            Err(err) => tracing::error!(%err, "dropping answer for unknown submission"),
        }
    }
}

impl Drop for PendingSubmission {
    fn drop(&mut self) {
        if self.store.is_some() {
            tracing::warn!(
                question_len = self.question.len(),
                "submission abandoned before its answer arrived"
            );
            self.resolve(transport_failure_payload());
        }
    }
}

pub struct SubmissionController<C> {
    store: Arc<Mutex<ConversationStore>>,
    client: C,
    notifier: Arc<dyn Notifier>,
}

impl<C: QueryClient> SubmissionController<C> {
    pub fn new(client: C, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: Arc::new(Mutex::new(ConversationStore::new())),
            client,
            notifier,
        }
    }

    /// Read-only handle for renderers
    pub fn view(&self) -> StoreView {
        StoreView::new(Arc::clone(&self.store))
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Guard the submission and record the question.
    ///
    /// On rejection nothing changes: no history entry, no state change, no
    /// notice.
    pub fn begin(&self, text: &str) -> Result<PendingSubmission, TransitionError> {
        let mut store = lock(&self.store);
        let step = transition(
            store.state(),
            SubmissionEvent::Submit {
                text: text.to_string(),
            },
        )
        .inspect_err(|err| tracing::debug!(%err, "submission rejected"))?;

        let request = apply(&mut store, step);
        let question = request.unwrap_or_default();
        tracing::info!(history_len = store.len(), "question accepted");

        Ok(PendingSubmission {
            question,
            store: Some(Arc::clone(&self.store)),
        })
    }

    /// Ask the service and record its answer. Never fails: a transport
    /// failure becomes a synthetic error payload plus one error notice.
    pub async fn complete(&self, mut pending: PendingSubmission) {
        let (raw, notice) = match self.client.ask(&pending.question).await {
            Ok(raw) => (raw, None),
            Err(failure) => {
                tracing::warn!(kind = ?failure.kind, %failure, "query service request failed");
                (transport_failure_payload(), Some(Notice::error(failure.to_string())))
            }
        };
        tracing::debug!(shape = classify(&raw).kind(), "answer received");

        pending.resolve(raw);

        if let Some(notice) = notice {
            self.notifier.notify(notice);
        }
    }

    /// Run a whole cycle. `on_accepted` runs once the question is recorded,
    /// before the request is sent; frontends clear their input buffer there.
    pub async fn submit(
        &self,
        text: &str,
        on_accepted: impl FnOnce(),
    ) -> Result<(), TransitionError> {
        let pending = self.begin(text)?;
        on_accepted();
        self.complete(pending).await;
        Ok(())
    }
}

/// Apply a transition to the store. Returns the question to send, if any.
pub(crate) fn apply(store: &mut ConversationStore, step: Transition) -> Option<String> {
    let mut request = None;
    for effect in step.effects {
        match effect {
            Effect::AppendQuestion { text } => store.append(Message::question(text)),
            Effect::RequestAnswer { text } => request = Some(text),
            Effect::AppendAnswer { raw } => store.append(Message::answer(raw)),
        }
    }
    store.set_submitting(step.next == SubmissionState::Submitting);
    request
}

//! Conversation history and submission state
//!
//! [`ConversationStore`] is the only stateful component. It is shared behind
//! an `Arc<Mutex<_>>` between the submission controller, which mutates it,
//! and any number of readers holding a [`StoreView`].

use crate::message::Message;
use crate::submission::SubmissionState;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Immutable view of the history at one point in time
pub type Snapshot = Arc<Vec<Message>>;

/// Published to subscribers after every mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    pub messages: usize,
    pub state: SubmissionState,
}

#[derive(Debug)]
pub struct ConversationStore {
    history: Snapshot,
    state: SubmissionState,
    changes: watch::Sender<Revision>,
}

impl ConversationStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(Revision {
            messages: 0,
            state: SubmissionState::Idle,
        });

        Self {
            history: Arc::new(Vec::new()),
            state: SubmissionState::Idle,
            changes,
        }
    }

    /// Add a message to the end of the history.
    pub fn append(&mut self, message: Message) {
        // Copy-on-write: outstanding snapshots keep the old vector.
        Arc::make_mut(&mut self.history).push(message);
        self.publish();
    }

    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.history)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn set_submitting(&mut self, submitting: bool) {
        self.state = if submitting {
            SubmissionState::Submitting
        } else {
            SubmissionState::Idle
        };
        self.publish();
    }

    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.changes.subscribe()
    }

    fn publish(&self) {
        self.changes.send_replace(Revision {
            messages: self.history.len(),
            state: self.state,
        });
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle on a shared store
#[derive(Clone)]
pub struct StoreView {
    inner: Arc<Mutex<ConversationStore>>,
}

impl StoreView {
    pub(crate) fn new(inner: Arc<Mutex<ConversationStore>>) -> Self {
        Self { inner }
    }

    pub fn snapshot(&self) -> Snapshot {
        lock(&self.inner).snapshot()
    }

    pub fn state(&self) -> SubmissionState {
        lock(&self.inner).state()
    }

    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        lock(&self.inner).subscribe()
    }
}

/// Lock the store, recovering from poisoning. Every critical section is a
/// single push or flag write, so a poisoned store is still consistent.
pub(crate) fn lock(store: &Mutex<ConversationStore>) -> MutexGuard<'_, ConversationStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

pub mod api;
pub mod config;
pub mod message;
pub mod notice;
pub mod render;
pub mod shape;
pub mod store;
pub mod submission;

#[cfg(test)]
mod proptests;

// Re-export main types for convenience
pub use api::{DatabaseStatus, HttpQueryClient, QueryClient, SchemaInfo, TransportFailure};
pub use config::Config;
pub use message::Message;
pub use notice::{Notice, NoticeLevel, Notifier};
pub use render::{Field, RecordView, Rendering};
pub use shape::{classify, KeywordAnalysis, KeywordMatch, PresentationShape, Record};
pub use store::{ConversationStore, Revision, Snapshot, StoreView};
pub use submission::{
    transition, Effect, PendingSubmission, SubmissionController, SubmissionEvent, SubmissionState,
    Transition, TransitionError,
};

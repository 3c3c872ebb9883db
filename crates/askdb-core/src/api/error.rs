//! Query service transport errors

use thiserror::Error;

/// A request that produced no usable payload
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportFailure {
    pub kind: TransportFailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: TransportFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportFailureKind::Network, message)
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(TransportFailureKind::Status { status }, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(TransportFailureKind::Decode, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureKind {
    /// Connection refused, DNS, timeout
    Network,
    /// The service answered with a non-2xx status
    Status { status: u16 },
    /// The body was not JSON
    Decode,
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportFailure::decode(format!("Query service sent an unreadable response: {err}"))
        } else if let Some(status) = err.status() {
            TransportFailure::status(status.as_u16(), format!("Query service returned {status}"))
        } else {
            TransportFailure::network(format!("Could not reach the query service: {err}"))
        }
    }
}

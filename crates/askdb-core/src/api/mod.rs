pub mod error;
pub mod http;

pub use error::{TransportFailure, TransportFailureKind};
pub use http::{DatabaseStatus, HttpQueryClient, SchemaInfo};

use async_trait::async_trait;
use serde_json::Value;

/// Sends one question to the query service.
///
/// Implementations issue exactly one request per call: no retries, no
/// caching. Callers serialize calls themselves if they need to.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn ask(&self, text: &str) -> Result<Value, TransportFailure>;
}

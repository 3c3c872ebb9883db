use super::{QueryClient, TransportFailure};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Serialize)]
struct AskRequest<'a> {
    query: &'a str,
}

/// Tables known to the service's schema mapper
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchemaInfo {
    #[serde(default)]
    pub tables: Vec<Option<String>>,
    #[serde(default)]
    pub total_tables: usize,
    #[serde(default)]
    pub keyword_mappings_count: usize,
}

/// Health of the database behind the service
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub table_info: Option<Value>,
}

#[derive(Clone)]
pub struct HttpQueryClient {
    client: Client,
    base_url: String,
}

impl HttpQueryClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Build a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, TransportFailure> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn schema_info(&self) -> Result<SchemaInfo, TransportFailure> {
        self.get_json("/api/schema-info").await
    }

    pub async fn database_status(&self) -> Result<DatabaseStatus, TransportFailure> {
        self.get_json("/api/database-status").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportFailure> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "querying service");

        let response = self.client.get(&url).send().await?;
        let response = check_status(response)?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn ask(&self, text: &str) -> Result<Value, TransportFailure> {
        let url = format!("{}/api/nl-to-sql", self.base_url);
        tracing::debug!(%url, question_len = text.len(), "sending question");

        let response = self
            .client
            .post(&url)
            .json(&AskRequest { query: text })
            .send()
            .await?;

        let response = check_status(response)?;
        Ok(response.json().await?)
    }
}

fn check_status(response: Response) -> Result<Response, TransportFailure> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TransportFailure::status(
            status.as_u16(),
            format!("Query service returned {status}"),
        ))
    }
}

//! Response classification
//!
//! The query service answers with loosely structured JSON. [`classify`]
//! maps any payload onto one of three presentation shapes. The checks run in
//! a fixed order and the last branch is a catch-all, so every payload gets a
//! shape.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Message used when an error payload carries no usable text
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Message placed in the synthetic payload that replaces a transport failure
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Sorry, I could not process your question.";

/// Fields probed for an error message, highest priority first.
///
/// `sql` outranks `error`: the service reports the SQL it
/// generated as the diagnostic for failed translations.
const ERROR_MESSAGE_FIELDS: [&str; 3] = ["sql", "error", "message"];

/// One row of a tabular answer. `None` when the element is not an object.
pub type Record = Option<Map<String, Value>>;

/// How an answer payload should be presented
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationShape {
    Error {
        message: String,
    },
    Tabular {
        records: Vec<Record>,
        /// `results.message` from the service, when present
        status: Option<String>,
        /// The SQL the service generated
        sql: Option<String>,
        analysis: Option<KeywordAnalysis>,
    },
    Raw {
        text: String,
    },
}

/// How the service mapped the question onto the schema
/// (`results.analysis`). Missing lists are empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct KeywordAnalysis {
    #[serde(rename = "tables_identified")]
    pub tables: Vec<String>,
    #[serde(rename = "fields_identified")]
    pub fields: Vec<String>,
    #[serde(rename = "keywords_detected")]
    pub keywords: Vec<KeywordMatch>,
}

/// A question word and the table or column it was mapped to
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct KeywordMatch {
    pub keyword: String,
    pub target: String,
}

impl PresentationShape {
    pub fn kind(&self) -> &'static str {
        match self {
            PresentationShape::Error { .. } => "error",
            PresentationShape::Tabular { .. } => "tabular",
            PresentationShape::Raw { .. } => "raw",
        }
    }
}

/// Classify a payload. Pure and total.
pub fn classify(raw: &Value) -> PresentationShape {
    let success = raw.get("success").and_then(Value::as_bool);

    if success == Some(false) {
        return PresentationShape::Error {
            message: error_message(raw),
        };
    }

    if success == Some(true) {
        let results = raw.get("results");
        if let Some(data) = results
            .and_then(|r| r.get("data"))
            .and_then(Value::as_array)
            .filter(|data| !data.is_empty())
        {
            let records = data.iter().map(|row| row.as_object().cloned()).collect();
            let status = results
                .and_then(|r| r.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let sql = raw
                .get("sql")
                .and_then(Value::as_str)
                .filter(|sql| !sql.trim().is_empty())
                .map(str::to_string);
            // A malformed analysis is dropped rather than failing the answer
            let analysis = results
                .and_then(|r| r.get("analysis"))
                .and_then(|a| KeywordAnalysis::deserialize(a).ok());
            return PresentationShape::Tabular {
                records,
                status,
                sql,
                analysis,
            };
        }
    }

    PresentationShape::Raw {
        text: pretty(raw),
    }
}

/// The payload that stands in for an answer when the request itself failed
pub fn transport_failure_payload() -> Value {
    serde_json::json!({
        "success": false,
        "message": TRANSPORT_FAILURE_MESSAGE,
    })
}

fn error_message(raw: &Value) -> String {
    ERROR_MESSAGE_FIELDS
        .iter()
        .filter_map(|field| raw.get(field).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .unwrap_or(UNKNOWN_ERROR_MESSAGE)
        .to_string()
}

fn pretty(raw: &Value) -> String {
    // Serializing a `Value` cannot fail: keys are always strings.
    serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string())
}

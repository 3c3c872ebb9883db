//! Renderer-neutral view of a [`PresentationShape`]
//!
//! Frontends draw these lines however they like, but labels, placeholders
//! and record headers are decided here so every frontend agrees.

use crate::shape::{KeywordAnalysis, PresentationShape, Record};
use serde_json::Value;

/// Placeholder shown for null or missing values
pub const EMPTY_PLACEHOLDER: &str = "Empty";

/// Status shown when the service sent no `results.message`
pub const DEFAULT_STATUS: &str = "SQL executed successfully";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendering {
    /// Display flagged as an error
    Error { message: String },
    /// One bullet list per record
    Records {
        records: Vec<RecordView>,
        /// Records left out because of the display limit
        hidden: usize,
        status: String,
        sql: Option<String>,
        analysis: Option<KeywordAnalysis>,
    },
    /// Display verbatim in a fixed-width block
    Preformatted { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    /// `Record N`, only set when there is more than one record
    pub header: Option<String>,
    pub fields: Vec<Field>,
}

/// A single `label: value` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: String,
    pub value: String,
}

impl PresentationShape {
    /// Render the shape, keeping at most `max_records` records.
    pub fn render(&self, max_records: Option<usize>) -> Rendering {
        match self {
            PresentationShape::Error { message } => Rendering::Error {
                message: message.clone(),
            },
            PresentationShape::Tabular {
                records,
                status,
                sql,
                analysis,
            } => {
                let numbered = records.len() > 1;
                let shown = max_records.map_or(records.len(), |max| max.min(records.len()));
                let views = records
                    .iter()
                    .take(shown)
                    .enumerate()
                    .map(|(i, record)| RecordView {
                        header: numbered.then(|| format!("Record {}", i + 1)),
                        fields: record_fields(record),
                    })
                    .collect();

                Rendering::Records {
                    records: views,
                    hidden: records.len() - shown,
                    status: status.clone().unwrap_or_else(|| DEFAULT_STATUS.to_string()),
                    sql: sql.clone(),
                    analysis: analysis.clone(),
                }
            }
            PresentationShape::Raw { text } => Rendering::Preformatted { text: text.clone() },
        }
    }
}

/// Replace underscores with spaces. Casing is left to the frontend.
pub fn humanize_key(key: &str) -> String {
    key.replace('_', " ")
}

/// String form of a field value
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => EMPTY_PLACEHOLDER.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

fn record_fields(record: &Record) -> Vec<Field> {
    match record {
        Some(map) => map
            .iter()
            .map(|(key, value)| Field {
                label: humanize_key(key),
                value: display_value(Some(value)),
            })
            .collect(),
        None => vec![Field {
            label: String::new(),
            value: EMPTY_PLACEHOLDER.to_string(),
        }],
    }
}

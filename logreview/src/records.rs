use crate::error::SENTINEL;
use serde::{Deserialize, Serialize};

/// A mined template waiting for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRow {
    #[serde(rename = "EventId")]
    pub event_id: String,
    #[serde(rename = "System")]
    pub system: String,
    #[serde(rename = "EventTemplate")]
    pub event_template: String,
    #[serde(rename = "Occurrences", default)]
    pub occurrences: Option<String>,
    #[serde(rename = "ExampleLog")]
    pub example_log: String,
}

impl TemplateRow {
    pub const REQUIRED_COLUMNS: &'static [&'static str] =
        &["EventId", "System", "EventTemplate", "ExampleLog"];
}

/// A manually reviewed example used to teach the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleRow {
    #[serde(rename = "System")]
    pub system: String,
    #[serde(rename = "EventId")]
    pub event_id: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "EventTemplate")]
    pub event_template: String,
    #[serde(rename = "Revised")]
    pub revised: String,
    #[serde(rename = "Guideline")]
    pub guideline: String,
}

impl ExampleRow {
    pub const REQUIRED_COLUMNS: &'static [&'static str] =
        &["System", "Content", "EventId", "EventTemplate", "Revised", "Guideline"];

    /// Rows with a blank log or template teach nothing and are skipped.
    pub fn is_usable(&self) -> bool {
        !self.content.trim().is_empty() && !self.event_template.trim().is_empty()
    }
}

/// What the assistant said about one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewResult {
    pub event_id: String,
    pub system: String,
    pub reviewed_template: String,
    pub suggestion: String,
}

/// An input row with the assistant's verdict attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRow {
    #[serde(rename = "EventId")]
    pub event_id: String,
    #[serde(rename = "System")]
    pub system: String,
    #[serde(rename = "Occurrences", default)]
    pub occurrences: Option<String>,
    #[serde(rename = "OriginalTemplate", default)]
    pub original_template: String,
    #[serde(rename = "ExampleLog", default)]
    pub example_log: String,
    #[serde(rename = "ReviewedTemplate")]
    pub reviewed_template: String,
    #[serde(rename = "Suggestion", default)]
    pub suggestion: String,
}

impl MergedRow {
    pub const REQUIRED_COLUMNS: &'static [&'static str] = &["EventId", "System", "ReviewedTemplate"];

    pub fn new(row: &TemplateRow, reviewed_template: String, suggestion: String) -> Self {
        Self {
            event_id: row.event_id.clone(),
            system: row.system.clone(),
            occurrences: row.occurrences.clone(),
            original_template: row.event_template.clone(),
            example_log: row.example_log.clone(),
            reviewed_template,
            suggestion,
        }
    }

    pub fn failed(row: &TemplateRow) -> Self {
        Self::new(row, SENTINEL.to_string(), SENTINEL.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.reviewed_template == SENTINEL
    }
}

/// Ground-truth revision produced by a human reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanRow {
    #[serde(rename = "EventId")]
    pub event_id: String,
    #[serde(rename = "System")]
    pub system: String,
    #[serde(rename = "Revised")]
    pub revised: String,
}

impl HumanRow {
    pub const REQUIRED_COLUMNS: &'static [&'static str] = &["EventId", "System", "Revised"];
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRow {
    pub reviewed: MergedRow,
    pub revised: String,
    pub similarity: f64,
    pub matched: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

use crate::error::SENTINEL;
use crate::records::ReviewResult;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{error, warn};

/// One entry of the assistant's JSON reply, fields trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub event_id: String,
    pub system: String,
    pub revised_template: String,
    pub revision_suggestions: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Parsed(Vec<ReviewItem>),
    Malformed(String),
}

impl Extraction {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Extraction::Malformed(_))
    }
}

/// Parse a batch reply. Anything but an array of well-formed objects is
/// `Malformed`; nothing is salvaged from a partially valid payload.
pub fn parse_batch_response(text: &str) -> Extraction {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return Extraction::Malformed(format!("invalid JSON: {e}")),
    };
    let Value::Array(items) = value else {
        return Extraction::Malformed("top-level value is not an array".into());
    };
    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let Value::Object(obj) = item else {
            return Extraction::Malformed(format!("item {idx} is not an object"));
        };
        match review_item(obj) {
            Ok(parsed) => out.push(parsed),
            Err(reason) => return Extraction::Malformed(format!("item {idx}: {reason}")),
        }
    }
    Extraction::Parsed(out)
}

fn review_item(obj: &Map<String, Value>) -> Result<ReviewItem, String> {
    Ok(ReviewItem {
        event_id: event_id_field(obj)?,
        system: text_field(obj, "System")?,
        revised_template: text_field(obj, "Revised_template")?,
        revision_suggestions: text_field(obj, "Revision_suggestions")?,
    })
}

// Models sometimes emit numeric ids; accept them as their textual form.
fn event_id_field(obj: &Map<String, Value>) -> Result<String, String> {
    match obj.get("EventId") {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(format!("EventId has unexpected type: {other}")),
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Result<String, String> {
    match obj.get(key) {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(other) => Err(format!("{key} is not a string: {other}")),
    }
}

/// Results keyed by trimmed EventId. A malformed reply yields an empty map so
/// every row of the batch falls back to the sentinel.
pub fn extract_batch_results(text: &str) -> HashMap<String, ReviewResult> {
    match parse_batch_response(text) {
        Extraction::Parsed(items) => {
            let mut out = HashMap::with_capacity(items.len());
            for item in items {
                if item.event_id.is_empty() {
                    warn!("dropping review item without EventId");
                    continue;
                }
                out.insert(
                    item.event_id.clone(),
                    ReviewResult {
                        event_id: item.event_id,
                        system: item.system,
                        reviewed_template: item.revised_template,
                        suggestion: item.revision_suggestions,
                    },
                );
            }
            out
        }
        Extraction::Malformed(reason) => {
            error!("could not parse assistant response: {reason}");
            HashMap::new()
        }
    }
}

/// Parse a per-row reply: a single object with `Revised_template` and
/// `Revision_suggestions`. Returns the sentinel pair on any failure.
pub fn extract_single_result(text: &str) -> (String, String) {
    let parsed = serde_json::from_str::<Value>(text)
        .map_err(|e| format!("invalid JSON: {e}"))
        .and_then(|v| match v {
            Value::Object(obj) => Ok(obj),
            _ => Err("top-level value is not an object".to_string()),
        })
        .and_then(|obj| {
            Ok((text_field(&obj, "Revised_template")?, text_field(&obj, "Revision_suggestions")?))
        });
    match parsed {
        Ok(pair) => pair,
        Err(reason) => {
            error!("could not parse assistant response: {reason}");
            (SENTINEL.to_string(), SENTINEL.to_string())
        }
    }
}

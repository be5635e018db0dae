#![allow(dead_code)]

use logreview::client::Completion;
use logreview::records::{ExampleRow, TemplateRow};
use logreview::ReviewError;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Replays scripted replies in order and records every prompt it was sent.
/// Once the script runs out, every further call fails.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: RefCell<VecDeque<Result<String, ReviewError>>>,
    pub calls: RefCell<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Result<String, ReviewError>>) -> Self {
        Self { replies: RefCell::new(replies.into()), calls: RefCell::new(Vec::new()) }
    }

    pub fn always_failing() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Completion for ScriptedCompletion {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ReviewError> {
        self.calls.borrow_mut().push((system_prompt.to_string(), user_prompt.to_string()));
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ReviewError::Transport("connection refused".into())))
    }
}

pub fn template(id: &str, system: &str) -> TemplateRow {
    TemplateRow {
        event_id: id.into(),
        system: system.into(),
        event_template: format!("Receiving block <*> for {id}"),
        occurrences: Some("3".to_string()),
        example_log: format!("Receiving block blk_-160 for {id}"),
    }
}

pub fn example(system: &str, id: &str) -> ExampleRow {
    ExampleRow {
        system: system.into(),
        event_id: id.into(),
        content: "PacketResponder 1 for block blk_38865 terminating".into(),
        event_template: "PacketResponder <*> for block <*> terminating".into(),
        revised: "PacketResponder <*> for block <*> terminating".into(),
        guideline: "The original template is complete.".into(),
    }
}

pub fn reply_for(rows: &[TemplateRow]) -> String {
    let items: Vec<serde_json::Value> = rows
        .iter()
        .map(|r| {
            serde_json::json!({
                "EventId": r.event_id,
                "System": r.system,
                "Revised_template": format!("revised {}", r.event_id),
                "Revision_suggestions": "ok",
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

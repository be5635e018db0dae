//! Talking to the text-generation endpoint.
//!
//! `ChatClient` speaks the OpenAI-compatible chat-completions protocol over a
//! blocking HTTP client. `TemplateReviewer` sits on top of any `Completion`
//! and turns template rows into user messages. It never lets a failed call
//! abort the run: failures come back as the `"ERROR"` sentinel.

use crate::error::{ReviewError, SENTINEL};
use crate::records::TemplateRow;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::{Duration, Instant};
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Endpoint settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), ..Default::default() }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            top_p: 0.9,
            timeout: Duration::from_secs(120),
        }
    }
}

/// A single system+user exchange with a text-generation model.
pub trait Completion {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ReviewError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct ChatClient {
    config: ClientConfig,
    http: reqwest::blocking::Client,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<Self, ReviewError> {
        if config.api_key.trim().is_empty() {
            return Err(ReviewError::InvalidConfig("API key is empty".into()));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReviewError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    pub fn build_request(&self, system_prompt: &str, user_prompt: &str) -> ChatRequest {
        build_request(&self.config, system_prompt, user_prompt)
    }
}

pub fn build_request(config: &ClientConfig, system_prompt: &str, user_prompt: &str) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage { role: "system".into(), content: system_prompt.to_string() },
            ChatMessage { role: "user".into(), content: user_prompt.to_string() },
        ],
        temperature: config.temperature,
        top_p: config.top_p,
    }
}

/// Pull `choices[0].message.content` out of a chat-completions body.
pub fn parse_chat_response(body: &str) -> Result<String, ReviewError> {
    let resp: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ReviewError::Transport(format!("unreadable response body: {e}")))?;
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ReviewError::Transport("response carried no message content".into()))
}

impl Completion for ChatClient {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ReviewError> {
        let request = self.build_request(system_prompt, user_prompt);
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ReviewError::Transport(format!("timed out after {}s", self.config.timeout.as_secs()))
                } else {
                    ReviewError::Transport(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ReviewError::Transport(format!("failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(ReviewError::Transport(format!("HTTP {status}: {body}")));
        }
        parse_chat_response(&body)
    }
}

/// User message asking for a whole batch to be reviewed at once.
pub fn render_batch_request(rows: &[TemplateRow]) -> String {
    let mut lines = vec!["Please review and optimize the following log templates:\n".to_string()];
    for row in rows {
        let mut block = String::new();
        let _ = write!(
            block,
            "\nSystem: {}\nEventId: {}\nOccurrences: {}\nEventTemplate: {}\nExampleLog: {}\n---",
            row.system,
            row.event_id,
            occurrences_label(row),
            row.event_template,
            row.example_log,
        );
        lines.push(block);
    }
    lines.join("\n")
}

/// User message for the per-row review mode.
pub fn render_single_request(row: &TemplateRow) -> String {
    format!(
        "Please review and optimize the following template: \nEventId: {}\nOccurrences: {}\nTemplate: {}\nExample: {}\nPlease provide optimization suggestions based on the style of the previous samples and return the optimization template.",
        row.event_id,
        occurrences_label(row),
        row.event_template,
        row.example_log,
    )
}

fn occurrences_label(row: &TemplateRow) -> &str {
    row.occurrences.as_deref().unwrap_or("N/A")
}

pub struct TemplateReviewer<C> {
    completion: C,
}

impl<C: Completion> TemplateReviewer<C> {
    pub fn new(completion: C) -> Self {
        Self { completion }
    }

    pub fn completion(&self) -> &C {
        &self.completion
    }

    /// One endpoint call for the whole batch. Returns the raw reply text, or
    /// the sentinel when the call failed.
    pub fn review_batch(&self, system_prompt: &str, rows: &[TemplateRow]) -> String {
        let user_prompt = render_batch_request(rows);
        self.call(system_prompt, &user_prompt, "batch")
    }

    pub fn review_one(&self, system_prompt: &str, row: &TemplateRow) -> String {
        let user_prompt = render_single_request(row);
        self.call(system_prompt, &user_prompt, "single")
    }

    fn call(&self, system_prompt: &str, user_prompt: &str, kind: &str) -> String {
        let started = Instant::now();
        match self.completion.complete(system_prompt, user_prompt) {
            Ok(text) => {
                info!(kind, elapsed_secs = started.elapsed().as_secs_f64(), "endpoint call finished");
                text
            }
            Err(e) => {
                error!(kind, "endpoint call failed: {e}");
                SENTINEL.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read as _, Write as _};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    fn row(id: &str, occurrences: Option<&str>) -> TemplateRow {
        TemplateRow {
            event_id: id.into(),
            system: "HDFS".into(),
            event_template: "Receiving block <*>".into(),
            occurrences: occurrences.map(str::to_string),
            example_log: "Receiving block blk_1".into(),
        }
    }

    #[test]
    fn request_carries_fixed_sampling() {
        let cfg = ClientConfig::new("k");
        let req = build_request(&cfg, "sys", "usr");
        assert_eq!(req.model, "gpt-4o-mini");
        assert!((req.temperature - 0.3).abs() < f32::EPSILON);
        assert!((req.top_p - 0.9).abs() < f32::EPSILON);
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages[1].content, "usr");
    }

    #[test]
    fn chat_response_content_is_extracted() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"[]"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "[]");
        assert!(parse_chat_response(r#"{"choices":[]}"#).is_err());
        assert!(parse_chat_response("<html>").is_err());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = ChatClient::new(ClientConfig::default()).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let cfg = ClientConfig { base_url: "http://localhost:8080/v1/".into(), ..ClientConfig::new("k") };
        let client = ChatClient::new(cfg).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn batch_request_lists_every_row() {
        let text = render_batch_request(&[row("E1", Some("4")), row("E2", None)]);
        assert!(text.starts_with("Please review and optimize the following log templates:\n"));
        assert!(text.contains("EventId: E1\nOccurrences: 4\n"));
        assert!(text.contains("EventId: E2\nOccurrences: N/A\n"));
        assert_eq!(text.matches("---").count(), 2);
    }

    /// Serve a single canned HTTP response on a loopback port. Returns the base
    /// URL and a channel that yields the raw request once it has been read.
    fn serve_once(status: &str, body: &str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            let _ = tx.send(request);
        });
        (format!("http://{addr}/v1"), rx)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if raw.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&raw).to_string()
    }

    fn local_client(base_url: String) -> ChatClient {
        let config = ClientConfig { base_url, timeout: Duration::from_secs(5), ..ClientConfig::new("k") };
        let http = reqwest::blocking::Client::builder().no_proxy().timeout(config.timeout).build().unwrap();
        ChatClient { config, http }
    }

    #[test]
    fn chat_client_posts_and_returns_content() {
        let (base_url, request) =
            serve_once("200 OK", r#"{"choices":[{"message":{"role":"assistant","content":"[{\"EventId\":\"E1\"}]"}}]}"#);
        let client = local_client(base_url);
        let reply = client.complete("sys", "usr").unwrap();
        assert_eq!(reply, r#"[{"EventId":"E1"}]"#);

        let request = request.recv_timeout(Duration::from_secs(5)).unwrap();
        let lowered = request.to_ascii_lowercase();
        assert!(lowered.starts_with("post /v1/chat/completions "));
        assert!(lowered.contains("authorization: bearer k\r\n"));
        assert!(request.contains(r#""model":"gpt-4o-mini""#));
        assert!(request.contains(r#""content":"usr""#));
    }

    #[test]
    fn server_error_status_becomes_sentinel() {
        let (base_url, _request) = serve_once("500 Internal Server Error", r#"{"error":"overloaded"}"#);
        let client = local_client(base_url.clone());
        let err = client.complete("sys", "usr").unwrap_err();
        match err {
            ReviewError::Transport(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("overloaded"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let (base_url, _request) = serve_once("500 Internal Server Error", "{}");
        let reviewer = TemplateReviewer::new(local_client(base_url));
        assert_eq!(reviewer.review_batch("sys", &[row("E1", None)]), SENTINEL);
    }

    #[test]
    fn success_without_content_is_a_transport_error() {
        let (base_url, _request) = serve_once("200 OK", r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#);
        let err = local_client(base_url).complete("sys", "usr").unwrap_err();
        assert!(matches!(err, ReviewError::Transport(_)));
    }

    #[test]
    fn unreachable_endpoint_becomes_sentinel() {
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let client = local_client(format!("http://127.0.0.1:{port}/v1"));
        assert!(matches!(client.complete("sys", "usr"), Err(ReviewError::Transport(_))));

        let reviewer = TemplateReviewer::new(local_client(format!("http://127.0.0.1:{port}/v1")));
        assert_eq!(reviewer.review_batch("sys", &[row("E1", Some("2"))]), SENTINEL);
        assert_eq!(reviewer.review_one("sys", &row("E1", Some("2"))), SENTINEL);
    }
}

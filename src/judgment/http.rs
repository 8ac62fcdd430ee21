//! HTTP judge - OpenAI-compatible chat-completions client
//!
//! Sends the query rubric as the system message and the JSON context as the
//! user message; returns the first choice's content. Deadlines are enforced
//! by the gate, the client timeout is only a backstop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{JudgmentError, JudgmentPort, JudgmentQuery};

/// Backstop for a hung connection; the gate's timeout normally fires first.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
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
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions judgment backend
#[derive(Clone)]
pub struct HttpJudge {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpJudge {
    /// # Errors
    ///
    /// Returns `JudgmentError::Backend` if the HTTP client cannot be built.
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>) -> Result<Self, JudgmentError> {
        let http = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| JudgmentError::Backend(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
        })
    }
}

fn transport_error(e: &reqwest::Error) -> JudgmentError {
    if e.is_timeout() {
        JudgmentError::Timeout {
            after_ms: CLIENT_TIMEOUT.as_millis() as u64,
        }
    } else {
        JudgmentError::Transport(e.to_string())
    }
}

/// Lead-in for the user message, matching what the context holds.
fn user_preamble(query: &JudgmentQuery<'_>) -> &'static str {
    match query {
        JudgmentQuery::Validation { .. } | JudgmentQuery::Fraud { .. } => {
            "Here is the transaction data:"
        }
        JudgmentQuery::RecoverySummary { .. } => {
            "The transaction has been processed with the following status:"
        }
    }
}

#[async_trait]
impl JudgmentPort for HttpJudge {
    async fn answer(&self, query: &JudgmentQuery<'_>) -> Result<String, JudgmentError> {
        let context = serde_json::to_string_pretty(&query.context())
            .map_err(|e| JudgmentError::Backend(e.to_string()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: query.rubric().to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("{}\n\n{context}", user_preamble(query)),
                },
            ],
            temperature: 0.0,
        };

        let mut req = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| transport_error(&e))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(JudgmentError::Transport(format!("server returned {status}")));
        }
        if !status.is_success() {
            return Err(JudgmentError::Backend(format!("server returned {status}")));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| JudgmentError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| JudgmentError::Malformed("no content in first choice".into()))
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

//! Triage classifier: assigns a priority, a one-sentence summary and an
//! optional suggested reply to a new ticket.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use helpdesk_types::models::{Priority, TriageResult};

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("quota exhausted")]
    QuotaExhausted,

    #[error("remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for TriageError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() { Self::Timeout } else { Self::Transport(e) }
    }
}

#[async_trait]
pub trait TriageClassifier: Send + Sync {
    async fn classify(&self, title: &str, description: &str) -> Result<TriageResult, TriageError>;
}

/// Chat-completions backed classifier.
pub struct OpenAiClassifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClassifier {
    pub fn new(api_key: String, base_url: Option<String>, model: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model,
        })
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

fn prompt(title: &str, description: &str) -> String {
    format!(
        "You are a support ticket triage assistant. Given the following ticket, assign a priority \
         (\"high\", \"medium\", or \"low\"), provide a one-sentence summary, and draft a short \
         suggested response to the customer.\n\n\
         Subject: {title}\n\
         Description: {description}\n\n\
         Respond in JSON only:\n\
         {{\n  \"priority\": \"high|medium|low\",\n  \"summary\": \"...\",\n  \"suggested_response\": \"...\"\n}}"
    )
}

#[async_trait]
impl TriageClassifier for OpenAiClassifier {
    async fn classify(&self, title: &str, description: &str) -> Result<TriageResult, TriageError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt(title, description) }],
                "temperature": 0.2,
            }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TriageError::QuotaExhausted);
        }
        if !status.is_success() {
            let body: String = response.text().await.unwrap_or_default().chars().take(512).collect();
            return Err(TriageError::Status { status: status.as_u16(), body });
        }

        let completion: ChatCompletion = response.json().await.map_err(|e| {
            if e.is_timeout() { TriageError::Timeout } else { TriageError::Malformed(e.to_string()) }
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| TriageError::Malformed("completion has no content".into()))?;

        debug!(len = content.len(), "triage completion received");
        decode_triage(&content)
    }
}

#[derive(Deserialize)]
struct RawTriage {
    priority: String,
    summary: String,
    #[serde(default)]
    suggested_response: Option<String>,
}

/// Decodes the model's reply into a typed result. Surrounding Markdown code
/// fences are tolerated; anything else that is not the expected object fails.
pub fn decode_triage(content: &str) -> Result<TriageResult, TriageError> {
    let body = strip_code_fence(content.trim());
    let raw: RawTriage =
        serde_json::from_str(body).map_err(|e| TriageError::Malformed(format!("not the expected JSON: {e}")))?;

    let priority: Priority = raw
        .priority
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|e| TriageError::Malformed(format!("{e}")))?;

    let summary = raw.summary.trim().to_string();
    if summary.is_empty() {
        return Err(TriageError::Malformed("empty summary".into()));
    }

    let suggested_response = raw
        .suggested_response
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(TriageResult { priority, summary, suggested_response })
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // drop the info string, e.g. "json"
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Used when no classifier is configured: every ticket starts at low priority
/// with its title as the summary.
pub struct FallbackClassifier;

#[async_trait]
impl TriageClassifier for FallbackClassifier {
    async fn classify(&self, title: &str, _description: &str) -> Result<TriageResult, TriageError> {
        Ok(TriageResult {
            priority: Priority::Low,
            summary: title.to_string(),
            suggested_response: None,
        })
    }
}

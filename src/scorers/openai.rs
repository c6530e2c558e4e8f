//! OpenAI-compatible chat-completions judge endpoint.
//!
//! One blocking HTTP call per `complete`, with a classified retry policy:
//!
//! | Failure | Class | Action |
//! |---------|-------|--------|
//! | HTTP 400 | content policy | costs 5 retry credits, longer backoff step |
//! | HTTP 408/429, transport timeout | rate limit | costs 1 credit, short backoff |
//! | HTTP 5xx | transient server | costs 1 credit, short backoff |
//! | anything else (401, 404, ...) | fatal | surfaces as [`Error::Judge`] |
//!
//! The budget is shared across classes; once exhausted, `complete` returns
//! `Ok(None)` and the caller scores the pair 0.0. A well-formed reply with no
//! content also yields `Ok(None)` without retrying.

use std::time::Duration;

use serde_json::json;

use crate::scorers::judge::JudgeEndpoint;
use crate::{Error, Result};

/// Default chat-completions endpoint.
pub const DEFAULT_JUDGE_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Default judge model.
pub const DEFAULT_JUDGE_MODEL: &str = "chatgpt-4o-latest";
/// Default retry-credit budget per call.
pub const DEFAULT_MAX_RETRIES: u32 = 15;
/// Retry credits consumed by a content-policy rejection.
const POLICY_RETRY_COST: u32 = 5;
/// Completion token cap per call.
const MAX_COMPLETION_TOKENS: u32 = 2000;

/// How a failed call should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Content-policy rejection: worth few further attempts.
    ContentPolicy,
    /// Rate limit, timeout, or transient server error: retry after a pause.
    Transient,
    /// Misconfiguration (bad credentials, unknown route): do not retry.
    Fatal,
}

/// Classify an HTTP status for retry purposes.
#[must_use]
pub fn classify_status(status: u16) -> RetryClass {
    match status {
        400 => RetryClass::ContentPolicy,
        408 | 429 => RetryClass::Transient,
        500..=599 => RetryClass::Transient,
        _ => RetryClass::Fatal,
    }
}

/// Backoff before the next attempt, escalating with spent credits.
#[must_use]
fn transient_backoff(spent_credits: u32) -> Duration {
    Duration::from_secs(u64::from(1 + spent_credits / POLICY_RETRY_COST))
}

/// Backoff after a content-policy rejection.
const POLICY_BACKOFF: Duration = Duration::from_secs(5);

enum CallOutcome {
    Content(String),
    Empty,
    Retry(RetryClass, String),
    Fatal(String),
}

/// Blocking judge client over an OpenAI-compatible chat-completions API.
pub struct OpenAiJudge {
    agent: ureq::Agent,
    url: String,
    model: String,
    api_key: String,
    max_retries: u32,
}

impl OpenAiJudge {
    /// Create a client with an explicit API key and defaults elsewhere.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(120))
                .build(),
            url: DEFAULT_JUDGE_URL.to_string(),
            model: DEFAULT_JUDGE_MODEL.to_string(),
            api_key: api_key.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a client reading the API key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::judge("OPENAI_API_KEY is not set"))?;
        if api_key.is_empty() {
            return Err(Error::judge("OPENAI_API_KEY is empty"));
        }
        Ok(Self::new(api_key))
    }

    /// Override the endpoint URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Override the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the retry-credit budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Request body for one prompt.
    fn request_body(&self, prompt: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": "You are a helpful assistant." },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": MAX_COMPLETION_TOKENS,
        })
    }

    fn call_once(&self, prompt: &str) -> CallOutcome {
        let response = self
            .agent
            .post(&self.url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(self.request_body(prompt));

        match response {
            Ok(response) => match response.into_json::<serde_json::Value>() {
                Ok(body) => {
                    let content = body["choices"][0]["message"]["content"].as_str();
                    match content {
                        Some(text) => CallOutcome::Content(text.to_string()),
                        None => CallOutcome::Empty,
                    }
                }
                Err(e) => CallOutcome::Retry(
                    RetryClass::Transient,
                    format!("unreadable response body: {}", e),
                ),
            },
            Err(ureq::Error::Status(status, _)) => {
                let class = classify_status(status);
                let message = format!("HTTP {} from {}", status, self.url);
                match class {
                    RetryClass::Fatal => CallOutcome::Fatal(message),
                    other => CallOutcome::Retry(other, message),
                }
            }
            Err(ureq::Error::Transport(t)) => {
                CallOutcome::Retry(RetryClass::Transient, format!("transport error: {}", t))
            }
        }
    }
}

impl JudgeEndpoint for OpenAiJudge {
    fn complete(&self, prompt: &str) -> Result<Option<String>> {
        let mut spent = 0u32;
        while spent < self.max_retries {
            match self.call_once(prompt) {
                CallOutcome::Content(text) => return Ok(Some(text)),
                CallOutcome::Empty => return Ok(None),
                CallOutcome::Retry(RetryClass::ContentPolicy, message) => {
                    spent += POLICY_RETRY_COST;
                    log::warn!(
                        "judge rejected request ({}), {} of {} retry credits spent",
                        message,
                        spent,
                        self.max_retries
                    );
                    std::thread::sleep(POLICY_BACKOFF);
                }
                CallOutcome::Retry(_, message) => {
                    spent += 1;
                    log::debug!(
                        "judge call failed ({}), {} of {} retry credits spent",
                        message,
                        spent,
                        self.max_retries
                    );
                    std::thread::sleep(transient_backoff(spent));
                }
                CallOutcome::Fatal(message) => return Err(Error::judge(message)),
            }
        }
        log::warn!(
            "judge call abandoned after {} retry credits",
            self.max_retries
        );
        Ok(None)
    }
}

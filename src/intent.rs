//! HTTP client for the remote intent service
//!
//! The service interprets a recognized utterance (or typed text) and answers
//! with a short message to show and speak. Only the `message` field drives the
//! session; `success` and `data` are carried along for logging.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::{Error, Result};

/// Path of the processing endpoint, relative to the service base
const PROCESS_PATH: &str = "voice/process";

/// Reply text used when the service sends no usable message
pub const DEFAULT_REPLY: &str = "Done.";

/// Parsed reply from the intent service
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Text to display and speak
    pub message: String,
    /// Service-reported outcome, if present
    pub success: Option<bool>,
    /// Structured payload, if present
    pub data: Option<Value>,
}

impl Reply {
    /// Interpret a response body
    ///
    /// # Errors
    ///
    /// Returns error if the body is JSON `null`
    pub fn from_body(body: &Value) -> Result<Self> {
        match body {
            Value::Null => Err(Error::Request("empty response body".to_string())),
            Value::Object(fields) => Ok(Self {
                message: reply_message(fields.get("message")),
                success: fields.get("success").and_then(Value::as_bool),
                data: fields.get("data").filter(|v| !v.is_null()).cloned(),
            }),
            _ => Ok(Self {
                message: DEFAULT_REPLY.to_string(),
                success: None,
                data: None,
            }),
        }
    }
}

/// Message text from a raw `message` field
///
/// Falsy values (missing, null, empty string, false, zero) fall back to
/// [`DEFAULT_REPLY`]; other non-string values render as JSON.
fn reply_message(message: Option<&Value>) -> String {
    match message {
        None | Some(Value::Null | Value::Bool(false)) => DEFAULT_REPLY.to_string(),
        Some(Value::String(s)) if s.is_empty() => DEFAULT_REPLY.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => DEFAULT_REPLY.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Interprets text and produces a reply
#[async_trait]
pub trait IntentService: Send + Sync {
    /// Send text for processing
    ///
    /// # Errors
    ///
    /// Returns error if the service cannot be reached or its reply is unreadable
    async fn process(&self, text: &str) -> Result<Reply>;

    /// Base address shown to the user when the service is unreachable
    fn endpoint(&self) -> &str;
}

#[derive(Serialize)]
struct ProcessRequest<'a> {
    text: &'a str,
}

/// Intent service reached over HTTP
#[derive(Clone)]
pub struct HttpIntentClient {
    client: reqwest::Client,
    base: String,
    process_url: Url,
}

impl HttpIntentClient {
    /// Create a client for the service at `base`
    ///
    /// # Errors
    ///
    /// Returns error if the processing URL cannot be derived from `base`
    pub fn new(base: &Url) -> Result<Self> {
        let mut root = base.clone();
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base: base.as_str().trim_end_matches('/').to_string(),
            process_url: root.join(PROCESS_PATH)?,
        })
    }

    /// Full URL requests are posted to
    #[must_use]
    pub const fn process_url(&self) -> &Url {
        &self.process_url
    }
}

#[async_trait]
impl IntentService for HttpIntentClient {
    async fn process(&self, text: &str) -> Result<Reply> {
        tracing::debug!(url = %self.process_url, chars = text.len(), "sending text to intent service");

        let response = self
            .client
            .post(self.process_url.clone())
            .json(&ProcessRequest { text })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "intent request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "intent service returned non-success status");
        }

        let body: Value = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse intent response");
            e
        })?;

        let reply = Reply::from_body(&body)?;
        tracing::info!(
            message = %reply.message,
            success = ?reply.success,
            has_data = reply.data.is_some(),
            "intent reply received"
        );
        if let Some(data) = &reply.data {
            tracing::debug!(%data, "intent reply data");
        }

        Ok(reply)
    }

    fn endpoint(&self) -> &str {
        &self.base
    }
}

//! Outbound Telegram delivery.
//!
//! Delivery is fire-and-forget: one `sendMessage` call with a bounded timeout,
//! response body discarded, no retry. Every transport or API failure stops at
//! this boundary — it is logged and swallowed so a failed announcement can
//! never disturb the request (or commit) that triggered it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::settings::ParseMode;

/// Bound on the whole outbound request, connect included.
const SEND_TIMEOUT: Duration = Duration::from_secs(8);

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Errors from a single delivery attempt.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("telegram responded with status {0}")]
    Status(StatusCode),
}

/// Anything that can deliver a text message to a chat.
///
/// The evaluator and the admin test-send only see this trait; tests substitute
/// a recording implementation.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Best-effort delivery. Implementations log failures and return.
    async fn send(&self, token: &str, chat_id: &str, text: &str, parse_mode: ParseMode);
}

/// [`ChatSink`] backed by the Telegram Bot HTTP API.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new() -> Result<Self, NotifyError> {
        static APP_USER_AGENT: &str =
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(SEND_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point at a different API host (tests, local bot API servers).
    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// One `sendMessage` call; errors are returned to the caller.
    ///
    /// [`ChatSink::send`] is the swallowing wrapper around this.
    pub async fn try_send(
        &self,
        token: &str,
        chat_id: &str,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<(), NotifyError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            token
        );

        let mut form = vec![("chat_id", chat_id), ("text", text)];
        if parse_mode != ParseMode::Plain {
            form.push(("parse_mode", parse_mode.as_str()));
        }

        let response = self.http.post(&url).form(&form).send().await?;
        let status = response.status();
        // Response body intentionally discarded.
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatSink for TelegramNotifier {
    async fn send(&self, token: &str, chat_id: &str, text: &str, parse_mode: ParseMode) {
        if let Err(error) = self.try_send(token, chat_id, text, parse_mode).await {
            tracing::error!(error = %error, "failed to send telegram message");
        }
    }
}

/// Literal `{name}` substitution.
///
/// No escaping, no recursion: values are substituted as-is and placeholders
/// with no matching key stay verbatim in the output.
pub fn render_template(template: &str, vars: &[(&str, String)]) -> String {
    let mut rendered = template.to_string();
    for (key, value) in vars {
        rendered = rendered.replace(&format!("{{{key}}}"), value);
    }
    rendered
}

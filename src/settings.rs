//! Plugin settings persisted in the host platform's generic config table.
//!
//! The host owns a `config` key/value table; this module reads and writes the
//! five settings the announcer needs under fixed `FB_TG_*` keys. Nothing here
//! creates schema or migrates anything.
//!
//! - `FB_TG_ENABLED` – `"1"` / `"0"`
//! - `FB_TG_TOKEN` – bot token (never echoed raw by the admin surface)
//! - `FB_TG_CHAT_ID` – destination chat
//! - `FB_TG_TEMPLATE` – message template, `{placeholder}` substitution
//! - `FB_TG_PARSE_MODE` – `""`, `"HTML"` or `"MarkdownV2"`

use std::fmt;
use std::str::FromStr;

use sqlx::SqlitePool;
use thiserror::Error;

pub const CFG_ENABLED: &str = "FB_TG_ENABLED";
pub const CFG_TOKEN: &str = "FB_TG_TOKEN";
pub const CFG_CHAT_ID: &str = "FB_TG_CHAT_ID";
pub const CFG_TEMPLATE: &str = "FB_TG_TEMPLATE";
pub const CFG_PARSE_MODE: &str = "FB_TG_PARSE_MODE";

/// Host config key holding the competition mode (`"users"` or `"teams"`).
pub const CFG_USER_MODE: &str = "user_mode";

/// Template used when the stored template is blank.
pub const DEFAULT_TEMPLATE: &str = "🩸 FIRST BLOOD! {solver} solved {challenge}";

/// Placeholders understood by the message template.
pub const PLACEHOLDERS: [&str; 8] = [
    "{solver}",
    "{solver_type}",
    "{challenge}",
    "{category}",
    "{points}",
    "{solve_id}",
    "{challenge_id}",
    "{date_utc}",
];

/// Errors from settings access and validation.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Underlying config table read/write failed.
    #[error("config table access failed: {0}")]
    Db(#[from] sqlx::Error),

    /// Rejected `parse_mode` value.
    #[error("parse_mode must be one of '', 'HTML', 'MarkdownV2'")]
    InvalidParseMode(String),
}

/// Telegram message formatting mode.
///
/// Stored as its wire string; the empty string means plain text and is omitted
/// from the outbound request entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    #[default]
    Plain,
    Html,
    MarkdownV2,
}

impl ParseMode {
    /// Wire representation, also the stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Plain => "",
            ParseMode::Html => "HTML",
            ParseMode::MarkdownV2 => "MarkdownV2",
        }
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParseMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(ParseMode::Plain),
            "HTML" => Ok(ParseMode::Html),
            "MarkdownV2" => Ok(ParseMode::MarkdownV2),
            other => Err(SettingsError::InvalidParseMode(other.to_string())),
        }
    }
}

/// Whether the competition scores individual users or teams.
///
/// Resolved once per evaluation from the host's `user_mode` config value and
/// passed around explicitly from there on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionMode {
    Users,
    Teams,
}

impl CompetitionMode {
    /// Table holding the accounts for this mode.
    pub fn account_table(self) -> &'static str {
        match self {
            CompetitionMode::Users => "users",
            CompetitionMode::Teams => "teams",
        }
    }

    /// Value of the `{solver_type}` placeholder.
    pub fn solver_type(self) -> &'static str {
        match self {
            CompetitionMode::Users => "user",
            CompetitionMode::Teams => "team",
        }
    }
}

/// Point-in-time view of all five settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub enabled: bool,
    pub token: String,
    pub chat_id: String,
    pub template: String,
    pub parse_mode: ParseMode,
}

impl Settings {
    /// True when both token and chat id are non-blank.
    pub fn is_configured(&self) -> bool {
        !self.token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

/// Reads and writes `FB_TG_*` keys in the host's config table.
#[derive(Clone)]
pub struct SettingsStore {
    pool: SqlitePool,
}

impl SettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a single config value, `None` when the key is absent or NULL.
    pub async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT value FROM config WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(value,)| value))
    }

    /// Read a single config value, falling back to `default` when unset.
    pub async fn get_or(&self, key: &str, default: &str) -> Result<String, SettingsError> {
        Ok(self.get(key).await?.unwrap_or_else(|| default.to_string()))
    }

    /// Upsert a single config value.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        sqlx::query(
            "INSERT INTO config (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        tracing::debug!(key, "updated plugin setting");
        Ok(())
    }

    /// Read all five settings in one pass.
    ///
    /// A stored parse mode that no longer validates (edited out of band) is
    /// demoted to plain text with a warning rather than poisoning every
    /// evaluation.
    pub async fn snapshot(&self) -> Result<Settings, SettingsError> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT key, value FROM config WHERE key IN (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(CFG_ENABLED)
        .bind(CFG_TOKEN)
        .bind(CFG_CHAT_ID)
        .bind(CFG_TEMPLATE)
        .bind(CFG_PARSE_MODE)
        .fetch_all(&self.pool)
        .await?;

        let lookup = |key: &str| -> String {
            rows.iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        let template = lookup(CFG_TEMPLATE);
        let template = if template.trim().is_empty() {
            DEFAULT_TEMPLATE.to_string()
        } else {
            template
        };

        let raw_mode = lookup(CFG_PARSE_MODE);
        let parse_mode = raw_mode.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw_mode, "stored parse_mode is invalid, treating as plain text");
            ParseMode::Plain
        });

        Ok(Settings {
            enabled: truthy(&lookup(CFG_ENABLED)),
            token: lookup(CFG_TOKEN),
            chat_id: lookup(CFG_CHAT_ID),
            template,
            parse_mode,
        })
    }

    /// Competition mode from the host's `user_mode` config value.
    pub async fn competition_mode(&self) -> Result<CompetitionMode, SettingsError> {
        let mode = self.get_or(CFG_USER_MODE, "users").await?;
        if mode.trim().eq_ignore_ascii_case("teams") {
            Ok(CompetitionMode::Teams)
        } else {
            Ok(CompetitionMode::Users)
        }
    }
}

/// Truthy-string parsing for boolean-like settings and request fields.
pub fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Mask a bot token for display.
///
/// Short tokens are fully starred; longer ones keep the first six and last
/// four characters so an admin can tell which bot is configured.
pub fn mask_token(token: &str) -> String {
    let token = token.trim();
    if token.is_empty() {
        return String::new();
    }
    if token.chars().count() <= 10 {
        return "*".repeat(token.chars().count());
    }
    let head: String = token.chars().take(6).collect();
    let tail: String = token
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{head}...{tail}")
}

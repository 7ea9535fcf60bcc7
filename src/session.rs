//! Page context: what the hosting page knows about the current visitor.
//!
//! A run needs the page URL (to tell a channel page from a single program page),
//! the cookie string (for the `qingting_id` session id), the stored refresh token
//! and device id, and optionally the visible program title. Embedders collect
//! these from wherever the page state lives and hand them over as a
//! [`PageContext`].

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::types::RunMode;

/// Snapshot of the hosting page's state
#[derive(Clone, Debug, Default)]
pub struct PageContext {
    /// Current page URL
    pub url: String,
    /// Raw `Cookie` string of the page
    pub cookie: Option<String>,
    /// Text of the visible program title element, if any
    pub title: Option<String>,
    /// Stored refresh token, as persisted by the site (JSON-encoded string)
    pub refresh_token: Option<String>,
    /// Stored device identifier
    pub device_id: Option<String>,
}

impl PageContext {
    /// Context for a page URL with nothing else known
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the page cookie string
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// Set the visible program title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the stored refresh token
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Set the stored device identifier
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Session id from the `qingting_id` cookie
    ///
    /// # Errors
    /// [`Error::Precondition`] if the cookie is absent or empty
    pub fn qingting_id(&self) -> Result<String> {
        self.cookie
            .as_deref()
            .and_then(|cookie| cookie_pattern().captures(cookie))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Error::Precondition("qingting_id cookie not found, is the user logged in?".into())
            })
    }

    /// Refresh token, decoded from its stored form
    ///
    /// The site stores the token JSON-encoded (`"\"abc\""`); a raw value that is not
    /// a JSON string is used as-is.
    ///
    /// # Errors
    /// [`Error::Precondition`] if no token is stored
    pub fn refresh_token(&self) -> Result<String> {
        let stored = self
            .refresh_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                Error::Precondition("refresh token not found, is the user logged in?".into())
            })?;

        Ok(serde_json::from_str::<String>(stored).unwrap_or_else(|_| stored.to_string()))
    }

    /// Stored device id, or `default` when none is stored
    pub fn device_id<'a>(&'a self, default: &'a str) -> &'a str {
        self.device_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(default)
    }

    /// Decide whether this page is a single program page or a channel page
    ///
    /// # Errors
    /// [`Error::Parse`] if the URL contains no channel id
    pub fn run_mode(&self) -> Result<RunMode> {
        if let Some(caps) = program_page_pattern().captures(&self.url) {
            return Ok(RunMode::SingleEpisode {
                channel_id: caps[1].to_string(),
                program_id: caps[2].to_string(),
            });
        }

        channel_page_pattern()
            .captures(&self.url)
            .map(|caps| RunMode::Channel {
                channel_id: caps[1].to_string(),
            })
            .ok_or_else(|| Error::Parse(format!("no channel id in {}", self.url)))
    }

    /// Display title for a single program page
    ///
    /// Falls back to `"{channel_id}-{program_id}"` when the page shows no title.
    pub fn program_title(&self, channel_id: &str, program_id: &str) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", channel_id, program_id))
    }
}

#[allow(clippy::expect_used)]
fn cookie_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|;)\s*qingting_id=([^;\s]*)").expect("cookie pattern is valid")
    })
}

#[allow(clippy::expect_used)]
fn program_page_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"channels/(\d+)/programs/(\d+)").expect("program pattern is valid")
    })
}

#[allow(clippy::expect_used)]
fn channel_page_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/channels/([^/?#\s]+)").expect("channel pattern is valid")
    })
}

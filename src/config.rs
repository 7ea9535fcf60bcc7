//! Configuration types for qingting-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Remote API settings (hosts, signing secret, timeouts)
///
/// The defaults point at the production QingTing FM hosts. Tests override the
/// hosts to point at a local mock server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the content API (default: "https://app.qtfm.cn")
    #[serde(default = "default_app_host")]
    pub app_host: String,

    /// Base URL of the user/auth API (default: "https://user.qtfm.cn")
    #[serde(default = "default_user_host")]
    pub user_host: String,

    /// Shared secret used to sign audiostream requests
    #[serde(default = "default_sign_secret")]
    pub sign_secret: String,

    /// Device identifier used when the page has none stored
    #[serde(default = "default_device_id")]
    pub default_device_id: String,

    /// Timeout applied to each API request in seconds (default: 30)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            app_host: default_app_host(),
            user_host: default_user_host(),
            sign_secret: default_sign_secret(),
            default_device_id: default_device_id(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Download behavior configuration (directory, concurrency, listing)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum number of episodes processed at the same time (default: 1, sequential)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Number of programs requested per listing page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Listing order of the channel's programs (default: asc)
    #[serde(default)]
    pub order: ListOrder,

    /// File collision handling
    #[serde(default)]
    pub file_collision: FileCollisionAction,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            page_size: default_page_size(),
            order: ListOrder::default(),
            file_collision: FileCollisionAction::default(),
        }
    }
}

/// Main configuration for [`QingtingDownloader`](crate::QingtingDownloader)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,
}

impl Config {
    /// Check settings that would make a run impossible
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        if self.download.page_size == 0 {
            return Err(Error::Config {
                message: "page_size must be at least 1".to_string(),
                key: Some("page_size".to_string()),
            });
        }
        for (key, host) in [
            ("app_host", &self.api.app_host),
            ("user_host", &self.api.user_host),
        ] {
            if url::Url::parse(host).is_err() {
                return Err(Error::Config {
                    message: format!("{key} is not a valid URL: {host}"),
                    key: Some(key.to_string()),
                });
            }
        }
        Ok(())
    }
}

/// Program listing order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    /// Oldest first (default)
    #[default]
    Asc,
    /// Newest first
    Desc,
}

impl ListOrder {
    /// Query parameter value understood by the listing endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            ListOrder::Asc => "asc",
            ListOrder::Desc => "desc",
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Fail the episode, keep existing
    Skip,
}

fn default_app_host() -> String {
    "https://app.qtfm.cn".to_string()
}

fn default_user_host() -> String {
    "https://user.qtfm.cn".to_string()
}

fn default_sign_secret() -> String {
    "fpMn12&38f_2e".to_string()
}

fn default_device_id() -> String {
    "1e7c8c52-6363-475d-bf44-60212cd688b8".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_concurrent() -> usize {
    1
}

fn default_page_size() -> usize {
    100
}

// Duration as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

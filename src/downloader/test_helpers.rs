//! Shared test helpers for creating QingtingDownloader instances in tests.

use crate::config::Config;
use crate::downloader::{FileSaver, QingtingDownloader};
use crate::error::{Error, Result};
use crate::session::PageContext;
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) const CHANNEL_ID: &str = "42";

/// In-memory [`FileSaver`] that records every call.
///
/// Tracks how many saves are in flight at once so concurrency bounds can be
/// asserted without touching the network or filesystem.
#[derive(Default)]
pub(crate) struct RecordingSaver {
    delay: Duration,
    failing_urls: HashSet<String>,
    names: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSaver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn failing_on(mut self, url: impl Into<String>) -> Self {
        self.failing_urls.insert(url.into());
        self
    }

    /// File names passed to `save`, in call order
    pub(crate) fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FileSaver for RecordingSaver {
    async fn save(&self, url: &str, name: &str) -> Result<PathBuf> {
        self.names.lock().unwrap().push(name.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_urls.contains(url) {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        Ok(PathBuf::from("/saved").join(name))
    }
}

/// Build a downloader whose API hosts point at `server`
pub(crate) fn create_test_downloader(
    server: &MockServer,
    max_concurrent: usize,
    saver: Arc<dyn FileSaver>,
) -> QingtingDownloader {
    let mut config = Config::default();
    config.api.app_host = server.uri();
    config.api.user_host = server.uri();
    config.download.max_concurrent_downloads = max_concurrent;
    QingtingDownloader::with_saver(config, saver).unwrap()
}

/// Logged-in page context for the test channel
pub(crate) fn channel_page() -> PageContext {
    PageContext::new(format!("https://www.qtfm.cn/channels/{CHANNEL_ID}/"))
        .with_cookie("foo=bar; qingting_id=sess")
        .with_refresh_token("\"refresh\"")
}

pub(crate) fn envelope(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "errorno": 0, "errormsg": "", "data": data }))
}

/// Audio URL the edition mock hands out for a program
pub(crate) fn audio_url(program_id: &str) -> String {
    format!("https://od.qtfm.cn/{program_id}.m4a")
}

pub(crate) async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/u2/api/v4/auth"))
        .respond_with(envelope(json!({ "access_token": "tok" })))
        .mount(server)
        .await;
}

/// Mount channel metadata and a single listing page with `count` programs
pub(crate) async fn mount_channel(server: &MockServer, count: usize) {
    Mock::given(method("GET"))
        .and(path(format!("/m-bff/v2/channel/{CHANNEL_ID}")))
        .respond_with(envelope(json!({
            "id": CHANNEL_ID,
            "title": "Test Channel",
            "program_count": count,
        })))
        .mount(server)
        .await;

    let programs: Vec<_> = (1..=count)
        .map(|id| json!({ "id": id, "title": format!("Episode {id}") }))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/m-bff/v2/channel/{CHANNEL_ID}/programs")))
        .respond_with(envelope(json!({ "programs": programs })))
        .mount(server)
        .await;
}

/// Answer every audiostream request with one m4a edition for that program
pub(crate) async fn mount_editions(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/m-bff/v1/audiostreams/channel/\d+/program/\d+$"))
        .respond_with(|request: &wiremock::Request| {
            let program_id = request
                .url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default()
                .to_string();
            envelope(json!({ "editions": [
                { "bitrate": 24, "format": "aac", "urls": [format!("https://od.qtfm.cn/{program_id}.aac")] },
                { "bitrate": 64, "format": "m4a", "urls": [audio_url(&program_id)] },
            ]}))
        })
        .mount(server)
        .await;
}

/// Token, channel of `count` programs and editions for all of them
pub(crate) async fn mount_happy_path(server: &MockServer, count: usize) {
    mount_token(server).await;
    mount_channel(server, count).await;
    mount_editions(server).await;
}

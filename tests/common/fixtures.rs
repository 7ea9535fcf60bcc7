//! Mock QingTing FM API for end-to-end tests
//!
//! One wiremock server plays every role: user host, app host and the audio CDN.

use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use qingting_dl::{Config, PageContext};

/// Channel served by [`MockApi`]
pub const CHANNEL_ID: &str = "7001";

/// Bytes served for a program's audio file
pub fn audio_body(program_id: &str) -> Vec<u8> {
    format!("audio for program {program_id}").into_bytes()
}

fn envelope(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "errorno": 0, "errormsg": "", "data": data }))
}

/// Mock API server with a channel of `titles.len()` programs
pub struct MockApi {
    pub server: MockServer,
}

impl MockApi {
    /// Start a server whose program `n` (1-based) is titled `titles[n - 1]`
    pub async fn start(titles: &[&str]) -> Self {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/u2/api/v4/auth"))
            .respond_with(envelope(json!({ "access_token": "e2e-token" })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/m-bff/v2/channel/{CHANNEL_ID}")))
            .respond_with(envelope(json!({
                "id": CHANNEL_ID.parse::<u64>().unwrap(),
                "title": "E2E Channel",
                "podcasters": [{ "nick_name": "host" }],
                "program_count": titles.len(),
            })))
            .mount(&server)
            .await;

        let programs: Vec<_> = titles
            .iter()
            .enumerate()
            .map(|(index, title)| json!({ "id": index + 1, "title": title }))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/m-bff/v2/channel/{CHANNEL_ID}/programs")))
            .respond_with(envelope(json!({ "programs": programs })))
            .mount(&server)
            .await;

        let audio_host = server.uri();
        Mock::given(method("GET"))
            .and(path_regex(r"^/m-bff/v1/audiostreams/channel/\d+/program/\d+$"))
            .respond_with(move |request: &Request| {
                let program_id = request
                    .url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .unwrap_or_default()
                    .to_string();
                envelope(json!({ "editions": [
                    { "bitrate": 32, "format": "aac", "urls": [format!("{audio_host}/low/{program_id}.aac")] },
                    { "bitrate": 96, "format": "m4a", "urls": [format!("{audio_host}/audio/{program_id}.m4a")] },
                ]}))
            })
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/audio/\d+\.m4a$"))
            .respond_with(|request: &Request| {
                let file = request.url.path().trim_start_matches("/audio/");
                let program_id = file.trim_end_matches(".m4a");
                ResponseTemplate::new(200).set_body_bytes(audio_body(program_id))
            })
            .mount(&server)
            .await;

        Self { server }
    }

    /// Config pointing every host at the mock and saving into `dir`
    pub fn config(&self, dir: &Path) -> Config {
        let mut config = Config::default();
        config.api.app_host = self.server.uri();
        config.api.user_host = self.server.uri();
        config.download.download_dir = dir.join("downloads");
        config
    }
}

/// Logged-in page for the mock channel
pub fn channel_page() -> PageContext {
    PageContext::new(format!("https://www.qtfm.cn/channels/{CHANNEL_ID}/"))
        .with_cookie("_ga=1; qingting_id=e2e-session")
        .with_refresh_token("\"e2e-refresh\"")
}

/// Fresh scratch directory
pub fn scratch() -> TempDir {
    tempfile::tempdir().unwrap()
}

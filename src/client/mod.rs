//! QingTing FM API client.
//!
//! Every endpoint answers with the same `{errorno, errormsg, data}` envelope. The
//! client unwraps it, turns a non-zero `errorno` into [`Error::Api`] and decodes
//! `data` into the endpoint's record type from [`schema`]. Nothing is retried;
//! callers decide whether a failure is fatal for the run or only for one episode.

pub mod schema;
pub mod sign;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::config::{ApiConfig, ListOrder};
use crate::error::{Error, Result};
use crate::types::ChannelInfo;

use self::schema::{
    AudioStreams, ChannelRecord, EditionRecord, Envelope, ProgramPage, ProgramRecord, TokenData,
    TokenRequest,
};

/// HTTP client for the QingTing FM web API (cloneable, shares one connection pool)
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ApiConfig>,
}

impl ApiClient {
    /// Create a client for the given API settings
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("qingting-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// API settings this client was built with
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Perform one request and unwrap the response envelope
    ///
    /// # Errors
    /// - [`Error::Network`] on transport failures and non-success HTTP statuses
    /// - [`Error::Api`] when `errorno != 0`, the body is not JSON, or `data` does not
    ///   match `T`
    pub async fn call<T, B>(&self, endpoint: &str, method: Method, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!(%method, endpoint, "API request");

        let mut request = self.http.request(method, endpoint);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?.error_for_status()?;
        let text = response.text().await?;

        let envelope: Envelope = serde_json::from_str(&text)
            .map_err(|e| Error::api(endpoint, format!("malformed response: {}", e)))?;

        if envelope.errorno != 0 {
            return Err(Error::api(endpoint, envelope.errormsg));
        }

        serde_json::from_value(envelope.data)
            .map_err(|e| Error::api(endpoint, format!("unexpected response shape: {}", e)))
    }

    /// Exchange a long-lived refresh token for a short-lived access token
    pub async fn exchange_token(&self, refresh_token: &str, qingting_id: &str) -> Result<String> {
        let endpoint = format!("{}/u2/api/v4/auth", host(&self.config.user_host));
        let body = TokenRequest {
            refresh_token,
            grant_type: "refresh_token",
            qingting_id,
        };

        let data: TokenData = self.call(&endpoint, Method::POST, Some(&body)).await?;
        Ok(data.access_token)
    }

    /// Fetch channel metadata
    pub async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo> {
        let endpoint = format!("{}/m-bff/v2/channel/{}", host(&self.config.app_host), channel_id);
        let record: ChannelRecord = self.call(&endpoint, Method::GET, None::<&()>).await?;
        Ok(channel_info_from_record(record))
    }

    /// Fetch one page (1-based) of a channel's program listing
    pub async fn program_page(
        &self,
        channel_id: &str,
        order: ListOrder,
        page_size: usize,
        page: usize,
    ) -> Result<Vec<ProgramRecord>> {
        let endpoint = format!(
            "{}/m-bff/v2/channel/{}/programs?order={}&pagesize={}&curpage={}",
            host(&self.config.app_host),
            channel_id,
            order.as_str(),
            page_size,
            page
        );
        let data: ProgramPage = self.call(&endpoint, Method::GET, None::<&()>).await?;
        Ok(data.programs)
    }

    /// Fetch the candidate editions behind an already signed audiostream URL
    pub async fn audiostreams(&self, signed_url: &str) -> Result<Vec<EditionRecord>> {
        let data: AudioStreams = self.call(signed_url, Method::GET, None::<&()>).await?;
        Ok(data.editions)
    }
}

fn host(base: &str) -> &str {
    base.trim_end_matches('/')
}

fn channel_info_from_record(record: ChannelRecord) -> ChannelInfo {
    let podcaster = record
        .podcasters
        .iter()
        .map(|p| p.nick_name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let category = record
        .novel_attrs
        .iter()
        .find(|attr| attr.kind == "subcate")
        .map(|attr| attr.name.clone())
        .unwrap_or_default();
    let tags = record
        .novel_attrs
        .iter()
        .filter(|attr| attr.kind == "label")
        .map(|attr| attr.name.clone())
        .collect();

    ChannelInfo {
        id: record.id,
        title: record.title,
        description: record.description.unwrap_or_default(),
        thumbs: record.thumbs.unwrap_or_default(),
        podcaster,
        category,
        tags,
        count: record.program_count,
    }
}

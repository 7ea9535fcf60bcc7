//! Edition resolution: pick the best streamable encoding of a program.

use tracing::debug;

use crate::client::ApiClient;
use crate::client::schema::EditionRecord;
use crate::client::sign::StreamRequest;
use crate::error::{Error, Result};
use crate::types::Edition;

/// Session credentials shared by every resolution in a run
#[derive(Clone, Debug)]
pub struct StreamCredentials {
    /// Session id from the `qingting_id` cookie
    pub qingting_id: String,
    /// Access token from the token exchange
    pub access_token: String,
    /// Device identifier
    pub device_id: String,
}

/// Resolves editions through signed audiostream requests
#[derive(Clone)]
pub struct EditionResolver {
    client: ApiClient,
    credentials: StreamCredentials,
}

impl EditionResolver {
    /// Create a resolver for one run's credentials
    pub fn new(client: ApiClient, credentials: StreamCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Resolve the highest-bitrate edition of a program
    ///
    /// # Errors
    /// - API/network errors from the audiostream request
    /// - [`Error::NoEditions`] when the response lists no usable edition
    pub async fn resolve(&self, channel_id: &str, program_id: &str) -> Result<Edition> {
        let api = self.client.config();
        let request = StreamRequest {
            channel_id,
            program_id,
            access_token: &self.credentials.access_token,
            device_id: &self.credentials.device_id,
            qingting_id: &self.credentials.qingting_id,
        };
        let url = request.signed_url(&api.app_host, &api.sign_secret)?;

        let editions = self.client.audiostreams(&url).await?;
        let edition = select_best_edition(&editions).ok_or_else(|| Error::NoEditions {
            program_id: program_id.to_string(),
        })?;

        debug!(
            program_id,
            format = %edition.format,
            bitrate = edition.bitrate,
            candidates = editions.len(),
            "Resolved edition"
        );
        Ok(edition)
    }
}

/// Pick the maximum-bitrate edition and its first URL
///
/// Ties keep the edition listed first, so the result does not depend on how the
/// remaining candidates are ordered. Returns `None` for an empty list or when the
/// best edition carries no URL.
pub fn select_best_edition(editions: &[EditionRecord]) -> Option<Edition> {
    let best = editions
        .iter()
        .reduce(|best, candidate| {
            if candidate.bitrate > best.bitrate {
                candidate
            } else {
                best
            }
        })?;

    best.urls.first().map(|url| Edition {
        format: best.format.clone(),
        url: url.clone(),
        bitrate: best.bitrate,
    })
}

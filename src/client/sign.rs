//! Audiostream request signing.
//!
//! The audiostream endpoint only accepts requests whose path and query carry a
//! `sign` parameter: the lowercase hex HMAC-MD5 of the unsigned path, keyed with a
//! secret shared by all web clients.

use hmac::{Hmac, Mac};
use md5::Md5;

use crate::error::{Error, Result};

type HmacMd5 = Hmac<Md5>;

/// Identifiers that go into a signed audiostream path
#[derive(Debug, Clone, Copy)]
pub struct StreamRequest<'a> {
    /// Channel ID
    pub channel_id: &'a str,
    /// Program ID
    pub program_id: &'a str,
    /// Short-lived access token from the token exchange
    pub access_token: &'a str,
    /// Device identifier
    pub device_id: &'a str,
    /// Session identifier from the `qingting_id` cookie
    pub qingting_id: &'a str,
}

impl StreamRequest<'_> {
    /// Unsigned request path, exactly as it is signed
    pub fn path(&self) -> String {
        format!(
            "/m-bff/v1/audiostreams/channel/{}/program/{}?access_token={}&device_id={}&qingting_id={}&type=play",
            self.channel_id, self.program_id, self.access_token, self.device_id, self.qingting_id
        )
    }

    /// Full signed URL on `host`
    pub fn signed_url(&self, host: &str, secret: &str) -> Result<String> {
        let path = self.path();
        let sign = sign(&path, secret)?;
        Ok(format!("{}{}&sign={}", host.trim_end_matches('/'), path, sign))
    }
}

/// Lowercase hex HMAC-MD5 of `message` keyed with `secret`
pub fn sign(message: &str, secret: &str) -> Result<String> {
    let mut mac = HmacMd5::new_from_slice(secret.as_bytes()).map_err(|e| Error::Config {
        message: format!("invalid signing secret: {}", e),
        key: Some("sign_secret".to_string()),
    })?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

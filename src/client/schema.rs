//! Response records for each API endpoint.
//!
//! The API is loosely typed: ids arrive as numbers or strings and list fields are
//! sometimes `null`. Those quirks are absorbed here so the rest of the crate sees
//! plain Rust types. Anything else that does not match a record is a shape error.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// Uniform `{errorno, errormsg, data}` wrapper around every response
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub(crate) errorno: i64,
    #[serde(default)]
    pub(crate) errormsg: String,
    #[serde(default)]
    pub(crate) data: serde_json::Value,
}

/// Body of the token exchange request
#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub(crate) refresh_token: &'a str,
    pub(crate) grant_type: &'static str,
    pub(crate) qingting_id: &'a str,
}

/// `data` of the token exchange response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenData {
    pub(crate) access_token: String,
}

/// `data` of the channel metadata response
#[derive(Debug, Deserialize)]
pub(crate) struct ChannelRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) thumbs: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub(crate) podcasters: Vec<Podcaster>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub(crate) novel_attrs: Vec<NovelAttr>,
    pub(crate) program_count: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Podcaster {
    pub(crate) nick_name: String,
}

/// Typed channel attribute; `subcate` holds the category, `label` the tags
#[derive(Debug, Deserialize)]
pub(crate) struct NovelAttr {
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) kind: String,
}

/// `data` of one program listing page
#[derive(Debug, Deserialize)]
pub(crate) struct ProgramPage {
    #[serde(deserialize_with = "null_as_empty")]
    pub(crate) programs: Vec<ProgramRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProgramRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub(crate) id: String,
    pub(crate) title: String,
}

/// `data` of the signed audiostream response
#[derive(Debug, Deserialize)]
pub(crate) struct AudioStreams {
    #[serde(deserialize_with = "null_as_empty")]
    pub(crate) editions: Vec<EditionRecord>,
}

/// One candidate encoding of a program
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditionRecord {
    /// Bitrate in kbps
    pub bitrate: u32,
    /// File format (e.g. "mp3", "m4a")
    pub format: String,
    /// Streaming URLs, first one preferred
    #[serde(deserialize_with = "null_as_empty")]
    pub urls: Vec<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

// A list that may be `null`; any other non-array value is rejected
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

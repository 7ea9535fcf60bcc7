//! Core types for qingting-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Episode status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    /// Enumerated, waiting for a concurrency slot
    #[default]
    Pending,
    /// Edition being resolved or file being saved
    Downloading,
    /// File saved successfully
    Finished,
    /// Edition resolution or file save failed
    Error,
}

impl EpisodeStatus {
    /// Whether the episode will not change state again within this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, EpisodeStatus::Finished | EpisodeStatus::Error)
    }
}

/// The chosen streamable representation of an episode
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edition {
    /// File format / extension reported by the API (e.g. "mp3", "m4a")
    pub format: String,
    /// Signed streaming URL
    pub url: String,
    /// Bitrate in kbps of the chosen edition
    pub bitrate: u32,
}

/// One downloadable program of a channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Program ID
    pub id: String,
    /// Display title, used as the output file stem
    pub title: String,
    /// Current lifecycle status
    pub status: EpisodeStatus,
    /// Resolved edition, set once resolution succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition: Option<Edition>,
    /// Failure message when `status` is [`EpisodeStatus::Error`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Saved file location when `status` is [`EpisodeStatus::Finished`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Episode {
    /// Create a pending episode
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: EpisodeStatus::Pending,
            edition: None,
            error: None,
            path: None,
        }
    }

    /// Edition resolved, file save not yet finished
    pub fn is_awaiting_download(&self) -> bool {
        self.status == EpisodeStatus::Downloading && self.edition.is_some()
    }

    /// Output file name for an edition: `"{title}.{format}"`
    pub fn file_name(&self, edition: &Edition) -> String {
        format!("{}.{}", self.title, edition.format)
    }
}

/// Run-level failure recorded in [`DownloadState`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    /// Machine-readable error code (see [`Error::error_code`])
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl From<&Error> for RunError {
    fn from(error: &Error) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Snapshot of a run, republished as a whole on every change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadState {
    /// True until the episode list is known (or the run failed)
    pub loading: bool,
    /// Set when the run failed before any episode was processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
    /// Episodes in listing order
    pub episodes: Vec<Episode>,
    /// When the run started
    pub started_at: DateTime<Utc>,
}

impl Default for DownloadState {
    fn default() -> Self {
        Self {
            loading: true,
            error: None,
            episodes: Vec::new(),
            started_at: Utc::now(),
        }
    }
}

impl DownloadState {
    /// Look up an episode by program ID
    pub fn episode(&self, id: &str) -> Option<&Episode> {
        self.episodes.iter().find(|episode| episode.id == id)
    }

    /// Whether every episode reached a terminal status
    pub fn is_complete(&self) -> bool {
        !self.loading && self.episodes.iter().all(|e| e.status.is_terminal())
    }

    /// Aggregate counts for a progress indicator
    pub fn progress(&self) -> Progress {
        if self.loading || self.error.is_some() {
            return Progress::default();
        }

        let total = self.episodes.len();
        let finished = self
            .episodes
            .iter()
            .filter(|e| e.status.is_terminal())
            .count();
        let downloading = self
            .episodes
            .iter()
            .filter(|e| e.status == EpisodeStatus::Downloading)
            .count();
        let percent = if total == 0 {
            0
        } else {
            ((finished as f64 / total as f64) * 100.0).round() as u8
        };

        Progress {
            total,
            finished,
            downloading,
            percent,
        }
    }
}

/// Progress summary derived from a [`DownloadState`]
///
/// `finished` counts every terminal episode, including failed ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Number of episodes in the run
    pub total: usize,
    /// Episodes that finished or failed
    pub finished: usize,
    /// Episodes currently in flight
    pub downloading: usize,
    /// `finished / total` as a rounded percentage
    pub percent: u8,
}

/// Channel metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel ID
    pub id: String,
    /// Channel title
    pub title: String,
    /// Channel description
    pub description: String,
    /// Cover image URL
    pub thumbs: String,
    /// Podcaster nick names joined with ","
    pub podcaster: String,
    /// Sub-category name ("" when absent)
    pub category: String,
    /// Label attributes
    pub tags: Vec<String>,
    /// Number of programs in the channel
    pub count: usize,
}

/// What a run downloads, decided once from the page URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Every program of a channel
    Channel {
        /// Channel ID
        channel_id: String,
    },
    /// A single program page
    SingleEpisode {
        /// Channel ID
        channel_id: String,
        /// Program ID
        program_id: String,
    },
}

impl RunMode {
    /// Channel the run belongs to
    pub fn channel_id(&self) -> &str {
        match self {
            RunMode::Channel { channel_id } | RunMode::SingleEpisode { channel_id, .. } => {
                channel_id
            }
        }
    }
}

/// Final counts returned when a run completes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of episodes enumerated
    pub total: usize,
    /// Episodes saved successfully
    pub finished: usize,
    /// Episodes that failed
    pub failed: usize,
}

/// Event emitted during a run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Episode list known, all episodes pending
    Enumerated {
        /// Channel ID
        channel_id: String,
        /// Number of episodes
        total: usize,
    },

    /// Episode acquired a concurrency slot
    Started {
        /// Program ID
        id: String,
    },

    /// Edition resolved, file save starting
    Resolved {
        /// Program ID
        id: String,
        /// Chosen format
        format: String,
        /// Chosen bitrate
        bitrate: u32,
    },

    /// Episode saved
    Finished {
        /// Program ID
        id: String,
        /// Saved file location
        path: PathBuf,
    },

    /// Episode failed
    Failed {
        /// Program ID
        id: String,
        /// Error message
        error: String,
    },

    /// Run aborted before processing episodes
    RunFailed {
        /// Error message
        error: String,
    },

    /// Every episode reached a terminal status
    RunComplete {
        /// Final counts
        report: RunReport,
    },
}

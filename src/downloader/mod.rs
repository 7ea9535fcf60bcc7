//! Core downloader implementation split into focused submodules.
//!
//! The `QingtingDownloader` struct and its methods are organized by concern:
//! - [`state`] - Published run state (single owner of the current snapshot)
//! - [`orchestration`] - Run setup and the per-episode lifecycle
//! - [`saver`] - File saving primitive and its HTTP implementation

mod orchestration;
mod saver;
mod state;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use saver::{FileSaver, HttpFileSaver};

use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::Result;
use crate::types::{DownloadState, Event};

use self::state::StateHandle;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// One instance drives one run at a time. Starting a new run resets the published
/// state; running two at once on the same instance is not supported.
#[derive(Clone)]
pub struct QingtingDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// API client shared by enumeration and edition resolution
    pub(crate) client: ApiClient,
    /// File saving primitive (trait object for pluggable implementations)
    pub(crate) saver: Arc<dyn FileSaver>,
    /// Owner of the current run state
    pub(crate) state: StateHandle,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cancels the current run; replaced with a fresh token once that run ends
    pub(crate) cancel_token: Arc<Mutex<CancellationToken>>,
}

impl QingtingDownloader {
    /// Create a downloader that saves files with [`HttpFileSaver`]
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or an HTTP client cannot be created
    pub fn new(config: Config) -> Result<Self> {
        let saver = Arc::new(HttpFileSaver::new(&config)?);
        Self::with_saver(config, saver)
    }

    /// Create a downloader with a custom file saving primitive
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be created
    pub fn with_saver(config: Config, saver: Arc<dyn FileSaver>) -> Result<Self> {
        config.validate()?;

        let client = ApiClient::new(config.api.clone())?;
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::debug!(
            max_concurrent = config.download.max_concurrent_downloads,
            download_dir = %config.download.download_dir.display(),
            "Downloader initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            client,
            saver,
            state: StateHandle::new(),
            event_tx,
            cancel_token: Arc::new(Mutex::new(CancellationToken::new())),
        })
    }

    /// Subscribe to run events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Watch the published state
    ///
    /// The receiver always holds the latest complete snapshot; intermediate
    /// snapshots may be skipped by slow readers. Use [`subscribe`](Self::subscribe)
    /// for a lossless transition log.
    pub fn watch_state(&self) -> tokio::sync::watch::Receiver<Arc<DownloadState>> {
        self.state.subscribe()
    }

    /// Latest published state snapshot
    pub fn state(&self) -> Arc<DownloadState> {
        self.state.current()
    }

    /// Cancel the running batch
    ///
    /// Episodes that have not started stay pending; in-flight ones are marked as
    /// errored. Called while no run is active, it cancels the next run. Once the
    /// cancelled run returns, the downloader can be run again.
    pub fn cancel(&self) {
        tracing::info!("Cancelling downloads");
        self.token().cancel();
    }

    /// Whether the current (or next) run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.token().is_cancelled()
    }

    /// Token of the current run
    pub(crate) fn run_token(&self) -> CancellationToken {
        self.token().clone()
    }

    /// Arm a fresh token for the next run
    pub(crate) fn finish_run(&self) {
        *self.token() = CancellationToken::new();
    }

    fn token(&self) -> MutexGuard<'_, CancellationToken> {
        // The guarded value stays valid even if a holder panicked
        self.cancel_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

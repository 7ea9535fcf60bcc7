//! Published run state.
//!
//! One [`StateHandle`] owns the current [`DownloadState`]. Every change clones the
//! latest snapshot, applies the change to the clone and publishes it as a new
//! `Arc`, all inside the watch channel's lock. Concurrent episode tasks therefore
//! always derive their update from the most recent snapshot, and readers only
//! ever see complete snapshots.

use std::sync::Arc;
use tokio::sync::watch;

use crate::types::{DownloadState, Episode};

/// Shared handle to the current run state (cloneable)
#[derive(Clone)]
pub(crate) struct StateHandle {
    tx: Arc<watch::Sender<Arc<DownloadState>>>,
}

impl StateHandle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(DownloadState::default()));
        Self { tx: Arc::new(tx) }
    }

    /// Receiver that observes every published snapshot
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<DownloadState>> {
        self.tx.subscribe()
    }

    /// Latest published snapshot
    pub(crate) fn current(&self) -> Arc<DownloadState> {
        Arc::clone(&self.tx.borrow())
    }

    /// Derive and publish the next snapshot from the latest one
    pub(crate) fn update(&self, f: impl FnOnce(&mut DownloadState)) {
        self.tx.send_modify(|current| {
            let mut next = (**current).clone();
            f(&mut next);
            *current = Arc::new(next);
        });
    }

    /// Apply `f` to the episode(s) with the given program ID
    pub(crate) fn update_episode(&self, id: &str, f: impl Fn(&mut Episode)) {
        self.update(|state| {
            state
                .episodes
                .iter_mut()
                .filter(|episode| episode.id == id)
                .for_each(&f);
        });
    }

    /// Start over with a fresh loading state
    pub(crate) fn reset(&self) {
        self.tx.send_replace(Arc::new(DownloadState::default()));
    }
}

//! Run orchestration: setup, enumeration and the per-episode lifecycle.
//!
//! Per episode: `pending -> downloading -> (error | awaiting download)`, then
//! `awaiting download -> (finished | error)`. Failures during setup abort the run
//! and are published as the run error; failures after setup stay on the episode.

use futures::future::join_all;
use std::future::Future;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::enumerator::enumerate;
use crate::error::{Error, Result};
use crate::resolver::{EditionResolver, StreamCredentials};
use crate::session::PageContext;
use crate::types::{Episode, EpisodeStatus, Event, RunError, RunMode, RunReport};

use super::QingtingDownloader;

/// Everything a run needs once setup succeeded
struct PreparedRun {
    mode: RunMode,
    resolver: EditionResolver,
    episodes: Vec<Episode>,
}

impl QingtingDownloader {
    /// Download every episode the page refers to
    ///
    /// Phases:
    /// 1. Read the session id and refresh token from the page context
    /// 2. Exchange the refresh token for an access token
    /// 3. Enumerate episodes and publish them as pending
    /// 4. Process episodes with at most `max_concurrent_downloads` in flight
    ///
    /// # Errors
    /// Only phases 1-3 fail the run. The error is also published in the state's
    /// `error` field and as [`Event::RunFailed`]. Per-episode failures are
    /// reported through the state and events, and counted in the returned report.
    pub async fn run(&self, page: &PageContext) -> Result<RunReport> {
        let cancel = self.run_token();
        let result = self.run_until_cancelled(page, &cancel).await;
        self.finish_run();
        result
    }

    async fn run_until_cancelled(
        &self,
        page: &PageContext,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        self.state.reset();

        let prepared = match self.prepare(page, cancel).await {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(error = %e, "Download run failed");
                let run_error = RunError::from(&e);
                self.state.update(|state| {
                    state.loading = false;
                    state.error = Some(run_error);
                });
                self.emit(Event::RunFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let channel_id = prepared.mode.channel_id().to_string();
        let total = prepared.episodes.len();
        self.state.update(|state| {
            state.loading = false;
            state.episodes = prepared.episodes.clone();
        });
        self.emit(Event::Enumerated {
            channel_id: channel_id.clone(),
            total,
        });
        info!(channel_id = %channel_id, total, "Starting downloads");

        self.process_episodes(&channel_id, &prepared.resolver, &prepared.episodes, cancel)
            .await;

        let report = self.report();
        info!(
            channel_id = %channel_id,
            finished = report.finished,
            failed = report.failed,
            "Download run complete"
        );
        self.emit(Event::RunComplete { report });
        Ok(report)
    }

    async fn prepare(&self, page: &PageContext, cancel: &CancellationToken) -> Result<PreparedRun> {
        let qingting_id = page.qingting_id()?;
        let refresh_token = page.refresh_token()?;
        let mode = page.run_mode()?;

        let access_token = cancellable(
            cancel,
            self.client.exchange_token(&refresh_token, &qingting_id),
        )
        .await?;
        debug!("Access token obtained");

        let episodes = cancellable(
            cancel,
            enumerate(
                &self.client,
                &mode,
                page,
                self.config.download.order,
                self.config.download.page_size,
            ),
        )
        .await?;

        let credentials = StreamCredentials {
            qingting_id,
            access_token,
            device_id: page
                .device_id(&self.config.api.default_device_id)
                .to_string(),
        };

        Ok(PreparedRun {
            mode,
            resolver: EditionResolver::new(self.client.clone(), credentials),
            episodes,
        })
    }

    /// Drive all episodes to a terminal status, at most N at a time.
    ///
    /// The semaphore is fair, so with N = 1 episodes run strictly in listing order.
    async fn process_episodes(
        &self,
        channel_id: &str,
        resolver: &EditionResolver,
        episodes: &[Episode],
        cancel: &CancellationToken,
    ) {
        let limit = Semaphore::new(self.config.download.max_concurrent_downloads);

        let tasks = episodes.iter().map(|episode| {
            let limit = &limit;
            async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    permit = limit.acquire() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };
                self.process_episode(channel_id, resolver, episode, cancel)
                    .await;
            }
        });

        join_all(tasks).await;
    }

    async fn process_episode(
        &self,
        channel_id: &str,
        resolver: &EditionResolver,
        episode: &Episode,
        cancel: &CancellationToken,
    ) {
        let id = episode.id.as_str();

        self.state
            .update_episode(id, |e| e.status = EpisodeStatus::Downloading);
        self.emit(Event::Started { id: id.to_string() });

        let edition = match cancellable(cancel, resolver.resolve(channel_id, id)).await {
            Ok(edition) => edition,
            Err(e) => {
                self.mark_failed(id, &e);
                return;
            }
        };

        let edition_for_state = edition.clone();
        self.state
            .update_episode(id, |e| e.edition = Some(edition_for_state.clone()));
        self.emit(Event::Resolved {
            id: id.to_string(),
            format: edition.format.clone(),
            bitrate: edition.bitrate,
        });

        let name = episode.file_name(&edition);
        match cancellable(cancel, self.saver.save(&edition.url, &name)).await {
            Ok(path) => {
                debug!(program_id = id, path = %path.display(), "Episode finished");
                let saved = path.clone();
                self.state.update_episode(id, |e| {
                    e.status = EpisodeStatus::Finished;
                    e.path = Some(saved.clone());
                });
                self.emit(Event::Finished {
                    id: id.to_string(),
                    path,
                });
            }
            Err(e) => self.mark_failed(id, &e),
        }
    }

    fn mark_failed(&self, id: &str, err: &Error) {
        warn!(program_id = id, error = %err, "Episode failed");
        let message = err.to_string();
        self.state.update_episode(id, |e| {
            e.status = EpisodeStatus::Error;
            e.error = Some(message.clone());
        });
        self.emit(Event::Failed {
            id: id.to_string(),
            error: message,
        });
    }

    fn report(&self) -> RunReport {
        let state = self.state.current();
        RunReport {
            total: state.episodes.len(),
            finished: state
                .episodes
                .iter()
                .filter(|e| e.status == EpisodeStatus::Finished)
                .count(),
            failed: state
                .episodes
                .iter()
                .filter(|e| e.status == EpisodeStatus::Error)
                .count(),
        }
    }
}

/// Run `fut` unless `cancel` fires first; the dropped future must clean up after itself
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

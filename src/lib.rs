//! # qingting-dl
//!
//! Batch downloader for QingTing FM podcasts.
//!
//! Given the page a user is looking at (its URL, cookies and stored login
//! token), qingting-dl lists every episode of the channel, or just the one
//! program the page shows, resolves the best streamable edition of each and
//! saves them to disk, a bounded number at a time.
//!
//! ## Design
//!
//! - **Library-first** - The caller supplies the page context and decides how to
//!   present progress
//! - **Observable** - A watch channel always holds the latest complete run state,
//!   and a broadcast channel carries every transition as an [`Event`]
//! - **Failure-isolated** - Only setup failures abort a run; one broken episode
//!   never stops the others
//!
//! ## Quick Start
//!
//! ```no_run
//! use qingting_dl::{Config, PageContext, QingtingDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.download.max_concurrent_downloads = 3;
//!
//!     let downloader = QingtingDownloader::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let page = PageContext::new("https://www.qtfm.cn/channels/123456/")
//!         .with_cookie("qingting_id=abc")
//!         .with_refresh_token("\"stored-refresh-token\"");
//!     let report = downloader.run(&page).await?;
//!     println!("{} of {} saved", report.finished, report.total);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// QingTing FM API client
pub mod client;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Episode enumeration
pub mod enumerator;
/// Error types
pub mod error;
/// Edition resolution
pub mod resolver;
/// Page context and session credentials
pub mod session;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use client::ApiClient;
pub use config::{ApiConfig, Config, DownloadConfig, FileCollisionAction, ListOrder};
pub use downloader::{FileSaver, HttpFileSaver, QingtingDownloader};
pub use error::{Error, Result};
pub use session::PageContext;
pub use types::{
    ChannelInfo, DownloadState, Edition, Episode, EpisodeStatus, Event, Progress, RunError,
    RunMode, RunReport,
};

/// Run a download with graceful signal handling.
///
/// Drives [`QingtingDownloader::run`] until it completes or a termination signal
/// arrives. On a signal the downloader is cancelled and the run is allowed to
/// wind down, so the returned report reflects what was saved.
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use qingting_dl::{Config, PageContext, QingtingDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = QingtingDownloader::new(Config::default())?;
///     let page = PageContext::new("https://www.qtfm.cn/channels/123456/")
///         .with_cookie("qingting_id=abc")
///         .with_refresh_token("token");
///
///     let report = run_with_shutdown(&downloader, &page).await?;
///     println!("{report:?}");
///     Ok(())
/// }
/// ```
///
/// # Errors
/// Returns the run's setup error, see [`QingtingDownloader::run`]
pub async fn run_with_shutdown(
    downloader: &QingtingDownloader,
    page: &PageContext,
) -> Result<RunReport> {
    let run = downloader.run(page);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = wait_for_signal() => {
            downloader.cancel();
            run.await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
                // Never resolve, the run finishes on its own
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}

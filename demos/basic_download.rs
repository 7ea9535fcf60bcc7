//! Basic download example
//!
//! This example demonstrates the core functionality of qingting-dl:
//! - Describing the page the user is logged in on
//! - Creating a downloader instance
//! - Subscribing to events
//! - Running until every episode is done (Ctrl+C cancels)
//!
//! Usage:
//!
//! ```text
//! QINGTING_COOKIE='qingting_id=...' QINGTING_REFRESH_TOKEN='...' \
//!     cargo run --example basic_download -- https://www.qtfm.cn/channels/123456/
//! ```

use qingting_dl::config::{Config, DownloadConfig};
use qingting_dl::{Event, PageContext, QingtingDownloader, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qingting_dl=info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .ok_or("usage: basic_download <channel or program URL>")?;

    let mut page = PageContext::new(url);
    if let Ok(cookie) = std::env::var("QINGTING_COOKIE") {
        page = page.with_cookie(cookie);
    }
    if let Ok(token) = std::env::var("QINGTING_REFRESH_TOKEN") {
        page = page.with_refresh_token(token);
    }
    if let Ok(title) = std::env::var("QINGTING_TITLE") {
        page = page.with_title(title);
    }

    // Build configuration
    let config = Config {
        download: DownloadConfig {
            download_dir: "downloads".into(),
            max_concurrent_downloads: 3,
            ..Default::default()
        },
        ..Default::default()
    };

    // Create downloader instance
    let downloader = QingtingDownloader::new(config)?;

    // Subscribe to events
    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Enumerated { channel_id, total } => {
                    println!("Channel {channel_id}: {total} episode(s)");
                }
                Event::Resolved {
                    id,
                    format,
                    bitrate,
                } => {
                    println!("  [{id}] {format} @ {bitrate} kbps");
                }
                Event::Finished { id, path } => {
                    println!("  [{id}] saved to {}", path.display());
                }
                Event::Failed { id, error } => {
                    eprintln!("  [{id}] failed: {error}");
                }
                Event::RunFailed { error } => {
                    eprintln!("Run failed: {error}");
                }
                _ => {}
            }
        }
    });

    let report = run_with_shutdown(&downloader, &page).await?;
    println!(
        "Done: {} saved, {} failed, {} total",
        report.finished, report.failed, report.total
    );

    Ok(())
}

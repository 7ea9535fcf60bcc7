//! Episode enumeration for channel and single program pages.

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::config::ListOrder;
use crate::error::Result;
use crate::session::PageContext;
use crate::types::{Episode, RunMode};

/// Number of listing pages needed for `count` programs
pub fn page_count(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Produce the ordered episode list for a run
///
/// # Errors
/// Any failed API call aborts enumeration; no partial list is returned.
pub async fn enumerate(
    client: &ApiClient,
    mode: &RunMode,
    page: &PageContext,
    order: ListOrder,
    page_size: usize,
) -> Result<Vec<Episode>> {
    match mode {
        RunMode::Channel { channel_id } => {
            channel_episodes(client, channel_id, order, page_size).await
        }
        RunMode::SingleEpisode {
            channel_id,
            program_id,
        } => {
            debug!(channel_id, program_id, "Using program from page URL");
            Ok(vec![single_episode(page, channel_id, program_id)])
        }
    }
}

/// List every program of a channel
///
/// All listing pages are requested concurrently; results keep page order, then
/// the order within each page.
pub async fn channel_episodes(
    client: &ApiClient,
    channel_id: &str,
    order: ListOrder,
    page_size: usize,
) -> Result<Vec<Episode>> {
    let info = client.channel_info(channel_id).await?;
    let pages = page_count(info.count, page_size);
    debug!(
        channel_id,
        title = %info.title,
        count = info.count,
        pages,
        "Fetched channel info"
    );

    let requests =
        (1..=pages).map(|page| client.program_page(channel_id, order, page_size, page));
    let episodes: Vec<Episode> = try_join_all(requests)
        .await?
        .into_iter()
        .flatten()
        .map(|program| Episode::new(program.id, program.title))
        .collect();

    info!(channel_id, episodes = episodes.len(), "Fetched program list");
    Ok(episodes)
}

/// The one episode of a single program page
pub fn single_episode(page: &PageContext, channel_id: &str, program_id: &str) -> Episode {
    Episode::new(program_id, page.program_title(channel_id, program_id))
}

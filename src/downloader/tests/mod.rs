use super::test_helpers::*;
use super::*;
use crate::error::Error;
use crate::types::{EpisodeStatus, RunReport};
use std::time::Duration;
use wiremock::{Mock, MockServer, ResponseTemplate};

mod run;

/// Drain every event already sent to `rx`
fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

use super::*;
use crate::session::PageContext;
use wiremock::matchers::{method, path};

#[tokio::test]
async fn every_episode_ends_finished() {
    let server = MockServer::start().await;
    mount_happy_path(&server, 5).await;
    let saver = Arc::new(RecordingSaver::new());
    let downloader = create_test_downloader(&server, 2, saver.clone());

    let report = downloader.run(&channel_page()).await.unwrap();

    assert_eq!(
        report,
        RunReport {
            total: 5,
            finished: 5,
            failed: 0
        }
    );
    let state = downloader.state();
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert!(state.is_complete());
    for episode in &state.episodes {
        assert_eq!(episode.status, EpisodeStatus::Finished);
        let edition = episode.edition.as_ref().unwrap();
        assert_eq!(edition.format, "m4a");
        assert_eq!(edition.bitrate, 64);
        assert_eq!(
            episode.path.as_deref(),
            Some(std::path::Path::new(&format!("/saved/{}.m4a", episode.title)))
        );
    }
    assert_eq!(state.progress().percent, 100);
}

#[tokio::test]
async fn saves_highest_bitrate_edition_under_title() {
    let server = MockServer::start().await;
    mount_happy_path(&server, 2).await;
    let saver = Arc::new(RecordingSaver::new());
    let downloader = create_test_downloader(&server, 1, saver.clone());

    downloader.run(&channel_page()).await.unwrap();

    assert_eq!(saver.names(), vec!["Episode 1.m4a", "Episode 2.m4a"]);
}

#[tokio::test]
async fn concurrency_never_exceeds_limit() {
    let server = MockServer::start().await;
    mount_happy_path(&server, 8).await;
    let saver = Arc::new(RecordingSaver::new().with_delay(Duration::from_millis(30)));
    let downloader = create_test_downloader(&server, 3, saver.clone());

    let report = downloader.run(&channel_page()).await.unwrap();

    assert_eq!(report.finished, 8);
    assert!(
        saver.max_in_flight() <= 3,
        "max in flight was {}",
        saver.max_in_flight()
    );
    assert!(saver.max_in_flight() > 1, "downloads never overlapped");
}

#[tokio::test]
async fn events_respect_concurrency_limit() {
    let server = MockServer::start().await;
    mount_happy_path(&server, 6).await;
    let saver = Arc::new(RecordingSaver::new().with_delay(Duration::from_millis(10)));
    let downloader = create_test_downloader(&server, 2, saver);
    let mut rx = downloader.subscribe();

    downloader.run(&channel_page()).await.unwrap();

    let mut active = 0usize;
    let mut peak = 0usize;
    for event in drain(&mut rx) {
        match event {
            Event::Started { .. } => {
                active += 1;
                peak = peak.max(active);
            }
            Event::Finished { .. } | Event::Failed { .. } => active -= 1,
            _ => {}
        }
    }
    assert_eq!(active, 0);
    assert!(peak <= 2, "peak concurrency was {peak}");
}

#[tokio::test]
async fn single_slot_runs_in_listing_order() {
    let server = MockServer::start().await;
    mount_happy_path(&server, 4).await;
    let saver = Arc::new(RecordingSaver::new().with_delay(Duration::from_millis(5)));
    let downloader = create_test_downloader(&server, 1, saver.clone());
    let mut rx = downloader.subscribe();

    downloader.run(&channel_page()).await.unwrap();

    let started: Vec<String> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            Event::Started { id } => Some(id),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec!["1", "2", "3", "4"]);
    assert_eq!(saver.max_in_flight(), 1);
}

#[tokio::test]
async fn event_sequence_for_one_episode() {
    let server = MockServer::start().await;
    mount_happy_path(&server, 1).await;
    let downloader = create_test_downloader(&server, 1, Arc::new(RecordingSaver::new()));
    let mut rx = downloader.subscribe();

    downloader.run(&channel_page()).await.unwrap();

    let events = drain(&mut rx);
    assert!(matches!(&events[0], Event::Enumerated { channel_id, total: 1 } if channel_id == CHANNEL_ID));
    assert!(matches!(&events[1], Event::Started { id } if id == "1"));
    assert!(matches!(&events[2], Event::Resolved { id, bitrate: 64, .. } if id == "1"));
    assert!(matches!(&events[3], Event::Finished { id, .. } if id == "1"));
    assert!(matches!(&events[4], Event::RunComplete { report } if report.finished == 1));
    assert_eq!(events.len(), 5);
}

#[tokio::test]
async fn single_episode_page_uses_fallback_title() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_editions(&server).await;
    Mock::given(method("GET"))
        .and(path("/m-bff/v2/channel/42"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let saver = Arc::new(RecordingSaver::new());
    let downloader = create_test_downloader(&server, 1, saver.clone());
    let page = PageContext::new("https://www.qtfm.cn/channels/42/programs/99")
        .with_cookie("qingting_id=sess")
        .with_refresh_token("refresh");

    let report = downloader.run(&page).await.unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.finished, 1);
    assert_eq!(saver.names(), vec!["42-99.m4a"]);
    let state = downloader.state();
    assert_eq!(state.episodes[0].id, "99");
    assert_eq!(state.episodes[0].title, "42-99");
}

#[tokio::test]
async fn empty_channel_completes_immediately() {
    let server = MockServer::start().await;
    mount_happy_path(&server, 0).await;
    let saver = Arc::new(RecordingSaver::new());
    let downloader = create_test_downloader(&server, 1, saver.clone());

    let report = downloader.run(&channel_page()).await.unwrap();

    assert_eq!(report, RunReport::default());
    assert!(saver.names().is_empty());
    assert!(!downloader.state().loading);
}

#[tokio::test]
async fn watchers_observe_final_state() {
    let server = MockServer::start().await;
    mount_happy_path(&server, 3).await;
    let downloader = create_test_downloader(&server, 2, Arc::new(RecordingSaver::new()));
    let watch = downloader.watch_state();

    downloader.run(&channel_page()).await.unwrap();

    let state = watch.borrow().clone();
    assert_eq!(state.episodes.len(), 3);
    assert!(state.is_complete());
}

#[tokio::test]
async fn second_run_starts_from_fresh_state() {
    let server = MockServer::start().await;
    mount_happy_path(&server, 2).await;
    let downloader = create_test_downloader(&server, 1, Arc::new(RecordingSaver::new()));

    downloader.run(&channel_page()).await.unwrap();
    let first_started = downloader.state().started_at;
    downloader.run(&channel_page()).await.unwrap();

    let state = downloader.state();
    assert_eq!(state.episodes.len(), 2);
    assert!(state.started_at >= first_started);
    assert!(state.is_complete());
}

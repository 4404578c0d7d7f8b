//! End-to-end tests of a viewer session against in-memory collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CollectingPresenter, MockDataSource, RecordingViewport};
use frame_cache::{ErrorPresenter, DataSource, ViewerConfig, ViewerEvent, ViewerSession};
use test_utils::{job_listing, layers, sample_listing, HOURLY_TIMES, JOB_ID};
use tokio::sync::mpsc;
use viewer_common::{FrameKey, PlotKind, ValidTime, ViewerError};

struct Harness {
    source: Arc<MockDataSource>,
    presenter: Arc<CollectingPresenter>,
    session: ViewerSession<RecordingViewport>,
}

fn harness(source: MockDataSource) -> Harness {
    harness_with(source, ViewerConfig::default())
}

fn harness_with(source: MockDataSource, config: ViewerConfig) -> Harness {
    let source = Arc::new(source);
    let presenter = Arc::new(CollectingPresenter::default());
    let session = ViewerSession::new(
        config,
        Arc::clone(&source) as Arc<dyn DataSource>,
        RecordingViewport::with_resolution(100.0),
        Arc::clone(&presenter) as Arc<dyn ErrorPresenter>,
    );
    Harness {
        source,
        presenter,
        session,
    }
}

async fn loaded() -> Harness {
    let mut h = harness(MockDataSource::new(sample_listing()));
    h.session.load_job(JOB_ID).await.unwrap();
    h
}

fn key(variable: &str, level: i32, time: i64) -> FrameKey {
    FrameKey::new(JOB_ID, ValidTime(time), variable, level)
}

fn visible_groups(session: &ViewerSession<RecordingViewport>) -> Vec<String> {
    session
        .catalog()
        .groups()
        .filter(|g| g.is_visible())
        .map(|g| g.variable().to_string())
        .collect()
}

/// Every frame shown on the map belongs to the visible group.
fn assert_map_matches_visible_group(session: &ViewerSession<RecordingViewport>) {
    let groups = visible_groups(session);
    assert!(groups.len() <= 1, "visible groups: {:?}", groups);
    for shown in session.viewport().visible_keys() {
        assert_eq!(Some(&shown.variable), groups.first(), "stray frame {}", shown);
    }
}

// ============================================================================
// Job loading
// ============================================================================

#[tokio::test]
async fn test_load_job_resolves_readiness() {
    let mut h = harness(MockDataSource::new(sample_listing()));
    let ready = h.session.ready();
    assert!(!ready.is_ready());

    h.session.load_job(JOB_ID).await.unwrap();

    let job = tokio::time::timeout(Duration::from_secs(1), ready.wait())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.job_id, JOB_ID);
    assert_eq!(h.session.catalog().len(), 2);
    assert_eq!(
        h.session.animation().timeline(),
        &[ValidTime(0), ValidTime(3600), ValidTime(7200)]
    );
    // Nothing is visible until asked
    assert!(visible_groups(&h.session).is_empty());
    assert_eq!(h.source.call_count(), 0);
}

#[tokio::test]
async fn test_load_job_error_is_presented_verbatim() {
    let mut h = harness(MockDataSource::failing_job(&["Job not found: abc"]));
    let ready = h.session.ready();

    let err = h.session.load_job("abc").await.unwrap_err();

    assert!(matches!(err, ViewerError::Upstream { .. }));
    assert_eq!(h.presenter.presented(), vec![vec!["Job not found: abc".to_string()]]);
    assert!(h.session.job().is_none());
    assert!(h.session.catalog().is_empty());
    assert!(!ready.is_ready());
}

#[tokio::test]
async fn test_initially_visible_group_is_shown() {
    let mut listing = layers("T2", 0, &HOURLY_TIMES, PlotKind::Contour);
    for layer in &mut listing {
        layer.visible = true;
    }
    let mut h = harness(MockDataSource::new(job_listing(JOB_ID, listing)));

    h.session.load_job(JOB_ID).await.unwrap();
    h.session.drain_fetches().await;

    assert_eq!(visible_groups(&h.session), vec!["T2"]);
    assert_eq!(h.session.viewport().visible_keys(), vec![key("T2", 0, 0)]);
}

#[tokio::test]
async fn test_group_commands_before_load() {
    let mut h = harness(MockDataSource::new(sample_listing()));
    assert!(matches!(
        h.session.show_group("T2", None),
        Err(ViewerError::NotReady)
    ));
}

// ============================================================================
// Loading and revealing frames
// ============================================================================

#[tokio::test]
async fn test_show_group_loads_and_reveals_when_complete() {
    let mut h = loaded().await;

    h.session.show_group("T2", None).unwrap();
    assert_eq!(h.session.in_flight(), 3);
    // Nothing shown while loading
    assert!(h.session.viewport().visible_keys().is_empty());

    assert_eq!(h.session.drain_fetches().await, 3);

    let group = h.session.catalog().group("T2").unwrap();
    assert_eq!(group.progress(), 100.0);
    assert_eq!(h.session.animation().selected_index(), 0);
    assert_eq!(h.session.viewport().visible_keys(), vec![key("T2", 0, 0)]);
}

#[tokio::test]
async fn test_t2_step_scenario_through_session() {
    let mut h = loaded().await;
    h.session.show_group("T2", None).unwrap();
    h.session.drain_fetches().await;

    h.session.step(1);
    h.session.step(1);
    let selected = h.session.step(-1);

    assert_eq!(selected, Some(ValidTime(3600)));
    assert_eq!(h.session.viewport().visible_keys(), vec![key("T2", 0, 3600)]);
}

#[tokio::test]
async fn test_fetches_are_issued_once_per_key() {
    let mut h = loaded().await;

    h.session.show_group("T2", None).unwrap();
    h.session.show_group("T2", None).unwrap();
    h.session.toggle_group("T2").unwrap();
    h.session.toggle_group("T2").unwrap();
    h.session.drain_fetches().await;

    let mut calls = h.source.calls();
    calls.sort();
    assert_eq!(calls, vec![key("T2", 0, 0), key("T2", 0, 3600), key("T2", 0, 7200)]);

    // Showing a loaded group fetches nothing
    h.session.show_group("WIND", None).unwrap();
    h.session.drain_fetches().await;
    h.session.show_group("T2", None).unwrap();
    assert_eq!(h.session.in_flight(), 0);
    assert_eq!(h.source.call_count(), 6);
}

#[tokio::test]
async fn test_switching_groups_keeps_previous_fetches() {
    let mut h = loaded().await;

    h.session.show_group("T2", None).unwrap();
    // Switch before any T2 fetch is handled
    h.session.show_group("WIND", None).unwrap();
    h.session.drain_fetches().await;

    assert_eq!(h.session.frames().realized_count(), 6);
    assert_eq!(h.session.catalog().progress_for("T2", 0), 100.0);
    // T2 completed while hidden and stays hidden
    assert_eq!(h.session.viewport().visible_keys(), vec![key("WIND", 0, 0)]);
}

#[tokio::test]
async fn test_completion_for_hidden_group_does_not_reveal() {
    let mut h = loaded().await;

    h.session.show_group("T2", None).unwrap();
    h.session.hide_group().unwrap();
    h.session.drain_fetches().await;

    assert!(visible_groups(&h.session).is_empty());
    assert!(h.session.viewport().visible_keys().is_empty());
}

// ============================================================================
// Visibility invariant
// ============================================================================

#[tokio::test]
async fn test_at_most_one_group_visible() {
    let mut h = loaded().await;

    let commands: Vec<ViewerEvent> = vec![
        ViewerEvent::Show { variable: "T2".into(), level: None },
        ViewerEvent::Show { variable: "WIND".into(), level: None },
        ViewerEvent::Toggle("T2".into()),
        ViewerEvent::Toggle("T2".into()),
        ViewerEvent::Toggle("WIND".into()),
        ViewerEvent::SetLevel { variable: "WIND".into(), level: 5 },
        ViewerEvent::Step(1),
        ViewerEvent::Toggle("T2".into()),
    ];

    for command in commands {
        h.session.handle(command).unwrap();
        h.session.drain_fetches().await;
        assert_map_matches_visible_group(&h.session);
    }

    assert_eq!(visible_groups(&h.session), vec!["T2"]);
    assert_eq!(h.session.viewport().visible_keys(), vec![key("T2", 0, 3600)]);
}

#[tokio::test]
async fn test_unknown_group_is_rejected_without_side_effects() {
    let mut h = loaded().await;
    h.session.show_group("T2", None).unwrap();
    h.session.drain_fetches().await;

    let err = h
        .session
        .handle(ViewerEvent::Toggle("NOPE".into()))
        .unwrap_err();

    assert!(matches!(err, ViewerError::UnknownGroup(_)));
    assert_eq!(visible_groups(&h.session), vec!["T2"]);
}

// ============================================================================
// Levels, opacity, viewport
// ============================================================================

#[tokio::test]
async fn test_set_level_swaps_frames() {
    let mut h = loaded().await;
    h.session.show_group("WIND", None).unwrap();
    h.session.drain_fetches().await;
    assert_eq!(h.session.viewport().visible_keys(), vec![key("WIND", 0, 0)]);

    h.session.set_level("WIND", 5).unwrap();
    assert!(h.session.viewport().visible_keys().is_empty());
    h.session.drain_fetches().await;

    let wind = h.session.catalog().group("WIND").unwrap();
    assert_eq!(wind.selected_level(), 5);
    assert_eq!(wind.progress_for(5), 100.0);
    assert_eq!(h.session.viewport().visible_keys(), vec![key("WIND", 5, 0)]);
}

#[tokio::test]
async fn test_set_level_on_hidden_group_does_not_fetch() {
    let mut h = loaded().await;
    h.session.set_level("WIND", 5).unwrap();
    assert_eq!(h.session.in_flight(), 0);
    assert!(h.session.set_level("WIND", 42).is_err());
}

#[tokio::test]
async fn test_set_opacity_reaches_realized_and_future_frames() {
    let mut h = loaded().await;
    h.session.show_group("WIND", None).unwrap();
    h.session.drain_fetches().await;

    h.session.set_opacity("WIND", 0.35).unwrap();
    assert_eq!(h.session.viewport().opacity[&key("WIND", 0, 7200)], 0.35);

    h.session.set_level("WIND", 5).unwrap();
    h.session.drain_fetches().await;
    let frame = h.session.frames().frame(&key("WIND", 5, 0)).unwrap();
    assert_eq!(frame.opacity, 0.35);
}

#[tokio::test]
async fn test_viewport_change_rerenders_visible_wind() {
    let mut h = loaded().await;
    h.session.show_group("WIND", None).unwrap();
    h.session.drain_fetches().await;

    let shown = key("WIND", 0, 0);
    assert_eq!(h.session.viewport().points[&shown].indices.len(), 16);

    h.session.viewport_mut().resolution = Some(1.0);
    h.session.handle(ViewerEvent::ViewportChanged).unwrap();
    assert_eq!(h.session.viewport().points[&shown].indices.len(), 144);
}

#[tokio::test]
async fn test_click_is_forwarded_only() {
    let mut h = loaded().await;
    h.session.handle(ViewerEvent::Click { x: 1.0, y: 2.0 }).unwrap();
    assert_eq!(h.session.viewport().clicks, vec![(1.0, 2.0)]);
    assert!(h.session.frames().is_empty());
}

// ============================================================================
// Failed fetches
// ============================================================================

#[tokio::test]
async fn test_failed_fetch_never_completes_and_is_not_retried() {
    let mut h = loaded().await;
    h.source.fail_frame(key("T2", 0, 3600));

    h.session.show_group("T2", None).unwrap();
    h.session.drain_fetches().await;

    let group = h.session.catalog().group("T2").unwrap();
    assert_eq!(group.loaded_at(0), 2);
    assert!(!group.is_complete(0));
    assert!(h.session.frames().is_pending(&key("T2", 0, 3600)));
    assert_eq!(h.presenter.presented().len(), 1);
    assert!(h.presenter.presented()[0][0].contains("No data for"));
    // Never revealed: the level is incomplete
    assert!(h.session.viewport().visible_keys().is_empty());

    h.session.toggle_group("T2").unwrap();
    h.session.toggle_group("T2").unwrap();
    assert_eq!(h.session.in_flight(), 0);
    assert_eq!(h.source.call_count(), 3);
}

// ============================================================================
// Event loop
// ============================================================================

#[tokio::test]
async fn test_run_loop_plays_and_stops() {
    let config = ViewerConfig {
        frame_delay_ms: 5,
        ..Default::default()
    };
    let mut h = harness_with(MockDataSource::new(sample_listing()), config);
    h.session.load_job(JOB_ID).await.unwrap();

    let (tx, rx) = mpsc::channel(16);
    let driver = tokio::spawn(async move {
        tx.send(ViewerEvent::Show { variable: "T2".into(), level: None })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(ViewerEvent::Play).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        tx.send(ViewerEvent::Pause).await.unwrap();
        tx.send(ViewerEvent::Shutdown).await.unwrap();
    });

    tokio::time::timeout(Duration::from_secs(5), h.session.run(rx))
        .await
        .unwrap();
    driver.await.unwrap();

    assert!(!h.session.animation().is_playing());
    assert_eq!(h.session.in_flight(), 0);
    assert_eq!(h.session.catalog().progress_for("T2", 0), 100.0);
    assert_eq!(h.session.viewport().visible_keys().len(), 1);
    assert_map_matches_visible_group(&h.session);
}

#[tokio::test]
async fn test_run_loop_stops_when_events_close() {
    let mut h = loaded().await;
    let (tx, rx) = mpsc::channel(1);
    drop(tx);

    tokio::time::timeout(Duration::from_secs(1), h.session.run(rx))
        .await
        .unwrap();
}

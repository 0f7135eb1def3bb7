//! Watcher driven through a real `CameraClient`
//!
//! The camera is a scripted transport, so these exercise the whole stack
//! below the watcher: session handling, envelope decoding and error
//! classification.

use std::sync::Arc;
use std::time::Duration;

use reolink_api::testing::{self, ScriptedTransport};
use reolink_api::{CameraClient, Credentials};
use reolink_watch::{CancellationToken, Event, EventAction, EventWatcher, WatchError};
use serde_json::json;

fn ai(person: bool) -> reolink_api::RawResponse {
    testing::success(
        "GetAiState",
        json!({
            "channel": 0,
            "people": {"alarm_state": i64::from(person), "support": 1},
            "vehicle": {"alarm_state": 0, "support": 1},
            "dog_cat": {"alarm_state": 0, "support": 1}
        }),
    )
}

fn motion(active: bool) -> reolink_api::RawResponse {
    testing::success("GetMdState", json!({"channel": 0, "state": i64::from(active)}))
}

fn client(transport: ScriptedTransport) -> (Arc<ScriptedTransport>, CameraClient<ScriptedTransport>) {
    let transport = Arc::new(transport);
    let client = CameraClient::with_transport(Arc::clone(&transport), Credentials::new("admin", "pw"));
    (transport, client)
}

/// Run until `limit` events have been seen
fn collect(watcher: &mut EventWatcher<&CameraClient<ScriptedTransport>>, limit: usize) -> Vec<Event> {
    let cancel = CancellationToken::new();
    let mut events = Vec::new();
    watcher
        .run(&cancel, |event| {
            events.push(event.clone());
            if events.len() >= limit {
                cancel.cancel();
            }
        })
        .expect("watch should end cleanly");
    events
}

#[test]
fn test_transitions_and_logout() {
    let (transport, client) = client(
        ScriptedTransport::new()
            .on("Login", testing::login_success("tok"))
            .on("GetAiState", ai(false))
            .on("GetAiState", ai(true))
            .on("GetAiState", ai(true))
            .on("GetMdState", motion(true))
            .on("GetMdState", motion(true))
            .on("GetMdState", motion(false))
            .on("Logout", testing::success("Logout", json!({}))),
    );

    let mut watcher = EventWatcher::new(&client).with_interval(Duration::from_millis(1));
    let events = collect(&mut watcher, 3);

    let seen: Vec<_> = events.iter().map(|e| (e.feature.as_str(), e.action)).collect();
    assert_eq!(
        seen,
        vec![
            ("motion", EventAction::Start),
            ("person", EventAction::Start),
            ("motion", EventAction::Stop),
        ]
    );
    assert_eq!(transport.count("Login"), 1);
    assert_eq!(transport.count("Logout"), 1);
}

#[test]
fn test_rejected_token_mid_watch_is_transparent() {
    let (transport, client) = client(
        ScriptedTransport::new()
            .on("Login", testing::login_success("first"))
            .on("Login", testing::login_success("second"))
            .on("GetAiState", ai(false))
            .on("GetMdState", motion(false))
            .on("GetMdState", testing::token_rejected("GetMdState"))
            .on("GetMdState", motion(true)),
    );

    let mut watcher = EventWatcher::new(&client).with_interval(Duration::from_millis(1));
    let events = collect(&mut watcher, 1);

    assert_eq!(events[0].feature, "motion");
    assert_eq!(events[0].action, EventAction::Start);
    assert_eq!(transport.count("Login"), 2);
}

#[test]
fn test_camera_without_ai_keeps_watching_motion() {
    let (_transport, client) = client(
        ScriptedTransport::new()
            .on("Login", testing::login_success("tok"))
            .on("GetAiState", testing::failure("GetAiState", -9, "not support"))
            .on("GetMdState", motion(true)),
    );

    let mut watcher = EventWatcher::new(&client);
    let events = collect(&mut watcher, 1);

    assert_eq!(events[0].feature, "motion");
    assert_eq!(watcher.queries().len(), 1);
}

#[test]
fn test_bad_credentials_end_the_watch() {
    let (transport, client) = client(
        ScriptedTransport::new().on("Login", testing::failure("Login", -7, "invalid user")),
    );

    let mut watcher = EventWatcher::new(&client);
    let err = watcher.run(&CancellationToken::new(), |_| {}).unwrap_err();

    assert!(matches!(err, WatchError::Auth(_)));
    assert_eq!(transport.count("GetAiState"), 0);
}

#[test]
fn test_unreachable_camera_skips_ticks() {
    let (transport, client) = client(
        ScriptedTransport::new()
            .on("Login", testing::login_success("tok"))
            .on_error("GetAiState", testing::timeout)
            .on("GetAiState", ai(true))
            .on("GetMdState", motion(false)),
    );

    let cancel = CancellationToken::new();
    let mut watcher = EventWatcher::new(&client).with_interval(Duration::from_millis(1));
    let summary = watcher.run(&cancel, |_| cancel.cancel()).unwrap();

    assert_eq!(summary.skipped_ticks, 1);
    assert_eq!(summary.events, 1);
    assert_eq!(transport.count("GetAiState"), 2);
}

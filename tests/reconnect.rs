mod common;

use common::{ConnectMode, Harness, RejectingTokenProvider, advance};
use realtime_resilience::{ConnectionState, RequestOutcome, ResilienceError, RoomKind};
use serde_json::json;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn connects_on_register_and_rejoins_room_once() {
    let h = Harness::new(ConnectMode::Succeed);
    h.manager.register().unwrap();
    h.manager
        .set_current_room("chat_42", RoomKind::Chat)
        .await
        .unwrap();

    advance(100).await;
    assert_eq!(h.transport.connects(), 1);
    assert_eq!(h.manager.connection_state(), ConnectionState::Connecting);

    // Stabilisation window
    advance(2_000).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert_eq!(h.manager.reconnect_attempts(), 0);
    assert_eq!(h.transport.sent_events("join_chat"), vec![json!("chat_42")]);
    assert_eq!(h.listener.count("reconnected"), 1);

    h.manager.unregister().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn requests_while_in_flight_are_dropped() {
    let h = Harness::new(ConnectMode::Hang);
    h.manager.register().unwrap();
    advance(100).await;

    for _ in 0..5 {
        let outcome = h.manager.request_reconnect().await.unwrap();
        assert_eq!(outcome, RequestOutcome::InFlight);
    }

    advance(100).await;
    assert_eq!(h.transport.connects(), 1);
    assert_eq!(h.manager.reconnect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn request_when_connected_is_a_no_op() {
    let h = Harness::new(ConnectMode::Succeed);
    h.manager.register().unwrap();
    advance(3_000).await;

    let outcome = h.manager.request_reconnect().await.unwrap();
    assert_eq!(outcome, RequestOutcome::AlreadyConnected);
    assert_eq!(h.transport.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn force_reconnect_resets_counter_and_pending_retry() {
    let h = Harness::new(ConnectMode::Hang);
    h.manager.register().unwrap();

    // First attempt times out at 10s; retry armed for 15s
    advance(11_000).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Reconnecting);
    assert_eq!(h.manager.reconnect_attempts(), 1);

    let outcome = h.manager.force_reconnect().await.unwrap();
    assert!(matches!(outcome, RequestOutcome::Started { attempt: 1, .. }));
    assert_eq!(h.manager.reconnect_attempts(), 1);
    assert_eq!(h.manager.connection_state(), ConnectionState::Connecting);

    // The old retry must not fire
    advance(5_000).await;
    assert_eq!(h.transport.connects(), 2);
    assert!(h.transport.disconnects() >= 1);
}

#[tokio::test(start_paused = true)]
async fn five_timeouts_end_in_failed_with_deferred_retry() {
    let h = Harness::new(ConnectMode::Hang);
    h.manager.register().unwrap();

    // Attempts start at 0, 15, 35, 65 and 115 seconds
    advance(124_000).await;
    assert_eq!(h.transport.connects(), 5);
    assert_eq!(h.manager.connection_state(), ConnectionState::Reconnecting);
    assert_eq!(h.listener.count("retrying:"), 4);
    assert_eq!(h.listener.count("failed:"), 0);

    // Fifth timeout at 125s
    advance(2_000).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Failed);
    assert_eq!(h.manager.reconnect_attempts(), 5);
    assert_eq!(h.listener.count("failed:5"), 1);

    advance(58_000).await;
    assert_eq!(h.transport.connects(), 5);

    // Sixth attempt 60s after giving up
    advance(2_000).await;
    assert_eq!(h.transport.connects(), 6);
    assert_eq!(h.manager.connection_state(), ConnectionState::Reconnecting);
}

#[tokio::test(start_paused = true)]
async fn token_failure_counts_as_an_attempt() {
    let h = Harness::with_tokens(ConnectMode::Succeed, Arc::new(RejectingTokenProvider));
    h.manager.register().unwrap();

    advance(100).await;
    assert_eq!(h.manager.reconnect_attempts(), 1);
    assert_eq!(h.manager.connection_state(), ConnectionState::Reconnecting);
    assert_eq!(h.transport.connects(), 0);

    advance(5_000).await;
    assert_eq!(h.manager.reconnect_attempts(), 2);
    assert_eq!(h.listener.count("retrying:2"), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_error_is_retried_with_backoff() {
    let h = Harness::new(ConnectMode::Fail("refused".to_string()));
    h.manager.register().unwrap();

    advance(100).await;
    assert_eq!(h.manager.reconnect_attempts(), 1);

    h.transport.set_mode(ConnectMode::Succeed);
    advance(5_000).await;
    assert_eq!(h.transport.connects(), 2);

    advance(2_000).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert_eq!(h.manager.reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn server_drop_reconnects_after_throttle_window() {
    let h = Harness::new(ConnectMode::Succeed);
    h.manager.register().unwrap();
    h.manager
        .set_current_room("chat_42", RoomKind::Chat)
        .await
        .unwrap();
    advance(3_000).await;

    // 3s after the last attempt: deferred to the 5s mark
    h.transport.drop_connection("transport close");
    advance(1_000).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Disconnected);
    assert_eq!(h.transport.connects(), 1);

    advance(3_500).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert_eq!(h.transport.connects(), 2);
    assert_eq!(h.transport.sent_events("join_chat").len(), 2);
    assert_eq!(h.listener.count("reconnected"), 2);
}

#[tokio::test(start_paused = true)]
async fn transport_restored_connection_is_adopted() {
    let h = Harness::new(ConnectMode::Succeed);
    h.manager.register().unwrap();
    advance(3_000).await;

    h.transport.drop_connection("ping timeout");
    advance(500).await;
    h.transport.restore();
    advance(100).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);

    // Deferred retry was cancelled
    advance(10_000).await;
    assert_eq!(h.transport.connects(), 1);
    assert_eq!(h.listener.count("reconnected"), 2);
}

#[tokio::test(start_paused = true)]
async fn join_and_leave_room_while_connected() {
    let h = Harness::new(ConnectMode::Succeed);
    h.manager.register().unwrap();
    advance(3_000).await;

    h.manager.join_room("chat_7", RoomKind::Chat).await.unwrap();
    advance(10).await;
    assert_eq!(h.transport.sent_events("join_chat"), vec![json!("chat_7")]);
    assert_eq!(h.manager.snapshot().room.map(|room| room.id), Some("chat_7".to_string()));

    h.manager.leave_room().await.unwrap();
    advance(10).await;
    assert_eq!(h.transport.sent_events("leave_chat"), vec![json!("chat_7")]);
    assert_eq!(h.manager.snapshot().room, None);

    h.manager
        .join_room("trip_9", RoomKind::LiveTracking)
        .await
        .unwrap();
    advance(10).await;
    assert_eq!(h.transport.sent_events("join_paseo"), vec![json!("trip_9")]);

    // Live tracking has no leave event
    h.manager.leave_room().await.unwrap();
    advance(10).await;
    assert_eq!(h.transport.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn inbound_messages_reach_the_listener() {
    let h = Harness::new(ConnectMode::Succeed);
    h.manager.register().unwrap();
    advance(3_000).await;

    h.transport
        .emit(realtime_resilience::TransportEvent::Message {
            event: "chat_message".to_string(),
            payload: json!({"text": "hi"}),
        });
    advance(10).await;

    assert_eq!(h.listener.count("message:chat_message:"), 1);
}

#[tokio::test(start_paused = true)]
async fn unregister_stops_every_timer() {
    let h = Harness::new(ConnectMode::Hang);
    h.manager.register().unwrap();
    h.manager
        .set_current_room("chat_42", RoomKind::Chat)
        .await
        .unwrap();
    advance(11_000).await;

    h.manager.unregister().await.unwrap();
    let snapshot = h.manager.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Disconnected);
    assert_eq!(snapshot.attempts, 0);
    assert_eq!(snapshot.room, None);

    advance(300_000).await;
    assert_eq!(h.transport.connects(), 1);
    assert!(matches!(
        h.manager.request_reconnect().await,
        Err(ResilienceError::NotRegistered)
    ));
}

#[tokio::test(start_paused = true)]
async fn timed_out_attempt_drops_the_transport_at_once() {
    let h = Harness::new(ConnectMode::Hang);
    h.manager.register().unwrap();

    advance(9_900).await;
    assert_eq!(h.transport.disconnects(), 0);

    // Timeout at 10s, next attempt not before 15s
    advance(200).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Reconnecting);
    assert_eq!(h.transport.disconnects(), 1);
    assert_eq!(h.transport.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn transport_restore_while_failed_is_adopted() {
    let h = Harness::new(ConnectMode::Fail("refused".to_string()));
    h.manager.register().unwrap();

    // Failures at 0, 5, 15, 35 and 75 seconds
    advance(76_000).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Failed);

    h.transport.restore();
    advance(100).await;
    let snapshot = h.manager.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert_eq!(snapshot.attempts, 0);
    assert!(snapshot.heartbeat_running);
    assert_eq!(h.listener.count("state:FAILED->RECONNECTING"), 1);
    assert_eq!(h.listener.count("reconnected"), 1);

    advance(600_000).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert_eq!(h.transport.connects(), 5);
}

#[tokio::test(start_paused = true)]
async fn foreground_return_keeps_exhausted_backoff() {
    let h = Harness::new(ConnectMode::Fail("refused".to_string()));
    h.manager.register().unwrap();

    advance(75_100).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Failed);
    assert_eq!(h.transport.connects(), 5);

    // Back inside the throttle window
    h.manager.set_foreground(false).await.unwrap();
    advance(500).await;
    h.manager.set_foreground(true).await.unwrap();

    advance(50_000).await;
    assert_eq!(h.transport.connects(), 5);

    // Exhausted retry still lands 60s after the last failure
    advance(10_000).await;
    assert_eq!(h.transport.connects(), 6);
}

#[tokio::test(start_paused = true)]
async fn rapid_forced_reconnects_rejoin_once_per_connection() {
    let h = Harness::new(ConnectMode::Succeed);
    h.manager.register().unwrap();
    h.manager
        .set_current_room("chat_42", RoomKind::Chat)
        .await
        .unwrap();

    // Two forces inside the first stabilisation window
    advance(1_000).await;
    h.manager.force_reconnect().await.unwrap();
    h.manager.force_reconnect().await.unwrap();
    advance(1_900).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connecting);
    assert!(h.transport.sent_events("join_chat").is_empty());

    advance(200).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert_eq!(h.transport.sent_events("join_chat").len(), 1);

    // And once more right after connecting
    h.manager.force_reconnect().await.unwrap();
    advance(1_900).await;
    assert_eq!(h.transport.sent_events("join_chat").len(), 1);

    advance(200).await;
    assert_eq!(h.manager.connection_state(), ConnectionState::Connected);
    assert_eq!(h.transport.sent_events("join_chat").len(), 2);
    assert_eq!(h.listener.count("reconnected"), 2);

    let connected = h
        .listener
        .events()
        .iter()
        .filter(|event| event.starts_with("state:") && event.ends_with("->CONNECTED"))
        .count();
    assert_eq!(connected, h.transport.sent_events("join_chat").len());
}

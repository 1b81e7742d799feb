//! Gateway Integration Tests
//!
//! Drive the real gateway client against an in-process mock server.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;
use std::time::Duration;

use cord_gateway::{ConnectionState, DispatchEvent, Gateway, GatewayError};
use integration_tests::{test_config, MockGateway, STEP_TIMEOUT, TEST_TOKEN};
use serde_json::json;
use tokio::sync::mpsc;

/// Forward every dispatch of `event` into a channel
fn collect(gateway: &Gateway, event: &str) -> mpsc::UnboundedReceiver<Arc<DispatchEvent>> {
    let (tx, rx) = mpsc::unbounded_channel();
    gateway.on(event, move |event| {
        let tx = tx.clone();
        async move {
            tx.send(event)?;
            Ok(())
        }
    });
    rx
}

async fn wait_for_state(gateway: &Gateway, state: ConnectionState) {
    let mut watch = gateway.watch_state();
    tokio::time::timeout(STEP_TIMEOUT, watch.wait_for(|s| *s == state))
        .await
        .expect("state not reached in time")
        .expect("state channel closed");
}

// ============================================================================
// Handshake and dispatch
// ============================================================================

#[tokio::test]
async fn test_identify_ready_and_dispatch() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));
    let mut ready = collect(&gateway, "READY");
    let mut messages = collect(&gateway, "MESSAGE_CREATE");

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();

    let identify = conn.handshake(1, "abc", &server.url()).await.unwrap();
    assert_eq!(identify["d"]["token"], TEST_TOKEN);
    assert!(identify["d"]["intents"].is_u64());
    assert!(identify["d"]["properties"]["os"].is_string());

    let event = tokio::time::timeout(STEP_TIMEOUT, ready.recv()).await.unwrap().unwrap();
    assert_eq!(event.sequence, 1);
    wait_for_state(&gateway, ConnectionState::Connected).await;
    assert_eq!(gateway.session().session_id.as_deref(), Some("abc"));

    conn.send_dispatch(2, "MESSAGE_CREATE", json!({ "content": "hi" })).await.unwrap();
    let event = tokio::time::timeout(STEP_TIMEOUT, messages.recv()).await.unwrap().unwrap();
    assert_eq!(event.name, "MESSAGE_CREATE");
    assert_eq!(event.sequence, 2);
    assert_eq!(event.data["content"], "hi");
    assert_eq!(gateway.session().sequence, Some(2));

    gateway.stop().await.unwrap();
    assert_eq!(conn.wait_closed().await.unwrap(), Some(1000));
    assert_eq!(gateway.state(), ConnectionState::Closed);
    assert!(gateway.session().session_id.is_none());
}

#[tokio::test]
async fn test_presence_update_sent_when_connected() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.handshake(1, "abc", &server.url()).await.unwrap();
    wait_for_state(&gateway, ConnectionState::Connected).await;

    gateway.update_presence("idle").await.unwrap();
    let presence = conn.expect_op(3).await.unwrap();
    assert_eq!(presence["d"]["status"], "idle");
    assert_eq!(presence["d"]["afk"], false);

    assert!(matches!(
        gateway.update_presence("away").await,
        Err(GatewayError::InvalidPresence(_))
    ));

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));
    let mut messages = collect(&gateway, "MESSAGE_CREATE");

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.handshake(1, "abc", &server.url()).await.unwrap();
    conn.send_dispatch(2, "MESSAGE_CREATE", json!({})).await.unwrap();
    tokio::time::timeout(STEP_TIMEOUT, messages.recv()).await.unwrap().unwrap();

    for garbage in [
        "not json",
        "[11,null,99]",
        r#"[0,{"content":"x"},98,"MESSAGE_CREATE"]"#,
        r#"{"op":0,"d":{},"t":"MESSAGE_CREATE"}"#,
    ] {
        conn.send_text(garbage).await.unwrap();
    }
    conn.send_dispatch(3, "MESSAGE_CREATE", json!({ "content": "after" })).await.unwrap();

    let event = tokio::time::timeout(STEP_TIMEOUT, messages.recv()).await.unwrap().unwrap();
    assert_eq!(event.sequence, 3);
    assert_eq!(event.data["content"], "after");
    assert_eq!(gateway.session().sequence, Some(3));
    assert_eq!(gateway.state(), ConnectionState::Connected);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_heartbeat_carries_last_sequence() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.send_hello(100).await.unwrap();
    conn.expect_op(2).await.unwrap();
    conn.send_ready(1, "abc", &server.url()).await.unwrap();
    conn.send_dispatch(5, "TYPING_START", json!({})).await.unwrap();

    // Beats sent before the dispatch was read may still carry 1
    let mut last = None;
    for _ in 0..10 {
        let beat = conn.recv().await.unwrap();
        assert_eq!(beat["op"], 1);
        conn.send_heartbeat_ack().await.unwrap();
        last = beat["d"].as_u64();
        if last == Some(5) {
            break;
        }
    }
    assert_eq!(last, Some(5));

    gateway.stop().await.unwrap();
}

// ============================================================================
// Reconnect and resume
// ============================================================================

#[tokio::test]
async fn test_resume_after_recoverable_close() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));
    let mut messages = collect(&gateway, "MESSAGE_CREATE");

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.handshake(1, "abc", &server.url()).await.unwrap();
    conn.send_dispatch(42, "MESSAGE_CREATE", json!({})).await.unwrap();
    tokio::time::timeout(STEP_TIMEOUT, messages.recv()).await.unwrap().unwrap();

    conn.close(4000).await.unwrap();

    let mut conn = server.accept().await.unwrap();
    conn.send_hello(45_000).await.unwrap();
    let resume = conn.expect_op(6).await.unwrap();
    assert_eq!(resume["d"]["token"], TEST_TOKEN);
    assert_eq!(resume["d"]["session_id"], "abc");
    assert_eq!(resume["d"]["seq"], 42);

    conn.send_dispatch(43, "RESUMED", json!({})).await.unwrap();
    wait_for_state(&gateway, ConnectionState::Connected).await;
    conn.send_dispatch(44, "MESSAGE_CREATE", json!({})).await.unwrap();
    let event = tokio::time::timeout(STEP_TIMEOUT, messages.recv()).await.unwrap().unwrap();
    assert_eq!(event.sequence, 44);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_request_resumes() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.handshake(3, "abc", &server.url()).await.unwrap();
    wait_for_state(&gateway, ConnectionState::Connected).await;

    conn.send(json!({ "op": 7, "d": null })).await.unwrap();
    assert_eq!(conn.wait_closed().await.unwrap(), Some(4000));

    let mut conn = server.accept().await.unwrap();
    conn.send_hello(45_000).await.unwrap();
    let resume = conn.expect_op(6).await.unwrap();
    assert_eq!(resume["d"]["seq"], 3);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_invalid_session_reidentifies() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.handshake(1, "abc", &server.url()).await.unwrap();
    wait_for_state(&gateway, ConnectionState::Connected).await;

    conn.send(json!({ "op": 9, "d": false })).await.unwrap();
    conn.wait_closed().await.unwrap();

    let mut conn = server.accept().await.unwrap();
    conn.send_hello(45_000).await.unwrap();
    let identify = conn.expect_op(2).await.unwrap();
    assert_eq!(identify["d"]["token"], TEST_TOKEN);
    assert!(gateway.session().session_id.is_none());

    conn.send_ready(1, "def", &server.url()).await.unwrap();
    wait_for_state(&gateway, ConnectionState::Connected).await;
    assert_eq!(gateway.session().session_id.as_deref(), Some("def"));

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_missing_hello_reconnects() {
    let server = MockGateway::start().await.unwrap();
    let config = test_config(&server.url()).with_hello_timeout(Duration::from_millis(200));
    let mut gateway = Gateway::new(config);

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();

    // Stay silent: the client gives up on this socket by itself
    assert_eq!(conn.wait_closed().await.unwrap(), Some(4000));

    let mut conn = server.accept().await.unwrap();
    conn.handshake(1, "abc", &server.url()).await.unwrap();
    wait_for_state(&gateway, ConnectionState::Connected).await;

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_zombie_connection_reconnects() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.send_hello(100).await.unwrap();
    conn.expect_op(2).await.unwrap();
    conn.send_ready(1, "abc", &server.url()).await.unwrap();

    // Never ACK: the second beat finds the first unanswered
    assert_eq!(conn.wait_closed().await.unwrap(), Some(4000));

    let mut conn = server.accept().await.unwrap();
    conn.send_hello(45_000).await.unwrap();
    let resume = conn.expect_op(6).await.unwrap();
    assert_eq!(resume["d"]["session_id"], "abc");

    gateway.stop().await.unwrap();
}

// ============================================================================
// Terminal closes and shutdown
// ============================================================================

#[tokio::test]
async fn test_authentication_failure_is_terminal() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));

    gateway.start("bad-token").unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.send_hello(45_000).await.unwrap();
    conn.expect_op(2).await.unwrap();
    conn.close(4004).await.unwrap();

    let result = tokio::time::timeout(STEP_TIMEOUT, gateway.wait()).await.unwrap();
    assert!(matches!(result, Err(GatewayError::AuthenticationFailed)));
    assert_eq!(gateway.state(), ConnectionState::Closed);
    assert!(!gateway.is_running());

    let reconnect = server.accept_within(Duration::from_millis(300)).await.unwrap();
    assert!(reconnect.is_none(), "client reconnected after 4004");
}

#[tokio::test]
async fn test_restart_after_unclaimed_terminal_close() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));

    gateway.start("bad-token").unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.send_hello(45_000).await.unwrap();
    conn.expect_op(2).await.unwrap();
    conn.close(4004).await.unwrap();
    wait_for_state(&gateway, ConnectionState::Closed).await;
    tokio::time::timeout(STEP_TIMEOUT, async {
        while gateway.is_running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("run did not finish");

    // No wait() in between: the old outcome is logged and replaced
    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    let identify = conn.handshake(1, "def", &server.url()).await.unwrap();
    assert_eq!(identify["d"]["token"], TEST_TOKEN);
    wait_for_state(&gateway, ConnectionState::Connected).await;

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_fatal_close_is_terminal() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.handshake(1, "abc", &server.url()).await.unwrap();
    conn.close(4014).await.unwrap();

    let result = tokio::time::timeout(STEP_TIMEOUT, gateway.wait()).await.unwrap();
    match result {
        Err(GatewayError::FatalClose(code)) => assert_eq!(code.as_u16(), 4014),
        other => panic!("expected fatal close, got {other:?}"),
    }
    assert_eq!(gateway.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_stop_cancels_backoff() {
    let server = MockGateway::start().await.unwrap();
    let mut config = test_config(&server.url());
    config.backoff.initial = Duration::from_secs(30);
    config.backoff.max = Duration::from_secs(30);
    let mut gateway = Gateway::new(config);

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.handshake(1, "abc", &server.url()).await.unwrap();
    wait_for_state(&gateway, ConnectionState::Connected).await;

    conn.close(4000).await.unwrap();
    wait_for_state(&gateway, ConnectionState::Reconnecting).await;

    tokio::time::timeout(STEP_TIMEOUT, gateway.stop())
        .await
        .expect("stop did not interrupt the backoff")
        .unwrap();
    assert_eq!(gateway.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_restart_after_stop() {
    let server = MockGateway::start().await.unwrap();
    let mut gateway = Gateway::new(test_config(&server.url()));

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.handshake(1, "abc", &server.url()).await.unwrap();
    gateway.stop().await.unwrap();

    gateway.start(TEST_TOKEN).unwrap();
    let mut conn = server.accept().await.unwrap();
    conn.send_hello(45_000).await.unwrap();
    // Stop cleared the session, so this is a fresh identify
    conn.expect_op(2).await.unwrap();

    gateway.stop().await.unwrap();
}

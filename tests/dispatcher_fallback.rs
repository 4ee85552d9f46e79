mod common;

use common::{FakeHost, FakeSocket, SocketMode, Via};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use workflow_courier::transport::{
    ConnectionAvailabilityCache, MessageHandler, PersistentChannel, ReadyState, Request,
    StatelessChannel, TransportDispatcher, op,
};

fn build(
    host: &Arc<FakeHost>,
    socket: &Arc<FakeSocket>,
    primary_timeout: Duration,
) -> (Arc<ConnectionAvailabilityCache>, TransportDispatcher) {
    let cache = Arc::new(ConnectionAvailabilityCache::default());
    let primary: Arc<dyn PersistentChannel> = Arc::clone(socket) as Arc<dyn PersistentChannel>;
    let fallback: Arc<dyn StatelessChannel> = Arc::clone(host) as Arc<dyn StatelessChannel>;
    let dispatcher = TransportDispatcher::with_channels(Arc::clone(&cache), Some(primary), fallback)
        .with_primary_timeout(primary_timeout)
        .with_fallback_timeout(Duration::from_millis(500));
    (cache, dispatcher)
}

fn exists_request(path: &str) -> Request {
    Request::new(op::PATH_EXISTS).param("path", path)
}

#[tokio::test]
async fn open_socket_answers_without_http() {
    let host = FakeHost::new().with_file("/w/a.json", "{}");
    let socket = FakeSocket::new(ReadyState::Open, SocketMode::Respond(Arc::clone(&host)));
    let (cache, dispatcher) = build(&host, &socket, Duration::from_millis(200));

    let reply = dispatcher.send(&exists_request("/w/a.json")).await.unwrap();
    assert_eq!(reply["exists"], true);

    let calls = host.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].via, Via::Socket);
    assert!(cache.snapshot().available);
}

#[tokio::test]
async fn closing_socket_fails_fast_and_falls_back() {
    let host = FakeHost::new().with_file("/w/a.json", "{}");
    let socket = FakeSocket::new(ReadyState::Closing, SocketMode::Silent);
    let (cache, dispatcher) = build(&host, &socket, Duration::from_secs(5));

    let started = Instant::now();
    let reply = dispatcher.send(&exists_request("/w/a.json")).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(reply["exists"], true);
    assert_eq!(socket.sent_count(), 0);
    assert_eq!(host.calls()[0].via, Via::Http);

    let state = cache.snapshot();
    assert!(state.last_checked_at.is_some());
    assert!(!state.available);
}

#[tokio::test]
async fn recent_failure_suppresses_the_socket() {
    let host = FakeHost::new().with_dir("/w");
    let socket = FakeSocket::new(ReadyState::Open, SocketMode::Respond(Arc::clone(&host)));
    let (cache, dispatcher) = build(&host, &socket, Duration::from_millis(200));
    cache.record_result(false);

    dispatcher.send(&exists_request("/w")).await.unwrap();
    assert_eq!(socket.sent_count(), 0);
    assert_eq!(host.calls()[0].via, Via::Http);
}

#[tokio::test]
async fn expired_failure_allows_the_socket_again() {
    let host = FakeHost::new().with_dir("/w");
    let socket = FakeSocket::new(ReadyState::Open, SocketMode::Respond(Arc::clone(&host)));
    let cache = Arc::new(ConnectionAvailabilityCache::new(Duration::from_millis(20)));
    let dispatcher = TransportDispatcher::with_channels(
        Arc::clone(&cache),
        Some(Arc::clone(&socket) as Arc<dyn PersistentChannel>),
        Arc::clone(&host) as Arc<dyn StatelessChannel>,
    );
    cache.record_result(false);
    tokio::time::sleep(Duration::from_millis(40)).await;

    dispatcher.send(&exists_request("/w")).await.unwrap();
    assert_eq!(socket.sent_count(), 1);
    assert!(cache.snapshot().available);
}

#[tokio::test]
async fn silent_socket_times_out_then_http_answers_once() {
    let host = FakeHost::new().with_file("/w/a.json", "{}");
    let socket = FakeSocket::new(ReadyState::Open, SocketMode::Silent);
    let original: MessageHandler = Arc::new(|_text: &str| {});
    socket.replace_message_handler(Some(Arc::clone(&original)));
    let (cache, dispatcher) = build(&host, &socket, Duration::from_millis(50));

    let reply = dispatcher.send(&exists_request("/w/a.json")).await.unwrap();
    assert_eq!(reply["exists"], true);
    assert_eq!(socket.sent_count(), 1);
    assert_eq!(host.call_count(op::PATH_EXISTS), 1);
    assert!(!cache.snapshot().available);

    let restored = socket.message_handler().expect("handler restored");
    assert!(Arc::ptr_eq(&restored, &original));
}

#[tokio::test]
async fn unrelated_frames_reach_the_previous_handler() {
    let host = FakeHost::new().with_dir("/w");
    let socket = FakeSocket::new(ReadyState::Open, SocketMode::NoisyRespond(Arc::clone(&host)));
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let original: MessageHandler = Arc::new(move |_text: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    socket.replace_message_handler(Some(Arc::clone(&original)));
    let (_cache, dispatcher) = build(&host, &socket, Duration::from_millis(200));

    let reply = dispatcher.send(&exists_request("/w")).await.unwrap();
    assert_eq!(reply["is_directory"], true);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&socket.message_handler().unwrap(), &original));
}

#[tokio::test]
async fn both_channels_down_reports_every_attempt() {
    let host = FakeHost::new();
    host.set_unreachable(true);
    let socket = FakeSocket::new(ReadyState::Closed, SocketMode::Silent);
    let (_cache, dispatcher) = build(&host, &socket, Duration::from_millis(50));

    let err = dispatcher.send(&exists_request("/w")).await.unwrap_err();
    assert!(err.is_unreachable());
    assert_eq!(err.attempts().len(), 2);
    assert_eq!(err.attempts()[0].strategy, "websocket");
    assert_eq!(err.attempts()[1].strategy, "http");
}

#[tokio::test]
async fn fallback_only_leaves_the_socket_alone() {
    let host = FakeHost::new().with_dir("/w");
    let socket = FakeSocket::new(ReadyState::Open, SocketMode::Respond(Arc::clone(&host)));
    let (cache, dispatcher) = build(&host, &socket, Duration::from_millis(200));

    dispatcher.send_fallback_only(&exists_request("/w")).await.unwrap();
    assert_eq!(socket.sent_count(), 0);
    assert!(cache.snapshot().last_checked_at.is_none());
}

#[tokio::test]
async fn status_probes_without_touching_files() {
    let host = FakeHost::new().with_dir("/w");
    let socket = FakeSocket::new(ReadyState::Closed, SocketMode::Silent);
    let (_cache, dispatcher) = build(&host, &socket, Duration::from_millis(50));

    let status = dispatcher.connection_status().await;
    assert!(!status.primary_open());
    assert!(status.fallback_reachable());
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn queued_sends_skip_a_socket_marked_down_while_they_waited() {
    let host = FakeHost::new().with_dir("/w");
    let socket = FakeSocket::new(ReadyState::Open, SocketMode::Silent);
    let (cache, dispatcher) = build(&host, &socket, Duration::from_millis(300));
    let request = exists_request("/w");

    let started = Instant::now();
    let (a, b, c) = tokio::join!(
        dispatcher.send(&request),
        dispatcher.send(&request),
        dispatcher.send(&request),
    );
    let elapsed = started.elapsed();

    for reply in [a, b, c] {
        assert_eq!(reply.unwrap()["is_directory"], true);
    }
    // one timeout, not three in a row
    assert!(elapsed < Duration::from_millis(600), "{elapsed:?}");
    assert_eq!(socket.sent_count(), 1);
    assert_eq!(host.call_count(op::PATH_EXISTS), 3);
    assert!(host.calls().iter().all(|c| c.via == Via::Http));
    assert!(!cache.snapshot().available);
}

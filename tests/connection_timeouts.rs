//! Connection-level timeouts on a real listener.

use std::time::Duration;

use servekit::http::ServerOptions;
use servekit::lifecycle::{ShutdownConfig, StopTrigger};
use servekit::HttpServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

mod common;

use common::{run_server, test_router, RunningServer};

async fn serve_with(options: ServerOptions, trigger: &StopTrigger) -> RunningServer {
    let server = HttpServer::new("127.0.0.1:0".parse().unwrap(), test_router()).with_options(options);
    let config = ShutdownConfig::new(Duration::from_millis(10), Duration::from_millis(500));
    run_server(server, trigger.subscribe(), config).await
}

/// Read until the server closes the connection, returning how long that took.
async fn wait_for_close(stream: &mut TcpStream) -> Duration {
    let start = Instant::now();
    let mut sink = Vec::new();
    // A reset is as good as an orderly close here.
    let _ = timeout(Duration::from_secs(5), stream.read_to_end(&mut sink))
        .await
        .expect("server kept the connection open");
    start.elapsed()
}

#[tokio::test]
async fn incomplete_headers_are_disconnected() {
    let trigger = StopTrigger::new();
    let running = serve_with(
        ServerOptions {
            read_header_timeout: Duration::from_millis(200),
            idle_timeout: Duration::from_secs(30),
            ..Default::default()
        },
        &trigger,
    )
    .await;

    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    // No blank line, so the request head never completes.
    stream.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n").await.unwrap();

    let elapsed = wait_for_close(&mut stream).await;
    assert!(elapsed < Duration::from_secs(5), "closed after {elapsed:?}");

    trigger.trigger();
    let result = timeout(Duration::from_secs(5), running.result).await.unwrap().unwrap();
    assert!(result.is_ok(), "unexpected error: {result:?}");
}

#[tokio::test]
async fn complete_request_is_answered_within_header_timeout() {
    let trigger = StopTrigger::new();
    let running = serve_with(
        ServerOptions {
            read_header_timeout: Duration::from_millis(200),
            ..Default::default()
        },
        &trigger,
    )
    .await;

    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "got {response:?}");
    assert!(response.ends_with("ok"));

    trigger.trigger();
    let result = timeout(Duration::from_secs(5), running.result).await.unwrap().unwrap();
    assert!(result.is_ok(), "unexpected error: {result:?}");
}

#[tokio::test]
async fn silent_connection_is_closed_after_idle_timeout() {
    let trigger = StopTrigger::new();
    let running = serve_with(
        ServerOptions {
            read_header_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_millis(200),
            ..Default::default()
        },
        &trigger,
    )
    .await;

    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    let elapsed = wait_for_close(&mut stream).await;
    assert!(elapsed >= Duration::from_millis(150), "closed after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "closed after {elapsed:?}");

    trigger.trigger();
    let result = timeout(Duration::from_secs(5), running.result).await.unwrap().unwrap();
    assert!(result.is_ok(), "unexpected error: {result:?}");
}

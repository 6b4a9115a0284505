//! End-to-end tests against a real listening server.
//!
//! Requests are written by hand over a TCP socket so the whole stack
//! (listener, router, body limits, JSON encoding) is exercised.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use chrono::Duration;
use seefood::server::{start_server_with_state, AppState, ServerConfig};
use seefood::share::{default_ttl, ttl_from_secs, ManualClock, ShareStore, MAX_TTL_SECS};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

struct Reply {
    status: u16,
    /// Status line and headers, lowercased.
    head: String,
    body: String,
}

async fn request(addr: SocketAddr, method: &str, path: &str, body: Option<Value>) -> Reply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let payload = body.map(|b| b.to_string()).unwrap_or_default();

    let mut raw = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n",
        method, path, addr
    );
    if !payload.is_empty() {
        raw.push_str("Content-Type: application/json\r\n");
        raw.push_str(&format!("Content-Length: {}\r\n", payload.len()));
    }
    raw.push_str("\r\n");
    raw.push_str(&payload);
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let text = String::from_utf8_lossy(&response).to_string();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    let (head, body) = text
        .split_once("\r\n\r\n")
        .map(|(h, b)| (h.to_lowercase(), b.to_string()))
        .unwrap_or_default();

    Reply { status, head, body }
}

fn test_config(base_port: u16) -> ServerConfig {
    ServerConfig {
        host: IpAddr::from([127, 0, 0, 1]),
        base_port,
        open_browser: false,
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn test_publish_lookup_expire_over_http() {
    let clock = Arc::new(ManualClock::default());
    let store = ShareStore::new(clock.clone(), default_ttl());
    let state = Arc::new(AppState::new(store).unwrap());

    let handle = start_server_with_state(state.clone(), &test_config(49400))
        .await
        .unwrap();
    let addr = handle.addr();

    let reply = request(
        addr,
        "POST",
        "/share",
        Some(json!({"imageData": "data:image/png;base64,AAA", "isHotDog": true})),
    )
    .await;
    assert_eq!(reply.status, 200);
    let published: Value = serde_json::from_str(&reply.body).unwrap();
    let id = published["id"].as_str().unwrap().to_string();
    assert_eq!(
        published["shareUrl"],
        format!("http://{}/share/{}", addr, id)
    );

    let reply = request(addr, "GET", &format!("/share?id={}", id), None).await;
    assert_eq!(reply.status, 200);
    let record: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(record["imageData"], "data:image/png;base64,AAA");
    assert_eq!(record["isHotDog"], true);
    assert!(record["createdAt"].is_i64());

    clock.advance(default_ttl() + Duration::milliseconds(1));

    let reply = request(addr, "GET", &format!("/share?id={}", id), None).await;
    assert_eq!(reply.status, 404);
    let error: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(error["error"], "Share not found or expired");

    let reply = request(
        addr,
        "POST",
        "/share",
        Some(json!({"imageData": "data:image/png;base64,BBB", "isHotDog": false})),
    )
    .await;
    assert_eq!(reply.status, 200);
    assert_eq!(state.store.len(), 1);

    handle.stop().await;
}

#[tokio::test]
async fn test_missing_image_over_http() {
    let state = Arc::new(AppState::new(ShareStore::default()).unwrap());
    let handle = start_server_with_state(state, &test_config(49500))
        .await
        .unwrap();

    let reply = request(
        handle.addr(),
        "POST",
        "/api/share",
        Some(json!({"isHotDog": true})),
    )
    .await;
    assert_eq!(reply.status, 400);
    let error: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(error["error"], "Image data is required");

    handle.stop().await;
}

#[tokio::test]
async fn test_preview_card_never_fails() {
    let state = Arc::new(AppState::new(ShareStore::default()).unwrap());
    let handle = start_server_with_state(state, &test_config(49600))
        .await
        .unwrap();

    let reply = request(
        handle.addr(),
        "GET",
        "/share/0123456789abcdef0123456789abcdef/opengraph-image",
        None,
    )
    .await;
    assert_eq!(reply.status, 200);
    assert!(reply.head.contains("content-type: image/png"));
    assert!(reply.body.contains("PNG"));

    handle.stop().await;
}

#[tokio::test]
async fn test_longest_ttl_keeps_fresh_share() {
    let clock = Arc::new(ManualClock::default());
    let store = ShareStore::new(clock.clone(), ttl_from_secs(MAX_TTL_SECS).unwrap());
    let state = Arc::new(AppState::new(store).unwrap());
    let handle = start_server_with_state(state, &test_config(49700))
        .await
        .unwrap();

    let reply = request(
        handle.addr(),
        "POST",
        "/share",
        Some(json!({ "imageData": "data:image/png;base64,AAA", "isHotDog": true })),
    )
    .await;
    assert_eq!(reply.status, 200);
    let id = serde_json::from_str::<Value>(&reply.body).unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    clock.advance(Duration::days(364));
    let reply = request(handle.addr(), "GET", &format!("/share?id={}", id), None).await;
    assert_eq!(reply.status, 200);

    handle.stop().await;
}

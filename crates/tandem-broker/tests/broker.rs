//! Integration tests for the broker: real sockets, raw WebSocket clients.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tandem_broker::Broker;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Starts a broker on an ephemeral port and returns its `ws://` URL.
async fn start_broker() -> String {
    let broker = Broker::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("broker should bind");
    let addr = broker.local_addr().expect("should have local addr");
    tokio::spawn(broker.run());
    format!("ws://{addr}/ws")
}

async fn send(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send should succeed");
}

/// Reads the next text frame as JSON.
async fn recv(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("broker sent invalid JSON");
        }
    }
}

/// Reads frames until one matches `pred`.
async fn recv_until(ws: &mut Client, pred: impl Fn(&Value) -> bool) -> Value {
    loop {
        let value = recv(ws).await;
        if pred(&value) {
            return value;
        }
    }
}

/// Connects and waits until the broker has registered us, by announcing
/// a cursor and waiting for its echo.
async fn join(url: &str, ip: &str) -> Client {
    let (mut ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("should connect");
    send(&mut ws, json!({"type": "cursor", "x": 0, "y": 0, "ip": ip})).await;
    recv_until(&mut ws, |v| v["type"] == "cursor" && v["ip"] == ip).await;
    ws
}

#[tokio::test]
async fn test_fan_out_reaches_everyone_including_sender() {
    let url = start_broker().await;
    let mut alice = join(&url, "10.0.0.1").await;
    let mut bob = join(&url, "10.0.0.2").await;

    let chat = json!({"type": "message", "text": "hi", "user": "alice"});
    send(&mut alice, chat.clone()).await;

    let at_bob = recv_until(&mut bob, |v| v["type"] == "message").await;
    let at_alice = recv_until(&mut alice, |v| v["type"] == "message").await;
    assert_eq!(at_bob, chat);
    assert_eq!(at_alice, chat);
}

#[tokio::test]
async fn test_invalid_frames_are_not_forwarded() {
    let url = start_broker().await;
    let mut alice = join(&url, "10.0.0.1").await;
    let mut bob = join(&url, "10.0.0.2").await;

    alice
        .send(Message::Text("not json".into()))
        .await
        .unwrap();
    send(&mut alice, json!({"type": "teleport", "ip": "10.0.0.1"})).await;
    send(&mut alice, json!({"type": "cursor", "x": -1, "y": 0, "ip": "10.0.0.1"})).await;
    send(&mut alice, json!({"type": "message", "text": "after", "user": "alice"})).await;

    // The first non-cursor frame bob sees is the valid chat.
    let next = recv_until(&mut bob, |v| v["type"] != "cursor").await;
    assert_eq!(next["type"], "message");
    assert_eq!(next["text"], "after");

    // The broker did not hang up on alice either.
    send(&mut alice, json!({"type": "message", "text": "still here", "user": "alice"})).await;
    let next = recv_until(&mut bob, |v| v["type"] == "message").await;
    assert_eq!(next["text"], "still here");
}

#[tokio::test]
async fn test_disconnect_announces_claimed_identity() {
    let url = start_broker().await;
    let alice = join(&url, "10.0.0.1").await;
    let mut bob = join(&url, "10.0.0.2").await;

    drop(alice);

    let gone = recv_until(&mut bob, |v| v["type"] == "disconnected").await;
    assert_eq!(gone, json!({"type": "disconnected", "ip": "10.0.0.1"}));
}

#[tokio::test]
async fn test_disconnect_without_claim_uses_peer_address() {
    let url = start_broker().await;
    let mut bob = join(&url, "10.0.0.2").await;

    let (mut silent, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .expect("should connect");
    // Give the broker a moment to register the silent connection.
    tokio::time::sleep(Duration::from_millis(50)).await;
    silent.close(None).await.unwrap();

    let gone = recv_until(&mut bob, |v| v["type"] == "disconnected").await;
    let ip = gone["ip"].as_str().expect("ip should be a string");
    assert!(ip.starts_with("127.0.0.1:"), "unexpected fallback identity {ip}");
}

#[tokio::test]
async fn test_silent_socket_does_not_block_new_joins() {
    let url = start_broker().await;
    let addr = url.trim_start_matches("ws://").trim_end_matches("/ws");

    // Connects at the TCP level and never sends the upgrade request.
    let _silent = TcpStream::connect(addr).await.expect("tcp connect");

    let joined = tokio::time::timeout(Duration::from_secs(3), join(&url, "10.0.0.1")).await;
    assert!(joined.is_ok(), "a silent socket held up the accept loop");
}

#[tokio::test]
async fn test_silent_socket_is_dropped_after_handshake_timeout() {
    let broker = Broker::builder()
        .bind("127.0.0.1:0")
        .handshake_timeout(Duration::from_millis(200))
        .build()
        .await
        .expect("broker should bind");
    let addr = broker.local_addr().expect("should have local addr");
    tokio::spawn(broker.run());

    let mut silent = TcpStream::connect(addr).await.expect("tcp connect");
    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(3), silent.read(&mut buf))
        .await
        .expect("broker never hung up on the silent socket");
    // EOF or a reset both mean the broker let go of it.
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[tokio::test]
async fn test_latest_claim_wins() {
    let url = start_broker().await;
    let mut alice = join(&url, "10.0.0.1").await;
    let mut bob = join(&url, "10.0.0.2").await;

    send(&mut alice, json!({"type": "cursor", "x": 1, "y": 1, "ip": "10.0.0.9"})).await;
    recv_until(&mut bob, |v| v["ip"] == "10.0.0.9").await;
    drop(alice);

    let gone = recv_until(&mut bob, |v| v["type"] == "disconnected").await;
    assert_eq!(gone["ip"], "10.0.0.9");
}

//! Relay behaviour over real WebSocket connections on a loopback listener.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use room_relay::{handle_connection, ChatServer, MemoryStore, MessageStore, RoomRegistry};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bind an ephemeral port and serve connections until the test ends
async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let store: Arc<dyn MessageStore> = Arc::new(MemoryStore::new());
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    tokio::spawn(ChatServer::with_registry(cmd_rx, RoomRegistry::new()).run());

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let cmd_tx = cmd_tx.clone();
            let store = store.clone();
            tokio::spawn(async move {
                let _ = handle_connection(stream, cmd_tx, store, 64).await;
            });
        }
    });

    format!("ws://{addr}")
}

async fn next_event(ws: &mut Socket) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send_event(ws: &mut Socket, event: Value) {
    ws.send(Message::Text(event.to_string().into())).await.unwrap();
}

/// Connect and consume the greeting, returning the issued participant id
async fn connect(url: &str) -> (Socket, String) {
    let (mut ws, _) = connect_async(url).await.unwrap();
    let greeting = next_event(&mut ws).await;
    assert_eq!(greeting["event"], "connected");
    let id = greeting["data"]["participantId"]
        .as_str()
        .expect("participantId is a string")
        .to_string();
    (ws, id)
}

async fn join(ws: &mut Socket, room: &str) {
    send_event(ws, json!({"event": "joinRoom", "data": {"room": room}})).await;
}

#[tokio::test]
async fn greeting_arrives_first() {
    let url = start_relay().await;
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

    let greeting = next_event(&mut ws).await;
    assert_eq!(greeting["event"], "connected");
    assert!(!greeting["data"]["participantId"]
        .as_str()
        .unwrap_or_default()
        .is_empty());
}

#[tokio::test]
async fn invalid_frame_is_ignored_and_join_still_works() {
    let url = start_relay().await;
    let (mut ws, _) = connect(&url).await;

    ws.send(Message::Text("this is not json".into())).await.unwrap();
    send_event(&mut ws, json!({"event": "joinRoom", "data": "lobby"})).await;
    join(&mut ws, "lobby").await;

    let welcome = next_event(&mut ws).await;
    assert_eq!(welcome["event"], "message");
    assert_eq!(welcome["data"]["authorId"], "system");
    assert_eq!(welcome["data"]["message"], "Welcome to lobby!");

    let history = next_event(&mut ws).await;
    assert_eq!(history["event"], "chatHistory");
    assert_eq!(history["data"], json!([]));

    let users = next_event(&mut ws).await;
    assert_eq!(users, json!({"event": "roomUsers", "data": {"count": 1}}));
}

#[tokio::test]
async fn chat_reaches_every_member() {
    let url = start_relay().await;
    let (mut a, a_id) = connect(&url).await;
    let (mut b, _) = connect(&url).await;

    join(&mut a, "lobby").await;
    for _ in 0..3 {
        next_event(&mut a).await;
    }
    join(&mut b, "lobby").await;
    for _ in 0..3 {
        next_event(&mut b).await;
    }
    // join notice and count on a
    next_event(&mut a).await;
    next_event(&mut a).await;

    send_event(
        &mut a,
        json!({"event": "chatMessage", "data": {"room": "lobby", "message": "hi"}}),
    )
    .await;

    for ws in [&mut a, &mut b] {
        let msg = next_event(ws).await;
        assert_eq!(msg["event"], "message");
        assert_eq!(msg["data"]["authorId"], a_id.as_str());
        assert_eq!(msg["data"]["message"], "hi");
        assert!(msg["data"]["replyTo"].is_null());
    }
}

#[tokio::test]
async fn dropped_connection_notifies_room() {
    let url = start_relay().await;
    let (mut a, _) = connect(&url).await;
    let (mut b, b_id) = connect(&url).await;

    join(&mut a, "lobby").await;
    for _ in 0..3 {
        next_event(&mut a).await;
    }
    join(&mut b, "lobby").await;
    for _ in 0..3 {
        next_event(&mut b).await;
    }

    let joined = next_event(&mut a).await;
    assert_eq!(joined["data"]["message"], format!("{b_id} has joined the chat"));
    let users = next_event(&mut a).await;
    assert_eq!(users["data"]["count"], 2);

    drop(b);

    let left = next_event(&mut a).await;
    assert_eq!(left["event"], "message");
    assert_eq!(left["data"]["message"], format!("{b_id} has left the chat"));
    let users = next_event(&mut a).await;
    assert_eq!(users, json!({"event": "roomUsers", "data": {"count": 1}}));
}

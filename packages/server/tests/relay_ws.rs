//! End-to-end tests: serve the relay on an ephemeral port and drive it with
//! WebSocket and HTTP clients.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tsudoi_server::{
    infrastructure::{StorageBackend, fixtures::Fixtures},
    ui::{AppState, Server},
};
use tsudoi_shared::time::{JST_OFFSET_MINUTES, SystemClock};

const FIXTURES: &str = r#"{
    "users": [
        { "id": "alice", "fullName": "Alice", "token": "token-alice" },
        { "id": "bob", "fullName": "Bob", "token": "token-bob" },
        { "id": "carol", "fullName": "Carol", "token": "token-carol" },
        { "id": "mallory", "fullName": "Mallory", "token": "token-mallory", "blocked": true }
    ],
    "rooms": [
        { "id": "R1", "members": ["alice", "bob"] }
    ]
}"#;

/// Start a relay with in-memory storage seeded from `FIXTURES`
async fn start_server() -> SocketAddr {
    let storage = StorageBackend::in_memory();
    Fixtures::from_json(FIXTURES)
        .unwrap()
        .apply(storage.seed.as_ref())
        .await
        .unwrap();
    let state = AppState::new(&storage, Arc::new(SystemClock), JST_OFFSET_MINUTES);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Server::new(state).serve(listener, std::future::pending()));
    addr
}

/// Helper struct wrapping one WebSocket client
struct TestClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    socket_id: String,
}

impl TestClient {
    async fn connect(addr: SocketAddr, token: Option<&str>) -> Self {
        let url = match token {
            Some(token) => format!("ws://{}/ws?token={}", addr, token),
            None => format!("ws://{}/ws", addr),
        };
        let (socket, _) = connect_async(url).await.expect("Failed to connect");
        let mut client = Self {
            socket,
            socket_id: String::new(),
        };
        let connected = client.expect_event("connected").await;
        client.socket_id = connected["socketId"].as_str().unwrap().to_string();
        client
    }

    async fn send(&mut self, event: &str, data: Value) {
        let frame = json!({ "event": event, "data": data }).to_string();
        self.socket.send(Message::Text(frame.into())).await.unwrap();
    }

    async fn send_raw(&mut self, frame: &str) {
        self.socket
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    /// Next JSON event, or panic after 2 seconds
    async fn next_event(&mut self) -> Value {
        let frame = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match self.socket.next().await {
                    Some(Ok(Message::Text(text))) => return text.to_string(),
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended: {:?}", other),
                }
            }
        })
        .await
        .expect("Timed out waiting for an event");
        serde_json::from_str(&frame).unwrap()
    }

    /// Next event must be `name`; returns its data
    async fn expect_event(&mut self, name: &str) -> Value {
        let event = self.next_event().await;
        assert_eq!(event["event"], name, "unexpected event: {}", event);
        event["data"].clone()
    }

    async fn expect_silence(&mut self) {
        let result = tokio::time::timeout(Duration::from_millis(200), self.socket.next()).await;
        assert!(result.is_err(), "unexpected frame: {:?}", result);
    }

    async fn join(&mut self, room_id: &str) {
        self.send("join-room", json!({ "roomId": room_id })).await;
        let data = self.expect_event("room-joined").await;
        assert_eq!(data["roomId"], room_id);
    }

    async fn say(&mut self, room_id: &str, text: &str) {
        self.send(
            "send-message",
            json!({ "roomId": room_id, "message": { "text": text } }),
        )
        .await;
    }

    /// Join the video call; returns the peers already in it
    async fn video_join(&mut self, room_id: &str) -> Vec<String> {
        self.send("video-join-room", json!({ "roomId": room_id })).await;
        let data = self.expect_event("video-room-joined").await;
        assert_eq!(data["roomId"], room_id);
        data["peers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|peer| peer.as_str().unwrap().to_string())
            .collect()
    }

    async fn close(mut self) {
        self.socket.close(None).await.unwrap();
    }
}

#[tokio::test]
async fn test_chat_message_reaches_sender_and_peer_with_verified_author() {
    // テスト項目: A の発言が A と B に 1 回ずつ届き、発言者は自己申告ではなく認証済みユーザーになる
    // given (前提条件):
    let addr = start_server().await;
    let mut alice = TestClient::connect(addr, Some("token-alice")).await;
    let mut bob = TestClient::connect(addr, Some("token-bob")).await;
    alice.join("R1").await;
    bob.join("R1").await;

    // when (操作):
    alice
        .send(
            "send-message",
            json!({
                "roomId": "R1",
                "message": { "text": "hi", "userId": "bob", "user": { "id": "bob", "fullName": "Bob" } }
            }),
        )
        .await;

    // then (期待する結果):
    for client in [&mut alice, &mut bob] {
        let data = client.expect_event("receive-message").await;
        assert_eq!(data["text"], "hi");
        assert_eq!(data["user"]["id"], "alice");
        assert_eq!(data["user"]["fullName"], "Alice");
        assert_eq!(data["time"].as_str().unwrap().len(), 5);
        client.expect_silence().await;
    }
}

#[tokio::test]
async fn test_non_member_cannot_join_or_receive() {
    // テスト項目: メンバーでないユーザーの join は拒否され、以後のブロードキャストも届かない
    // given (前提条件):
    let addr = start_server().await;
    let mut alice = TestClient::connect(addr, Some("token-alice")).await;
    let mut carol = TestClient::connect(addr, Some("token-carol")).await;
    alice.join("R1").await;

    // when (操作):
    carol.send("join-room", json!({ "roomId": "R1" })).await;
    let rejected = carol.expect_event("error").await;
    alice.say("R1", "members only").await;

    // then (期待する結果):
    assert_eq!(rejected["code"], "not-a-member");
    assert_eq!(rejected["source"], "join-room");
    assert_eq!(rejected["roomId"], "R1");
    alice.expect_event("receive-message").await;
    carol.expect_silence().await;
}

#[tokio::test]
async fn test_send_without_join_is_rejected() {
    // テスト項目: join していないルームへの送信は not-in-room で拒否される
    // given (前提条件):
    let addr = start_server().await;
    let mut alice = TestClient::connect(addr, Some("token-alice")).await;

    // when (操作):
    alice.say("R1", "hello?").await;

    // then (期待する結果):
    let rejected = alice.expect_event("error").await;
    assert_eq!(rejected["code"], "not-in-room");
}

#[tokio::test]
async fn test_video_offer_reaches_only_the_other_peer() {
    // テスト項目: 2 人のビデオ通話で offer は相手にだけ、送信者 ID 付きで届く
    // given (前提条件):
    let addr = start_server().await;
    let mut alice = TestClient::connect(addr, Some("token-alice")).await;
    let mut bob = TestClient::connect(addr, Some("token-bob")).await;
    assert!(alice.video_join("R1").await.is_empty());
    assert_eq!(bob.video_join("R1").await, vec![alice.socket_id.clone()]);
    let joined = alice.expect_event("video-user-joined").await;
    assert_eq!(joined["socketId"], bob.socket_id);

    // when (操作):
    let offer = json!({ "type": "offer", "sdp": "v=0" });
    alice
        .send("video-offer", json!({ "roomId": "R1", "offer": offer }))
        .await;

    // then (期待する結果):
    let relayed = bob.expect_event("video-offer").await;
    assert_eq!(relayed["offer"], offer);
    assert_eq!(relayed["sender"], alice.socket_id);
    alice.expect_silence().await;
}

#[tokio::test]
async fn test_disconnect_stops_delivery_and_notifies_video_peers() {
    // テスト項目: 切断した接続はグループから消え、ビデオ通話の相手に退出が通知される
    // given (前提条件):
    let addr = start_server().await;
    let mut alice = TestClient::connect(addr, Some("token-alice")).await;
    let mut bob = TestClient::connect(addr, Some("token-bob")).await;
    alice.join("R1").await;
    bob.join("R1").await;
    alice.video_join("R1").await;
    bob.video_join("R1").await;
    alice.expect_event("video-user-joined").await;
    let bob_id = bob.socket_id.clone();

    // when (操作):
    bob.close().await;

    // then (期待する結果):
    let left = alice.expect_event("video-user-left").await;
    assert_eq!(left["socketId"], bob_id);
    let overview: Value = reqwest::get(format!("http://{}/debug/rooms", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(overview["connections"], 1);
    assert_eq!(overview["chat"][0]["connections"], 1);
    alice.say("R1", "still here").await;
    alice.expect_event("receive-message").await;
}

#[tokio::test]
async fn test_mark_seen_and_unread_count_over_http() {
    // テスト項目: A の 3 件を B が既読にすると未読 0、さらに 1 件で未読 1
    // given (前提条件):
    let addr = start_server().await;
    let http = reqwest::Client::new();
    let mut alice = TestClient::connect(addr, Some("token-alice")).await;
    alice.join("R1").await;
    for text in ["one", "two", "three"] {
        alice.say("R1", text).await;
        alice.expect_event("receive-message").await;
    }

    // when (操作):
    let seen: Value = http
        .patch(format!("http://{}/chat/seen/R1", addr))
        .bearer_auth("token-bob")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let unread_after_seen: Value = http
        .get(format!("http://{}/chat/unread/R1", addr))
        .bearer_auth("token-bob")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    alice.say("R1", "four").await;
    alice.expect_event("receive-message").await;
    let unread_after_new: Value = http
        .get(format!("http://{}/chat/unread/R1", addr))
        .bearer_auth("token-bob")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let history: Vec<Value> = http
        .get(format!("http://{}/chat/R1", addr))
        .bearer_auth("token-bob")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(seen["updated"], 3);
    assert_eq!(unread_after_seen["count"], 0);
    assert_eq!(unread_after_new["count"], 1);
    let texts: Vec<&str> = history.iter().map(|m| m["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["one", "two", "three", "four"]);
    assert_eq!(history[0]["seen"], true);
    assert_eq!(history[3]["seen"], false);
    assert_eq!(history[0]["userId"], "alice");
}

#[tokio::test]
async fn test_http_api_requires_token_and_membership() {
    // テスト項目: トークンなしは 401、ブロック済みとメンバー外は 403
    // given (前提条件):
    let addr = start_server().await;
    let http = reqwest::Client::new();
    let url = format!("http://{}/chat/R1", addr);

    // when (操作):
    let anonymous = http.get(&url).send().await.unwrap().status();
    let invalid = http
        .get(&url)
        .bearer_auth("nope")
        .send()
        .await
        .unwrap()
        .status();
    let outsider = http
        .get(&url)
        .bearer_auth("token-carol")
        .send()
        .await
        .unwrap()
        .status();
    let blocked = http
        .get(&url)
        .bearer_auth("token-mallory")
        .send()
        .await
        .unwrap()
        .status();

    // then (期待する結果):
    assert_eq!(anonymous, reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(invalid, reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(outsider, reqwest::StatusCode::FORBIDDEN);
    assert_eq!(blocked, reqwest::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_websocket_upgrade_rejects_bad_tokens() {
    // テスト項目: 不正なトークンは 401、ブロック済みユーザーは 403 でアップグレードが拒否される
    // given (前提条件):
    let addr = start_server().await;

    // when (操作):
    let invalid = connect_async(format!("ws://{}/ws?token=nope", addr)).await;
    let blocked = connect_async(format!("ws://{}/ws?token=token-mallory", addr)).await;

    // then (期待する結果):
    for (result, expected) in [(invalid, 401), (blocked, 403)] {
        match result {
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                assert_eq!(response.status().as_u16(), expected);
            }
            other => panic!("expected HTTP rejection, got {:?}", other.map(|_| ())),
        }
    }
}

#[tokio::test]
async fn test_late_authentication_enables_join() {
    // テスト項目: トークンなしで接続した後、authenticate すると join できる
    // given (前提条件):
    let addr = start_server().await;
    let mut alice = TestClient::connect(addr, None).await;
    alice.send("join-room", json!({ "roomId": "R1" })).await;
    let rejected = alice.expect_event("error").await;
    assert_eq!(rejected["code"], "not-authenticated");

    // when (操作):
    alice
        .send("authenticate", json!({ "token": "token-alice" }))
        .await;
    let authenticated = alice.expect_event("authenticated").await;

    // then (期待する結果):
    assert_eq!(authenticated["id"], "alice");
    alice.join("R1").await;
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    // テスト項目: 壊れたフレームには invalid-payload を返し、接続はそのまま使える
    // given (前提条件):
    let addr = start_server().await;
    let mut alice = TestClient::connect(addr, Some("token-alice")).await;

    // when (操作):
    alice.send_raw("not json").await;
    alice.send_raw(r#"{"event":"dance","data":{}}"#).await;

    // then (期待する結果):
    let first = alice.expect_event("error").await;
    let second = alice.expect_event("error").await;
    assert_eq!(first["code"], "invalid-payload");
    assert_eq!(second["code"], "invalid-payload");
    assert_eq!(second["source"], "dance");
    alice.join("R1").await;
}

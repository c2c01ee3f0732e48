//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    domain::{AuthError, ConnectionId, PusherChannel, VerifiedUser},
    infrastructure::dto::{
        conversion::rejection,
        websocket::{
            ClientEvent, ConnectedPayload, ErrorCode, ErrorPayload, PeerPayload,
            ReceiveMessagePayload, RelayedAnswer, RelayedCandidate, RelayedOffer, RoomPayload,
            ServerEvent, UserInfo, VideoRoomJoinedPayload,
        },
    },
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Bearer token; without it the connection starts unauthenticated
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = match query.token.as_deref() {
        None => None,
        Some(token) => match state.authenticate_usecase.verify(token).await {
            Ok(user) => Some(user),
            Err(AuthError::InvalidToken) => return Err(StatusCode::UNAUTHORIZED),
            Err(AuthError::Blocked(_)) => return Err(StatusCode::FORBIDDEN),
            Err(AuthError::Unavailable(_)) => return Err(StatusCode::SERVICE_UNAVAILABLE),
        },
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// Every outbound frame for this connection (broadcasts from other connections and
/// acknowledgements to this one) goes through the same channel, so their order is preserved.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: Option<VerifiedUser>) {
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    let user_id = user.as_ref().map(|user| user.id.as_str().to_string());
    let connection_id = state
        .connect_participant_usecase
        .execute(tx.clone(), user)
        .await;

    let session = Session {
        state: state.clone(),
        connection_id: connection_id.clone(),
        reply: tx,
    };
    session.reply(ServerEvent::Connected(ConnectedPayload {
        socket_id: connection_id.as_str().to_string(),
        user_id,
    }));

    let mut send_task = pusher_loop(rx, sender);

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => session.handle_text(text.as_str()).await,
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!(
                        "Connection '{}' requested close",
                        session.connection_id.as_str()
                    );
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    let left = ServerEvent::VideoUserLeft(PeerPayload {
        socket_id: connection_id.as_str().to_string(),
    })
    .to_json();
    if state
        .disconnect_participant_usecase
        .execute(&connection_id, &left)
        .await
        .is_none()
    {
        tracing::debug!(
            "Connection '{}' was already cleaned up",
            connection_id.as_str()
        );
    }
}

/// 1 本の WebSocket 接続の受信イベントを UseCase に振り分ける
struct Session {
    state: Arc<AppState>,
    connection_id: ConnectionId,
    reply: PusherChannel,
}

impl Session {
    /// 送信元の接続にだけ返す
    fn reply(&self, event: ServerEvent) {
        if self.reply.send(event.to_json()).is_err() {
            tracing::debug!(
                "Connection '{}' is closing, reply dropped",
                self.connection_id.as_str()
            );
        }
    }

    async fn handle_text(&self, text: &str) {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    "Invalid payload from '{}': {}",
                    self.connection_id.as_str(),
                    e
                );
                self.reply(ServerEvent::Error(ErrorPayload {
                    source: event_name(text),
                    room_id: None,
                    code: ErrorCode::InvalidPayload,
                    message: e.to_string(),
                }));
                return;
            }
        };

        let source = event.name();
        tracing::debug!("Received '{}' from '{}'", source, self.connection_id.as_str());

        match event {
            ClientEvent::Authenticate(payload) => {
                match self
                    .state
                    .authenticate_usecase
                    .attach(&self.connection_id, &payload.token)
                    .await
                {
                    Ok(user) => self.reply(ServerEvent::Authenticated(UserInfo::from(&user))),
                    Err(e) => self.reply(rejection(source, None, &e)),
                }
            }
            ClientEvent::JoinRoom(payload) => {
                match self
                    .state
                    .join_room_usecase
                    .join(&self.connection_id, payload.room_id.clone())
                    .await
                {
                    Ok(admission) => self.reply(ServerEvent::RoomJoined(RoomPayload {
                        room_id: admission.room_id.into_string(),
                    })),
                    Err(e) => self.reply(rejection(source, Some(&payload.room_id), &e)),
                }
            }
            ClientEvent::LeaveRoom(payload) => {
                match self
                    .state
                    .join_room_usecase
                    .leave(&self.connection_id, payload.room_id.clone())
                {
                    Ok(_) => self.reply(ServerEvent::RoomLeft(payload)),
                    Err(e) => self.reply(rejection(source, Some(&payload.room_id), &e)),
                }
            }
            ClientEvent::SendMessage(payload) => {
                let offset = self.state.display_offset_minutes;
                let result = self
                    .state
                    .send_message_usecase
                    .execute(
                        &self.connection_id,
                        payload.room_id.clone(),
                        payload.message.text,
                        |message| {
                            ServerEvent::ReceiveMessage(ReceiveMessagePayload::from_domain(
                                message, offset,
                            ))
                            .to_json()
                        },
                    )
                    .await;
                if let Err(e) = result {
                    self.reply(rejection(source, Some(&payload.room_id), &e));
                }
            }
            ClientEvent::VideoJoinRoom(payload) => {
                let announcement = ServerEvent::VideoUserJoined(self.peer()).to_json();
                match self
                    .state
                    .signaling_usecase
                    .join(&self.connection_id, payload.room_id.clone(), &announcement)
                    .await
                {
                    Ok(joined) => self.reply(ServerEvent::VideoRoomJoined(VideoRoomJoinedPayload {
                        room_id: joined.admission.room_id.into_string(),
                        peers: joined.peers.into_iter().map(ConnectionId::into_string).collect(),
                    })),
                    Err(e) => self.reply(rejection(source, Some(&payload.room_id), &e)),
                }
            }
            ClientEvent::VideoLeaveRoom(payload) => {
                let announcement = ServerEvent::VideoUserLeft(self.peer()).to_json();
                match self
                    .state
                    .signaling_usecase
                    .leave(&self.connection_id, payload.room_id.clone(), &announcement)
                    .await
                {
                    Ok(_) => self.reply(ServerEvent::VideoRoomLeft(payload)),
                    Err(e) => self.reply(rejection(source, Some(&payload.room_id), &e)),
                }
            }
            ClientEvent::VideoOffer(payload) => {
                let relayed = ServerEvent::VideoOffer(RelayedOffer {
                    offer: payload.offer,
                    sender: self.connection_id.as_str().to_string(),
                });
                self.relay(source, payload.room_id, payload.to, relayed).await;
            }
            ClientEvent::VideoAnswer(payload) => {
                let relayed = ServerEvent::VideoAnswer(RelayedAnswer {
                    answer: payload.answer,
                    sender: self.connection_id.as_str().to_string(),
                });
                self.relay(source, payload.room_id, payload.to, relayed).await;
            }
            ClientEvent::VideoIceCandidate(payload) => {
                let relayed = ServerEvent::VideoIceCandidate(RelayedCandidate {
                    candidate: payload.candidate,
                    sender: self.connection_id.as_str().to_string(),
                });
                self.relay(source, payload.room_id, payload.to, relayed).await;
            }
        }
    }

    async fn relay(&self, source: &str, room_id: String, to: Option<String>, event: ServerEvent) {
        if let Err(e) = self
            .state
            .signaling_usecase
            .relay(&self.connection_id, room_id.clone(), to, &event.to_json())
            .await
        {
            self.reply(rejection(source, Some(&room_id), &e));
        }
    }

    fn peer(&self) -> PeerPayload {
        PeerPayload {
            socket_id: self.connection_id.as_str().to_string(),
        }
    }
}

/// 壊れたペイロードでも `event` フィールドが読めれば否定応答の `source` に使う
fn event_name(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|value| value.get("event")?.as_str().map(str::to_string))
        .unwrap_or_default()
}

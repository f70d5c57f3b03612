//! WebSocket connection handlers for both transports.
//!
//! - `/ws/{room_id}`: the room is in the path and the token in the query string
//!   (or an `Authorization: Bearer` header). The connection is admitted before
//!   the upgrade, so refusals are plain HTTP errors.
//! - `/socket`: the first text frame is an auth handshake
//!   `{"auth": {"token", "room_id" | "session_id", "user_entity_id"?}}`.
//!   Refusals are sent as a `connect_error` event followed by a policy close.
//!
//! After admission both transports run the same [`run_session`] loop.

use std::sync::Arc;

use axum::{
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};

use crate::{
    domain::{AccessError, FrameError, InboundMessage, RoomKind, ServerEvent},
    infrastructure::{
        codec::{EventCodec, FrameCodec, PlainCodec},
        dto::websocket::HandshakeDto,
    },
    ui::state::AppState,
    usecase::{Admission, ConnectRequest, Session, SessionGateway},
};

use super::{bearer_token, header_claim, refusal_response};

type SocketSink = SplitSink<WebSocket, Message>;
type SocketStream = SplitStream<WebSocket>;

/// Query parameters of the path transport
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
    pub user_entity_id: Option<String>,
}

pub async fn room_socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Response {
    let request = ConnectRequest {
        room_id,
        token: query
            .token
            .or_else(|| bearer_token(&headers))
            .unwrap_or_default(),
        claimed_entity_id: query.user_entity_id.or_else(|| header_claim(&headers)),
    };

    // 接続前に認証・認可（拒否された接続はアップグレードしない）
    let admission = match state.gateway.admit(&request).await {
        Ok(admission) => admission,
        Err(e) => return refusal_response(&e),
    };

    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| async move {
        let (sender, receiver) = socket.split();
        run_session(sender, receiver, gateway, Arc::new(PlainCodec), admission).await;
    })
}

pub async fn handshake_socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_handshake(socket, state))
}

async fn handle_handshake(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let codec = EventCodec;

    let request = match tokio::time::timeout(state.handshake_timeout, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => parse_handshake(text.as_str()),
        Ok(_) => Err(AccessError::Unauthenticated(
            "Authentication handshake required".to_string(),
        )),
        Err(_) => Err(AccessError::Unauthenticated(
            "Authentication handshake timed out".to_string(),
        )),
    };

    let admission = match request {
        Ok(request) => state.gateway.admit(&request).await,
        Err(e) => {
            tracing::warn!("Rejected handshake: {}", e);
            Err(e)
        }
    };

    match admission {
        Ok(admission) => {
            run_session(sender, receiver, state.gateway.clone(), Arc::new(codec), admission).await;
        }
        Err(e) => {
            let refusal = e.refusal();
            match codec.encode_refusal(&refusal) {
                Ok(json) => {
                    let _ = sender.send(Message::Text(json.into())).await;
                }
                Err(e) => tracing::error!("Failed to encode refusal: {}", e),
            }
            let close = CloseFrame {
                code: close_code::POLICY,
                reason: refusal.code.to_string().into(),
            };
            let _ = sender.send(Message::Close(Some(close))).await;
        }
    }
}

fn parse_handshake(text: &str) -> Result<ConnectRequest, AccessError> {
    let handshake: HandshakeDto = serde_json::from_str(text).map_err(|e| {
        tracing::debug!("Malformed handshake: {}", e);
        AccessError::Unauthenticated("Malformed authentication handshake".to_string())
    })?;
    let auth = handshake.auth;

    Ok(ConnectRequest {
        room_id: auth.target_room().unwrap_or_default().to_string(),
        token: auth.token,
        claimed_entity_id: auth.user_entity_id,
    })
}

/// Drains this connection's channel into the socket.
///
/// Ends when the channel closes (the connection was evicted or the registry was
/// drained) or when the socket can no longer be written.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    mut sender: SocketSink,
    codec: Arc<dyn FrameCodec>,
    kind: RoomKind,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match codec.encode(kind, &event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to encode event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    })
}

/// Reads frames off the socket and forwards the decoded ones in arrival order.
fn reader_loop(
    mut receiver: SocketStream,
    inbound: mpsc::UnboundedSender<Result<InboundMessage, FrameError>>,
    codec: Arc<dyn FrameCodec>,
    kind: RoomKind,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error: {}", e);
                    break;
                }
            };

            let frame = match msg {
                Message::Text(text) => match codec.decode(kind, text.as_str()) {
                    Ok(Some(message)) => Ok(message),
                    Ok(None) => continue,
                    Err(e) => Err(e),
                },
                Message::Binary(_) => Err(FrameError::Malformed(
                    "binary frames are not supported".to_string(),
                )),
                Message::Close(_) => break,
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => continue,
            };
            if inbound.send(frame).is_err() {
                break;
            }
        }
    })
}

/// Handles decoded frames in arrival order.
///
/// Once the socket has closed, chat and end-session frames already received are
/// still handled, while utterances are dropped and an in-flight generation is
/// cancelled: nobody is left to read the reply.
async fn process_loop(
    mut inbound: mpsc::UnboundedReceiver<Result<InboundMessage, FrameError>>,
    gateway: Arc<SessionGateway>,
    session: Session,
    mut closed: watch::Receiver<bool>,
) {
    while let Some(frame) = inbound.recv().await {
        match frame {
            Ok(message @ InboundMessage::Utterance(_)) => {
                if *closed.borrow() {
                    tracing::debug!(
                        "Dropping utterance from closed connection '{}'",
                        session.connection_id
                    );
                    continue;
                }
                tokio::select! {
                    _ = gateway.handle(&session, message) => {}
                    _ = closed.wait_for(|closed| *closed) => {
                        tracing::debug!(
                            "Connection '{}' closed during generation",
                            session.connection_id
                        );
                    }
                }
            }
            Ok(message) => gateway.handle(&session, message).await,
            Err(e) => gateway.reject_frame(&session, e).await,
        }
    }
}

async fn run_session(
    sender: SocketSink,
    receiver: SocketStream,
    gateway: Arc<SessionGateway>,
    codec: Arc<dyn FrameCodec>,
    admission: Admission,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = gateway.join(admission, tx).await;
    let kind = session.room.kind;

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let mut recv_task = reader_loop(receiver, inbound_tx, codec.clone(), kind);
    let mut send_task = pusher_loop(rx, sender, codec, kind);

    // ソケットが閉じたことを処理タスクに知らせる
    let (closed_tx, closed_rx) = watch::channel(false);

    // 受信したフレームは 1 つずつ処理する（同じ接続からの発話は直列化される）
    let mut process_task = {
        let gateway = gateway.clone();
        let session = session.clone();
        tokio::spawn(process_loop(inbound_rx, gateway, session, closed_rx))
    };

    tokio::select! {
        _ = &mut recv_task => {
            // 受信済みのフレームを処理し終えてから送信を止める
            let _ = closed_tx.send(true);
            let _ = (&mut process_task).await;
            send_task.abort();
        }
        _ = &mut send_task => {
            recv_task.abort();
            process_task.abort();
        }
        _ = &mut process_task => {
            recv_task.abort();
            send_task.abort();
        }
    };

    gateway.disconnect(session).await;
}

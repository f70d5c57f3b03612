//! In-process test server shared by the integration tests.
#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

use clinic_relay_server::{
    domain::{AccessPolicy, EntityResolver, RelationshipGraph},
    infrastructure::{
        auth::JwtAuthVerifier, generator::ScriptedGenerator, message_pusher::ConnectionRegistry,
        seed::SeedData,
    },
    ui::Server,
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, EndSessionUseCase,
        GetRoomsUseCase, InterviewService, InterviewSettings, SendMessageUseCase, SessionGateway,
    },
};
use clinic_relay_shared::time::SystemClock;

pub const SECRET: &str = "integration-secret";

pub type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const SEED: &str = r#"{
    "users": [
        { "id": "u-pat", "role": "patient" },
        { "id": "u-doc", "role": "doctor", "profile_id": "d1" },
        { "id": "u-doc2", "role": "doctor", "profile_id": "d2" }
    ],
    "chats": [{ "id": "chat-1", "doctor_id": "d1", "patient_id": "p1" }],
    "ai_sessions": [{ "id": "session-1", "chat_id": "chat-1" }],
    "edges": [
        { "id": "e1", "from": { "kind": "user", "id": "u-pat" },
          "to": { "kind": "patient", "id": "p1" }, "label": "self" },
        { "id": "e2", "from": { "kind": "doctor", "id": "d1" },
          "to": { "kind": "patient", "id": "p1" } }
    ]
}"#;

/// Server bound to an ephemeral port; shut down on drop
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let seed: SeedData = serde_json::from_str(SEED).unwrap();
        let stores = seed.into_stores();
        let graph = RelationshipGraph::new(stores.relationships.clone());
        let registry = Arc::new(ConnectionRegistry::new());
        let interviews = Arc::new(InterviewService::new(
            Arc::new(ScriptedGenerator::new()),
            InterviewSettings::default(),
        ));

        let gateway = Arc::new(SessionGateway::new(
            Arc::new(ConnectParticipantUseCase::new(
                Arc::new(JwtAuthVerifier::new(SECRET, stores.users.clone())),
                EntityResolver::new(graph.clone()),
                AccessPolicy::new(graph),
                stores.rooms.clone(),
                stores.turns.clone(),
                registry.clone(),
            )),
            Arc::new(SendMessageUseCase::new(
                stores.rooms.clone(),
                stores.turns.clone(),
                registry.clone(),
                interviews.clone(),
                Arc::new(SystemClock),
            )),
            Arc::new(EndSessionUseCase::new(
                stores.rooms.clone(),
                interviews,
                registry.clone(),
            )),
            Arc::new(DisconnectParticipantUseCase::new(registry.clone())),
            registry.clone(),
        ));
        let server = Server::new(
            gateway,
            Arc::new(GetRoomsUseCase::new(registry.clone())),
            registry,
        )
        .with_handshake_timeout(Duration::from_secs(2));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async {
            let _ = signal.await;
        }));

        Self {
            addr,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop accepting connections and drain every room
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// HS256 access token for `user_id`
pub fn token(user_id: &str) -> String {
    let claims = json!({
        "sub": user_id,
        "type": "access",
        "exp": 4_102_444_800u64,
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn connect(url: &str) -> Client {
    let (client, _) = connect_async(url).await.unwrap();
    client
}

pub async fn send_json(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

/// Next message of any kind, or `None` when the stream ended
pub async fn next_message(client: &mut Client) -> Option<Message> {
    tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for a frame")
        .map(|msg| msg.unwrap())
}

/// Next text frame parsed as JSON
pub async fn next_json(client: &mut Client) -> Value {
    loop {
        match next_message(client).await {
            Some(Message::Text(text)) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Message::Ping(_)) | Some(Message::Pong(_)) => continue,
            other => panic!("expected a text frame, got {:?}", other),
        }
    }
}

/// Asserts that nothing arrives within a short window
pub async fn assert_silent(client: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(result.is_err(), "unexpected frame: {:?}", result);
}

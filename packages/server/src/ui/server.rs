//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    domain::MessagePusher,
    usecase::{GetRoomsUseCase, SessionGateway},
};

use super::{
    handler::{end_ai_session, get_rooms, handshake_socket_handler, health_check, room_socket_handler},
    signal::shutdown_signal,
    state::AppState,
};

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Clinic relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(gateway, get_rooms_usecase, registry);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// SessionGateway（接続・受信・切断の窓口）
    gateway: Arc<SessionGateway>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// MessagePusher（停止後にすべての接続を閉じる）
    message_pusher: Arc<dyn MessagePusher>,
    handshake_timeout: Duration,
}

impl Server {
    pub fn new(
        gateway: Arc<SessionGateway>,
        get_rooms_usecase: Arc<GetRoomsUseCase>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            gateway,
            get_rooms_usecase,
            message_pusher,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            gateway: self.gateway.clone(),
            get_rooms_usecase: self.get_rooms_usecase.clone(),
            handshake_timeout: self.handshake_timeout,
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws/{room_id}", get(room_socket_handler))
            .route("/socket", get(handshake_socket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/ai-sessions/{room_id}/end", post(end_ai_session))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the relay server until Ctrl+C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Clinic relay listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws/{{room_id}} or ws://{}/socket", bind_addr, bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves, then drain
    /// every room so that open sockets close.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        let evicted = self.message_pusher.drain().await;
        tracing::info!("Server shutdown complete ({} connection(s) closed)", evicted);

        Ok(())
    }
}

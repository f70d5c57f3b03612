//! Shared application state.

use std::{sync::Arc, time::Duration};

use crate::usecase::{GetRoomsUseCase, SessionGateway};

/// Shared application state
pub struct AppState {
    /// SessionGateway（接続・受信・切断の窓口）
    pub gateway: Arc<SessionGateway>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// Time allowed for the first frame of the handshake transport
    pub handshake_timeout: Duration,
}

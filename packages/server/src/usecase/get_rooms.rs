//! UseCase: 接続中のルーム一覧の取得

use std::sync::Arc;

use crate::domain::{LiveRoom, MessagePusher};

/// ルーム一覧取得のユースケース
pub struct GetRoomsUseCase {
    message_pusher: Arc<dyn MessagePusher>,
}

impl GetRoomsUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// メンバーが一人以上いるルームを ID 順に返す
    pub async fn execute(&self) -> Vec<LiveRoom> {
        self.message_pusher.live_rooms().await
    }
}

//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 切断したコネクションに以降のブロードキャストが届かないことを保証
//! - 最後のメンバーが抜けたルームがレジストリから消えることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：メンバーの切断
//! - エッジケース：ブロードキャストで既に除去されたコネクションの切断

use std::sync::Arc;

use crate::domain::{MessagePusher, RoomId};

use super::connect_participant::Session;

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// セッションを消費してレジストリから外す
    ///
    /// `Session` を値で受け取るため、同じセッションの切断は一度しか実行できない。
    ///
    /// # Returns
    ///
    /// * `Some(RoomId)` - 登録が残っていた場合、そのルーム
    /// * `None` - 送信失敗などで既に除去されていた場合
    pub async fn execute(&self, session: Session) -> Option<RoomId> {
        let left = self.message_pusher.leave(&session.connection_id).await;
        tracing::info!(
            "Entity '{}' disconnected from room '{}'",
            session.entity.id,
            session.room.id
        );
        left
    }
}

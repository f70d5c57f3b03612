//! UseCase: AI セッションの終了
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - EndSessionUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 終了後は発話が SESSION_CONCLUDED で拒否されることを保証
//! - ルームストアに終了が記録されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：AI セッションの終了と通知
//! - 異常系：チャットルームの終了要求
//! - エッジケース：二重の終了要求

use std::sync::Arc;

use crate::domain::{MessagePusher, Phase, Room, RoomId, RoomKind, RoomStore, ServerEvent};

use super::{error::FinalizeError, interview::InterviewService};

pub const SESSION_ENDED_NOTICE: &str = "This AI session has ended.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOutcome {
    pub room_id: RoomId,
    pub phase: Phase,
    /// `false` if the session had already ended
    pub ended_now: bool,
}

/// AI セッション終了のユースケース
pub struct EndSessionUseCase {
    rooms: Arc<dyn RoomStore>,
    interviews: Arc<InterviewService>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl EndSessionUseCase {
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        interviews: Arc<InterviewService>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            rooms,
            interviews,
            message_pusher,
        }
    }

    /// AI セッションを concluded にし、ルームストアに終了を記録する
    ///
    /// 新たに終了した場合は、ルームの全メンバーに終了通知をブロードキャストする。
    pub async fn execute(&self, room: &Room) -> Result<EndOutcome, FinalizeError> {
        if room.kind != RoomKind::AiSession {
            return Err(FinalizeError::NotAiSession(room.id.to_string()));
        }

        // 1. 先にストアへ記録（失敗したら状態を変えない）
        let ended_now = self
            .rooms
            .mark_ended(&room.id)
            .await
            .map_err(FinalizeError::Store)?;

        // 2. 状態機械を concluded にして破棄
        self.interviews.conclude(room).await;

        // 3. 通知
        if ended_now {
            self.message_pusher
                .broadcast(&room.id, &ServerEvent::system(SESSION_ENDED_NOTICE), None)
                .await;
        }

        Ok(EndOutcome {
            room_id: room.id.clone(),
            phase: Phase::Concluded,
            ended_now,
        })
    }
}

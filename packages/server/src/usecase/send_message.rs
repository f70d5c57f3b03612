//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::relay_chat() / ask_assistant() メソッド
//! - チャット：保存してから送信者以外にブロードキャスト
//! - AI セッション：インタビューを進め、返答を送信者にだけ送る
//!
//! ### なぜこのテストが必要か
//! - 保存に失敗したメッセージが配信されないことを保証
//! - AI の返答がルーム全体にブロードキャストされないことを確認
//! - 要約ターンの後に summary 通知が届くことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：チャットの中継、AI への質問と要約
//! - 異常系：保存失敗、生成失敗
//! - エッジケース：AI セッションに複数のメンバーがいる場合

use std::sync::Arc;

use clinic_relay_shared::time::Clock;

use crate::domain::{
    BroadcastReport, ChatDraft, ChatEnvelope, InterviewError, InterviewReply, MessageContent,
    MessagePusher, Room, RoomKind, RoomStore, ServerEvent, Timestamp, TurnAuthor, TurnRecord,
    TurnStore,
};

use super::{connect_participant::Session, error::MessageError, interview::InterviewService};

pub const PROCESSING_NOTICE: &str = "Processing your message...";

pub const SUMMARY_NOTICE: &str =
    "AI has generated a summary. You can edit it and send it to the doctor.";

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    rooms: Arc<dyn RoomStore>,
    turns: Arc<dyn TurnStore>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    interviews: Arc<InterviewService>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        turns: Arc<dyn TurnStore>,
        message_pusher: Arc<dyn MessagePusher>,
        interviews: Arc<InterviewService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            turns,
            message_pusher,
            interviews,
            clock,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// チャットメッセージを保存し、送信者以外のメンバーにブロードキャストする
    pub async fn relay_chat(
        &self,
        session: &Session,
        draft: ChatDraft,
    ) -> Result<BroadcastReport, MessageError> {
        if session.room.kind != RoomKind::Chat {
            return Err(MessageError::Unsupported(session.room.kind));
        }

        let timestamp = self.now();
        let content = draft.content.into_string();

        // 1. 保存（失敗したら配信しない）
        self.turns
            .append_turn(TurnRecord {
                room_id: session.room.id.clone(),
                author: TurnAuthor::Participant(session.entity.clone()),
                text: content.clone(),
                metadata: serde_json::json!({
                    "message_type": draft.message_type,
                    "file_details": draft.file_details,
                }),
                timestamp,
            })
            .await
            .map_err(|e| {
                tracing::error!("Failed to persist chat message in '{}': {}", session.room.id, e);
                MessageError::Persist(e)
            })?;

        // 2. 送信者以外にブロードキャスト
        let envelope = ChatEnvelope {
            room_id: session.room.id.clone(),
            sender_id: session.entity.id.clone(),
            content,
            message_type: draft.message_type,
            file_details: draft.file_details,
            timestamp,
        };
        let report = self
            .message_pusher
            .broadcast(
                &session.room.id,
                &ServerEvent::Chat(envelope),
                Some(&session.connection_id),
            )
            .await;

        tracing::debug!(
            "Relayed message from '{}' in '{}' to {} member(s)",
            session.entity.id,
            session.room.id,
            report.delivered
        );
        Ok(report)
    }

    /// 発話をインタビューに渡し、返答を送信者にだけ送る
    ///
    /// 接続後にセッションが終了している場合があるため、ルームはストアから読み直す。
    /// 終了済みなら処理中通知を送らずに SessionConcluded を返す。
    pub async fn ask_assistant(
        &self,
        session: &Session,
        utterance: MessageContent,
    ) -> Result<InterviewReply, MessageError> {
        if session.room.kind != RoomKind::AiSession {
            return Err(MessageError::Unsupported(session.room.kind));
        }

        let room = self.current_room(session).await?;
        if room.ended {
            return Err(InterviewError::SessionConcluded.into());
        }

        self.push(session, ServerEvent::status(PROCESSING_NOTICE)).await;

        let reply = self.interviews.ask(&room, &utterance).await?;

        // 保存は一度きり。失敗してもリトライせず、返答は届ける
        self.persist_exchange(session, &reply).await;

        self.push(
            session,
            ServerEvent::AiResponse {
                message: reply.message.clone(),
                is_summary: reply.is_summary,
                question_count: reply.question_count,
                phase: reply.phase,
            },
        )
        .await;
        if reply.is_summary {
            self.push(
                session,
                ServerEvent::Summary {
                    content: SUMMARY_NOTICE.to_string(),
                },
            )
            .await;
        }
        Ok(reply)
    }

    async fn current_room(&self, session: &Session) -> Result<Room, MessageError> {
        match self.rooms.get_room(&session.room.id).await {
            Ok(Some(room)) => Ok(room),
            Ok(None) => {
                tracing::warn!("Room '{}' disappeared from the store", session.room.id);
                Ok(session.room.clone())
            }
            Err(e) => {
                tracing::error!("Failed to load room '{}': {}", session.room.id, e);
                Err(MessageError::Load(e))
            }
        }
    }

    async fn persist_exchange(&self, session: &Session, reply: &InterviewReply) {
        let timestamp = self.now();
        let records = [
            TurnRecord {
                room_id: session.room.id.clone(),
                author: TurnAuthor::Participant(session.entity.clone()),
                text: reply.utterance.clone(),
                metadata: serde_json::json!({ "question_count": reply.question_count }),
                timestamp,
            },
            TurnRecord {
                room_id: session.room.id.clone(),
                author: TurnAuthor::Assistant,
                text: reply.message.clone(),
                metadata: serde_json::json!({
                    "is_summary": reply.is_summary,
                    "question_count": reply.question_count,
                }),
                timestamp,
            },
        ];
        for record in records {
            if let Err(e) = self.turns.append_turn(record).await {
                tracing::error!("Failed to persist AI turn in '{}': {}", session.room.id, e);
            }
        }
    }

    async fn push(&self, session: &Session, event: ServerEvent) {
        if let Err(e) = self
            .message_pusher
            .send_to(&session.connection_id, event)
            .await
        {
            tracing::warn!("Failed to push to '{}': {}", session.connection_id, e);
        }
    }
}

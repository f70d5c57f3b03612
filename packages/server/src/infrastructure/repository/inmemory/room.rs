//! InMemory Room Store 実装
//!
//! チャットと AI セッションのレコードを保持し、ドメインの `Room` 読み取りモデルに変換します。
//! AI セッションは親チャットを参照し、所有者は親チャットの患者です。
//!
//! チャットと AI セッションのルーム ID は同じ名前空間を共有します（チャットが優先）。

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::{EntityId, Room, RoomId, RoomStore, StoreError};

/// Stored chat between one doctor and one patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: RoomId,
    pub doctor_id: EntityId,
    pub patient_id: EntityId,
}

/// Stored AI interview session attached to a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSessionRecord {
    pub id: RoomId,
    pub chat_id: RoomId,
    #[serde(default)]
    pub ended: bool,
}

#[derive(Default)]
struct Records {
    chats: HashMap<RoomId, ChatRecord>,
    ai_sessions: HashMap<RoomId, AiSessionRecord>,
}

pub struct InMemoryRoomStore {
    records: RwLock<Records>,
}

impl InMemoryRoomStore {
    pub fn new(chats: Vec<ChatRecord>, ai_sessions: Vec<AiSessionRecord>) -> Self {
        let records = Records {
            chats: chats.into_iter().map(|c| (c.id.clone(), c)).collect(),
            ai_sessions: ai_sessions.into_iter().map(|s| (s.id.clone(), s)).collect(),
        };
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn insert_chat(&self, chat: ChatRecord) {
        self.records.write().await.chats.insert(chat.id.clone(), chat);
    }

    pub async fn insert_ai_session(&self, session: AiSessionRecord) {
        self.records
            .write()
            .await
            .ai_sessions
            .insert(session.id.clone(), session);
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        let records = self.records.read().await;

        if let Some(chat) = records.chats.get(room_id) {
            return Ok(Some(Room::chat(
                chat.id.clone(),
                chat.doctor_id.clone(),
                chat.patient_id.clone(),
            )));
        }

        let Some(session) = records.ai_sessions.get(room_id) else {
            return Ok(None);
        };
        match records.chats.get(&session.chat_id) {
            Some(chat) => Ok(Some(Room::ai_session(
                session.id.clone(),
                chat.patient_id.clone(),
                session.ended,
            ))),
            None => {
                tracing::warn!(
                    "AI session '{}' references missing chat '{}'",
                    session.id,
                    session.chat_id
                );
                Ok(None)
            }
        }
    }

    async fn mark_ended(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let session = records
            .ai_sessions
            .get_mut(room_id)
            .ok_or_else(|| StoreError::NotFound(format!("ai session {}", room_id)))?;
        let ended_now = !session.ended;
        session.ended = true;
        Ok(ended_now)
    }
}

//! トランスポートに依存しない受信メッセージと送信イベント
//!
//! 各トランスポートは自身のフレームを [`InboundMessage`] にデコードし、
//! [`ServerEvent`] を自身のフレームにエンコードする。

use serde::{Deserialize, Serialize};

use super::{
    interview::Phase,
    value_object::{ConnectionId, EntityId, MessageContent, RoomId, Timestamp},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageType {
    #[default]
    Text,
    Audio,
    File,
}

/// 参加者が送信したチャットメッセージ
#[derive(Debug, Clone, PartialEq)]
pub struct ChatDraft {
    pub content: MessageContent,
    pub message_type: ChatMessageType,
    pub file_details: Option<serde_json::Value>,
}

/// コネクションから受信したメッセージ（ルーム種別に対して検証済み）
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Chat(ChatDraft),
    Utterance(MessageContent),
    EndSession,
}

/// チャットルームの他のメンバーに中継されるメッセージ
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEnvelope {
    pub room_id: RoomId,
    pub sender_id: EntityId,
    pub content: String,
    pub message_type: ChatMessageType,
    pub file_details: Option<serde_json::Value>,
    pub timestamp: Timestamp,
}

/// 新しく参加したチャットメンバーに再送する過去の発言
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub sender_id: Option<EntityId>,
    pub content: String,
    pub metadata: serde_json::Value,
    pub timestamp: Timestamp,
}

/// サーバーからルームの 1 人または全員に送るイベント
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// ライフサイクル通知（最初の 1 件は `joined` 通知）
    System {
        content: String,
        connection_id: Option<ConnectionId>,
    },
    Status {
        content: String,
    },
    History {
        messages: Vec<HistoryEntry>,
    },
    Chat(ChatEnvelope),
    AiResponse {
        message: String,
        is_summary: bool,
        question_count: u32,
        phase: Phase,
    },
    Summary {
        content: String,
    },
    Error {
        code: &'static str,
        content: String,
    },
}

impl ServerEvent {
    pub fn system(content: impl Into<String>) -> Self {
        ServerEvent::System {
            content: content.into(),
            connection_id: None,
        }
    }

    pub fn status(content: impl Into<String>) -> Self {
        ServerEvent::Status {
            content: content.into(),
        }
    }

    pub fn error(code: &'static str, content: impl Into<String>) -> Self {
        ServerEvent::Error {
            code,
            content: content.into(),
        }
    }
}

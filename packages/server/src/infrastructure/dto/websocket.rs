//! WebSocket frame DTOs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ChatMessageType, Phase};

// ========================================
// Outbound
// ========================================

/// Frame pushed to a client, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    System {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        connection_id: Option<String>,
    },
    Status {
        content: String,
    },
    History {
        messages: Vec<HistoryMessageDto>,
    },
    Message {
        message: ChatMessageDto,
    },
    AiResponse {
        content: AiReplyDto,
        question_count: u32,
        phase: Phase,
    },
    Summary {
        content: String,
    },
    Error {
        code: String,
        content: String,
    },
    /// Connection attempt refused; the socket is closed right after
    Refused {
        code: String,
        reason: String,
    },
}

/// Chat message as relayed to the other members of a chat room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub room_id: String,
    pub sender_id: String,
    pub content: String,
    pub message_type: ChatMessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_details: Option<Value>,
    /// RFC 3339
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessageDto {
    /// `None` for assistant turns
    pub sender_id: Option<String>,
    pub content: String,
    pub metadata: Value,
    /// RFC 3339
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiReplyDto {
    pub message: String,
    #[serde(rename = "isSummary")]
    pub is_summary: bool,
}

// ========================================
// Inbound
// ========================================

/// Chat room frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatFrameDto {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub message_type: ChatMessageType,
    #[serde(default)]
    pub file_details: Option<Value>,
}

/// AI room frame: either `{message}` or `{action: "end_session"}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiFrameDto {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

/// First frame of the handshake transport
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandshakeDto {
    pub auth: HandshakeAuthDto,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandshakeAuthDto {
    pub token: String,
    /// AI session id; accepted as an alias of `room_id`
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub user_entity_id: Option<String>,
}

impl HandshakeAuthDto {
    pub fn target_room(&self) -> Option<&str> {
        self.room_id.as_deref().or(self.session_id.as_deref())
    }
}

/// `{event, data}` envelope used by the handshake transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

//! Conversion logic between DTOs and domain types.

use clinic_relay_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    ChatDraft, ChatEnvelope, FrameError, HistoryEntry, InboundMessage, MessageContent, Refusal,
    ServerEvent,
};
use crate::infrastructure::dto::websocket as dto;

pub const END_SESSION_ACTION: &str = "end_session";

// ========================================
// DTO → Domain
// ========================================

impl dto::ChatFrameDto {
    /// Blank chat content is ignored, not an error.
    pub fn into_inbound(self) -> Result<Option<InboundMessage>, FrameError> {
        if self.content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(InboundMessage::Chat(ChatDraft {
            content: MessageContent::new(self.content)?,
            message_type: self.message_type,
            file_details: self.file_details,
        })))
    }
}

impl dto::AiFrameDto {
    pub fn into_inbound(self) -> Result<InboundMessage, FrameError> {
        match (self.action, self.message) {
            (Some(action), _) if action == END_SESSION_ACTION => Ok(InboundMessage::EndSession),
            (Some(action), _) => Err(FrameError::Unsupported(action)),
            (None, Some(message)) => Ok(InboundMessage::Utterance(MessageContent::new(message)?)),
            (None, None) => Err(FrameError::Malformed("missing 'message' field".to_string())),
        }
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<&ChatEnvelope> for dto::ChatMessageDto {
    fn from(envelope: &ChatEnvelope) -> Self {
        Self {
            room_id: envelope.room_id.as_str().to_string(),
            sender_id: envelope.sender_id.as_str().to_string(),
            content: envelope.content.clone(),
            message_type: envelope.message_type,
            file_details: envelope.file_details.clone(),
            timestamp: timestamp_to_rfc3339(envelope.timestamp.value()),
        }
    }
}

impl From<&HistoryEntry> for dto::HistoryMessageDto {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            sender_id: entry.sender_id.as_ref().map(|id| id.as_str().to_string()),
            content: entry.content.clone(),
            metadata: entry.metadata.clone(),
            timestamp: timestamp_to_rfc3339(entry.timestamp.value()),
        }
    }
}

impl From<&ServerEvent> for dto::OutboundFrame {
    fn from(event: &ServerEvent) -> Self {
        match event {
            ServerEvent::System {
                content,
                connection_id,
            } => Self::System {
                content: content.clone(),
                connection_id: connection_id.map(|id| id.to_string()),
            },
            ServerEvent::Status { content } => Self::Status {
                content: content.clone(),
            },
            ServerEvent::History { messages } => Self::History {
                messages: messages.iter().map(Into::into).collect(),
            },
            ServerEvent::Chat(envelope) => Self::Message {
                message: envelope.into(),
            },
            ServerEvent::AiResponse {
                message,
                is_summary,
                question_count,
                phase,
            } => Self::AiResponse {
                content: dto::AiReplyDto {
                    message: message.clone(),
                    is_summary: *is_summary,
                },
                question_count: *question_count,
                phase: *phase,
            },
            ServerEvent::Summary { content } => Self::Summary {
                content: content.clone(),
            },
            ServerEvent::Error { code, content } => Self::Error {
                code: code.to_string(),
                content: content.clone(),
            },
        }
    }
}

impl From<&Refusal> for dto::OutboundFrame {
    fn from(refusal: &Refusal) -> Self {
        Self::Refused {
            code: refusal.code.to_string(),
            reason: refusal.reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatMessageType, EntityId, RoomId, Timestamp};

    #[test]
    fn test_blank_chat_frame_is_ignored() {
        // テスト項目: 空のチャットフレームはエラーではなく無視される
        // given (前提条件):
        let frame = dto::ChatFrameDto {
            content: "   ".to_string(),
            message_type: ChatMessageType::Text,
            file_details: None,
        };

        // when (操作):
        let inbound = frame.into_inbound();

        // then (期待する結果):
        assert_eq!(inbound, Ok(None));
    }

    #[test]
    fn test_ai_frame_variants() {
        // テスト項目: AI フレームは発話・セッション終了・不正なアクションに振り分けられる
        // given (前提条件):
        let utterance = dto::AiFrameDto {
            message: Some("I feel dizzy".to_string()),
            action: None,
        };
        let end = dto::AiFrameDto {
            message: None,
            action: Some("end_session".to_string()),
        };
        let unknown = dto::AiFrameDto {
            message: None,
            action: Some("restart".to_string()),
        };
        let empty = dto::AiFrameDto {
            message: Some("".to_string()),
            action: None,
        };

        // when (操作):

        // then (期待する結果):
        assert!(matches!(
            utterance.into_inbound(),
            Ok(InboundMessage::Utterance(ref c)) if c.as_str() == "I feel dizzy"
        ));
        assert_eq!(end.into_inbound(), Ok(InboundMessage::EndSession));
        assert!(matches!(unknown.into_inbound(), Err(FrameError::Unsupported(_))));
        assert!(matches!(empty.into_inbound(), Err(FrameError::Invalid(_))));
    }

    #[test]
    fn test_chat_event_becomes_message_frame() {
        // テスト項目: チャットイベントは送信者とルームを含む message フレームになる
        // given (前提条件):
        let event = ServerEvent::Chat(ChatEnvelope {
            room_id: RoomId::new("chat-1".to_string()).unwrap(),
            sender_id: EntityId::new("p1".to_string()).unwrap(),
            content: "hello".to_string(),
            message_type: ChatMessageType::File,
            file_details: Some(serde_json::json!({"name": "scan.png"})),
            timestamp: Timestamp::new(0),
        });

        // when (操作):
        let frame = dto::OutboundFrame::from(&event);

        // then (期待する結果):
        let dto::OutboundFrame::Message { message } = frame else {
            panic!("expected a message frame");
        };
        assert_eq!(message.room_id, "chat-1");
        assert_eq!(message.sender_id, "p1");
        assert_eq!(message.message_type, ChatMessageType::File);
        assert_eq!(message.timestamp, "1970-01-01T00:00:00+00:00");
    }
}

use crate::{
    domain::{FrameError, InboundMessage, Refusal, RoomKind, ServerEvent},
    infrastructure::dto::websocket::{AiFrameDto, ChatFrameDto, EventEnvelope, OutboundFrame},
};

use super::FrameCodec;

pub const CHAT_EVENT: &str = "chat_message";
pub const AI_EVENT: &str = "ai_message";
pub const END_SESSION_EVENT: &str = "end_session";
pub const CONNECT_ERROR_EVENT: &str = "connect_error";

fn event_name(kind: RoomKind) -> &'static str {
    match kind {
        RoomKind::Chat => CHAT_EVENT,
        RoomKind::AiSession => AI_EVENT,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventCodec;

impl FrameCodec for EventCodec {
    fn decode(&self, kind: RoomKind, text: &str) -> Result<Option<InboundMessage>, FrameError> {
        let malformed = |e: serde_json::Error| FrameError::Malformed(e.to_string());
        let envelope: EventEnvelope = serde_json::from_str(text).map_err(malformed)?;

        match (kind, envelope.event.as_str()) {
            (RoomKind::Chat, CHAT_EVENT) => serde_json::from_value::<ChatFrameDto>(envelope.data)
                .map_err(malformed)?
                .into_inbound(),
            (RoomKind::AiSession, AI_EVENT) => {
                serde_json::from_value::<AiFrameDto>(envelope.data)
                    .map_err(malformed)?
                    .into_inbound()
                    .map(Some)
            }
            (RoomKind::AiSession, END_SESSION_EVENT) => Ok(Some(InboundMessage::EndSession)),
            _ => Err(FrameError::Unsupported(envelope.event)),
        }
    }

    fn encode(&self, kind: RoomKind, event: &ServerEvent) -> Result<String, serde_json::Error> {
        serde_json::to_string(&EventEnvelope {
            event: event_name(kind).to_string(),
            data: serde_json::to_value(OutboundFrame::from(event))?,
        })
    }

    fn encode_refusal(&self, refusal: &Refusal) -> Result<String, serde_json::Error> {
        serde_json::to_string(&EventEnvelope {
            event: CONNECT_ERROR_EVENT.to_string(),
            data: serde_json::to_value(OutboundFrame::from(refusal))?,
        })
    }
}

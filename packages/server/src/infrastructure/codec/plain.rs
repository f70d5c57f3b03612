use crate::{
    domain::{FrameError, InboundMessage, Refusal, RoomKind, ServerEvent},
    infrastructure::dto::websocket::{AiFrameDto, ChatFrameDto, OutboundFrame},
};

use super::FrameCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl FrameCodec for PlainCodec {
    fn decode(&self, kind: RoomKind, text: &str) -> Result<Option<InboundMessage>, FrameError> {
        let malformed = |e: serde_json::Error| FrameError::Malformed(e.to_string());
        match kind {
            RoomKind::Chat => serde_json::from_str::<ChatFrameDto>(text)
                .map_err(malformed)?
                .into_inbound(),
            RoomKind::AiSession => serde_json::from_str::<AiFrameDto>(text)
                .map_err(malformed)?
                .into_inbound()
                .map(Some),
        }
    }

    fn encode(&self, _kind: RoomKind, event: &ServerEvent) -> Result<String, serde_json::Error> {
        serde_json::to_string(&OutboundFrame::from(event))
    }

    fn encode_refusal(&self, refusal: &Refusal) -> Result<String, serde_json::Error> {
        serde_json::to_string(&OutboundFrame::from(refusal))
    }
}

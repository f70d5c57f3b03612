//! Frame codecs of the two socket transports.
//!
//! Both transports carry the same DTOs; they differ only in framing:
//!
//! - `plain`: path transport, frames are bare JSON objects tagged by `type`
//! - `event`: handshake transport, frames are `{event, data}` envelopes

mod event;
mod plain;

pub use event::EventCodec;
pub use plain::PlainCodec;

use crate::domain::{FrameError, InboundMessage, Refusal, RoomKind, ServerEvent};

pub trait FrameCodec: Send + Sync {
    /// Decode one inbound text frame. `Ok(None)` means the frame is ignored.
    fn decode(&self, kind: RoomKind, text: &str) -> Result<Option<InboundMessage>, FrameError>;

    fn encode(&self, kind: RoomKind, event: &ServerEvent) -> Result<String, serde_json::Error>;

    fn encode_refusal(&self, refusal: &Refusal) -> Result<String, serde_json::Error>;
}

//! ドメイン層：エンティティ、値オブジェクト、純粋なポリシー、外側の層が実装するインターフェース

pub mod collaborator;
pub mod entity;
pub mod error;
pub mod event;
pub mod interview;
pub mod message_pusher;
pub mod policy;
pub mod relationship;
pub mod repository;
pub mod resolver;
pub mod value_object;

pub use collaborator::{AuthVerifier, TextGenerator};
#[cfg(test)]
pub use collaborator::{MockAuthVerifier, MockTextGenerator};
pub use entity::{
    EntityKind, NodeKind, NodeRef, Participant, Principal, RelationEdge, RelationLabel,
    ResolvedEntity, Role, Room, RoomKind, TurnAuthor, TurnRecord, UserAccount,
};
pub use error::{
    AccessError, DeliveryError, FrameError, GenerationError, InterviewError, Refusal, StoreError,
    ValidationError,
};
pub use event::{ChatDraft, ChatEnvelope, ChatMessageType, HistoryEntry, InboundMessage, ServerEvent};
pub use interview::{Instruction, InterviewReply, InterviewState, Phase, Speaker, Turn};
pub use message_pusher::{BroadcastReport, LiveRoom, Member, MessagePusher, PusherChannel};
pub use policy::AccessPolicy;
pub use relationship::{PatientLink, RelationshipGraph};
pub use repository::{RelationshipStore, RoomStore, TurnStore, UserDirectory};
pub use resolver::EntityResolver;
pub use value_object::{ConnectionId, EdgeId, EntityId, MessageContent, RoomId, Timestamp, UserId};

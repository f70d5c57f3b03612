//! UseCase テスト用の共通フィクスチャ
//!
//! ```text
//! user u-pat --self--> patient p1 <-- doctor d1 (chat-1, session-1)
//! user u-pat --child-> patient p2
//! doctor d2 (p1 とのエッジなし)
//! ```

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use clinic_relay_shared::time::FixedClock;
use tokio::sync::mpsc;

use crate::{
    domain::{
        AccessError, AccessPolicy, AuthVerifier, EdgeId, EntityId, EntityResolver, NodeRef,
        Principal, RelationEdge, RelationLabel, RelationshipGraph, Role, RoomId, ServerEvent,
        UserId,
    },
    infrastructure::{
        message_pusher::ConnectionRegistry,
        repository::{
            AiSessionRecord, ChatRecord, InMemoryRelationshipStore, InMemoryRoomStore,
            InMemoryTurnStore,
        },
    },
};

use super::connect_participant::ConnectRequest;

pub(crate) const NOW: i64 = 1_700_000_000_000;

/// トークン文字列から固定の Principal を返す認証の Fake
pub(crate) struct StaticAuth(HashMap<&'static str, Principal>);

impl StaticAuth {
    pub(crate) fn standard() -> Self {
        let principal = |user: &str, role: Role, profile: Option<&str>| Principal {
            user_id: UserId::new(user.to_string()).unwrap(),
            role,
            profile_id: profile.map(entity),
        };
        Self(HashMap::from([
            ("patient-token", principal("u-pat", Role::Patient, None)),
            ("doctor-token", principal("u-doc", Role::Doctor, Some("d1"))),
            ("other-doctor-token", principal("u-doc2", Role::Doctor, Some("d2"))),
            ("hospital-token", principal("u-hosp", Role::Hospital, Some("h1"))),
            ("admin-token", principal("u-admin", Role::Admin, None)),
        ]))
    }
}

#[async_trait]
impl AuthVerifier for StaticAuth {
    async fn verify(&self, token: &str) -> Result<Principal, AccessError> {
        self.0
            .get(token)
            .cloned()
            .ok_or_else(|| AccessError::Unauthenticated("Invalid token".to_string()))
    }
}

pub(crate) fn entity(id: &str) -> EntityId {
    EntityId::new(id.to_string()).unwrap()
}

pub(crate) fn room_id(id: &str) -> RoomId {
    RoomId::new(id.to_string()).unwrap()
}

pub(crate) fn request(room: &str, token: &str, claim: Option<&str>) -> ConnectRequest {
    ConnectRequest {
        room_id: room.to_string(),
        token: token.to_string(),
        claimed_entity_id: claim.map(str::to_string),
    }
}

pub(crate) struct Fixture {
    pub(crate) auth: Arc<StaticAuth>,
    pub(crate) resolver: EntityResolver,
    pub(crate) policy: AccessPolicy,
    pub(crate) rooms: Arc<InMemoryRoomStore>,
    pub(crate) turns: Arc<InMemoryTurnStore>,
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) clock: Arc<FixedClock>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let edge = |id: &str, from: NodeRef, to: NodeRef, label: Option<RelationLabel>| {
            RelationEdge {
                id: EdgeId::new(id.to_string()).unwrap(),
                from,
                to,
                label,
            }
        };
        let user = UserId::new("u-pat".to_string()).unwrap();
        let relationships = Arc::new(InMemoryRelationshipStore::new(vec![
            edge(
                "e1",
                NodeRef::user(&user),
                NodeRef::patient(&entity("p1")),
                Some(RelationLabel::Oneself),
            ),
            edge(
                "e2",
                NodeRef::user(&user),
                NodeRef::patient(&entity("p2")),
                Some(RelationLabel::Child),
            ),
            edge(
                "e3",
                NodeRef::doctor(&entity("d1")),
                NodeRef::patient(&entity("p1")),
                None,
            ),
        ]));
        let rooms = Arc::new(InMemoryRoomStore::new(
            vec![ChatRecord {
                id: room_id("chat-1"),
                doctor_id: entity("d1"),
                patient_id: entity("p1"),
            }],
            vec![
                AiSessionRecord {
                    id: room_id("session-1"),
                    chat_id: room_id("chat-1"),
                    ended: false,
                },
                AiSessionRecord {
                    id: room_id("session-ended"),
                    chat_id: room_id("chat-1"),
                    ended: true,
                },
            ],
        ));
        let graph = RelationshipGraph::new(relationships);

        Self {
            auth: Arc::new(StaticAuth::standard()),
            resolver: EntityResolver::new(graph.clone()),
            policy: AccessPolicy::new(graph),
            rooms,
            turns: Arc::new(InMemoryTurnStore::new()),
            registry: Arc::new(ConnectionRegistry::new()),
            clock: Arc::new(FixedClock::new(NOW)),
        }
    }
}

pub(crate) fn drain_events(receiver: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

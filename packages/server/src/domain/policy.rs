//! アクセスポリシー：解決済みエンティティがルームに入れるか

use super::{
    entity::{EntityKind, NodeRef, ResolvedEntity, Room, RoomKind},
    error::StoreError,
    relationship::RelationshipGraph,
};

#[derive(Clone)]
pub struct AccessPolicy {
    graph: RelationshipGraph,
}

impl AccessPolicy {
    pub fn new(graph: RelationshipGraph) -> Self {
        Self { graph }
    }

    /// ルール:
    /// - 管理者はすべてのルームに入れる
    /// - チャットルームにはその医師と患者が入れる
    /// - AI セッションルームには所有者の患者と、その患者への医師↔患者エッジを持つ医師が入れる
    pub async fn authorize(&self, entity: &ResolvedEntity, room: &Room) -> Result<bool, StoreError> {
        if entity.kind == EntityKind::Admin {
            return Ok(true);
        }

        match room.kind {
            RoomKind::Chat => Ok(room.has_participant(entity)),
            RoomKind::AiSession => {
                if room.has_participant(entity) {
                    return Ok(true);
                }
                match (entity.kind, room.owner()) {
                    (EntityKind::Doctor, Some(owner)) if owner.kind == EntityKind::Patient => {
                        self.graph
                            .related(&NodeRef::doctor(&entity.id), &NodeRef::patient(&owner.id))
                            .await
                    }
                    _ => Ok(false),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{
        entity::RelationEdge,
        relationship::tests::{StaticEdges, edge, entity},
        value_object::RoomId,
    };

    fn policy(edges: Vec<RelationEdge>) -> AccessPolicy {
        AccessPolicy::new(RelationshipGraph::new(Arc::new(StaticEdges(edges))))
    }

    fn room_id(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn as_entity(id: &str, kind: EntityKind) -> ResolvedEntity {
        ResolvedEntity::new(entity(id), kind)
    }

    #[tokio::test]
    async fn test_admin_is_authorized_everywhere() {
        // テスト項目: 管理者はすべてのルームにアクセスできる
        // given (前提条件):
        let policy = policy(vec![]);
        let admin = as_entity("admin-1", EntityKind::Admin);
        let chat = Room::chat(room_id("c1"), entity("d1"), entity("p1"));
        let session = Room::ai_session(room_id("s1"), entity("p1"), false);

        // when (操作):
        let chat_result = policy.authorize(&admin, &chat).await;
        let session_result = policy.authorize(&admin, &session).await;

        // then (期待する結果):
        assert_eq!(chat_result, Ok(true));
        assert_eq!(session_result, Ok(true));
    }

    #[tokio::test]
    async fn test_chat_room_admits_only_its_participants() {
        // テスト項目: チャットルームには参加者の医師と患者のみがアクセスできる
        // given (前提条件):
        let policy = policy(vec![]);
        let chat = Room::chat(room_id("c1"), entity("d1"), entity("p1"));

        // when (操作):
        let doctor = policy.authorize(&as_entity("d1", EntityKind::Doctor), &chat).await;
        let patient = policy.authorize(&as_entity("p1", EntityKind::Patient), &chat).await;
        let stranger = policy.authorize(&as_entity("d2", EntityKind::Doctor), &chat).await;
        let hospital = policy.authorize(&as_entity("h1", EntityKind::Hospital), &chat).await;

        // then (期待する結果):
        assert_eq!(doctor, Ok(true));
        assert_eq!(patient, Ok(true));
        assert_eq!(stranger, Ok(false));
        assert_eq!(hospital, Ok(false));
    }

    #[tokio::test]
    async fn test_ai_session_admits_owner_only() {
        // テスト項目: AI セッションはオーナーの患者のみ許可し、他の患者は拒否する
        // given (前提条件):
        let policy = policy(vec![]);
        let session = Room::ai_session(room_id("s1"), entity("p1"), false);

        // when (操作):
        let owner = policy.authorize(&as_entity("p1", EntityKind::Patient), &session).await;
        let other = policy.authorize(&as_entity("p2", EntityKind::Patient), &session).await;

        // then (期待する結果):
        assert_eq!(owner, Ok(true));
        assert_eq!(other, Ok(false));
    }

    #[tokio::test]
    async fn test_mapped_doctor_may_enter_patient_ai_session() {
        // テスト項目: 医師 D が患者 P にマッピングされていれば P の AI セッションに入れる
        // given (前提条件):
        let policy = policy(vec![edge(
            "e1",
            NodeRef::doctor(&entity("D")),
            NodeRef::patient(&entity("P")),
            None,
        )]);
        let session = Room::ai_session(room_id("s1"), entity("P"), false);

        // when (操作):
        let result = policy.authorize(&as_entity("D", EntityKind::Doctor), &session).await;

        // then (期待する結果):
        assert_eq!(result, Ok(true));
    }

    #[tokio::test]
    async fn test_unmapped_doctor_is_refused_from_ai_session() {
        // テスト項目: 医師 D が患者 P にマッピングされていなければ P の AI セッションに入れない
        // given (前提条件): D は別の患者 Q にのみマッピングされている
        let policy = policy(vec![edge(
            "e1",
            NodeRef::doctor(&entity("D")),
            NodeRef::patient(&entity("Q")),
            None,
        )]);
        let session = Room::ai_session(room_id("s1"), entity("P"), false);

        // when (操作):
        let result = policy.authorize(&as_entity("D", EntityKind::Doctor), &session).await;

        // then (期待する結果):
        assert_eq!(result, Ok(false));
    }
}

//! 関係グラフへの読み取り専用クエリ
//!
//! エッジの種類は 病院↔医師、病院↔患者、医師↔患者、ユーザー↔患者（ラベル付き）。
//! グラフ自身は状態を持たず、クエリはすべて [`RelationshipStore`] への射影になる。

use std::sync::Arc;

use super::{
    entity::{NodeKind, NodeRef, RelationEdge, RelationLabel},
    error::StoreError,
    repository::RelationshipStore,
    value_object::{EdgeId, EntityId, UserId},
};

/// ユーザー↔患者エッジでユーザーから辿れる患者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientLink {
    pub edge_id: EdgeId,
    pub patient_id: EntityId,
    pub label: RelationLabel,
}

#[derive(Clone)]
pub struct RelationshipGraph {
    store: Arc<dyn RelationshipStore>,
}

impl RelationshipGraph {
    pub fn new(store: Arc<dyn RelationshipStore>) -> Self {
        Self { store }
    }

    /// 2 つのノードを（向きを問わず）結ぶエッジがあるか
    pub async fn related(&self, a: &NodeRef, b: &NodeRef) -> Result<bool, StoreError> {
        let edges = self.store.edges_touching(a).await?;
        Ok(edges.iter().any(|edge| edge.connects(a, b)))
    }

    /// ユーザーに紐づく患者（エッジ ID 順）
    ///
    /// ラベルのないエッジは [`RelationLabel::Other`] として返す。
    pub async fn patients_of_user(&self, user_id: &UserId) -> Result<Vec<PatientLink>, StoreError> {
        let user = NodeRef::user(user_id);
        let mut edges = self.store.edges_touching(&user).await?;
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        let links = edges
            .iter()
            .filter_map(|edge| {
                let other = edge.other_end(&user)?;
                if other.kind != NodeKind::Patient {
                    return None;
                }
                let patient_id = EntityId::new(other.id.clone()).ok()?;
                Some(PatientLink {
                    edge_id: edge.id.clone(),
                    patient_id,
                    label: edge.label.unwrap_or(RelationLabel::Other),
                })
            })
            .collect();

        Ok(links)
    }

    pub async fn doctors_of(&self, patient_id: &EntityId) -> Result<Vec<EntityId>, StoreError> {
        self.neighbours(&NodeRef::patient(patient_id), NodeKind::Doctor)
            .await
    }

    pub async fn hospitals_of(&self, patient_id: &EntityId) -> Result<Vec<EntityId>, StoreError> {
        self.neighbours(&NodeRef::patient(patient_id), NodeKind::Hospital)
            .await
    }

    pub async fn patients_of_doctor(
        &self,
        doctor_id: &EntityId,
    ) -> Result<Vec<EntityId>, StoreError> {
        self.neighbours(&NodeRef::doctor(doctor_id), NodeKind::Patient)
            .await
    }

    pub async fn doctors_of_hospital(
        &self,
        hospital_id: &EntityId,
    ) -> Result<Vec<EntityId>, StoreError> {
        self.neighbours(&NodeRef::hospital(hospital_id), NodeKind::Doctor)
            .await
    }

    /// `node` に隣接する種別 `kind` のノード（重複なし、エッジ ID 順）
    async fn neighbours(&self, node: &NodeRef, kind: NodeKind) -> Result<Vec<EntityId>, StoreError> {
        let mut edges: Vec<RelationEdge> = self.store.edges_touching(node).await?;
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        let mut ids: Vec<EntityId> = Vec::new();
        for other in edges.iter().filter_map(|edge| edge.other_end(node)) {
            if other.kind != kind {
                continue;
            }
            if let Ok(id) = EntityId::new(other.id.clone()) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}

//! InMemory Relationship Store 実装
//!
//! マッピングテーブル（hospital-doctor, hospital-patient, doctor-patient,
//! user-patient）をひとつのエッジ一覧として保持します。

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{NodeRef, RelationEdge, RelationshipStore, StoreError};

pub struct InMemoryRelationshipStore {
    edges: RwLock<Vec<RelationEdge>>,
}

impl InMemoryRelationshipStore {
    pub fn new(edges: Vec<RelationEdge>) -> Self {
        Self {
            edges: RwLock::new(edges),
        }
    }

    /// エッジを追加する（CRUD 側でマッピングが作られた場合に相当）
    pub async fn insert(&self, edge: RelationEdge) {
        self.edges.write().await.push(edge);
    }

    /// 指定 ID のエッジを削除する
    pub async fn remove(&self, edge_id: &str) -> bool {
        let mut edges = self.edges.write().await;
        let before = edges.len();
        edges.retain(|edge| edge.id.as_str() != edge_id);
        edges.len() != before
    }
}

#[async_trait]
impl RelationshipStore for InMemoryRelationshipStore {
    async fn edges_touching(&self, node: &NodeRef) -> Result<Vec<RelationEdge>, StoreError> {
        let edges = self.edges.read().await;
        Ok(edges
            .iter()
            .filter(|edge| &edge.from == node || &edge.to == node)
            .cloned()
            .collect())
    }
}

//! InMemory Turn Store 実装
//!
//! ルームごとに発話を追記のみで保持します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RoomId, StoreError, TurnRecord, TurnStore};

#[derive(Default)]
pub struct InMemoryTurnStore {
    turns: Mutex<HashMap<RoomId, Vec<TurnRecord>>>,
}

impl InMemoryTurnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// ルームの全ターン（古い順）
    pub async fn turns_of(&self, room_id: &RoomId) -> Vec<TurnRecord> {
        self.turns
            .lock()
            .await
            .get(room_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TurnStore for InMemoryTurnStore {
    async fn append_turn(&self, record: TurnRecord) -> Result<(), StoreError> {
        self.turns
            .lock()
            .await
            .entry(record.room_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn recent_turns(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<TurnRecord>, StoreError> {
        let turns = self.turns.lock().await;
        let Some(records) = turns.get(room_id) else {
            return Ok(Vec::new());
        };
        let skip = records.len().saturating_sub(limit);
        Ok(records[skip..].to_vec())
    }
}

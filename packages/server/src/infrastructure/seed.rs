//! Seed fixture for the in-memory stores.
//!
//! ```json
//! {
//!   "users": [{ "id": "u1", "role": "patient" }],
//!   "chats": [{ "id": "chat-1", "doctor_id": "d1", "patient_id": "p1" }],
//!   "ai_sessions": [{ "id": "session-1", "chat_id": "chat-1" }],
//!   "edges": [{ "id": "e1", "from": { "kind": "user", "id": "u1" },
//!               "to": { "kind": "patient", "id": "p1" }, "label": "self" }]
//! }
//! ```

use std::{path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{RelationEdge, UserAccount};

use super::repository::{
    AiSessionRecord, ChatRecord, InMemoryRelationshipStore, InMemoryRoomStore, InMemoryTurnStore,
    InMemoryUserDirectory,
};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid seed file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<UserAccount>,
    #[serde(default)]
    pub chats: Vec<ChatRecord>,
    #[serde(default)]
    pub ai_sessions: Vec<AiSessionRecord>,
    #[serde(default)]
    pub edges: Vec<RelationEdge>,
}

/// Stores built from one seed fixture
pub struct SeededStores {
    pub users: Arc<InMemoryUserDirectory>,
    pub rooms: Arc<InMemoryRoomStore>,
    pub relationships: Arc<InMemoryRelationshipStore>,
    pub turns: Arc<InMemoryTurnStore>,
}

impl SeedData {
    pub async fn load(path: &Path) -> Result<Self, SeedError> {
        let display = path.display().to_string();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SeedError::Io {
                path: display.clone(),
                source,
            })?;
        serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
            path: display,
            source,
        })
    }

    pub fn into_stores(self) -> SeededStores {
        tracing::info!(
            "Seeding stores: {} user(s), {} chat(s), {} AI session(s), {} edge(s)",
            self.users.len(),
            self.chats.len(),
            self.ai_sessions.len(),
            self.edges.len()
        );
        SeededStores {
            users: Arc::new(InMemoryUserDirectory::new(self.users)),
            rooms: Arc::new(InMemoryRoomStore::new(self.chats, self.ai_sessions)),
            relationships: Arc::new(InMemoryRelationshipStore::new(self.edges)),
            turns: Arc::new(InMemoryTurnStore::new()),
        }
    }
}

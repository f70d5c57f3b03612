//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::Phase;

/// `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// One entry of `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub room_id: String,
    pub members: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummaryDto>,
}

/// Body of `POST /api/ai-sessions/{id}/end`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EndSessionRequest {
    #[serde(default)]
    pub user_entity_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndSessionResponse {
    pub session_id: String,
    pub phase: Phase,
    /// `false` if the session had already ended
    pub ended_now: bool,
}

/// Error body of every failed HTTP request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub reason: String,
}

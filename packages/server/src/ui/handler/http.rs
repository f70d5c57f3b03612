//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    infrastructure::dto::http::{
        EndSessionRequest, EndSessionResponse, HealthResponse, RoomListResponse, RoomSummaryDto,
    },
    ui::state::AppState,
    usecase::{ConnectRequest, FinalizeError},
};

use super::{bearer_token, error_response, header_claim, refusal_response};

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Rooms with at least one live connection
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<RoomListResponse> {
    let rooms = state.get_rooms_usecase.execute().await;

    // Domain Model から DTO への変換
    let rooms = rooms
        .into_iter()
        .map(|room| RoomSummaryDto {
            room_id: room.room_id.into_string(),
            members: room.members,
        })
        .collect();

    Json(RoomListResponse { rooms })
}

/// End an AI session
///
/// The caller is authorized exactly like a socket connection to the same room.
/// The claimed entity comes from the JSON body or the `X-User-Entity-Id` header.
pub async fn end_ai_session(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: EndSessionRequest = if body.is_empty() {
        EndSessionRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(body) => body,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, "INVALID_MESSAGE", e.to_string());
            }
        }
    };

    let request = ConnectRequest {
        room_id,
        token: bearer_token(&headers).unwrap_or_default(),
        claimed_entity_id: body.user_entity_id.or_else(|| header_claim(&headers)),
    };

    match state.gateway.end_session(&request).await {
        Ok(outcome) => Json(EndSessionResponse {
            session_id: outcome.room_id.into_string(),
            phase: outcome.phase,
            ended_now: outcome.ended_now,
        })
        .into_response(),
        Err(FinalizeError::Access(e)) => refusal_response(&e),
        Err(e @ FinalizeError::NotAiSession(_)) => {
            error_response(StatusCode::BAD_REQUEST, e.code(), e.to_string())
        }
        Err(e @ FinalizeError::Store(_)) => {
            tracing::error!("Failed to end session '{}': {:?}", request.room_id, e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.code(), e.to_string())
        }
    }
}

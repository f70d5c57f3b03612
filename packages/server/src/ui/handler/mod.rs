//! Request handlers.

mod http;
mod websocket;

pub use http::{end_ai_session, get_rooms, health_check};
pub use websocket::{handshake_socket_handler, room_socket_handler};

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};

use crate::{
    domain::AccessError, infrastructure::auth::extract_bearer_token,
    infrastructure::dto::http::ErrorResponse,
};

/// Header carrying the claimed entity id on HTTP requests
pub const USER_ENTITY_HEADER: &str = "x-user-entity-id";

fn access_status(error: &AccessError) -> StatusCode {
    match error {
        AccessError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        AccessError::Forbidden(_) => StatusCode::FORBIDDEN,
        AccessError::NotFound(_) => StatusCode::NOT_FOUND,
        AccessError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(status: StatusCode, code: &str, reason: String) -> Response {
    let body = ErrorResponse {
        code: code.to_string(),
        reason,
    };
    (status, Json(body)).into_response()
}

fn refusal_response(error: &AccessError) -> Response {
    error_response(access_status(error), error.code(), error.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    extract_bearer_token(value).map(str::to_string)
}

fn header_claim(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

//! JWT access-token verification.
//!
//! Tokens are HS256-signed by the CRUD backend with claims `{sub, type, exp}`.
//! Only `type == "access"` is accepted. The principal's role and linked profile
//! come from the user directory, so a deactivated account is refused even while
//! its token is still valid.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::domain::{AccessError, AuthVerifier, Principal, UserDirectory, UserId};

const ACCESS_TOKEN_TYPE: &str = "access";

/// Payload carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

pub struct JwtAuthVerifier {
    key: DecodingKey,
    validation: Validation,
    users: Arc<dyn UserDirectory>,
}

impl JwtAuthVerifier {
    pub fn new(secret: &str, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            users,
        }
    }

    fn decode_claims(&self, token: &str) -> Result<AccessClaims, AccessError> {
        let data = decode::<AccessClaims>(token, &self.key, &self.validation).map_err(|err| {
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidSignature => "Invalid signature",
                ErrorKind::InvalidToken => "Invalid token",
                _ => "Could not validate credentials",
            };
            tracing::debug!("Token rejected: {}", err);
            AccessError::Unauthenticated(reason.to_string())
        })?;

        if data.claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AccessError::Unauthenticated(
                "Invalid token type".to_string(),
            ));
        }
        Ok(data.claims)
    }
}

#[async_trait]
impl AuthVerifier for JwtAuthVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AccessError> {
        let claims = self.decode_claims(token)?;

        let user_id = UserId::new(claims.sub)
            .map_err(|_| AccessError::Unauthenticated("Invalid token subject".to_string()))?;

        let account = self
            .users
            .find_user(&user_id)
            .await
            .map_err(AccessError::from)?
            .ok_or_else(|| AccessError::Unauthenticated("User not found".to_string()))?;

        if !account.is_active {
            tracing::warn!("Inactive user '{}' attempted to connect", user_id);
            return Err(AccessError::Unauthenticated("Inactive user".to_string()));
        }

        Ok(account.principal())
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header: Option<&str>) -> Option<&str> {
    let token = header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

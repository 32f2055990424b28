//! JWT token minting for operator tooling and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use taskhub_core::config::AuthConfig;
use taskhub_core::error::AppError;
use taskhub_core::types::{TenantId, UserId};
use taskhub_entity::user::UserRole;

use super::claims::Claims;

/// Creates signed access tokens with the same claims as the identity
/// service.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    ttl_minutes: i64,
    issuer: Option<String>,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("ttl_minutes", &self.ttl_minutes)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder; tokens expire `ttl_minutes` after issuance.
    pub fn new(config: &AuthConfig, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_minutes,
            issuer: (!config.issuer.is_empty()).then(|| config.issuer.clone()),
        }
    }

    /// Mint an access token.
    pub fn issue(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        role: UserRole,
        name: &str,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            tenant_id,
            role,
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.ttl_minutes)).timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))
    }
}

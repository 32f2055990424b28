//! JWT token validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use taskhub_core::config::AuthConfig;
use taskhub_core::error::AppError;

use super::claims::Claims;

/// Validates access tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;
        if !config.issuer.is_empty() {
            validation.set_issuer(&[config.issuer.as_str()]);
            validation.set_required_spec_claims(&["exp", "iss"]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates an access token string.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::authentication("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AppError::authentication("Invalid token format")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::authentication("Invalid token signature")
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AppError::authentication("Invalid token issuer")
                }
                jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(claim) => {
                    AppError::authentication(format!("Token is missing the '{claim}' claim"))
                }
                _ => AppError::authentication(format!("Token validation failed: {e}")),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encoder::JwtEncoder;
    use taskhub_core::error::ErrorKind;
    use taskhub_core::types::{TenantId, UserId};
    use taskhub_entity::user::UserRole;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_round_trip_claims() {
        let encoder = JwtEncoder::new(&config("s3cret"), 15);
        let user = UserId::new();
        let tenant = TenantId::new();
        let token = encoder
            .issue(user, tenant, UserRole::Manager, "Mia")
            .expect("token");

        let claims = JwtDecoder::new(&config("s3cret")).decode(&token).expect("valid");
        assert_eq!(claims.sub, user);
        assert_eq!(claims.tenant_id, tenant);
        assert_eq!(claims.role, UserRole::Manager);
        assert_eq!(claims.name, "Mia");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtEncoder::new(&config("one"), 15)
            .issue(UserId::new(), TenantId::new(), UserRole::Operator, "Op")
            .expect("token");
        let err = JwtDecoder::new(&config("two")).decode(&token).expect_err("bad signature");
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Invalid token signature");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = JwtEncoder::new(&config("s"), -10)
            .issue(UserId::new(), TenantId::new(), UserRole::Operator, "Op")
            .expect("token");
        let err = JwtDecoder::new(&config("s")).decode(&token).expect_err("expired");
        assert_eq!(err.message, "Token has expired");
    }

    #[test]
    fn test_issuer_is_checked_when_configured() {
        let mut issuing = config("s");
        issuing.issuer = "https://id.example.com".to_string();
        let token = JwtEncoder::new(&config("s"), 15)
            .issue(UserId::new(), TenantId::new(), UserRole::Operator, "Op")
            .expect("token");
        let err = JwtDecoder::new(&issuing).decode(&token).expect_err("no issuer");
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Token is missing the 'iss' claim");

        let mut other = config("s");
        other.issuer = "https://evil.example.com".to_string();
        let token = JwtEncoder::new(&other, 15)
            .issue(UserId::new(), TenantId::new(), UserRole::Operator, "Op")
            .expect("token");
        let err = JwtDecoder::new(&issuing).decode(&token).expect_err("wrong issuer");
        assert_eq!(err.message, "Invalid token issuer");

        let token = JwtEncoder::new(&issuing, 15)
            .issue(UserId::new(), TenantId::new(), UserRole::Operator, "Op")
            .expect("token");
        assert!(JwtDecoder::new(&issuing).decode(&token).is_ok());
    }
}

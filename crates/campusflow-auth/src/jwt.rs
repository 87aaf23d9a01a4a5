//! Token creation and verification.
//!
//! Access tokens are short lived and carry [`Claims`]. Refresh tokens carry
//! [`RefreshTokenClaims`] with `token_type = "refresh"` and are exchanged for
//! a fresh pair at `/api/auth/refresh`.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use campusflow_config::JwtConfig;
use campusflow_core::AppError;

use crate::claims::{Claims, RefreshTokenClaims};

const REFRESH_TOKEN_TYPE: &str = "refresh";

fn expires_at(now: i64, lifetime_secs: i64) -> usize {
    (now + lifetime_secs).max(0) as usize
}

/// Identity facts baked into an access token.
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
    pub tenant_id: Option<Uuid>,
    pub role: Option<&'a str>,
    pub permissions: Vec<String>,
}

pub fn create_access_token(
    subject: TokenSubject<'_>,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();

    let claims = Claims {
        sub: subject.user_id.to_string(),
        email: subject.email.to_string(),
        tenant_id: subject.tenant_id,
        role: subject.role.map(str::to_string),
        permissions: subject.permissions,
        exp: expires_at(now, jwt_config.access_token_expiry),
        iat: now as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token".to_string()))
}

pub fn create_refresh_token(
    user_id: Uuid,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();

    let claims = RefreshTokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: expires_at(now, jwt_config.refresh_token_expiry),
        iat: now as usize,
        jti: Uuid::new_v4().to_string(),
        token_type: REFRESH_TOKEN_TYPE.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create refresh token: {}", e)))
}

pub fn verify_refresh_token(
    token: &str,
    jwt_config: &JwtConfig,
) -> Result<RefreshTokenClaims, AppError> {
    let claims = decode::<RefreshTokenClaims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired refresh token".to_string()))?;

    if claims.token_type != REFRESH_TOKEN_TYPE {
        return Err(AppError::unauthorized(
            "Invalid or expired refresh token".to_string(),
        ));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        }
    }

    fn subject(user_id: Uuid, tenant_id: Option<Uuid>) -> TokenSubject<'static> {
        TokenSubject {
            user_id,
            email: "admin@riverdale.edu",
            tenant_id,
            role: Some("tenant_admin"),
            permissions: vec!["users:manage".to_string()],
        }
    }

    #[test]
    fn access_token_round_trip() {
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let token = create_access_token(subject(user_id, Some(tenant_id)), &config()).unwrap();

        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.tenant_id, Some(tenant_id));
        assert_eq!(claims.role.as_deref(), Some("tenant_admin"));
        assert_eq!(claims.permissions, vec!["users:manage".to_string()]);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_access_token(subject(Uuid::new_v4(), None), &config()).unwrap();
        let other = JwtConfig {
            secret: "another-secret-key-at-least-32-characters".to_string(),
            ..config()
        };
        let err = verify_token(&token, &other).unwrap_err();
        assert_eq!(err.status.as_u16(), 401);
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = JwtConfig {
            access_token_expiry: -120,
            ..config()
        };
        let token = create_access_token(subject(Uuid::new_v4(), None), &expired).unwrap();
        assert!(verify_token(&token, &config()).is_err());
    }

    #[test]
    fn refresh_tokens_are_unique_and_verifiable() {
        let user_id = Uuid::new_v4();
        let a = create_refresh_token(user_id, "a@b.c", &config()).unwrap();
        let b = create_refresh_token(user_id, "a@b.c", &config()).unwrap();
        assert_ne!(a, b);

        let claims = verify_refresh_token(&a, &config()).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.token_type, "refresh");
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let token = create_access_token(subject(Uuid::new_v4(), None), &config()).unwrap();
        assert!(verify_refresh_token(&token, &config()).is_err());
    }
}

use chrono::{DateTime, Utc};
use campusflow_models::UserId;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifetime of a password reset link.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Trial length granted to colleges that sign up themselves.
pub const SIGNUP_TRIAL_DAYS: i64 = 14;

/// Plan a self-service signup starts on.
pub const TRIAL_PLAN_SLUG: &str = "free-trial";

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists with that email, a password reset link has been sent";

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl PasswordResetToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.used && now < self.expires_at
    }
}

/// 32 random bytes, hex encoded. Only the hash is stored.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn reset_tokens_are_random_hex() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn hashing_is_stable_and_hides_the_token() {
        let token = generate_reset_token();
        assert_eq!(hash_reset_token(&token), hash_reset_token(&token));
        assert_ne!(hash_reset_token(&token), token);
    }

    #[test]
    fn used_or_expired_tokens_are_rejected() {
        let now = Utc::now();
        let mut row = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id: UserId::new(),
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
            used: false,
        };
        assert!(row.is_usable(now));

        row.used = true;
        assert!(!row.is_usable(now));

        row.used = false;
        row.expires_at = now - Duration::seconds(1);
        assert!(!row.is_usable(now));
    }
}

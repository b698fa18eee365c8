//! Bearer token authentication
//!
//! The token subject is the numeric user id. Issuing tokens (login) happens
//! elsewhere; this module only signs and checks them.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::UserId;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// The user the token was issued to
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| AuthError::InvalidToken)
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token lifetime of {0} hours is out of range")]
    LifetimeOutOfRange(u64),
}

/// Signs a token for a user
pub fn create_token(user_id: UserId, secret: &str, expiration_hours: u64) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = i64::try_from(expiration_hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or(AuthError::LifetimeOutOfRange(expiration_hours))?;

    let claims = Claims {
        sub: user_id.value().to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_carries_user_id() {
        let token = create_token(UserId::new(21), SECRET, 1).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId::new(21));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(UserId::new(21), SECRET, 1).unwrap();
        assert!(matches!(validate_token(&token, "other"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: "21".into(),
            exp: past.timestamp(),
            iat: past.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_oversized_lifetime_is_an_error() {
        assert!(matches!(
            create_token(UserId::new(21), SECRET, u64::MAX),
            Err(AuthError::LifetimeOutOfRange(u64::MAX))
        ));
        assert!(matches!(
            create_token(UserId::new(21), SECRET, 10_000_000_000_000),
            Err(AuthError::LifetimeOutOfRange(_))
        ));
    }

    #[test]
    fn test_non_numeric_subject_is_invalid() {
        let claims = Claims {
            sub: "admin".into(),
            exp: 0,
            iat: 0,
        };
        assert!(matches!(claims.user_id(), Err(AuthError::InvalidToken)));
    }
}

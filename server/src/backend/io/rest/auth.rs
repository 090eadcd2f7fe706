//! Bearer token authentication.
//!
//! Access tokens are HS256 JWTs carrying the user id in `sub` and
//! `type = "access"`. Handlers take a [`CurrentUser`] argument to require one.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::domain::error::LoyaltyError;
use crate::backend::domain::models::User;
use crate::backend::io::rest::error::ApiError;
use crate::backend::storage::UserRepository;
use crate::backend::AppState;

pub const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    #[serde(rename = "type")]
    pub token_type: String,
    pub exp: i64,
}

/// Signs and checks access tokens with a shared secret
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenAuthority {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Issue an access token; sessions are managed elsewhere, this serves tooling and tests
    pub fn issue_access_token(&self, user_id: i64, ttl: Duration) -> Result<String, LoyaltyError> {
        let claims = Claims {
            sub: user_id,
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| LoyaltyError::Internal(format!("failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, LoyaltyError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| LoyaltyError::Unauthorized(format!("invalid token: {}", e)))
    }
}

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Authorization header must use the Bearer scheme"))?;

        let claims = state.tokens.verify(token).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            ApiError::from(e)
        })?;
        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(ApiError::bad_request("Invalid token type"));
        }

        let mut conn = state.db.pool().acquire().await.map_err(LoyaltyError::from)?;
        let user = UserRepository::find_by_id(&mut conn, claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User not found"))?;

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify() {
        let authority = TokenAuthority::new(b"test-secret");
        let token = authority.issue_access_token(9, Duration::minutes(5)).unwrap();

        let claims = authority.verify(&token).unwrap();
        assert_eq!(claims.sub, 9);
        assert_eq!(claims.token_type, ACCESS_TOKEN_TYPE);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = TokenAuthority::new(b"one")
            .issue_access_token(9, Duration::minutes(5))
            .unwrap();
        let result = TokenAuthority::new(b"two").verify(&token);
        assert!(matches!(result, Err(LoyaltyError::Unauthorized(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let authority = TokenAuthority::new(b"test-secret");
        let token = authority.issue_access_token(9, Duration::hours(-1)).unwrap();
        assert!(matches!(authority.verify(&token), Err(LoyaltyError::Unauthorized(_))));
    }
}

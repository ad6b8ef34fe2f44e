use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::user::UserRole;

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_minutes: i64,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    /// Session id; revocation is tracked per session, not per user.
    pub sid: Uuid,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

pub fn issue_token(
    user_id: Uuid,
    role: UserRole,
    keys: &SessionKeys,
) -> jsonwebtoken::errors::Result<(String, SessionClaims)> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(keys.ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        sid: Uuid::new_v4(),
        role,
        exp,
        iat: now.timestamp() as usize,
    };
    let token = jsonwebtoken::encode(&Header::default(), &claims, &keys.encoding)?;
    Ok((token, claims))
}

pub fn decode_token(token: &str, keys: &SessionKeys) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(token, &keys.decoding, &Validation::default())
        .map(|data| data.claims)
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Sessions revoked by logout, kept until their tokens would have expired anyway.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    revoked: Arc<RwLock<HashMap<Uuid, usize>>>,
}

impl SessionRegistry {
    pub async fn revoke(&self, claims: &SessionClaims) {
        let now = Utc::now().timestamp() as usize;
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.sid, claims.exp);
    }

    pub async fn is_revoked(&self, sid: Uuid) -> bool {
        self.revoked.read().await.contains_key(&sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret", 60)
    }

    #[test]
    fn test_issue_and_decode() {
        let user_id = Uuid::new_v4();
        let (token, issued) = issue_token(user_id, UserRole::MarketingHead, &keys()).unwrap();
        let decoded = decode_token(&token, &keys()).unwrap();
        assert_eq!(decoded.sub, user_id);
        assert_eq!(decoded.sid, issued.sid);
        assert_eq!(decoded.role, UserRole::MarketingHead);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (token, _) = issue_token(Uuid::new_v4(), UserRole::Ceo, &keys()).unwrap();
        assert!(decode_token(&token, &SessionKeys::new("other", 60)).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let expired = SessionKeys::new("test-secret", -120);
        let (token, _) = issue_token(Uuid::new_v4(), UserRole::Ceo, &expired).unwrap();
        assert!(decode_token(&token, &keys()).is_err());
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  xyz "), Some("xyz"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[tokio::test]
    async fn test_revocation() {
        let registry = SessionRegistry::default();
        let (_, claims) = issue_token(Uuid::new_v4(), UserRole::Ceo, &keys()).unwrap();
        assert!(!registry.is_revoked(claims.sid).await);
        registry.revoke(&claims).await;
        assert!(registry.is_revoked(claims.sid).await);
    }
}

//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs issued by Supabase; `sub` is the user id. The raw
//! token is kept so table queries run under the caller's row-level security.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Supabase sets `aud: authenticated`; we don't pin it.
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self { key: DecodingKey::from_secret(secret.as_bytes()), validation }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.key, &self.validation).map(|data| data.claims)
    }
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtVerifier").finish_non_exhaustive()
    }
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::MissingToken)?;

        let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();

        let claims = state.jwt.verify(token).map_err(|err| {
            debug!(error = %err, "Rejected bearer token");
            ApiError::InvalidToken
        })?;

        Ok(AuthUser { id: claims.sub, token: token.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, claims: &Claims) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
            .unwrap()
    }

    #[test]
    fn verifies_token_signed_with_secret() {
        let verifier = JwtVerifier::new("secret");
        let jwt = token("secret", &Claims { sub: "user-1".into(), exp: None });

        assert_eq!(verifier.verify(&jwt).unwrap().sub, "user-1");
    }

    #[test]
    fn rejects_wrong_secret_and_garbage() {
        let verifier = JwtVerifier::new("secret");
        let jwt = token("other", &Claims { sub: "user-1".into(), exp: None });

        assert!(verifier.verify(&jwt).is_err());
        assert!(verifier.verify("not-a-jwt").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = JwtVerifier::new("secret");
        let jwt = token("secret", &Claims { sub: "user-1".into(), exp: Some(1_000_000) });

        assert!(verifier.verify(&jwt).is_err());
    }
}

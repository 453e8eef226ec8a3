use crate::config::tokens::JwtSettings;
use crate::utils::auth::errors::AuthError;

use anyhow::Context;
use axum::{async_trait, extract::FromRequestParts, RequestPartsExt};
use axum_extra::extract::CookieJar;
use http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

/// Access token claims issued by the identity provider.
///
/// The caller's identity comes from here only, never from request bodies.
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub jti: Uuid,
    pub uid: Uuid,
    pub exp: u64,
}

impl Claims {
    pub const COOKIE_NAME: &'static str = "jwt";

    pub fn new(uid: Uuid, duration: Duration) -> Self {
        Self {
            jti: Uuid::new_v4(),
            uid,
            exp: jsonwebtoken::get_current_timestamp() + duration.whole_seconds().unsigned_abs(),
        }
    }

    pub fn generate_jwt(&self, key: &Secret<String>) -> Result<String, AuthError> {
        Ok(encode(
            &Header::default(),
            &self,
            &EncodingKey::from_secret(key.expose_secret().as_bytes()),
        )
        .context("Failed to encrypt token")?)
    }

    pub fn decode_jwt(token: &str, key: &Secret<String>) -> Result<Self, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 5;

        let data = decode::<Self>(
            token,
            &DecodingKey::from_secret(key.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(|_e| AuthError::InvalidToken)?;

        Ok(data.claims)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let secrets = parts
            .extensions
            .get::<JwtSettings>()
            .cloned()
            .context("Failed to get jwt settings extension")?;

        let token = match bearer_token(&parts.headers) {
            Some(token) => token,
            None => {
                let jar = parts
                    .extract::<CookieJar>()
                    .await
                    .context("Failed to fetch cookie jar")?;
                jar.get(Self::COOKIE_NAME)
                    .ok_or(AuthError::InvalidToken)?
                    .value()
                    .to_string()
            }
        };

        Self::decode_jwt(&token, &secrets.access.0.token)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod claims_tests {
    use super::*;
    use http::HeaderValue;

    fn secret() -> Secret<String> {
        Secret::new("TEST_SECRET".to_string())
    }

    #[test]
    fn token_round_trip_keeps_uid() {
        let uid = Uuid::new_v4();
        let token = Claims::new(uid, Duration::minutes(5))
            .generate_jwt(&secret())
            .unwrap();
        let claims = Claims::decode_jwt(&token, &secret()).unwrap();
        assert_eq!(claims.uid, uid);
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = Claims::new(Uuid::new_v4(), Duration::minutes(5))
            .generate_jwt(&Secret::new("OTHER".to_string()))
            .unwrap();
        assert!(matches!(
            Claims::decode_jwt(&token, &secret()),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = Claims::new(Uuid::new_v4(), Duration::minutes(5));
        claims.exp = jsonwebtoken::get_current_timestamp() - 120;
        let token = claims.generate_jwt(&secret()).unwrap();
        assert!(matches!(
            Claims::decode_jwt(&token, &secret()),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_header_is_parsed() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}

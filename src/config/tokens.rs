use crate::config::get_secret_env;
use secrecy::Secret;
use serde::Deserialize;
use time::Duration;
use tracing::warn;

pub const NAME_ACCESS_SECRET: &str = "JWT_ACCESS_SECRET";

const ACCESS_SECRET: &str = "ACCESS_SECRET";
const ACCESS_EXPIRATION: Duration = Duration::minutes(15);

#[derive(Deserialize)]
pub struct JwtSettingsModel {
    pub access: Option<TokenDataModel>,
}

#[derive(Deserialize)]
pub struct TokenDataModel {
    pub token: Option<String>,
    pub expiration: Option<Duration>,
}

impl TokenDataModel {
    fn to_access(self) -> AccessTokenData {
        let token = self.token.unwrap_or_else(|| {
            warn!("Using default access token secret");
            ACCESS_SECRET.to_string()
        });
        let expiration = self.expiration.map_or(ACCESS_EXPIRATION, |expiration| {
            warn!("Using custom access token expiration of {}", &expiration);
            expiration
        });
        AccessTokenData(TokenData::new(Secret::new(token), expiration))
    }
}

/// Shared secret used to verify identity-provider tokens.
#[derive(Clone)]
pub struct JwtSettings {
    pub access: AccessTokenData,
}

impl JwtSettings {
    pub fn new(access: &str) -> Self {
        Self {
            access: AccessTokenData(TokenData::new(
                Secret::new(access.to_string()),
                ACCESS_EXPIRATION,
            )),
        }
    }

    pub fn from_env() -> Self {
        Self {
            access: AccessTokenData(TokenData::new(
                get_secret_env(NAME_ACCESS_SECRET),
                ACCESS_EXPIRATION,
            )),
        }
    }
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self::new(ACCESS_SECRET)
    }
}

#[derive(Clone)]
pub struct TokenData {
    pub token: Secret<String>,
    pub expiration: Duration,
}

impl TokenData {
    fn new(token: Secret<String>, expiration: Duration) -> Self {
        Self { token, expiration }
    }
}

#[derive(Clone)]
pub struct AccessTokenData(pub TokenData);

impl JwtSettingsModel {
    pub fn to_settings(self) -> JwtSettings {
        let access = self.access.map_or_else(
            || {
                warn!("Using default access token");
                JwtSettings::default().access
            },
            |t| t.to_access(),
        );

        JwtSettings { access }
    }
}

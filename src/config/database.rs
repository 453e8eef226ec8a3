use crate::config::{get_env, try_get_env};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tracing::info;

pub const NAME_POSTGRES: &str = "DATABASE_URL";

#[derive(Deserialize, Clone)]
pub struct DatabaseFieldsModel {
    username: Option<String>,
    password: Option<String>,
    port: Option<u16>,
    host: Option<String>,
    database_name: Option<String>,
}

impl DatabaseFieldsModel {
    fn to_fields(self) -> DatabaseFields {
        DatabaseFields {
            username: self.username.unwrap_or("postgres".to_string()),
            password: Secret::new(self.password.unwrap_or_default()),
            port: self.port.unwrap_or(5432),
            host: self.host.unwrap_or("localhost".to_string()),
            database_name: self.database_name.unwrap_or("couple_link".to_string()),
        }
    }
}

#[derive(Clone)]
pub struct DatabaseFields {
    username: String,
    password: Secret<String>,
    port: u16,
    host: String,
    database_name: String,
}

impl DatabaseFields {
    fn compose(&self, scheme: &str) -> Secret<String> {
        Secret::new(format!(
            "{scheme}://{}:{}@{}:{}/{}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.database_name
        ))
    }
}

#[derive(Deserialize, Clone)]
pub struct PostgresSettingsModel {
    database_url: Option<String>,
    fields: Option<DatabaseFieldsModel>,
    is_migrating: Option<bool>,
}

impl PostgresSettingsModel {
    /// Composed fields win over an explicit url, which wins over `DATABASE_URL`.
    fn connection_string(&self) -> Option<Secret<String>> {
        if let Some(fields) = &self.fields {
            info!("Using composed url for postgresql");
            return Some(fields.clone().to_fields().compose("postgresql"));
        }
        if let Some(url) = &self.database_url {
            info!("Using field url for postgresql");
            return Some(Secret::new(url.clone()));
        }
        let url = try_get_env(NAME_POSTGRES)?;
        info!("Using env url for postgresql");
        Some(Secret::new(url))
    }

    pub fn to_settings(self) -> Option<PostgresSettings> {
        let is_migrating = self.is_migrating.unwrap_or(false);
        let database_url = self.connection_string()?;
        Some(PostgresSettings {
            database_url,
            is_migrating,
        })
    }
}

#[derive(Clone)]
pub struct PostgresSettings {
    pub database_url: Secret<String>,
    pub is_migrating: bool,
}

impl PostgresSettings {
    pub fn from_env() -> Self {
        Self {
            database_url: Secret::new(get_env(NAME_POSTGRES)),
            is_migrating: true,
        }
    }

    /// `DATABASE_URL` when set, otherwise nothing.
    pub fn try_from_env() -> Option<Self> {
        Some(Self {
            database_url: Secret::new(try_get_env(NAME_POSTGRES)?),
            is_migrating: false,
        })
    }
}

use self::database::get_postgres_pool;
use crate::config::app::ApplicationSettings;
use crate::config::environment::Environment;
use crate::config::get_config;
use crate::config::tokens::JwtSettings;
use crate::utils::pairing::code::{CodeGenerator, RandomCodes};
use crate::utils::pairing::memory::MemoryStore;
use crate::utils::pairing::models::InviteLinks;
use crate::utils::pairing::postgres::PgStore;
use crate::utils::pairing::store::PairingStore;
use axum::extract::FromRef;
use core::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod database;

pub struct Modules {
    pub app: ApplicationSettings,
    store: Arc<dyn PairingStore>,
    codes: Arc<dyn CodeGenerator>,
    jwt: JwtSettings,
    environment: Environment,
}

impl Modules {
    pub async fn load_from_settings() -> Self {
        let settings = get_config()
            .map_err(|e| error!("Failed to load settings {e:#?}"))
            .expect("Invalid settings");
        info!("Settings loaded");
        info!("Loading modules");
        let store: Arc<dyn PairingStore> = match settings.postgres {
            Some(postgres) => {
                info!("Using postgres store");
                Arc::new(PgStore::new(get_postgres_pool(postgres).await))
            }
            None => {
                warn!("Using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };
        info!("Modules loaded");
        Self {
            store,
            codes: Arc::new(RandomCodes),
            app: settings.app,
            jwt: settings.jwt,
            environment: settings.environment,
        }
    }

    pub fn use_custom(
        store: Arc<dyn PairingStore>,
        codes: Arc<dyn CodeGenerator>,
        addr: SocketAddr,
        origin: String,
        access: &str,
        environment: Environment,
    ) -> Self {
        Self {
            store,
            codes,
            app: ApplicationSettings::new(addr, origin),
            jwt: JwtSettings::new(access),
            environment,
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(self)
    }

    pub fn extensions(&self) -> AppExtensions {
        AppExtensions::new(self)
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}

#[derive(Clone, FromRef)]
pub struct AppState {
    pub environment: Environment,
    pub store: Arc<dyn PairingStore>,
    pub codes: Arc<dyn CodeGenerator>,
    pub links: InviteLinks,
}

impl AppState {
    fn new(modules: &Modules) -> Self {
        Self {
            environment: modules.environment,
            store: modules.store.clone(),
            codes: modules.codes.clone(),
            links: InviteLinks::new(&modules.app.origin),
        }
    }
}

impl Display for AppState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "pairing store, code generator, invite links")
    }
}

pub struct AppExtensions {
    pub jwt: JwtSettings,
}

impl AppExtensions {
    fn new(modules: &Modules) -> Self {
        Self {
            jwt: modules.jwt.clone(),
        }
    }
}

impl Display for AppExtensions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "token secrets")
    }
}

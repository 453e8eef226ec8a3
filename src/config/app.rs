use crate::config::get_env;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tracing::warn;

pub const NAME_PORT: &str = "PORT";
pub const NAME_ORIGIN: &str = "WEBSITE_URL";

const DEFAULT_HOST: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_ORIGIN: &str = "http://127.0.0.1:3000";

#[derive(Deserialize)]
pub struct ApplicationSettingsModel {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub origin: Option<String>,
}

impl ApplicationSettingsModel {
    pub fn to_settings(self) -> ApplicationSettings {
        let host = self.host.map_or_else(
            || {
                warn!("Using default host");
                DEFAULT_HOST
            },
            |host| Ipv4Addr::from_str(&host).expect("Incorrect host"),
        );
        let port = self.port.unwrap_or_else(|| {
            warn!("Using default port");
            DEFAULT_PORT
        });
        let origin = self.origin.unwrap_or_else(|| {
            warn!("Using default origin for invite links");
            DEFAULT_ORIGIN.to_string()
        });

        ApplicationSettings::new(SocketAddr::new(IpAddr::V4(host), port), origin)
    }
}

#[derive(Clone)]
pub struct ApplicationSettings {
    pub addr: SocketAddr,
    /// Base of the shareable join links.
    pub origin: String,
}

impl ApplicationSettings {
    pub fn new(addr: SocketAddr, origin: String) -> Self {
        Self { addr, origin }
    }

    pub fn from_env() -> Self {
        let port = get_env(NAME_PORT)
            .parse::<u16>()
            .expect("Invalid port number");
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            origin: get_env(NAME_ORIGIN),
        }
    }
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(DEFAULT_HOST), DEFAULT_PORT),
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

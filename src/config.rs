use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::store::StoreConfig;

/// An unprivileged port, so the gateway runs without root. 110 can be
/// forwarded to it where clients expect the standard port.
const DEFAULT_PORT: u16 = 5110;

fn default_socket() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)
}

fn default_mail_root() -> PathBuf {
    PathBuf::from("/var/lib/popgate")
}

fn default_banner() -> String {
    String::from("popgate POP3 server ready")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Address and port to accept POP3 connections on
    #[serde(default = "default_socket")]
    pub socket: SocketAddr,

    /// Directory holding the per-user local mailboxes (downloaded
    /// messages, metadata sidecars and index ledgers)
    #[serde(default = "default_mail_root")]
    pub mail_root: PathBuf,

    /// Greeting sent as the first line of every connection
    #[serde(default = "default_banner")]
    pub banner: String,

    /// Which object store the mailboxes are synchronised from
    pub store: StoreConfig,
}

impl Config {
    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// If the file doesn't exist, is not readable, or is not valid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            anyhow::anyhow!("Failed to read config from {}: {}", path.display(), err)
        })?;

        Ok(toml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_fill_in() {
        let config: Config = toml::from_str(
            r#"
            [store]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.socket.port(), DEFAULT_PORT);
        assert_eq!(config.mail_root, PathBuf::from("/var/lib/popgate"));
        assert!(matches!(config.store, StoreConfig::Memory));
    }

    #[test]
    fn full_config_parses() {
        let config: Config = toml::from_str(
            r#"
            socket = "127.0.0.1:1100"
            mail_root = "/tmp/popgate"
            banner = "hello"

            [store]
            backend = "fs"
            root = "/srv/mail-objects"
            "#,
        )
        .unwrap();

        assert_eq!(config.socket.port(), 1100);
        assert_eq!(config.banner, "hello");
        assert!(matches!(config.store, StoreConfig::Fs { .. }));
    }
}

//! Server-side configuration file.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//!
//! [storage]
//! data_dir = "/var/lib/droplink"
//!
//! [jwt]
//! secret = "..."
//! expire_secs = 604800
//!
//! [pi]
//! network = "mainnet"
//! api_key = "..."
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use droplink::pi::PiConfig;
use droplink::service::DroplinkConfig;

/// Directory holding named contexts (`droplinkd -c prod`).
const CONTEXT_DIR: &str = "/etc/droplink";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub pi: PiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Session token lifetime.
    #[serde(default = "default_expire_secs")]
    pub expire_secs: i64,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_expire_secs() -> i64 {
    7 * 24 * 3600
}

impl ServerConfig {
    /// A bare name resolves to `/etc/droplink/<name>.toml`; anything with a
    /// `/` or `.` is used as a path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            Path::new(CONTEXT_DIR).join(format!("{}.toml", name_or_path))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Settings for the Droplink service.
    pub fn droplink_config(&self) -> DroplinkConfig {
        DroplinkConfig {
            jwt_secret: self.jwt.secret.clone(),
            session_ttl: self.jwt.expire_secs,
            pi: self.pi.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_context_names() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/droplink/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./dev.toml"),
            PathBuf::from("./dev.toml")
        );
    }

    #[test]
    fn parse_minimal_config() {
        let config = ServerConfig::parse(
            r#"
            [storage]
            data_dir = "/tmp/droplink"

            [jwt]
            secret = "s3cret"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.jwt.expire_secs, 604800);
        assert!(!config.pi.mock_auth);

        let dl = config.droplink_config();
        assert_eq!(dl.jwt_secret, "s3cret");
        assert_eq!(dl.ad_window_minutes, 30);
    }

    #[test]
    fn parse_pi_section() {
        let config = ServerConfig::parse(
            r#"
            [server]
            listen = "127.0.0.1:9000"

            [storage]
            data_dir = "/tmp/droplink"

            [jwt]
            secret = "s3cret"
            expire_secs = 60

            [pi]
            network = "testnet"
            api_key = "key"
            mock_auth = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert!(config.pi.sandbox());
        assert!(config.pi.mock_auth);
        assert_eq!(config.droplink_config().session_ttl, 60);
    }

    #[test]
    fn missing_jwt_section_is_an_error() {
        assert!(ServerConfig::parse("[storage]\ndata_dir = \"/tmp\"\n").is_err());
    }
}

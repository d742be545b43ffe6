//! Bootstrap: first-start checks and forum seeding.
//!
//! When droplinkd starts:
//! 1. Verify the config is complete; refuse to start otherwise.
//! 2. Create the default forum categories if there are none.
//! 3. Drop ad grants that expired while the server was down.

use tracing::info;

use droplink::service::DroplinkService;

use crate::config::ServerConfig;

/// Verify server configuration is ready for production use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.jwt.expire_secs <= 0 {
        anyhow::bail!("jwt.expire_secs must be positive.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    if !config.pi.mock_auth && config.pi.api_key.is_empty() {
        anyhow::bail!(
            "Pi API key is empty in configuration.\n\
             Set [pi] api_key, or mock_auth = true for local development."
        );
    }
    Ok(())
}

/// Seed default forum categories on an empty database.
pub fn seed_forum(svc: &DroplinkService) -> anyhow::Result<()> {
    let created = svc
        .seed_default_categories()
        .map_err(|e| anyhow::anyhow!("failed to seed forum categories: {}", e))?;
    if created > 0 {
        info!("Created {} default forum categories", created);
    }
    Ok(())
}

/// Remove ad grants that expired while the server was down.
pub fn sweep_ad_grants(svc: &DroplinkService) -> anyhow::Result<()> {
    svc.purge_expired_ad_access()
        .map_err(|e| anyhow::anyhow!("failed to purge ad grants: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str, data_dir: &str, api_key: &str, mock: bool) -> ServerConfig {
        ServerConfig::parse(&format!(
            r#"
            [storage]
            data_dir = "{}"

            [jwt]
            secret = "{}"

            [pi]
            api_key = "{}"
            mock_auth = {}
            "#,
            data_dir, secret, api_key, mock
        ))
        .unwrap()
    }

    #[test]
    fn accepts_complete_config() {
        assert!(verify_config(&config("s", "/tmp", "key", false)).is_ok());
        assert!(verify_config(&config("s", "/tmp", "", true)).is_ok());
    }

    #[test]
    fn rejects_empty_secret() {
        assert!(verify_config(&config("", "/tmp", "key", false)).is_err());
    }

    #[test]
    fn rejects_empty_data_dir() {
        assert!(verify_config(&config("s", "", "key", false)).is_err());
    }

    #[test]
    fn rejects_missing_api_key_without_mock() {
        let err = verify_config(&config("s", "/tmp", "", false)).unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn startup_seeds_forum_and_sweeps_stale_ad_grants() {
        use std::sync::Arc;

        use droplink::service::DroplinkConfig;
        use droplink::DroplinkModule;
        use droplink_core::SystemClock;
        use droplink_kv::{KVStore, RedbStore};
        use droplink_sql::SqliteStore;

        let dir = tempfile::tempdir().unwrap();
        let sql = Arc::new(SqliteStore::open(&dir.path().join("data.sqlite")).unwrap());
        let kv = Arc::new(RedbStore::open(&dir.path().join("data.redb")).unwrap());
        kv.set("ads/stale", b"2020-01-01T00:00:00Z").unwrap();
        kv.set("ads/live", b"2999-01-01T00:00:00Z").unwrap();

        let mut config = DroplinkConfig::default();
        config.pi.mock_auth = true;
        let module = DroplinkModule::new(sql, kv.clone(), Arc::new(SystemClock), config).unwrap();

        seed_forum(module.service()).unwrap();
        sweep_ad_grants(module.service()).unwrap();

        assert!(!module.service().list_categories().unwrap().is_empty());
        assert!(kv.get("ads/stale").unwrap().is_none());
        assert!(kv.get("ads/live").unwrap().is_some());
    }
}

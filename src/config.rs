//! Typed application configuration, loaded once at startup via
//! `AppConfig::load()` after `dotenvy::dotenv()`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,

    pub database_url: String,
    pub redis_url: String,

    pub signing_private_key: String,
    pub oracle_address: String,

    /// Address shape the Validator checks against, generalized from a
    /// hardcoded `0x`+40-hex check into a configurable prefix/length pair.
    pub address_prefix: String,
    pub address_length: usize,

    #[serde(default = "default_max_audit_entries_per_market")]
    pub max_audit_entries_per_market: u64,
    #[serde(default = "default_max_audit_entries_global")]
    pub max_audit_entries_global: u64,
    #[serde(default = "default_admission_lock_ttl_ms")]
    pub admission_lock_ttl_ms: u64,
}

fn default_max_audit_entries_per_market() -> u64 {
    100_000
}

fn default_max_audit_entries_global() -> u64 {
    1_000_000
}

fn default_admission_lock_ttl_ms() -> u64 {
    5_000
}

impl AppConfig {
    /// Loads configuration from the process environment:
    /// `DATABASE_URL`, `REDIS_URL`, `SIGNING_PRIVATE_KEY`, `PORT`, `HOST`,
    /// `LOG_LEVEL`, `ORACLE_ADDRESS`, and the two optional overrides.
    pub fn load() -> anyhow::Result<Self> {
        let raw = config::Config::builder()
            .set_default("environment", "development")?
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("log_level", "info")?
            .set_default("address_prefix", "0x")?
            .set_default("address_length", 40)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        let config: AppConfig = raw.try_deserialize()?;
        Ok(config)
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        AppConfig {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "debug".to_string(),
            database_url: "postgres://localhost/test".to_string(),
            redis_url: "redis://localhost".to_string(),
            signing_private_key: "0x0000000000000000000000000000000000000000000000000000000000000001".to_string(),
            oracle_address: "0x0000000000000000000000000000000000000001".to_string(),
            address_prefix: "0x".to_string(),
            address_length: 40,
            max_audit_entries_per_market: default_max_audit_entries_per_market(),
            max_audit_entries_global: default_max_audit_entries_global(),
            admission_lock_ttl_ms: default_admission_lock_ttl_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_test_config_has_sane_defaults() {
        let cfg = AppConfig::for_test();
        assert_eq!(cfg.admission_lock_ttl_ms, 5_000);
        assert_eq!(cfg.address_prefix, "0x");
        assert_eq!(cfg.address_length, 40);
    }
}

//! Process configuration read from the environment (and `.env` when present).

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use std::net::SocketAddr;
use tracing::warn;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:loyalty.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CODE_TTL_SECONDS: i64 = 300;
/// One day; a code is meant to be shown at the counter right after issuance
pub const MAX_CODE_TTL_SECONDS: i64 = 86_400;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub code_ttl: chrono::Duration,
    pub allowed_origin: String,
}

impl AppConfig {
    /// Load from the process environment after merging `.env`
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary lookup so tests need not touch the real environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("LOYALTY_DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = lookup("LOYALTY_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("LOYALTY_BIND_ADDR must be a socket address such as 127.0.0.1:3000")?;

        let code_ttl_seconds = match lookup("LOYALTY_CODE_TTL_SECONDS") {
            Some(raw) => raw
                .parse::<i64>()
                .context("LOYALTY_CODE_TTL_SECONDS must be an integer")?,
            None => DEFAULT_CODE_TTL_SECONDS,
        };
        if !(1..=MAX_CODE_TTL_SECONDS).contains(&code_ttl_seconds) {
            return Err(anyhow!(
                "LOYALTY_CODE_TTL_SECONDS must be between 1 and {}, got {}",
                MAX_CODE_TTL_SECONDS,
                code_ttl_seconds
            ));
        }
        let code_ttl = chrono::Duration::try_seconds(code_ttl_seconds)
            .ok_or_else(|| anyhow!("LOYALTY_CODE_TTL_SECONDS is out of range: {}", code_ttl_seconds))?;

        let jwt_secret = match lookup("LOYALTY_JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("LOYALTY_JWT_SECRET is not set, generating a random secret; tokens will not survive a restart");
                random_secret()
            }
        };

        let allowed_origin =
            lookup("LOYALTY_ALLOWED_ORIGIN").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string());

        Ok(Self {
            database_url,
            bind_addr,
            jwt_secret,
            code_ttl,
            allowed_origin,
        })
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.code_ttl, chrono::Duration::seconds(300));
        assert!(!config.jwt_secret.is_empty());
    }

    #[test]
    fn explicit_values_win() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("LOYALTY_DATABASE_URL", "sqlite::memory:"),
            ("LOYALTY_BIND_ADDR", "0.0.0.0:8000"),
            ("LOYALTY_JWT_SECRET", "s3cret"),
            ("LOYALTY_CODE_TTL_SECONDS", "60"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.code_ttl, chrono::Duration::seconds(60));
    }

    #[test]
    fn invalid_values_fail_startup() {
        assert!(AppConfig::from_lookup(lookup_from(&[("LOYALTY_BIND_ADDR", "nowhere")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("LOYALTY_CODE_TTL_SECONDS", "soon")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("LOYALTY_CODE_TTL_SECONDS", "0")])).is_err());
    }

    #[test]
    fn oversized_code_ttl_is_rejected() {
        for raw in ["9223372036854775807", "9000000000000000", "86401"] {
            let err = AppConfig::from_lookup(lookup_from(&[("LOYALTY_CODE_TTL_SECONDS", raw)]))
                .expect_err("oversized TTL must fail startup");
            assert!(err.to_string().contains("LOYALTY_CODE_TTL_SECONDS"));
        }

        let longest = AppConfig::from_lookup(lookup_from(&[("LOYALTY_CODE_TTL_SECONDS", "86400")])).unwrap();
        assert_eq!(longest.code_ttl, chrono::Duration::days(1));
    }
}

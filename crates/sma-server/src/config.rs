use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use sma_db::DbOptions;
use thiserror::Error;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SMA_JWT_SECRET is unset or still a placeholder")]
    MissingSecret,

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl: chrono::Duration,
    pub db: DbOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        let jwt_secret = get("SMA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }

        let host = get("SMA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse(vars, "SMA_PORT", 8000)?;
        let addr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::Invalid { name: "SMA_HOST", value: host })?;

        let expire_minutes: i64 = parse(vars, "SMA_TOKEN_EXPIRE_MINUTES", 30)?;
        if expire_minutes <= 0 {
            return Err(ConfigError::Invalid {
                name: "SMA_TOKEN_EXPIRE_MINUTES",
                value: expire_minutes.to_string(),
            });
        }

        let busy_timeout_ms: u64 = parse(vars, "SMA_DB_BUSY_TIMEOUT_MS", 5000)?;
        let readers: usize = parse(vars, "SMA_DB_READERS", 4)?;

        Ok(Self {
            jwt_secret,
            db_path: get("SMA_DB_PATH").unwrap_or_else(|| "sma.db".into()).into(),
            addr,
            token_ttl: chrono::Duration::minutes(expire_minutes),
            db: DbOptions {
                reader_pool_size: readers.max(1),
                busy_timeout: Duration::from_millis(busy_timeout_ms),
            },
        })
    }
}

fn parse<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name, value: raw.clone() }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults() {
        let config = Config::from_vars(&vars(&[("SMA_JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.db_path, PathBuf::from("sma.db"));
        assert_eq!(config.token_ttl, chrono::Duration::minutes(30));
        assert_eq!(config.db.reader_pool_size, 4);
        assert_eq!(config.db.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(matches!(Config::from_vars(&vars(&[])), Err(ConfigError::MissingSecret)));
        assert!(matches!(
            Config::from_vars(&vars(&[("SMA_JWT_SECRET", "dev-secret-change-me")])),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn overrides_and_bad_values() {
        let config = Config::from_vars(&vars(&[
            ("SMA_JWT_SECRET", "s3cret"),
            ("SMA_HOST", "127.0.0.1"),
            ("SMA_PORT", "9001"),
            ("SMA_DB_PATH", "/tmp/x.db"),
            ("SMA_TOKEN_EXPIRE_MINUTES", "5"),
            ("SMA_DB_READERS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:9001".parse::<SocketAddr>().unwrap());
        assert_eq!(config.token_ttl, chrono::Duration::minutes(5));
        assert_eq!(config.db.reader_pool_size, 1);

        let err = Config::from_vars(&vars(&[("SMA_JWT_SECRET", "s3cret"), ("SMA_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SMA_PORT", .. }));
    }
}

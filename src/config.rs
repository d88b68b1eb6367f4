//! Runtime settings, read once at startup from the environment (and `.env`).

use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

/// Shortest accepted `SESSION_SECRET`, in bytes.
const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment: {0}")]
    Env(#[from] envy::Error),

    #[error("SESSION_SECRET must be at least {MIN_SECRET_LEN} bytes")]
    WeakSessionSecret,

    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

/// Server settings.
///
/// | Variable                   | Required | Default |
/// |----------------------------|----------|---------|
/// | `DATABASE_URL`             | yes      |         |
/// | `SESSION_SECRET`           | yes      |         |
/// | `SERVER_PORT`              | no       | 3000    |
/// | `DATABASE_MAX_CONNECTIONS` | no       | 5       |
/// | `SESSION_TTL_HOURS`        | no       | 24      |
/// | `CORS_ORIGIN`              | no       | none    |
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    /// HMAC key for session tokens
    pub session_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    /// Browser origin allowed to call the API with credentials
    #[serde(default)]
    pub cors_origin: Option<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_session_ttl_hours() -> i64 {
    24
}

impl Config {
    /// Load `.env` if present, then deserialize and check the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::from_iter(vars)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSessionSecret);
        }
        if self.session_ttl_hours <= 0 {
            return Err(ConfigError::NotPositive("SESSION_TTL_HOURS"));
        }
        if self.database_max_connections == 0 {
            return Err(ConfigError::NotPositive("DATABASE_MAX_CONNECTIONS"));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SECRET: &str = "0123456789abcdef";

    fn vars(extra: &[(&str, &str)]) -> Vec<(String, String)> {
        [("DATABASE_URL", "postgres://localhost/quocbank")]
            .iter()
            .chain(extra)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_to_optional_fields() {
        let config = Config::from_vars(vars(&[("SESSION_SECRET", SECRET)])).unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.session_ttl(), Duration::hours(24));
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn session_secret_is_required() {
        assert!(matches!(
            Config::from_vars(vars(&[])),
            Err(ConfigError::Env(_))
        ));
    }

    #[rstest]
    #[case::short_secret(&[("SESSION_SECRET", "short")])]
    #[case::zero_ttl(&[("SESSION_SECRET", SECRET), ("SESSION_TTL_HOURS", "0")])]
    #[case::empty_pool(&[("SESSION_SECRET", SECRET), ("DATABASE_MAX_CONNECTIONS", "0")])]
    #[case::bad_port(&[("SESSION_SECRET", SECRET), ("SERVER_PORT", "http")])]
    fn rejects_unusable_settings(#[case] extra: &[(&str, &str)]) {
        assert!(Config::from_vars(vars(extra)).is_err());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_vars(vars(&[
            ("SESSION_SECRET", SECRET),
            ("SERVER_PORT", "8080"),
            ("CORS_ORIGIN", "http://localhost:5173"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:5173"));
    }
}

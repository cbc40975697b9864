//! Connection settings, read once from the environment.

use sqlx::postgres::PgConnectOptions;

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DATABASE: &str = "test";
pub const DEFAULT_USER: &str = "postgres";

/// Everything needed to open a single Postgres connection.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
        }
    }
}

impl DbConfig {
    /// Build a config from `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER` and
    /// `DB_PASSWORD`, falling back to the defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DbConfig::from_env`] but over an arbitrary key lookup.
    ///
    /// Empty values count as unset, except for the password where an empty
    /// string is a legitimate value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("DB_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|source| ConfigError::InvalidPort { value: raw.clone(), source })?,
            None => defaults.port,
        };

        Ok(Self {
            host: non_empty("DB_HOST").unwrap_or(defaults.host),
            port,
            database: non_empty("DB_NAME").unwrap_or(defaults.database),
            user: non_empty("DB_USER").unwrap_or(defaults.user),
            password: lookup("DB_PASSWORD").unwrap_or(defaults.password),
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let cfg = DbConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg, DbConfig::default());
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 5432);
        assert_eq!(cfg.database, "test");
        assert_eq!(cfg.user, "postgres");
        assert_eq!(cfg.password, "");
    }

    #[test]
    fn set_variables_override_defaults() {
        let cfg = DbConfig::from_lookup(lookup_from(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_NAME", "shop"),
            ("DB_USER", "app"),
            ("DB_PASSWORD", "hunter2"),
        ]))
        .unwrap();

        assert_eq!(cfg.host, "db.internal");
        assert_eq!(cfg.port, 6543);
        assert_eq!(cfg.database, "shop");
        assert_eq!(cfg.user, "app");
        assert_eq!(cfg.password, "hunter2");
    }

    #[test]
    fn empty_values_are_treated_as_unset() {
        let cfg = DbConfig::from_lookup(lookup_from(&[("DB_HOST", ""), ("DB_PORT", "  ")])).unwrap();
        assert_eq!(cfg.host, DEFAULT_HOST);
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn malformed_port_is_rejected() {
        let err = DbConfig::from_lookup(lookup_from(&[("DB_PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { ref value, .. } if value == "not-a-port"));

        let err = DbConfig::from_lookup(lookup_from(&[("DB_PORT", "70000")])).unwrap_err();
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    fn debug_output_hides_the_password() {
        let cfg = DbConfig { password: "s3cret".into(), ..DbConfig::default() };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn connect_options_carry_the_settings() {
        let cfg = DbConfig { host: "pg.example".into(), port: 15432, ..DbConfig::default() };
        let opts = cfg.connect_options();
        assert_eq!(opts.get_host(), "pg.example");
        assert_eq!(opts.get_port(), 15432);
        assert_eq!(opts.get_database(), Some("test"));
        assert_eq!(opts.get_username(), "postgres");
    }
}

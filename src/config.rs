use std::str::FromStr;
use thiserror::Error;

use crate::users::{Role, UserModel};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env` when present)
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs every repository in memory
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_expiration_days: i64,
    pub cors_allow_any: bool,
    /// Accounts preloaded into the in-memory user directory
    pub seed_users: Vec<UserModel>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&non_empty, "PORT", 3000)?,
            database_url: non_empty("DATABASE_URL"),
            jwt_secret: non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            token_expiration_days: parse_or(&non_empty, "TOKEN_EXPIRATION_DAYS", 7)?,
            cors_allow_any: parse_or(&non_empty, "CORS_ALLOW_ANY", true)?,
            seed_users: parse_seed_users(non_empty("SEED_USERS"))?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// `SEED_USERS` holds `;`-separated entries of `id:email[:first[:last[:ROLE]]]`
fn parse_seed_users(raw: Option<String>) -> Result<Vec<UserModel>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_seed_user)
        .collect()
}

fn parse_seed_user(entry: &str) -> Result<UserModel, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "SEED_USERS",
        value: entry.to_string(),
    };

    let fields: Vec<&str> = entry.split(':').map(str::trim).collect();
    if fields.len() < 2 || fields.len() > 5 || fields[1].is_empty() {
        return Err(invalid());
    }

    let id = fields[0].parse().map_err(|_| invalid())?;
    let optional = |index: usize| {
        fields
            .get(index)
            .copied()
            .filter(|value| !value.is_empty())
    };
    let role = match optional(4) {
        Some(role) => Role::from_str(role).map_err(|_| invalid())?,
        None => Role::Customer,
    };

    Ok(UserModel {
        id,
        email: fields[1].to_string(),
        first_name: optional(2).map(str::to_string),
        last_name: optional(3).map(str::to_string),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.database_url, None);
        assert_eq!(config.token_expiration_days, 7);
        assert!(config.cors_allow_any);
        assert!(config.seed_users.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("JWT_SECRET", "s"),
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("DATABASE_URL", "postgres://localhost/market"),
            ("TOKEN_EXPIRATION_DAYS", "30"),
            ("CORS_ALLOW_ANY", "false"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/market"));
        assert_eq!(config.token_expiration_days, 30);
        assert!(!config.cors_allow_any);
    }

    #[test]
    fn test_errors() {
        assert_eq!(config(&[]), Err(ConfigError::Missing("JWT_SECRET")));
        assert_eq!(
            config(&[("JWT_SECRET", "s"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid {
                name: "PORT",
                value: "eighty".to_string()
            })
        );
    }

    #[test]
    fn test_seed_users() {
        let config = config(&[
            ("JWT_SECRET", "s"),
            (
                "SEED_USERS",
                "1:ann@example.com:Ann:Lee; 2:bob@example.com ;3:root@example.com:Root::ADMIN;",
            ),
        ])
        .unwrap();

        assert_eq!(
            config.seed_users,
            vec![
                UserModel::new(1, "ann@example.com", "Ann", "Lee"),
                UserModel {
                    id: 2,
                    email: "bob@example.com".to_string(),
                    first_name: None,
                    last_name: None,
                    role: Role::Customer,
                },
                UserModel {
                    id: 3,
                    email: "root@example.com".to_string(),
                    first_name: Some("Root".to_string()),
                    last_name: None,
                    role: Role::Admin,
                },
            ]
        );
    }

    #[rstest]
    #[case("ann@example.com")]
    #[case("x:ann@example.com")]
    #[case("1:")]
    #[case("1:ann@example.com:Ann:Lee:OWNER")]
    #[case("1:ann@example.com:Ann:Lee:ADMIN:extra")]
    fn test_invalid_seed_user(#[case] entry: &str) {
        assert_eq!(
            config(&[("JWT_SECRET", "s"), ("SEED_USERS", entry)]),
            Err(ConfigError::Invalid {
                name: "SEED_USERS",
                value: entry.to_string()
            })
        );
    }
}

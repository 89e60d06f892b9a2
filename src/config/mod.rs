use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Secret used when `APP_ENV` is development and `JWT_SECRET` is unset.
pub const DEV_JWT_SECRET: &str = "rbac-admin-dev-secret-change-me";

/// Longest token lifetime `SECURITY_JWT_EXPIRY_HOURS` may ask for (ten years).
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `None` selects the in-memory backend.
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_page_size: i64,
    pub default_page_size: i64,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub password_min_length: usize,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Build the configuration from `APP_ENV` presets plus individual
    /// overrides. Outside development a `JWT_SECRET` is mandatory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|v| !v.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Ok(v) = env::var("RBAC_API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().map_err(|_| ConfigError::Invalid {
                name: "RBAC_API_PORT",
                value: v.clone(),
            })?;
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_MIN_LENGTH") {
            self.security.password_min_length =
                v.parse().unwrap_or(self.security.password_min_length);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        let expiry = self.security.jwt_expiry_hours;
        if expiry == 0 || expiry > MAX_JWT_EXPIRY_HOURS {
            return Err(ConfigError::Invalid {
                name: "SECURITY_JWT_EXPIRY_HOURS",
                value: expiry.to_string(),
            });
        }
        if self.api.max_page_size <= 0 {
            return Err(ConfigError::Invalid {
                name: "API_MAX_PAGE_SIZE",
                value: self.api.max_page_size.to_string(),
            });
        }
        if self.api.default_page_size <= 0 || self.api.default_page_size > self.api.max_page_size {
            return Err(ConfigError::Invalid {
                name: "API_DEFAULT_PAGE_SIZE",
                value: self.api.default_page_size.to_string(),
            });
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3000,
                max_page_size: 1000,
                default_page_size: 10,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7,
                password_min_length: 6,
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3000,
                max_page_size: 500,
                default_page_size: 10,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                password_min_length: 6,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            api: ApiConfig {
                port: 3000,
                max_page_size: 100,
                default_page_size: 10,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 1,
                password_min_length: 8,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.is_development());
        assert!(config.database.url.is_none());
        assert_eq!(config.security.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.security.password_min_length, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.database.run_migrations);
        assert_eq!(config.api.max_page_size, 100);
        assert!(!config.api.enable_request_logging);
    }

    #[test]
    fn production_requires_a_secret() {
        let config = AppConfig::production();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
    }

    #[test]
    fn default_page_size_must_fit_under_max() {
        let mut config = AppConfig::development();
        config.api.default_page_size = config.api.max_page_size + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "API_DEFAULT_PAGE_SIZE", .. })
        ));
    }

    #[test]
    fn token_lifetime_is_bounded() {
        let mut config = AppConfig::development();
        config.security.jwt_expiry_hours = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "SECURITY_JWT_EXPIRY_HOURS", .. })
        ));

        config.security.jwt_expiry_hours = 0;
        assert!(config.validate().is_err());

        config.security.jwt_expiry_hours = MAX_JWT_EXPIRY_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = AppConfig::development();
        config.database.url = Some("postgres://u:p@localhost/rbac".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains(DEV_JWT_SECRET));
        assert!(!json.contains("u:p@"));
    }
}

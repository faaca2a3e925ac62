use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Default page size when the client does not send `limit`.
    pub default_page_size: i64,
    /// Hard clamp for `limit` on any list endpoint.
    pub max_page_size: i64,
    /// Row cap for audit export endpoints.
    pub export_row_cap: i64,
    /// Maximum accepted file-version upload size.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub access_expiry_mins: i64,
    pub refresh_expiry_hours: i64,
    /// Emit `Secure` on auth cookies. Off in development so plain HTTP works.
    pub secure_cookies: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Environment presets first, specific env vars override.
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }

        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("API_EXPORT_ROW_CAP") {
            self.api.export_row_cap = v.parse().unwrap_or(self.api.export_row_cap);
        }
        if let Ok(v) = env::var("API_MAX_UPLOAD_BYTES") {
            self.api.max_upload_bytes = v.parse().unwrap_or(self.api.max_upload_bytes);
        }

        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ACCESS_EXPIRY_MINS") {
            self.security.access_expiry_mins = v.parse().unwrap_or(self.security.access_expiry_mins);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_EXPIRY_HOURS") {
            self.security.refresh_expiry_hours = v.parse().unwrap_or(self.security.refresh_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig { max_connections: 10, acquire_timeout_secs: 30 },
            api: ApiConfig {
                default_page_size: 20,
                max_page_size: 100,
                export_row_cap: 10_000,
                max_upload_bytes: 25 * 1024 * 1024,
            },
            security: SecurityConfig {
                // Development fallback only; real deployments set JWT_SECRET.
                jwt_secret: "dev-secret-change-me".to_string(),
                access_expiry_mins: 60 * 24,
                refresh_expiry_hours: 24 * 30,
                secure_cookies: false,
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
            database: DatabaseConfig { max_connections: 20, acquire_timeout_secs: 10 },
            api: ApiConfig {
                default_page_size: 20,
                max_page_size: 100,
                export_row_cap: 10_000,
                max_upload_bytes: 25 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_expiry_mins: 60,
                refresh_expiry_hours: 24 * 7,
                secure_cookies: true,
                cors_origins: vec!["https://staging.firmdesk.example".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig { max_connections: 50, acquire_timeout_secs: 5 },
            api: ApiConfig {
                default_page_size: 20,
                max_page_size: 100,
                export_row_cap: 10_000,
                max_upload_bytes: 10 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_expiry_mins: 30,
                refresh_expiry_hours: 24 * 7,
                secure_cookies: true,
                cors_origins: vec!["https://app.firmdesk.example".to_string()],
            },
        }
    }
}

// Global singleton config, initialized once at startup.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.api.default_page_size, 20);
        assert_eq!(config.api.export_row_cap, 10_000);
        assert!(!config.security.secure_cookies);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn production_defaults() {
        let config = AppConfig::production();
        assert!(config.security.secure_cookies);
        assert_eq!(config.security.access_expiry_mins, 30);
        // Production refuses to guess a secret; it must come from JWT_SECRET.
        assert!(config.security.jwt_secret.is_empty());
    }
}

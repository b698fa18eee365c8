//! API configuration

use serde::Deserialize;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT lifetime in hours
    pub jwt_expiration_hours: u64,
    /// Database URL
    pub database_url: String,
    /// Comma-separated allowed origins, `*` for any
    pub cors_origins: String,
    /// Prefix for links in emails
    pub public_base_url: String,
    /// HTTP mail relay; emails are only logged when unset
    pub mail_endpoint: Option<String>,
    /// From address on request emails
    pub mail_sender: String,
    /// Log level
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_hours: 12,
            database_url: "postgres://localhost/gop".to_string(),
            cors_origins: "*".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            mail_endpoint: None,
            mail_sender: "MediPay <no-reply@medipay.local>".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_expiration_hours", defaults.jwt_expiration_hours)?
            .set_default("database_url", defaults.database_url)?
            .set_default("cors_origins", defaults.cors_origins)?
            .set_default("public_base_url", defaults.public_base_url)?
            .set_default("mail_sender", defaults.mail_sender)?
            .set_default("log_level", defaults.log_level)?
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Allowed origins; empty means any
    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty() && *origin != "*")
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_origins_allow_any() {
        assert!(ApiConfig::default().allowed_origins().is_empty());
    }

    #[test]
    fn test_origins_are_split_and_trimmed() {
        let config = ApiConfig {
            cors_origins: "https://a.test, https://b.test,".into(),
            ..ApiConfig::default()
        };
        assert_eq!(config.allowed_origins(), vec!["https://a.test", "https://b.test"]);
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
    }
}

use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

/// Base URL used when neither the runtime override nor the build-time value is set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Login routes tried in order when `AUTH_LOGIN_PATHS` is not set.
pub const DEFAULT_LOGIN_PATHS: [&str; 4] = [
    "/admin/auth/login",
    "/auth/admin/login",
    "/admin/login",
    "/auth/login",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    /// Admin credentials used by the CLI to open a session
    pub credentials: Option<Credentials>,
    /// Maximum size in bytes of a single staged media file
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Candidate login routes, tried in order
    pub login_paths: Vec<String>,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_paths: DEFAULT_LOGIN_PATHS.iter().map(|p| p.to_string()).collect(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            credentials: None,
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

impl ApiConfig {
    /// Config pointing at a specific base URL, everything else default.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            ..Default::default()
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let base_url = resolve_base_url(
            std::env::var("ADMIN_API_BASE_URL").ok(),
            option_env!("VITE_API_BASE_URL")
                .map(str::to_string)
                .or_else(|| std::env::var("VITE_API_BASE_URL").ok()),
        );

        let timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let login_paths: Vec<String> = std::env::var("AUTH_LOGIN_PATHS")
            .map(|p| {
                p.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| DEFAULT_LOGIN_PATHS.iter().map(|p| p.to_string()).collect());

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let credentials = match (
            std::env::var("ADMIN_EMAIL").ok(),
            std::env::var("ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            _ => None,
        };

        let config = Config {
            api: ApiConfig {
                base_url,
                login_paths,
                timeout: Duration::from_secs(timeout_secs),
            },
            credentials,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "API base URL '{}' is not a valid absolute URL: {e}",
                self.api.base_url
            ))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "API base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.api.login_paths.is_empty() {
            return Err(ConfigError::ValidationError(
                "AUTH_LOGIN_PATHS must name at least one route".to_string(),
            ));
        }

        if let Some(path) = self.api.login_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::ValidationError(format!(
                "login path '{path}' must start with '/'"
            )));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if url.scheme() == "http" && url.host_str() != Some("localhost") {
            tracing::warn!(
                base_url = %self.api.base_url,
                "API base URL is plain http; session cookies will travel unencrypted"
            );
        }

        Ok(())
    }
}

/// Runtime override wins over the build-time value, which wins over the default.
pub fn resolve_base_url(runtime: Option<String>, build_time: Option<String>) -> String {
    let raw = runtime
        .filter(|s| !s.trim().is_empty())
        .or_else(|| build_time.filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    normalize_base_url(&raw)
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_override_wins() {
        let url = resolve_base_url(
            Some("https://runtime.example/api/".into()),
            Some("https://build.example/api".into()),
        );
        assert_eq!(url, "https://runtime.example/api");
    }

    #[test]
    fn test_build_time_used_when_no_override() {
        let url = resolve_base_url(None, Some("https://build.example/api".into()));
        assert_eq!(url, "https://build.example/api");
    }

    #[test]
    fn test_blank_values_fall_through_to_default() {
        let url = resolve_base_url(Some("  ".into()), Some(String::new()));
        assert_eq!(url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_validate_rejects_relative_base_url() {
        let config = Config {
            api: ApiConfig {
                base_url: "/api".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_login_path_without_slash() {
        let config = Config {
            api: ApiConfig {
                login_paths: vec!["admin/login".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }
}

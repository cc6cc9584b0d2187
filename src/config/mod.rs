pub mod validation;

use serde::Deserialize;

use crate::protocol::provider::ProviderTag;

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Upstream request timeout in seconds, streaming bodies included.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default)]
    pub runtime_worker_threads: Option<usize>,
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub http_use_env_proxy: bool,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_timeout() -> u64 {
    180
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}
fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            runtime_worker_threads: None,
            base_path: String::new(),
            http_use_env_proxy: false,
            proxy: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Per-provider endpoint and credential.
#[derive(Clone, Default, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Only read for Anthropic (`anthropic-version` header).
    #[serde(default)]
    pub api_version: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

#[must_use]
pub fn default_base_url(provider: ProviderTag) -> &'static str {
    match provider {
        ProviderTag::Anthropic => "https://api.anthropic.com/v1",
        ProviderTag::OpenAi => "https://api.openai.com/v1",
        ProviderTag::Google => "https://generativelanguage.googleapis.com/v1beta",
    }
}

/// Environment variable consulted when a provider has no `api_key` in the file.
#[must_use]
pub fn credential_env_var(provider: ProviderTag) -> &'static str {
    match provider {
        ProviderTag::Anthropic => "ANTHROPIC_API_KEY",
        ProviderTag::OpenAi => "OPENAI_API_KEY",
        ProviderTag::Google => "GOOGLE_API_KEY",
    }
}

impl ProviderConfig {
    /// Configured base URL, or the vendor default, without a trailing `/`.
    #[must_use]
    pub fn base_url_for(&self, provider: ProviderTag) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| default_base_url(provider))
            .trim_end_matches('/')
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub google: ProviderConfig,
}

impl ProvidersConfig {
    #[must_use]
    pub fn get(&self, provider: ProviderTag) -> &ProviderConfig {
        match provider {
            ProviderTag::Anthropic => &self.anthropic,
            ProviderTag::OpenAi => &self.openai,
            ProviderTag::Google => &self.google,
        }
    }

    fn get_mut(&mut self, provider: ProviderTag) -> &mut ProviderConfig {
        match provider {
            ProviderTag::Anthropic => &mut self.anthropic,
            ProviderTag::OpenAi => &mut self.openai,
            ProviderTag::Google => &mut self.google,
        }
    }

    /// Fill missing keys from the environment and drop blank ones.
    fn resolve_credentials<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for provider in ProviderTag::ALL {
            let entry = self.get_mut(provider);
            if entry.api_key().is_none() {
                entry.api_key = env(credential_env_var(provider))
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty());
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load, resolve credentials and validate the YAML config at `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed or validated.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents, |name| std::env::var(name).ok())
}

/// Parse config text with an explicit environment lookup.
///
/// # Errors
///
/// Returns [`ConfigError`] when the YAML is invalid or fails validation.
pub fn parse_config<F>(contents: &str, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: AppConfig = serde_yaml::from_str(contents)?;
    config.providers.resolve_credentials(env);
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_example_config() {
        let config = load_config("config.example.yaml");
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(
            config.providers.anthropic.base_url_for(ProviderTag::Anthropic),
            "https://api.anthropic.com/v1"
        );
    }

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let config = parse_config("features:\n  log_level: DEBUG\n", no_env).unwrap();
        assert_eq!(config.server.timeout, 180);
        assert_eq!(config.server.connect_timeout, 5);
        assert_eq!(config.features.log_level, "DEBUG");
        for provider in ProviderTag::ALL {
            assert!(config.providers.get(provider).api_key().is_none());
            assert_eq!(
                config.providers.get(provider).base_url_for(provider),
                default_base_url(provider)
            );
        }
    }

    #[test]
    fn test_env_fills_missing_keys_only() {
        let yaml = "providers:\n  openai:\n    api_key: sk-file\n  google:\n    api_key: \"  \"\n";
        let config = parse_config(yaml, |name| match name {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "GOOGLE_API_KEY" => Some("g-env".to_string()),
            "ANTHROPIC_API_KEY" => Some(String::new()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.providers.openai.api_key(), Some("sk-file"));
        assert_eq!(config.providers.google.api_key(), Some("g-env"));
        assert_eq!(config.providers.anthropic.api_key(), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let yaml = "providers:\n  openai:\n    base_url: http://127.0.0.1:9000/v1/\n";
        let config = parse_config(yaml, no_env).unwrap();
        assert_eq!(
            config.providers.openai.base_url_for(ProviderTag::OpenAi),
            "http://127.0.0.1:9000/v1"
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let entry = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..ProviderConfig::default()
        };
        let rendered = format!("{entry:?}");
        assert!(!rendered.contains("sk-secret"));
    }
}

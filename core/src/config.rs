use crate::errors::{GeminiError, GeminiResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.searchapi.io/api/v1/search";
pub const DEFAULT_PREVIEW_ENDPOINT: &str = "https://api.firecrawl.dev/v2/scrape";
pub const DEFAULT_SEARCH_RESULTS_COUNT: usize = 5;
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3000";

/// Generation provider settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl GeminiConfig {
    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_GEMINI_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(60))
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }
}

/// Web search provider settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub results_count: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl SearchConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_SEARCH_ENDPOINT)
    }

    pub fn results_count(&self) -> usize {
        self.results_count.unwrap_or(DEFAULT_SEARCH_RESULTS_COUNT)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(15))
    }

    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            endpoint: other.endpoint.clone().or_else(|| self.endpoint.clone()),
            results_count: other.results_count.or(self.results_count),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }
}

/// Page preview (scrape) provider settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PreviewConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl PreviewConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_PREVIEW_ENDPOINT)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(10))
    }

    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            endpoint: other.endpoint.clone().or_else(|| self.endpoint.clone()),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }
}

/// HTTP listener and outbound transport settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ServerConfig {
    pub http_addr: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    /// Development only: accept any TLS certificate on outbound calls.
    /// Never enable this against production providers.
    pub insecure_skip_tls_verify: Option<bool>,
}

impl ServerConfig {
    pub fn http_addr(&self) -> &str {
        self.http_addr.as_deref().unwrap_or(DEFAULT_HTTP_ADDR)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.unwrap_or(10))
    }

    pub fn insecure_skip_tls_verify(&self) -> bool {
        self.insecure_skip_tls_verify.unwrap_or(false)
    }

    /// Builds an outbound HTTP client bounded by `timeout`.
    pub fn http_client(&self, timeout: Duration) -> GeminiResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(self.connect_timeout());

        if self.insecure_skip_tls_verify() {
            warn!("TLS certificate verification is disabled for outbound requests");
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| GeminiError::ConfigError(format!("Failed to create HTTP client: {}", e)))
    }

    pub fn merge(&self, other: &Self) -> Self {
        Self {
            http_addr: other.http_addr.clone().or_else(|| self.http_addr.clone()),
            connect_timeout_secs: other.connect_timeout_secs.or(self.connect_timeout_secs),
            insecure_skip_tls_verify: other
                .insecure_skip_tls_verify
                .or(self.insecure_skip_tls_verify),
        }
    }
}

/// Process-wide configuration, built once at startup and shared read-only
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct WatchbotConfig {
    pub gemini: GeminiConfig,
    pub search: SearchConfig,
    pub preview: PreviewConfig,
    pub server: ServerConfig,
}

impl WatchbotConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> GeminiResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                GeminiError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: Self = toml::from_str(&content).map_err(|e| {
                GeminiError::ConfigError(format!("Failed to parse config file: {}", e))
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> GeminiResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            GeminiError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GeminiError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            GeminiError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Reads the provider credentials and limits from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let results_count = get("SEARCH_RESULTS_COUNT").and_then(|raw| match raw.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!(value = %raw, "Ignoring invalid SEARCH_RESULTS_COUNT");
                None
            }
        });

        Self {
            gemini: GeminiConfig {
                api_key: get("GEMINI_API_KEY"),
                model_name: get("GEMINI_MODEL"),
                ..GeminiConfig::default()
            },
            search: SearchConfig {
                api_key: get("SEARCH_API_KEY"),
                results_count,
                ..SearchConfig::default()
            },
            preview: PreviewConfig {
                api_key: get("FIRECRAWL_API_KEY"),
                ..PreviewConfig::default()
            },
            server: ServerConfig::default(),
        }
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            gemini: self.gemini.merge(&other.gemini),
            search: self.search.merge(&other.search),
            preview: self.preview.merge(&other.preview),
            server: self.server.merge(&other.server),
        }
    }

    /// Names of required credentials that are not configured
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gemini.api_key.is_none() {
            missing.push("GEMINI_API_KEY");
        }
        if self.search.api_key.is_none() {
            missing.push("SEARCH_API_KEY");
        }
        missing
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> GeminiResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        GeminiError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> GeminiResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}

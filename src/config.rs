use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".pr-harvester.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-harvester.toml.
/// All fields are optional; the tool runs with zero config apart from a token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub harvest: HarvestConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// GraphQL endpoint all queries are POSTed to
    pub endpoint: String,
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            endpoint: "https://api.github.com/graphql".to_string(),
            user_agent: "pr-harvester".to_string(),
        }
    }
}

/// Limits for the repository lister and pull request fetcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Search string used to rank repositories
    pub search_query: String,
    pub repository_limit: usize,
    pub search_page_size: u32,
    pub pull_request_limit: usize,
    pub pull_request_page_size: u32,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            search_query: "stars:>0 sort:stars-desc".to_string(),
            repository_limit: 400,
            search_page_size: 100,
            pull_request_limit: 300,
            pull_request_page_size: 20,
        }
    }
}

/// Backoff timings for the paginated collector, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub gateway_delay_secs: u64,
    pub max_gateway_retries: u32,
    pub rate_limit_delay_secs: u64,
    pub reset_margin_secs: u64,
    pub courtesy_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            gateway_delay_secs: 2,
            max_gateway_retries: 50,
            rate_limit_delay_secs: 2,
            reset_margin_secs: 5,
            courtesy_delay_secs: 1,
        }
    }
}

impl RetryConfig {
    pub fn gateway_delay(&self) -> Duration {
        Duration::from_secs(self.gateway_delay_secs)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs(self.rate_limit_delay_secs)
    }

    pub fn reset_margin(&self) -> Duration {
        Duration::from_secs(self.reset_margin_secs)
    }

    pub fn courtesy_delay(&self) -> Duration {
        Duration::from_secs(self.courtesy_delay_secs)
    }
}

/// Thresholds applied by the filter stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum time from creation to merge/close
    pub min_elapsed_secs: i64,
    /// Minimum surviving pull requests for a repository to be kept
    pub min_pull_requests: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_elapsed_secs: 3600,
            min_pull_requests: 100,
        }
    }
}

impl Config {
    /// Load configuration from the given path, or .pr-harvester.toml in the
    /// current directory. Returns default config if the file doesn't exist.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        if config.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                config.github.token = Some(token);
            }
        }

        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }
}

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use secrecy::SecretString;

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_DATABASE_URL: &str = "sqlite://ci_insights.db?mode=rwc";
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const GITHUB_API_URL: &str = "https://api.github.com";
    pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
    pub const OPENAI_MODEL: &str = "gpt-3.5-turbo";
    pub const LOOKBACK_DAYS: i64 = 7;
    pub const MAX_CONCURRENT_FETCHES: usize = 4;
    pub const FETCH_TIMEOUT_SECS: u64 = 30;
    pub const COLLECT_INTERVAL_SECS: u64 = 3600;
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// GitHub Actions connection settings.
#[derive(Debug)]
pub struct GitHubSettings {
    /// REST API base URL (GitHub Enterprise installs use their own host)
    pub api_url: String,
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Token with `actions:read` and `contents:read`
    pub token: SecretString,
}

impl GitHubSettings {
    /// `owner/repo` form used in logs and run records.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Text-generation (chat completion) settings.
#[derive(Debug)]
pub struct AdvisorSettings {
    pub api_url: String,
    pub model: String,
    pub api_key: SecretString,
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Read API host address
    pub host: String,
    /// Read API port
    pub port: u16,
    /// Database URL (SQLite or PostgreSQL connection string)
    pub database_url: String,
    /// GitHub settings; `None` disables collection
    pub github: Option<GitHubSettings>,
    /// Text-generation settings; `None` uses fallback suggestions
    pub advisor: Option<AdvisorSettings>,
    /// How far back `collect` looks for runs (default: 7 days)
    pub lookback_days: i64,
    /// Runs fetched concurrently within a batch (default: 4)
    pub max_concurrent_fetches: usize,
    /// Timeout for each CI provider / advisor request (default: 30s)
    pub fetch_timeout_secs: u64,
    /// Interval between batches in `watch` mode (default: 1 hour)
    pub collect_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In development mode (RUST_ENV=development) everything except RUST_ENV has a default
    /// and GitHub collection is optional. In production mode the database URL must not be the
    /// development default and the GitHub settings are required.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `CI_INSIGHTS_DATABASE_URL`: database connection string
    /// - `CI_INSIGHTS_HOST` / `CI_INSIGHTS_PORT`: read API bind address
    /// - `GITHUB_TOKEN`, `GITHUB_OWNER`, `GITHUB_REPO`: repository to collect from
    /// - `GITHUB_API_URL`: REST API base (default: https://api.github.com)
    /// - `OPENAI_API_KEY`: enables AI suggestions (optional)
    /// - `OPENAI_MODEL` / `OPENAI_API_URL`: chat completion model and endpoint
    /// - `CI_INSIGHTS_LOOKBACK_DAYS`: default collection window (default: 7)
    /// - `CI_INSIGHTS_MAX_CONCURRENT_FETCHES`: per-batch fetch parallelism (default: 4)
    /// - `CI_INSIGHTS_FETCH_TIMEOUT_SECS`: HTTP timeout (default: 30)
    /// - `CI_INSIGHTS_COLLECT_INTERVAL_SECS`: `watch` interval (default: 3600)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_str = lookup("RUST_ENV").ok_or(ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = lookup("CI_INSIGHTS_HOST").unwrap_or_else(|| defaults::DEV_HOST.to_string());

        let port = parse_or(
            &lookup,
            "CI_INSIGHTS_PORT",
            defaults::DEV_PORT,
            "CI_INSIGHTS_PORT must be a valid port number",
        )?;

        let database_url = lookup("CI_INSIGHTS_DATABASE_URL")
            .unwrap_or_else(|| defaults::DEV_DATABASE_URL.to_string());

        let github = match (
            lookup("GITHUB_TOKEN"),
            lookup("GITHUB_OWNER"),
            lookup("GITHUB_REPO"),
        ) {
            (Some(token), Some(owner), Some(repo)) => Some(GitHubSettings {
                api_url: lookup("GITHUB_API_URL")
                    .unwrap_or_else(|| defaults::GITHUB_API_URL.to_string()),
                owner,
                repo,
                token: SecretString::from(token),
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "GITHUB_TOKEN, GITHUB_OWNER and GITHUB_REPO must be set together",
                ));
            }
        };

        let advisor = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(|key| AdvisorSettings {
                api_url: lookup("OPENAI_API_URL")
                    .unwrap_or_else(|| defaults::OPENAI_API_URL.to_string()),
                model: lookup("OPENAI_MODEL").unwrap_or_else(|| defaults::OPENAI_MODEL.to_string()),
                api_key: SecretString::from(key),
            });

        let lookback_days = parse_or(
            &lookup,
            "CI_INSIGHTS_LOOKBACK_DAYS",
            defaults::LOOKBACK_DAYS,
            "CI_INSIGHTS_LOOKBACK_DAYS must be a valid number",
        )?;

        let max_concurrent_fetches = parse_or(
            &lookup,
            "CI_INSIGHTS_MAX_CONCURRENT_FETCHES",
            defaults::MAX_CONCURRENT_FETCHES,
            "CI_INSIGHTS_MAX_CONCURRENT_FETCHES must be a valid number",
        )?;
        if max_concurrent_fetches == 0 {
            return Err(ConfigError::InvalidValue(
                "CI_INSIGHTS_MAX_CONCURRENT_FETCHES must be at least 1",
            ));
        }

        let fetch_timeout_secs = parse_or(
            &lookup,
            "CI_INSIGHTS_FETCH_TIMEOUT_SECS",
            defaults::FETCH_TIMEOUT_SECS,
            "CI_INSIGHTS_FETCH_TIMEOUT_SECS must be a valid number",
        )?;

        let collect_interval_secs = parse_or(
            &lookup,
            "CI_INSIGHTS_COLLECT_INTERVAL_SECS",
            defaults::COLLECT_INTERVAL_SECS,
            "CI_INSIGHTS_COLLECT_INTERVAL_SECS must be a valid number",
        )?;

        let config = Config {
            environment,
            host,
            port,
            database_url,
            github,
            advisor,
            lookback_days,
            max_concurrent_fetches,
            fetch_timeout_secs,
            collect_interval_secs,
        };

        // Validate production configuration
        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that production configuration does not use development defaults.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.database_url == defaults::DEV_DATABASE_URL {
            errors.push(format!(
                "CI_INSIGHTS_DATABASE_URL is using development default '{}'. Set a production database URL.",
                defaults::DEV_DATABASE_URL
            ));
        }

        if self.github.is_none() {
            errors.push(
                "GITHUB_TOKEN, GITHUB_OWNER and GITHUB_REPO are required in production.".to_string(),
            );
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the read API bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    default: T,
    message: &'static str,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(message)),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Placeholder secret shipped in `config/dev.yaml`. Refused outside `dev`.
pub const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL. Without it users live in memory.
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// Redis connection URL. Without it lockout and revocation state live in memory.
    #[serde(default)]
    pub redis_url: Option<String>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_cors_origin() -> String {
    "*".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: u64,
    #[serde(default)]
    pub lockout: LockoutConfig,
}

fn default_access_ttl() -> u64 {
    60 * 60
}

fn default_refresh_ttl() -> u64 {
    7 * 24 * 60 * 60
}

impl AuthConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }
}

/// Failed-login throttling parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LockoutConfig {
    /// Failures that trigger a lock
    pub max_attempts: i64,
    /// Lifetime of the attempt counter, started at the first failure
    pub window_secs: u64,
    /// Lifetime of the lock flag
    pub lock_secs: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 15 * 60,
            lock_secs: 15 * 60,
        }
    }
}

impl LockoutConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn lock_duration(&self) -> Duration {
        Duration::from_secs(self.lock_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeoutConfig {
    pub cache_ms: u64,
    pub store_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            cache_ms: 2_000,
            store_ms: 5_000,
        }
    }
}

impl TimeoutConfig {
    pub fn cache(&self) -> Duration {
        Duration::from_millis(self.cache_ms)
    }

    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml`, then apply environment overrides.
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());

        if env != "dev" && config.auth.jwt_secret == DEV_JWT_SECRET {
            anyhow::bail!("JWT_SECRET must be set outside the dev environment");
        }
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Secrets and endpoints come from the process environment when present.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.postgres_url = Some(url);
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.redis_url = Some(url);
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }
        if let Some(origin) = lookup("CORS_HOST") {
            self.gateway.cors_origin = origin;
        }
    }
}

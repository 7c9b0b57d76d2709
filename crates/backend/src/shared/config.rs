use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// Ключ шифрования учетных данных (base64). Если не задан,
    /// при старте генерируется случайный ключ на время процесса.
    pub credential_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_sync_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_seconds: u64,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_seconds: u64,
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_seconds: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
    #[serde(default = "default_webhook_retention")]
    pub webhook_retention: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_sync_interval() -> u64 {
    300
}

fn default_adapter_timeout() -> u64 {
    30
}

fn default_backoff_base() -> u64 {
    60
}

fn default_backoff_cap() -> u64 {
    3600
}

fn default_max_attempts() -> u32 {
    5
}

fn default_low_stock_threshold() -> i64 {
    10
}

fn default_webhook_retention() -> u64 {
    500
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            credential_key: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_sync_interval(),
            adapter_timeout_seconds: default_adapter_timeout(),
            backoff_base_seconds: default_backoff_base(),
            backoff_cap_seconds: default_backoff_cap(),
            max_attempts: default_max_attempts(),
            low_stock_threshold: default_low_stock_threshold(),
            webhook_retention: default_webhook_retention(),
        }
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/app.db"

[server]
port = 3000

[sync]
interval_seconds = 300
adapter_timeout_seconds = 30
backoff_base_seconds = 60
backoff_cap_seconds = 3600
max_attempts = 5
low_stock_threshold = 10
webhook_retention = 500
"#;

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Current working directory
/// 3. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    // Try to find config.toml next to the executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&contents)?;
                return Ok(config);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    // Try the working directory (for cargo run)
    let cwd_config = Path::new("config.toml");
    if cwd_config.exists() {
        tracing::info!("Loading config from working directory");
        let contents = std::fs::read_to_string(cwd_config)?;
        let config: Config = toml::from_str(&contents)?;
        return Ok(config);
    }

    // Fall back to default config
    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

/// Make the loaded configuration available process-wide
pub fn initialize_config(config: Config) -> anyhow::Result<()> {
    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Config has already been initialized"))
}

pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config has not been initialized")
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    // If absolute path, use as is
    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    // If relative path, resolve it relative to the executable directory
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let resolved_path = exe_dir.join(db_path);
            return Ok(resolved_path);
        }
    }

    // Fallback: use relative to current directory
    Ok(PathBuf::from(db_path_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config: Result<Config, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config.database.path, "target/db/app.db");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.sync.adapter_timeout_seconds, 30);
        assert_eq!(config.sync.low_stock_threshold, 10);
        assert!(config.security.credential_key.is_none());
    }

    #[test]
    fn test_partial_config_uses_section_defaults() {
        let config: Config = toml::from_str("[database]\npath = \"x.db\"\n").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.sync.interval_seconds, 300);
        assert_eq!(config.sync.max_attempts, 5);
        assert_eq!(config.sync.webhook_retention, 500);
    }
}

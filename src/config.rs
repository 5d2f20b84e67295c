// src/config.rs - Configuration management
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::fs;
use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:3010";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub listing: ListingConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub keep_alive: u64,
    pub client_timeout: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    /// Базовый адрес бэкенда (`NEXT_PUBLIC_API_URL`), без завершающих слэшей
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ListingConfig {
    pub default_limit: u32,
    pub max_limit: u32,
    pub search_debounce_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub max_request_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            keep_alive: 30,
            client_timeout: 30,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            search_debounce_ms: 500,
        }
    }
}

impl ListingConfig {
    /// Пауза ввода перед применением текстового фильтра
    pub fn search_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.search_debounce_ms)
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            max_request_size: 1024 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Убирает завершающие слэши: `http://api/` -> `http://api`
pub fn normalize_api_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

pub fn load_config() -> Result<Config> {
    load_env_file()?;

    let mut config = if let Ok(config_file) = env::var("CONFIG_FILE") {
        load_config_file(Path::new(&config_file))?
    } else {
        Config::default()
    };

    override_with_env(&mut config);
    config.backend.api_url = normalize_api_url(&config.backend.api_url);

    config.validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

pub fn load_config_file(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn override_with_env(config: &mut Config) {
    if let Ok(url) = env::var("NEXT_PUBLIC_API_URL") {
        if !url.trim().is_empty() {
            config.backend.api_url = url;
        }
    }
    if let Ok(host) = env::var("BIND_ADDRESS") {
        config.server.host = host;
    }
    if let Ok(port_str) = env::var("GATEWAY_PORT") {
        if let Ok(port) = port_str.parse::<u16>() {
            config.server.port = port;
        }
    }
    if let Ok(workers_str) = env::var("GATEWAY_WORKERS") {
        if let Ok(workers) = workers_str.parse::<usize>() {
            config.server.workers = Some(workers);
        }
    }
    if let Ok(timeout_str) = env::var("BACKEND_TIMEOUT_SECS") {
        if let Ok(timeout) = timeout_str.parse::<u64>() {
            config.backend.request_timeout_secs = timeout;
        }
    }
    if let Ok(limit_str) = env::var("LIST_DEFAULT_LIMIT") {
        if let Ok(limit) = limit_str.parse::<u32>() {
            config.listing.default_limit = limit;
        }
    }
    if let Ok(max_str) = env::var("LIST_MAX_LIMIT") {
        if let Ok(max) = max_str.parse::<u32>() {
            config.listing.max_limit = max;
        }
    }
    if let Ok(debounce_str) = env::var("SEARCH_DEBOUNCE_MS") {
        if let Ok(debounce) = debounce_str.parse::<u64>() {
            config.listing.search_debounce_ms = debounce;
        }
    }
    if let Ok(origins_str) = env::var("ALLOWED_ORIGINS") {
        config.security.allowed_origins = origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(level) = env::var("RUST_LOG") {
        config.logging.level = level;
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let url = &self.backend.api_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "Backend API URL must start with http:// or https:// (current: '{}')",
                url
            ));
        }
        url::Url::parse(url)
            .with_context(|| format!("Backend API URL is not a valid URL: {}", url))?;

        if self.listing.default_limit == 0 {
            return Err(anyhow::anyhow!("default_limit must be at least 1"));
        }

        if self.listing.max_limit < self.listing.default_limit {
            return Err(anyhow::anyhow!(
                "max_limit ({}) must be >= default_limit ({})",
                self.listing.max_limit,
                self.listing.default_limit
            ));
        }

        if self.backend.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request_timeout_secs must be positive"));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        env::var("FLEETDESK_ENV").map(|v| v == "production").unwrap_or(false)
    }

    pub fn print_startup_info(&self) {
        log::info!("🚗 Fleetdesk admin gateway starting up...");
        log::info!("🌐 Server: {}:{}", self.server.host, self.server.port);
        log::info!("🔗 Backend: {} (timeout {}s)", self.backend.api_url, self.backend.request_timeout_secs);
        log::info!("📄 Listing: default limit {}, max limit {}, search debounce {}ms",
            self.listing.default_limit, self.listing.max_limit, self.listing.search_debounce_ms);
        log::info!("📊 Logging: {} level", self.logging.level);

        if !self.is_production() {
            log::warn!("🚧 Running in development mode");
        }
    }
}

pub fn load_env_file() -> Result<()> {
    if let Ok(env_file) = env::var("ENV_FILE") {
        dotenvy::from_filename(&env_file)
            .with_context(|| format!("Failed to load environment file: {}", env_file))?;
    } else if Path::new(".env").exists() {
        dotenvy::dotenv().context("Failed to load .env file")?;
    }
    Ok(())
}

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub widgets: WidgetsConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    /// How long a request waits for a pooled connection before the widget fails.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WidgetsConfig {
    pub ev_total_stations: u64,
    pub parking_occupied: u64,
    pub parking_total: u64,
}

impl Default for WidgetsConfig {
    fn default() -> Self {
        Self {
            ev_total_stations: 32,
            parking_occupied: 145,
            parking_total: 199,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Server the polling client reads snapshots from.
    pub base_url: String,
    pub refresh_interval_ms: u64,
    /// A trigger this soon after an in-flight request was issued joins it
    /// instead of issuing another.
    pub dedup_window_ms: u64,
    pub request_timeout_ms: u64,
    /// Keep polling while the consumer is hidden.
    pub refresh_when_hidden: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            refresh_interval_ms: 5_000,
            dedup_window_ms: 1_000,
            request_timeout_ms: 10_000,
            refresh_when_hidden: false,
        }
    }
}

impl PollingConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.acquire_timeout_ms > 0,
            "database.acquire_timeout_ms must be > 0, got {}",
            self.database.acquire_timeout_ms
        );
        anyhow::ensure!(
            self.widgets.ev_total_stations > 0,
            "widgets.ev_total_stations must be > 0, got {}",
            self.widgets.ev_total_stations
        );
        anyhow::ensure!(
            self.widgets.parking_total > 0,
            "widgets.parking_total must be > 0, got {}",
            self.widgets.parking_total
        );
        anyhow::ensure!(
            self.widgets.parking_occupied <= self.widgets.parking_total,
            "widgets.parking_occupied must be <= parking_total ({}), got {}",
            self.widgets.parking_total,
            self.widgets.parking_occupied
        );
        anyhow::ensure!(
            !self.polling.base_url.is_empty(),
            "polling.base_url must be non-empty"
        );
        anyhow::ensure!(
            self.polling.refresh_interval_ms > 0,
            "polling.refresh_interval_ms must be > 0, got {}",
            self.polling.refresh_interval_ms
        );
        anyhow::ensure!(
            self.polling.dedup_window_ms < self.polling.refresh_interval_ms,
            "polling.dedup_window_ms must be shorter than refresh_interval_ms ({}), got {}",
            self.polling.refresh_interval_ms,
            self.polling.dedup_window_ms
        );
        anyhow::ensure!(
            self.polling.request_timeout_ms > 0,
            "polling.request_timeout_ms must be > 0, got {}",
            self.polling.request_timeout_ms
        );
        Ok(())
    }
}

//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `MINESTAT_CONFIG` env var
//! 3. **Environment variables**: `MINESTAT__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`ServerConfig`]: HTTP listener settings
//! - [`NodeConfig`]: Chain node JSON-RPC endpoint and credentials
//! - [`StoreConfig`]: Durable store connection
//! - [`IngestionConfig`]: History depth, tip safety margin, refresh interval
//! - [`ResolverConfig`]: Epoch range resolver strides
//! - [`PayoutConfig`]: External payout overlay source
//! - [`StatsConfig`]: Request limits and bucket parameters
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! [node]
//! host = "127.0.0.1"
//! port = 9332
//! username = "rpcuser"
//! password = "rpcpass"
//!
//! [ingestion]
//! history_depth = 100000
//! refresh_interval_seconds = 60
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `0.0.0.0`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `8080`.
    pub bind_port: u16,

    /// Maximum number of concurrent stats requests. Defaults to `256`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Maximum accepted request body size in bytes. Defaults to 64 KiB.
    #[serde(default = "default_request_body_limit_bytes")]
    pub request_body_limit_bytes: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_max_concurrent_requests() -> usize {
    256
}

fn default_request_body_limit_bytes() -> usize {
    64 * 1024
}

/// Chain node JSON-RPC endpoint. Requests use HTTP basic auth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,

    /// Per-request timeout in seconds. Defaults to `5`.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Block window passed to `getnetworkhashps`. Defaults to `100`.
    #[serde(default = "default_hashrate_window_blocks")]
    pub hashrate_window_blocks: u64,
}

fn default_timeout_seconds() -> u64 {
    5
}

fn default_hashrate_window_blocks() -> u64 {
    100
}

/// Durable store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `SQLite` database URL. Defaults to `sqlite://./db/minestat.db`.
    pub database_url: String,

    /// Pool size. In-memory databases always use a single connection. Defaults to `4`.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Create the database file (and its directory) when missing. Defaults to `true`.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

fn default_max_connections() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// How many heights below the node tip are kept. Defaults to `100000`.
    pub history_depth: u64,

    /// Number of heights at the tip that are not ingested yet, as protection against
    /// reorgs. `1` excludes the tip itself. Defaults to `1`.
    #[serde(default = "default_tip_safety_margin")]
    pub tip_safety_margin: u64,

    /// Seconds the refresher sleeps between passes. Defaults to `60`.
    pub refresh_interval_seconds: u64,

    /// Log a progress line every N heights. Defaults to `500`.
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

fn default_tip_safety_margin() -> u64 {
    1
}

fn default_progress_every() -> u64 {
    500
}

/// Strides used by the epoch range resolver's bracket probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Forward (or backward, from the high end) step between probes. Defaults to `256`.
    pub advance_stride: u64,

    /// Single corrective jump applied once a probe overshoots. Defaults to `512`.
    pub correction_stride: u64,
}

/// External payout collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutConfig {
    /// Whether payout overlay data is merged into stats. Defaults to `true`.
    pub enabled: bool,

    /// URL prefix; the receiving address is appended to it.
    pub base_url: String,

    /// Request timeout in seconds. Defaults to `5`.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Stats request limits and bucket parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Addresses beyond this count are dropped from a request. Defaults to `10`.
    pub max_addresses: usize,

    /// Totals at or below this value produce a win percent of `0`. Defaults to `0.1`.
    pub noise_floor: f64,

    /// Lower clamp for `NumDays`. Defaults to `2`.
    pub min_days: u32,

    /// Upper clamp for `NumDays`. Defaults to `21`.
    pub max_days: u32,
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

/// Root application configuration containing all subsystem settings.
///
/// Loaded with the `MINESTAT` prefix for environment overrides using `__` as a
/// separator, e.g. `MINESTAT__NODE__PASSWORD=secret`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub node: NodeConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub payout: PayoutConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: 8080,
            max_concurrent_requests: default_max_concurrent_requests(),
            request_body_limit_bytes: default_request_body_limit_bytes(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9332,
            username: String::new(),
            password: String::new(),
            timeout_seconds: default_timeout_seconds(),
            hashrate_window_blocks: default_hashrate_window_blocks(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./db/minestat.db".to_string(),
            max_connections: default_max_connections(),
            create_if_missing: true,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            history_depth: 100_000,
            tip_safety_margin: default_tip_safety_margin(),
            refresh_interval_seconds: 60,
            progress_every: default_progress_every(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { advance_stride: 256, correction_stride: 512 }
    }
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://pogo.dmo-tools.com/api/v1/stats/".to_string(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { max_addresses: 10, noise_floor: 0.1, min_days: 2, max_days: 21 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// A missing file is not an error; compiled defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.bind_address", "0.0.0.0")?
            .set_default("server.bind_port", 8080)?
            .set_default("node.host", "127.0.0.1")?
            .set_default("node.port", 9332)?
            .set_default("store.database_url", "sqlite://./db/minestat.db")?
            .set_default("ingestion.history_depth", 100_000)?
            .set_default("ingestion.refresh_interval_seconds", 60)?
            .set_default("resolver.advance_stride", 256)?
            .set_default("resolver.correction_stride", 512)?
            .set_default("payout.enabled", true)?
            .set_default("payout.base_url", "https://pogo.dmo-tools.com/api/v1/stats/")?
            .set_default("stats.max_addresses", 10)?
            .set_default("stats.noise_floor", 0.1)?
            .set_default("stats.min_days", 2)?
            .set_default("stats.max_days", 21)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("MINESTAT").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Loads configuration from `config/config.toml`, overridable via `MINESTAT_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("MINESTAT_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "Invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    /// Returns the node JSON-RPC endpoint URL.
    #[must_use]
    pub fn node_url(&self) -> String {
        format!("http://{}:{}", self.node.host, self.node.port)
    }

    #[must_use]
    pub fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node.timeout_seconds)
    }

    #[must_use]
    pub fn payout_timeout(&self) -> Duration {
        Duration::from_secs(self.payout.timeout_seconds)
    }

    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.ingestion.refresh_interval_seconds)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }

        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }

        if self.node.host.is_empty() {
            return Err("Node host must not be empty".to_string());
        }

        if self.node.port == 0 {
            return Err("Node port must be greater than 0".to_string());
        }

        if self.node.timeout_seconds == 0 {
            return Err("Node timeout must be greater than 0".to_string());
        }

        if self.store.database_url.is_empty() {
            return Err("Store database URL must not be empty".to_string());
        }

        if self.ingestion.history_depth == 0 {
            return Err("History depth must be greater than 0".to_string());
        }

        if self.ingestion.refresh_interval_seconds == 0 {
            return Err("Refresh interval must be greater than 0".to_string());
        }

        if self.ingestion.progress_every == 0 {
            return Err("Progress interval must be greater than 0".to_string());
        }

        if self.resolver.advance_stride == 0 || self.resolver.correction_stride == 0 {
            return Err("Resolver strides must be greater than 0".to_string());
        }

        if self.resolver.correction_stride < self.resolver.advance_stride {
            return Err(format!(
                "Resolver correction stride ({}) must be at least the advance stride ({})",
                self.resolver.correction_stride, self.resolver.advance_stride
            ));
        }

        if self.payout.enabled {
            if !self.payout.base_url.starts_with("http") {
                return Err(format!("Invalid payout base URL: {}", self.payout.base_url));
            }
            if self.payout.timeout_seconds == 0 {
                return Err("Payout timeout must be greater than 0".to_string());
            }
        }

        if self.stats.max_addresses == 0 {
            return Err("Max addresses must be greater than 0".to_string());
        }

        if self.stats.min_days > self.stats.max_days {
            return Err("stats.min_days must not exceed stats.max_days".to_string());
        }

        if !self.stats.noise_floor.is_finite() || self.stats.noise_floor < 0.0 {
            return Err("Noise floor must be a non-negative number".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}

// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

use crate::server::NotFoundPolicy;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Listening socket and outer loop
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `listen(2)` backlog
    pub backlog: i32,
    /// Outer loop tick; one serving cycle runs per tick
    pub cycle_interval_ms: u64,
}

/// Request reading and response writing
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Value of the `Server` header on every response
    pub server_name: String,
    /// Bytes requested per receive call
    pub recv_chunk_size: usize,
    /// Requests larger than this are answered with 413
    pub max_request_size: usize,
    /// Incomplete requests older than this are answered with 408
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// What to do when no route matches
    pub not_found: NotFoundPolicy,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// LED controller demo application
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DemoConfig {
    /// Root of the static files served by the catch-all route
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default = "default_led_count")]
    pub led_count: usize,
    /// Where LED state is saved between runs (not persisted if unset)
    #[serde(default)]
    pub state_file: Option<String>,
}

fn default_static_dir() -> String {
    "html".to_string()
}

const fn default_led_count() -> usize {
    8
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
            led_count: default_led_count(),
            state_file: None,
        }
    }
}

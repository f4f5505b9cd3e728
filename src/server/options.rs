// Serving options
// Runtime knobs for the serving cycle, built from configuration by the caller

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::http::response::DEFAULT_SERVER_NAME;
use crate::server::connection::ReadLimits;

/// Handling of requests no route matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundPolicy {
    /// Close the connection without sending anything
    #[default]
    Drop,
    /// Answer with 404
    Respond,
}

/// Options for [`super::Server`]
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub server_name: String,
    pub read_limits: ReadLimits,
    pub write_timeout: Duration,
    pub not_found: NotFoundPolicy,
    pub access_log: bool,
    pub access_log_format: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.to_string(),
            read_limits: ReadLimits {
                chunk_size: 1024,
                max_request_size: 8192,
                timeout: Duration::from_secs(2),
            },
            write_timeout: Duration::from_secs(2),
            not_found: NotFoundPolicy::Drop,
            access_log: false,
            access_log_format: "combined".to_string(),
        }
    }
}

impl From<&Config> for ServerOptions {
    fn from(config: &Config) -> Self {
        Self {
            server_name: config.http.server_name.clone(),
            read_limits: ReadLimits {
                chunk_size: config.http.recv_chunk_size,
                max_request_size: config.http.max_request_size,
                timeout: Duration::from_millis(config.http.read_timeout_ms),
            },
            write_timeout: Duration::from_millis(config.http.write_timeout_ms),
            not_found: config.http.not_found,
            access_log: config.logging.access_log,
            access_log_format: config.logging.access_log_format.clone(),
        }
    }
}

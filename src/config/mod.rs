// Configuration module entry point
// Loads typed configuration from an optional TOML file and the environment

mod types;

use std::net::SocketAddr;
use std::time::Duration;

// Re-export public types
pub use types::{Config, DemoConfig, HttpConfig, LoggingConfig, ServerConfig};

/// Prefix of environment overrides, e.g. `TINYROUTE_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "TINYROUTE";

impl Config {
    /// Load configuration from the specified file path
    ///
    /// The extension may be omitted (`config` finds `config.toml`). A missing
    /// file is not an error; defaults and environment overrides still apply.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.backlog", 16)?
            .set_default("server.cycle_interval_ms", 20)?
            .set_default("http.server_name", crate::http::response::DEFAULT_SERVER_NAME)?
            .set_default("http.recv_chunk_size", 1024)?
            .set_default("http.max_request_size", 8192)?
            .set_default("http.read_timeout_ms", 2000)?
            .set_default("http.write_timeout_ms", 2000)?
            .set_default("http.not_found", "drop")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Outer loop tick, never shorter than 1 ms
    pub const fn cycle_interval(&self) -> Duration {
        let ms = self.server.cycle_interval_ms;
        Duration::from_millis(if ms == 0 { 1 } else { ms })
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::NotFoundPolicy;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does/not/exist").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.http.recv_chunk_size, 1024);
        assert_eq!(cfg.http.server_name, "ESP32Server");
        assert_eq!(cfg.http.not_found, NotFoundPolicy::Drop);
        assert_eq!(cfg.demo.static_dir, "html");
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tinyroute.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 9090\n\n[http]\nnot_found = \"respond\"\nmax_request_size = 4096\n\n[demo]\nled_count = 16"
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.http.not_found, NotFoundPolicy::Respond);
        assert_eq!(cfg.http.max_request_size, 4096);
        assert_eq!(cfg.demo.led_count, 16);
    }

    #[test]
    fn test_invalid_address() {
        let mut cfg = Config::load_from("does/not/exist").unwrap();
        cfg.server.host = "not an ip".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }

    #[test]
    fn test_zero_cycle_interval_is_clamped() {
        let mut cfg = Config::load_from("does/not/exist").unwrap();
        assert_eq!(cfg.cycle_interval(), Duration::from_millis(20));
        cfg.server.cycle_interval_ms = 0;
        assert_eq!(cfg.cycle_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_to_toml_round_trips_port() {
        let cfg = Config::load_from("does/not/exist").unwrap();
        let rendered = cfg.to_toml().unwrap();
        assert!(rendered.contains("port = 8080"));
    }
}

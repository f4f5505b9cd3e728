//! Logger module
//!
//! Provides logging utilities for the router including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::net::SocketAddr;

use crate::config::Config;
use crate::error::ParseError;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, routes: &[&str]) {
    write_info("======================================");
    write_info("Router started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!(
        "Cycle interval: {} ms, read timeout: {} ms",
        config.server.cycle_interval_ms, config.http.read_timeout_ms
    ));
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info(&format!("Routes ({}):", routes.len()));
    for rule in routes {
        write_info(&format!("  - {rule}"));
    }
    write_info("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(peer_addr: &SocketAddr, err: &std::io::Error) {
    write_error(&format!("[ERROR] Connection {peer_addr}: {err}"));
}

pub fn log_bad_request(peer_addr: &SocketAddr, err: &ParseError) {
    write_error(&format!("[WARN] Bad request from {peer_addr}: {err}"));
}

pub fn log_unmatched(method: &str, path: &str) {
    write_error(&format!("[WARN] No route for {method} {path}"));
}

pub fn log_handler_failure(rule: &str, message: &str) {
    write_error(&format!("[ERROR] Handler for {rule} failed: {message}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}

pub fn log_shutdown(served: u64) {
    write_info(&format!("\n[Shutdown] Stopping after {served} responses"));
}

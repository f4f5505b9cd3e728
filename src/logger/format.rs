//! Access log format module
//!
//! Supports multiple log formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - Custom patterns with `$variables`

use std::net::SocketAddr;

use chrono::{DateTime, Local};

use crate::http::Request;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One served request, as written to the access log
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// Version token from the request line, e.g. `HTTP/1.1`
    pub version: String,
    pub status: u16,
    /// Bytes written for the whole response
    pub bytes_sent: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Entry for `request` from `peer`, stamped now
    pub fn from_request(peer: SocketAddr, request: &Request) -> Self {
        Self {
            remote_addr: peer.ip().to_string(),
            time: Local::now(),
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            version: request.version.clone(),
            status: 200,
            bytes_sent: 0,
            referer: request.header("referer").map(str::to_string),
            user_agent: request.header("user-agent").map(str::to_string),
            request_time_us: 0,
        }
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn request_line(&self) -> String {
        format!("{} {} {}", self.method, self.request_uri(), self.version)
    }

    /// `$remote_addr - - [$time_local] "$request" $status $bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.bytes_sent,
        )
    }

    fn format_json(&self) -> String {
        serde_json::json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "version": self.version,
            "status": self.status,
            "bytes_sent": self.bytes_sent,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables: `$remote_addr`, `$time_local`, `$time_iso8601`,
    /// `$request`, `$request_method`, `$request_uri`, `$request_time`
    /// (seconds, 3 decimals), `$status`, `$bytes_sent`, `$http_referer`,
    /// `$http_user_agent`.
    fn format_custom(&self, pattern: &str) -> String {
        #[allow(clippy::cast_precision_loss)]
        let request_time = self.request_time_us as f64 / 1_000_000.0;

        // $request_* before $request so the prefix is not replaced first
        pattern
            .replace("$remote_addr", &self.remote_addr)
            .replace("$time_local", &self.time.format(CLF_TIME).to_string())
            .replace("$time_iso8601", &self.time.to_rfc3339())
            .replace("$request_time", &format!("{request_time:.3}"))
            .replace("$request_method", &self.method)
            .replace("$request_uri", &self.request_uri())
            .replace("$request", &self.request_line())
            .replace("$status", &self.status.to_string())
            .replace("$bytes_sent", &self.bytes_sent.to_string())
            .replace("$http_referer", self.referer.as_deref().unwrap_or("-"))
            .replace("$http_user_agent", self.user_agent.as_deref().unwrap_or("-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{parse_request, Parsed};

    fn create_test_entry() -> AccessLogEntry {
        let raw = b"GET /set?rgb=112233 HTTP/1.1\r\nReferer: http://led.local/\r\nUser-Agent: curl/8.0\r\n\r\n";
        let Ok(Parsed::Complete(request, _)) = parse_request(raw) else {
            panic!("test request must parse");
        };
        let mut entry = AccessLogEntry::from_request("192.168.1.7:50123".parse().unwrap(), &request);
        entry.status = 200;
        entry.bytes_sent = 321;
        entry.request_time_us = 2000;
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.starts_with("192.168.1.7 - - ["));
        assert!(log.contains("\"GET /set?rgb=112233 HTTP/1.1\" 200 321"));
        assert!(log.ends_with("\"http://led.local/\" \"curl/8.0\""));
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.contains("\"GET /set?rgb=112233 HTTP/1.1\" 200 321"));
        assert!(!log.contains("curl"));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.7");
        assert_eq!(value["query"], "rgb=112233");
        assert_eq!(value["status"], 200);
        assert_eq!(value["bytes_sent"], 321);
    }

    #[test]
    fn test_format_custom() {
        let log = create_test_entry().format("$request_method $request_uri -> $status in $request_time");
        assert_eq!(log, "GET /set?rgb=112233 -> 200 in 0.002");
    }
}

//! HTTP response module
//!
//! Holds the handler-facing [`Response`] value and the writer that frames it
//! onto the wire. The writer always injects the server identification,
//! `Connection: Close` and permissive CORS headers, overriding any value the
//! handler set for the same names.

use std::io::{self, Write};

use serde::Serialize;

/// Allow-headers list advertised on every response
pub const CORS_ALLOW_HEADERS: &str = "Origin, Accept, Content-Type, X-Requested-With, X-CSRF-Token";

/// Methods advertised on every response
pub const CORS_ALLOW_METHODS: &str = "GET, POST";

/// Default value of the `Server` header
pub const DEFAULT_SERVER_NAME: &str = "ESP32Server";

/// Response headers, serialized in insertion order
///
/// Names compare case-insensitively; setting an existing name replaces
/// the value and keeps the original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, String)>,
}

impl ResponseHeaders {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set a header; CR and LF are removed from both name and value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = strip_line_breaks(name.into());
        let value = strip_line_breaks(value.into());
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn strip_line_breaks(mut text: String) -> String {
    if text.contains(|c: char| c == '\r' || c == '\n') {
        text.retain(|c| c != '\r' && c != '\n');
    }
    text
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// A handler's result: status, headers and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: ResponseHeaders,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, headers: ResponseHeaders, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// 200 with no extra headers
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, ResponseHeaders::new(), body)
    }

    /// Plain-text response
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::new(status, ResponseHeaders::new(), body).with_header("Content-Type", "text/plain")
    }

    /// 200 with a JSON-encoded body
    pub fn json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::ok(body).with_header("Content-Type", "application/json; charset=UTF-8"))
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response {
    Response::text(400, "400 Bad Request")
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response {
    Response::text(404, "404 Not Found")
}

/// Build 408 Request Timeout response
pub fn build_408_response() -> Response {
    Response::text(408, "408 Request Timeout")
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response {
    Response::text(413, "413 Payload Too Large")
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response {
    Response::text(500, "500 Internal Server Error")
}

/// Apply the headers every response carries, overriding caller values
pub fn apply_forced_headers(headers: &mut ResponseHeaders, server_name: &str) {
    headers.insert("Server", server_name);
    headers.insert("Connection", "Close");
    headers.insert("Access-Control-Allow-Origin", "*");
    headers.insert("Access-Control-Allow-Methods", CORS_ALLOW_METHODS);
    headers.insert("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS);
}

/// Frame a response: status line, headers, blank line, body, trailing CRLF
pub fn serialize_response(response: &Response, server_name: &str) -> Vec<u8> {
    let mut headers = response.headers.clone();
    apply_forced_headers(&mut headers, server_name);

    let mut out = Vec::with_capacity(128 + response.body.len());
    out.extend_from_slice(format!("HTTP/1.1 {}\r\n", response.status).as_bytes());
    for (name, value) in headers.iter() {
        out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&response.body);
    out.extend_from_slice(b"\r\n");
    out
}

/// Write a framed response with a single `write_all`
///
/// Returns the number of bytes written.
pub fn write_response<W: Write>(
    writer: &mut W,
    response: &Response,
    server_name: &str,
) -> io::Result<usize> {
    let bytes = serialize_response(response, server_name);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_basic() {
        let headers: ResponseHeaders = [("X", "Y")].into_iter().collect();
        let resp = Response::new(200, headers, "hi");
        let out = String::from_utf8(serialize_response(&resp, DEFAULT_SERVER_NAME)).unwrap();

        assert!(out.starts_with("HTTP/1.1 200\r\n"));
        assert!(out.contains("X: Y\r\n"));
        assert!(out.contains("Server: ESP32Server\r\n"));
        assert!(out.contains("Connection: Close\r\n"));
        assert!(out.contains("Access-Control-Allow-Origin: *\r\n"));
        assert!(out.contains("Access-Control-Allow-Methods: GET, POST\r\n"));
        assert!(out.contains(&format!("Access-Control-Allow-Headers: {CORS_ALLOW_HEADERS}\r\n")));
        assert!(out.ends_with("\r\n\r\nhi\r\n"));
    }

    #[test]
    fn test_forced_headers_override_caller() {
        let resp = Response::ok("x")
            .with_header("server", "Custom")
            .with_header("Connection", "keep-alive")
            .with_header("Access-Control-Allow-Origin", "https://example.com");
        let out = String::from_utf8(serialize_response(&resp, "Tiny")).unwrap();

        assert!(out.contains("server: Tiny\r\n"));
        assert!(!out.contains("Custom"));
        assert!(!out.contains("keep-alive"));
        assert!(!out.contains("example.com"));
        assert_eq!(out.matches("Connection:").count(), 1);
    }

    #[test]
    fn test_header_order_preserved() {
        let resp = Response::ok("")
            .with_header("B", "2")
            .with_header("A", "1");
        let out = String::from_utf8(serialize_response(&resp, DEFAULT_SERVER_NAME)).unwrap();
        let b = out.find("B: 2").unwrap();
        let a = out.find("A: 1").unwrap();
        let server = out.find("Server:").unwrap();
        assert!(b < a);
        assert!(a < server);
    }

    #[test]
    fn test_line_breaks_cannot_inject_headers() {
        let echoed = "red\r\nSet-Cookie: session=stolen";
        let resp = Response::ok("")
            .with_header("X-Color", echoed)
            .with_header("X-Bad\nName", "1");
        let out = String::from_utf8(serialize_response(&resp, DEFAULT_SERVER_NAME)).unwrap();

        assert!(out.contains("X-Color: redSet-Cookie: session=stolen\r\n"));
        assert!(!out.contains("\r\nSet-Cookie"));
        assert!(out.contains("X-BadName: 1\r\n"));
    }

    #[test]
    fn test_with_status_keeps_headers_and_body() {
        let resp = Response::text(200, "gone").with_status(410);
        assert_eq!(resp.status, 410);
        assert_eq!(resp.headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(resp.body, b"gone");
    }

    #[test]
    fn test_binary_body_written_verbatim() {
        let body = vec![0u8, 159, 146, 150];
        let resp = Response::ok(body.clone());
        let out = serialize_response(&resp, DEFAULT_SERVER_NAME);
        let tail = &out[out.len() - body.len() - 2..];
        assert_eq!(&tail[..body.len()], body.as_slice());
        assert_eq!(&tail[body.len()..], b"\r\n");
    }

    #[test]
    fn test_json_response() {
        let resp = Response::json(&serde_json::json!({"status": "on"})).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(
            resp.headers.get("content-type"),
            Some("application/json; charset=UTF-8")
        );
        assert_eq!(resp.body, br#"{"status":"on"}"#);
    }

    #[test]
    fn test_write_response_counts_bytes() {
        let mut sink = Vec::new();
        let written = write_response(&mut sink, &build_404_response(), "S").unwrap();
        assert_eq!(written, sink.len());
        assert!(sink.starts_with(b"HTTP/1.1 404\r\n"));
    }
}

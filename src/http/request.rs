//! Request parsing module
//!
//! Turns the bytes accumulated for one connection into a [`Request`].
//! Parsing is restartable: [`parse_request`] reports [`Parsed::Incomplete`]
//! until the header block and any announced body have arrived, so the
//! caller can keep appending bytes and try again on the next cycle.

use std::borrow::Cow;

use crate::error::ParseError;

/// End of the header block
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Ordered string map where re-inserting a key replaces its value in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a pair, replacing the value of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
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

/// Request headers keyed by lower-cased name
///
/// Duplicate names are not merged: the last one received wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Params,
}

impl Headers {
    pub const fn new() -> Self {
        Self {
            inner: Params::new(),
        }
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.inner
            .insert(name.trim().to_ascii_lowercase(), value.trim());
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter()
    }
}

/// One parsed HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Request path with the query string stripped
    pub path: String,
    /// Raw query string (without the leading `?`)
    pub query: Option<String>,
    pub version: String,
    pub params: Params,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    /// Body as text, replacing invalid UTF-8 sequences
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }
}

/// Outcome of a parse attempt over the bytes received so far
#[derive(Debug, PartialEq, Eq)]
pub enum Parsed {
    /// A full request, and the number of buffered bytes it consumed
    Complete(Request, usize),
    /// More bytes are needed
    Incomplete,
}

/// Parse a request from the bytes received so far
///
/// The header block ends at the first empty line. When `Content-Length`
/// is present the body is exactly that many bytes and parsing waits for
/// all of them. Without it, the body runs up to the next empty line, or
/// to the end of what has been received.
pub fn parse_request(buf: &[u8]) -> Result<Parsed, ParseError> {
    let Some(head_end) = find(buf, HEAD_TERMINATOR) else {
        return Ok(Parsed::Incomplete);
    };
    let head = std::str::from_utf8(&buf[..head_end]).map_err(|_| ParseError::InvalidEncoding)?;
    let body_start = head_end + HEAD_TERMINATOR.len();

    let mut lines = head.split("\r\n");
    let (method, target, version) = parse_request_line(lines.next().unwrap_or_default())?;

    let mut headers = Headers::new();
    for line in lines {
        let (name, value) = parse_header_line(line)?;
        headers.insert(name, value);
    }

    let rest = &buf[body_start..];
    let (body, consumed) = match headers.get("content-length") {
        Some(raw) => {
            let length: usize = raw
                .parse()
                .map_err(|_| ParseError::InvalidContentLength(raw.to_string()))?;
            if rest.len() < length {
                return Ok(Parsed::Incomplete);
            }
            (rest[..length].to_vec(), body_start + length)
        }
        None => {
            let body = unframed_body(rest);
            (body.to_vec(), buf.len())
        }
    };

    let (path, query) = split_target(target);
    let params = query.map(parse_params).unwrap_or_default();

    let request = Request {
        method: method.to_string(),
        path: path.to_string(),
        query: query.map(str::to_string),
        version: version.to_string(),
        params,
        headers,
        body,
    };
    Ok(Parsed::Complete(request, consumed))
}

/// Split `METHOD SP TARGET SP VERSION` on whitespace, at most twice
///
/// The version keeps whatever follows the target, so `GET /a b HTTP/1.1`
/// yields the version `b HTTP/1.1`.
pub fn parse_request_line(line: &str) -> Result<(&str, &str, &str), ParseError> {
    let malformed = || ParseError::MalformedRequestLine(line.to_string());
    let (method, rest) = next_token(line).ok_or_else(malformed)?;
    let (target, rest) = next_token(rest).ok_or_else(malformed)?;
    let version = rest.trim();
    if version.is_empty() {
        return Err(malformed());
    }
    Ok((method, target, version))
}

/// First whitespace-delimited token and the text after it
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    Some(s.split_once(char::is_whitespace).unwrap_or((s, "")))
}

/// Bytes the request will occupy once complete, known as soon as the head
/// has arrived
///
/// Head plus the announced `Content-Length` (zero when absent or
/// unparseable). `None` until the header block is complete.
pub fn announced_len(buf: &[u8]) -> Option<usize> {
    let head_end = find(buf, HEAD_TERMINATOR)?;
    let head = std::str::from_utf8(&buf[..head_end]).ok()?;
    let body_len = head
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .filter_map(|(_, value)| value.trim().parse::<usize>().ok())
        .last()
        .unwrap_or(0);
    Some((head_end + HEAD_TERMINATOR.len()).saturating_add(body_len))
}

/// Split a header line on its first `:`, trimming both halves
pub fn parse_header_line(line: &str) -> Result<(&str, &str), ParseError> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| ParseError::MalformedHeader(line.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::MalformedHeader(line.to_string()));
    }
    Ok((name, value.trim()))
}

/// Parse `k=v&k2=v2`
///
/// Pairs without exactly one `=` are dropped. No percent-decoding is applied.
pub fn parse_params(query: &str) -> Params {
    let mut params = Params::new();
    for pair in query.split('&') {
        let mut halves = pair.split('=');
        if let (Some(key), Some(value), None) = (halves.next(), halves.next(), halves.next()) {
            params.insert(key, value);
        }
    }
    params
}

fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

/// Body bytes up to the next empty line, or everything when there is none
fn unframed_body(rest: &[u8]) -> &[u8] {
    if rest.starts_with(b"\r\n") {
        return &[];
    }
    match find(rest, b"\n\r\n") {
        Some(idx) => &rest[..=idx],
        None => rest,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

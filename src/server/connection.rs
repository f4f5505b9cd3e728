// Connection module
// One accepted socket plus the bytes received on it so far

use std::io::{self, ErrorKind, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use crate::error::ParseError;
use crate::http::{self, Parsed, Request, Response};

/// Limits applied while reading a request
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    /// Bytes requested per receive call
    pub chunk_size: usize,
    /// Largest request (head and body) accepted
    pub max_request_size: usize,
    /// How long an incomplete request may stay pending
    pub timeout: Duration,
}

/// Where a connection stands after a read pass
#[derive(Debug)]
pub enum ReadState {
    /// A full request arrived
    Ready(Request),
    /// Nothing or only part of a request so far; try again next cycle
    Waiting,
    /// Peer went away or the socket failed before a request completed
    Closed,
    /// Buffered bytes exceeded the request size limit
    TooLarge,
    /// Request still incomplete after the read timeout
    TimedOut,
    /// Bytes arrived but do not form a request
    Invalid(ParseError),
}

/// Accepted connection with its receive buffer
///
/// The socket is closed when the value is dropped, so every exit path
/// from a serving cycle releases it.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: Vec<u8>,
    accepted_at: Instant,
    peer_closed: bool,
}

impl Connection {
    /// Take ownership of an accepted stream and make it non-blocking
    pub fn new(stream: TcpStream, peer: SocketAddr) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            peer,
            buffer: Vec::new(),
            accepted_at: Instant::now(),
            peer_closed: false,
        })
    }

    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Time since the connection was accepted
    pub fn age(&self) -> Duration {
        self.accepted_at.elapsed()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Receive whatever is available and try to parse a request from it
    pub fn poll_request(&mut self, limits: &ReadLimits) -> ReadState {
        if self.fill(limits).is_err() {
            return ReadState::Closed;
        }
        let announced = http::announced_len(&self.buffer).unwrap_or(0);
        if self.buffer.len().max(announced) > limits.max_request_size {
            return ReadState::TooLarge;
        }

        match http::parse_request(&self.buffer) {
            Ok(Parsed::Complete(request, _)) => ReadState::Ready(request),
            Err(err) => ReadState::Invalid(err),
            Ok(Parsed::Incomplete) if self.peer_closed => ReadState::Closed,
            Ok(Parsed::Incomplete) if self.age() >= limits.timeout => ReadState::TimedOut,
            Ok(Parsed::Incomplete) => ReadState::Waiting,
        }
    }

    /// Non-blocking receives until the socket would block, the peer closes,
    /// or the buffer passes the size limit
    fn fill(&mut self, limits: &ReadLimits) -> io::Result<()> {
        let mut chunk = vec![0u8; limits.chunk_size.max(1)];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.peer_closed = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    if self.buffer.len() > limits.max_request_size {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Write `response` in one call, then close the connection
    ///
    /// The socket goes back to blocking mode (bounded by `write_timeout`,
    /// unbounded when zero) so a body larger than the kernel send buffer is
    /// not cut short.
    pub fn respond(
        self,
        response: &Response,
        server_name: &str,
        write_timeout: Duration,
    ) -> io::Result<usize> {
        let mut stream = self.stream;
        stream.set_nonblocking(false)?;
        stream.set_write_timeout((!write_timeout.is_zero()).then_some(write_timeout))?;
        let written = http::write_response(&mut stream, response, server_name)?;
        // FIN now; the descriptor itself closes on drop
        let _ = stream.shutdown(Shutdown::Write);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    fn pair() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (stream, peer) = listener.accept().unwrap();
        (Connection::new(stream, peer).unwrap(), client)
    }

    fn limits() -> ReadLimits {
        ReadLimits {
            chunk_size: 16,
            max_request_size: 256,
            timeout: Duration::from_secs(5),
        }
    }

    fn poll_until_settled(conn: &mut Connection, limits: &ReadLimits) -> ReadState {
        for _ in 0..200 {
            match conn.poll_request(limits) {
                ReadState::Waiting => std::thread::sleep(Duration::from_millis(5)),
                other => return other,
            }
        }
        ReadState::Waiting
    }

    #[test]
    fn test_nothing_received_is_waiting() {
        let (mut conn, _client) = pair();
        assert!(matches!(conn.poll_request(&limits()), ReadState::Waiting));
        assert_eq!(conn.buffered(), 0);
    }

    #[test]
    fn test_request_accumulates_across_polls() {
        let (mut conn, mut client) = pair();
        client.write_all(b"GET /status HT").unwrap();
        client.flush().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(matches!(conn.poll_request(&limits()), ReadState::Waiting));

        client.write_all(b"TP/1.1\r\nHost: x\r\n\r\n").unwrap();
        match poll_until_settled(&mut conn, &limits()) {
            ReadState::Ready(req) => {
                assert_eq!(req.path, "/status");
                assert_eq!(req.header("host"), Some("x"));
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn test_too_large() {
        let (mut conn, mut client) = pair();
        client.write_all(&[b'a'; 400]).unwrap();
        assert!(matches!(
            poll_until_settled(&mut conn, &limits()),
            ReadState::TooLarge
        ));
    }

    #[test]
    fn test_announced_body_over_limit_is_too_large() {
        let (mut conn, mut client) = pair();
        client
            .write_all(b"POST /echo HTTP/1.1\r\nContent-Length: 10000\r\n\r\n")
            .unwrap();
        assert!(matches!(
            poll_until_settled(&mut conn, &limits()),
            ReadState::TooLarge
        ));
    }

    #[test]
    fn test_zero_write_timeout_still_responds() {
        let (mut conn, mut client) = pair();
        client.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(matches!(
            poll_until_settled(&mut conn, &limits()),
            ReadState::Ready(_)
        ));

        let written = conn
            .respond(&Response::ok("hi"), "S", Duration::ZERO)
            .unwrap();
        let mut out = Vec::new();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        std::io::Read::read_to_end(&mut client, &mut out).unwrap();
        assert_eq!(out.len(), written);
        assert!(out.starts_with(b"HTTP/1.1 200\r\n"));
    }

    #[test]
    fn test_timeout() {
        let (mut conn, mut client) = pair();
        client.write_all(b"GET / HTTP/1.1\r\n").unwrap();
        let quick = ReadLimits {
            timeout: Duration::from_millis(30),
            ..limits()
        };
        std::thread::sleep(Duration::from_millis(50));
        assert!(matches!(conn.poll_request(&quick), ReadState::TimedOut));
    }

    #[test]
    fn test_peer_closed_before_request() {
        let (mut conn, client) = pair();
        drop(client);
        assert!(matches!(
            poll_until_settled(&mut conn, &limits()),
            ReadState::Closed
        ));
    }

    #[test]
    fn test_invalid_request() {
        let (mut conn, mut client) = pair();
        client.write_all(b"NONSENSE\r\n\r\n").unwrap();
        assert!(matches!(
            poll_until_settled(&mut conn, &limits()),
            ReadState::Invalid(ParseError::MalformedRequestLine(_))
        ));
    }
}

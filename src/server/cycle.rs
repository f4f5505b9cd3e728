// Serving cycle module
// Accept, read, match, dispatch, respond and close, one connection at a time

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::panic::{self, AssertUnwindSafe};

use crate::error::ServeError;
use crate::http::{self, Request, Response};
use crate::logger::{self, AccessLogEntry};
use crate::routing::{RouteId, RouteTable};
use crate::server::connection::{Connection, ReadState};
use crate::server::listener::create_listener;
use crate::server::options::{NotFoundPolicy, ServerOptions};

/// What one call to [`Server::serve_once`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// No connection was waiting
    Idle,
    /// A connection is open but its request has not fully arrived
    Pending,
    /// A handler answered
    Served { route: RouteId, status: u16 },
    /// A handler failed; an error response was sent
    HandlerFailed { route: RouteId, status: u16 },
    /// Answered without reaching a handler (400, 404, 408, 413)
    Rejected { status: u16 },
    /// No route matched and the connection was closed without a response
    Unmatched,
    /// The peer went away or a socket error ended the connection
    Dropped,
}

/// A listening socket polled one connection at a time
///
/// At most one connection is in flight. When its request has not fully
/// arrived, it is kept and read again on the next call instead of
/// accepting another client.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    options: ServerOptions,
    pending: Option<Connection>,
}

impl Server {
    /// Serve on an already bound and listening socket
    pub fn new(listener: TcpListener, options: ServerOptions) -> Result<Self, ServeError> {
        listener.set_nonblocking(true).map_err(ServeError::Listener)?;
        Ok(Self {
            listener,
            options,
            pending: None,
        })
    }

    /// Bind a fresh listener on `addr`
    pub fn bind(addr: SocketAddr, backlog: i32, options: ServerOptions) -> std::io::Result<Self> {
        let listener = create_listener(addr, backlog)?;
        Ok(Self {
            listener,
            options,
            pending: None,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub const fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Whether a partially received request is waiting for more bytes
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Run one serving cycle without blocking
    ///
    /// Only listener failures are errors. Everything that can go wrong with a
    /// single client is reported through [`Cycle`], and its socket is closed
    /// on every path except [`Cycle::Pending`].
    pub fn serve_once(&mut self, routes: &RouteTable) -> Result<Cycle, ServeError> {
        let mut conn = match self.pending.take() {
            Some(conn) => conn,
            None => match self.accept()? {
                Accepted::Connection(conn) => conn,
                Accepted::Nothing => return Ok(Cycle::Idle),
                Accepted::Lost => return Ok(Cycle::Dropped),
            },
        };

        match conn.poll_request(&self.options.read_limits) {
            ReadState::Waiting => {
                self.pending = Some(conn);
                Ok(Cycle::Pending)
            }
            ReadState::Closed => Ok(Cycle::Dropped),
            ReadState::TooLarge => {
                logger::log_warning(&format!(
                    "Request from {} exceeds {} bytes",
                    conn.peer_addr(),
                    self.options.read_limits.max_request_size
                ));
                Ok(self.reject(conn, &http::build_413_response()))
            }
            ReadState::TimedOut => {
                logger::log_warning(&format!(
                    "Incomplete request from {} after {} ms",
                    conn.peer_addr(),
                    conn.age().as_millis()
                ));
                Ok(self.reject(conn, &http::build_408_response()))
            }
            ReadState::Invalid(err) => {
                logger::log_bad_request(&conn.peer_addr(), &err);
                Ok(self.reject(conn, &http::build_400_response()))
            }
            ReadState::Ready(request) => Ok(self.dispatch(conn, &request, routes)),
        }
    }

    fn accept(&self) -> Result<Accepted, ServeError> {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                if self.options.access_log {
                    logger::log_connection_accepted(&peer);
                }
                match Connection::new(stream, peer) {
                    Ok(conn) => Ok(Accepted::Connection(conn)),
                    Err(err) => {
                        logger::log_connection_error(&peer, &err);
                        Ok(Accepted::Lost)
                    }
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(Accepted::Nothing)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
                ) =>
            {
                Ok(Accepted::Lost)
            }
            Err(e) => Err(ServeError::Accept(e)),
        }
    }

    /// Match the request and run its handler
    fn dispatch(&self, conn: Connection, request: &Request, routes: &RouteTable) -> Cycle {
        let Some(found) = routes.find(&request.path) else {
            logger::log_unmatched(&request.method, &request.path);
            return match self.options.not_found {
                NotFoundPolicy::Drop => Cycle::Unmatched,
                NotFoundPolicy::Respond => {
                    let response = http::build_404_response();
                    self.finish(conn, Some(request), &response);
                    Cycle::Rejected { status: 404 }
                }
            };
        };

        let rule = found.route.rule();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            found.route.handler().handle(request, &found.params)
        }));

        match outcome {
            Ok(Ok(response)) => {
                let status = response.status;
                self.finish(conn, Some(request), &response);
                Cycle::Served {
                    route: found.id,
                    status,
                }
            }
            Ok(Err(err)) => {
                logger::log_handler_failure(rule, &err.to_string());
                let response = match err.status {
                    Some(status) => Response::text(status, err.message),
                    None => http::build_500_response(),
                };
                let status = response.status;
                self.finish(conn, Some(request), &response);
                Cycle::HandlerFailed {
                    route: found.id,
                    status,
                }
            }
            Err(_) => {
                logger::log_handler_failure(rule, "handler panicked");
                self.finish(conn, Some(request), &http::build_500_response());
                Cycle::HandlerFailed {
                    route: found.id,
                    status: 500,
                }
            }
        }
    }

    fn reject(&self, conn: Connection, response: &Response) -> Cycle {
        self.finish(conn, None, response);
        Cycle::Rejected {
            status: response.status,
        }
    }

    /// Write the response, close the socket and record the access log line
    fn finish(&self, conn: Connection, request: Option<&Request>, response: &Response) {
        let peer = conn.peer_addr();
        let elapsed = conn.age();
        let result = conn.respond(
            response,
            &self.options.server_name,
            self.options.write_timeout,
        );
        let written = match result {
            Ok(n) => n,
            Err(err) => {
                logger::log_connection_error(&peer, &err);
                0
            }
        };

        if let (true, Some(request)) = (self.options.access_log, request) {
            let mut entry = AccessLogEntry::from_request(peer, request);
            entry.status = response.status;
            entry.bytes_sent = written;
            entry.request_time_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
            logger::log_access(&entry, &self.options.access_log_format);
        }
    }
}

enum Accepted {
    Connection(Connection),
    Nothing,
    Lost,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    fn server(options: ServerOptions) -> Server {
        Server::bind("127.0.0.1:0".parse().unwrap(), 8, options).unwrap()
    }

    /// Drive cycles until one does something other than wait
    fn settle(server: &mut Server, routes: &RouteTable) -> Cycle {
        for _ in 0..400 {
            match server.serve_once(routes).unwrap() {
                Cycle::Idle | Cycle::Pending => std::thread::sleep(Duration::from_millis(5)),
                other => return other,
            }
        }
        panic!("serving cycle never settled");
    }

    fn read_all(mut client: TcpStream) -> String {
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut out = String::new();
        let _ = client.read_to_string(&mut out);
        out
    }

    #[test]
    fn test_idle_when_nobody_connects() {
        let mut srv = server(ServerOptions::default());
        let mut routes = RouteTable::new();
        routes.register("/", |_, _| Ok(Response::ok("root"))).unwrap();

        for _ in 0..3 {
            assert_eq!(srv.serve_once(&routes).unwrap(), Cycle::Idle);
        }
        assert_eq!(routes.len(), 1);
        assert!(!srv.has_pending());
    }

    #[test]
    fn test_serves_matched_route() {
        let mut srv = server(ServerOptions::default());
        let mut routes = RouteTable::new();
        let id = routes
            .register("/mode/<mode>", |_, params| {
                Ok(Response::ok(format!("mode={}", params.get("mode").unwrap_or(""))))
            })
            .unwrap();

        let mut client = TcpStream::connect(srv.local_addr().unwrap()).unwrap();
        client.write_all(b"GET /mode/rainbow HTTP/1.1\r\n\r\n").unwrap();

        assert_eq!(
            settle(&mut srv, &routes),
            Cycle::Served {
                route: id,
                status: 200
            }
        );
        let out = read_all(client);
        assert!(out.starts_with("HTTP/1.1 200\r\n"));
        assert!(out.ends_with("\r\n\r\nmode=rainbow\r\n"));
    }

    #[test]
    fn test_unmatched_drop_closes_without_response() {
        let mut srv = server(ServerOptions::default());
        let routes = RouteTable::new();

        let mut client = TcpStream::connect(srv.local_addr().unwrap()).unwrap();
        client.write_all(b"GET /missing HTTP/1.1\r\n\r\n").unwrap();

        assert_eq!(settle(&mut srv, &routes), Cycle::Unmatched);
        assert_eq!(read_all(client), "");
    }

    #[test]
    fn test_unmatched_respond_sends_404() {
        let mut srv = server(ServerOptions {
            not_found: NotFoundPolicy::Respond,
            ..ServerOptions::default()
        });
        let routes = RouteTable::new();

        let mut client = TcpStream::connect(srv.local_addr().unwrap()).unwrap();
        client.write_all(b"GET /missing HTTP/1.1\r\n\r\n").unwrap();

        assert_eq!(settle(&mut srv, &routes), Cycle::Rejected { status: 404 });
        assert!(read_all(client).starts_with("HTTP/1.1 404\r\n"));
    }

    #[test]
    fn test_bad_request() {
        let mut srv = server(ServerOptions::default());
        let routes = RouteTable::new();

        let mut client = TcpStream::connect(srv.local_addr().unwrap()).unwrap();
        client.write_all(b"HELLO\r\n\r\n").unwrap();

        assert_eq!(settle(&mut srv, &routes), Cycle::Rejected { status: 400 });
        assert!(read_all(client).starts_with("HTTP/1.1 400\r\n"));
    }

    #[test]
    fn test_handler_error_and_panic() {
        let mut srv = server(ServerOptions::default());
        let mut routes = RouteTable::new();
        let teapot = routes
            .register("/teapot", |_, _| {
                Err(crate::error::HandlerError::with_status(418, "short and stout"))
            })
            .unwrap();
        let boom = routes
            .register("/boom", |_, _| -> crate::routing::HandlerResult {
                panic!("handler bug")
            })
            .unwrap();

        let mut client = TcpStream::connect(srv.local_addr().unwrap()).unwrap();
        client.write_all(b"GET /teapot HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(
            settle(&mut srv, &routes),
            Cycle::HandlerFailed {
                route: teapot,
                status: 418
            }
        );
        assert!(read_all(client).contains("short and stout"));

        let mut client = TcpStream::connect(srv.local_addr().unwrap()).unwrap();
        client.write_all(b"GET /boom HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(
            settle(&mut srv, &routes),
            Cycle::HandlerFailed {
                route: boom,
                status: 500
            }
        );
        assert!(read_all(client).starts_with("HTTP/1.1 500\r\n"));
    }

    #[test]
    fn test_client_that_sends_nothing_times_out() {
        let mut options = ServerOptions::default();
        options.read_limits.timeout = Duration::from_millis(40);
        let mut srv = server(options);
        let routes = RouteTable::new();

        let client = TcpStream::connect(srv.local_addr().unwrap()).unwrap();
        assert_eq!(settle(&mut srv, &routes), Cycle::Rejected { status: 408 });
        assert!(read_all(client).starts_with("HTTP/1.1 408\r\n"));
    }
}

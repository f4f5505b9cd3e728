//! Minimal single-connection HTTP router for constrained sockets.
//!
//! A [`RouteTable`] is built at startup from path templates such as
//! `/mode/<mode>` and handed to [`Server::serve_once`], which the
//! application calls from its own loop. Each call accepts or continues at
//! most one connection, never blocks, and closes the connection once a
//! response has been written.
//!
//! ```no_run
//! use tinyroute::{Response, RouteTable, Server, ServerOptions};
//!
//! let mut routes = RouteTable::new();
//! routes
//!     .register("/set", |req, _| {
//!         Ok(Response::ok(format!("rgb={}", req.param("rgb").unwrap_or("none"))))
//!     })
//!     .unwrap();
//!
//! let mut server = Server::bind("0.0.0.0:80".parse().unwrap(), 16, ServerOptions::default()).unwrap();
//! loop {
//!     server.serve_once(&routes).unwrap();
//!     // other work: animations, sensors, ...
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use error::{HandlerError, ParseError, RouteError, ServeError};
pub use http::{Request, Response, ResponseHeaders};
pub use routing::{Handler, HandlerResult, PathParams, RouteId, RouteTable};
pub use server::{Cycle, NotFoundPolicy, Server, ServerOptions};

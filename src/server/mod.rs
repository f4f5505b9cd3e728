// Server module entry point
// Listener creation, per-connection reading and the serving cycle

pub mod connection;
pub mod cycle;
pub mod listener;
pub mod options;

// Re-export commonly used types
pub use connection::{Connection, ReadLimits, ReadState};
pub use cycle::{Cycle, Server};
pub use listener::create_listener;
pub use options::{NotFoundPolicy, ServerOptions};

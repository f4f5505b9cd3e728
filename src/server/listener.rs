// Listener module
// Creates the non-blocking TCP listener the serving cycle polls

use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener};

/// Create a non-blocking `TcpListener` with `SO_REUSEADDR` enabled.
///
/// The serving cycle accepts at most one connection per call and must never
/// block when nobody is connecting, so the socket is non-blocking from the start.
///
/// # Arguments
///
/// * `addr` - The socket address to bind to
/// * `backlog` - Pending-connection queue length passed to `listen(2)`
pub fn create_listener(addr: SocketAddr, backlog: i32) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // Allow quick rebinding after a restart while old sockets sit in TIME_WAIT
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}

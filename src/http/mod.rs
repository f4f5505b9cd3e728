//! HTTP protocol layer module
//!
//! Hand-rolled HTTP/1.1 subset: request parsing, response framing and
//! content-type lookup. Nothing here touches sockets.

pub mod cache;
pub mod mime;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{announced_len, parse_request, Headers, Params, Parsed, Request};
pub use response::{
    build_400_response, build_404_response, build_408_response, build_413_response,
    build_500_response, serialize_response, write_response, Response, ResponseHeaders,
};

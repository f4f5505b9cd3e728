//! Routing module
//!
//! Provides path-template routing:
//! - Rule compilation into anchored matchers (literal, variable and wildcard segments)
//! - An ordered route table with first-match dispatch

pub mod pattern;
pub mod table;

pub use pattern::{RoutePattern, Segment};
pub use table::{Handler, HandlerResult, PathParams, Route, RouteId, RouteMatch, RouteTable};

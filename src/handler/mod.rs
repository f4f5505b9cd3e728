//! Reusable handlers
//!
//! Ready-made [`crate::routing::Handler`] implementations applications can
//! register alongside their own closures.

pub mod static_files;

pub use static_files::StaticFiles;

//! Platform sentinel service
//!
//! HTTP surface over [`sentinel_core::SentinelEngine`] plus the terminal
//! renderer used by the `sentinel` binary.

pub mod handler;
pub mod output;

pub use handler::{create_router, AppState};

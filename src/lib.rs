//! Client side request layer for the language learning app backend

pub mod analysis;
pub mod api;
pub mod config;
pub mod ctx;
pub mod notify;
pub mod store;

/// Version constant for the client
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

//! Proxy pool for outbound requests
//!
//! This module provides round-robin proxy selection with health tracking.
//!
//! # Components
//!
//! - `ProxyPool`: the shared set of endpoints and their health map
//! - `ProxyEndpoint`: a snapshot of one endpoint handed out per request
//! - `ProxyMode`: whether direct connections are allowed when no proxy exists

mod endpoint;
mod pool;

pub use endpoint::{parse_proxy_address, ProxyEndpoint, ProxyMode};
pub use pool::ProxyPool;

//! Warden Daemon library
//!
//! This module provides the core components for the warden daemon:
//! - Admission decision endpoint
//! - Lifecycle API for templates, constraints, expansions and namespaces
//! - Prometheus metrics
//! - Server lifecycle management

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use api::{create_router, AppState};
pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, DaemonResult};
pub use server::Server;

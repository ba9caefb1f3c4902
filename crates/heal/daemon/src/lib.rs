//! HEAL Daemon library
//!
//! This module provides the core components for the HEAL daemon:
//! - REST API handlers
//! - Remediation action handlers and host checks
//! - Configuration loading
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod remediation;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, ApiResult, DaemonError, DaemonResult};
pub use server::Server;

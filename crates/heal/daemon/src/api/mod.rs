//! API layer for heal-daemon

pub mod rest;

pub use rest::router::create_router;

//! Incident persistence.
//!
//! The orchestrator only talks to the [`IncidentStore`] trait. An in-memory
//! store is always available; the PostgreSQL store is behind the `postgres`
//! feature.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod traits;

pub use memory::InMemoryIncidentStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresIncidentStore;
pub use traits::IncidentStore;

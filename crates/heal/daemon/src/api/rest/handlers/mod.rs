//! API request handlers

mod health;
mod incidents;

pub use health::*;
pub use incidents::*;

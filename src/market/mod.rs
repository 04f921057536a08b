//! Market data: quotes, chain snapshots and the provider they come from.

pub mod loader;
pub mod provider;
pub mod types;

pub use provider::*;
pub use types::*;

//! # slotgate-store
//!
//! Store backends for Slotgate. Supports two modes:
//!
//! - **redis**: shared Redis server using the [redis](https://crates.io/crates/redis) crate
//! - **memory**: in-process store for single-process deployments and tests
//!
//! The backend is selected at runtime based on configuration.

#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::StoreManager;

//! Redis store backend.

pub mod client;
pub mod registry;
pub mod store;

pub use client::RedisClient;
pub use registry::ClientRegistry;
pub use store::RedisSlotStore;

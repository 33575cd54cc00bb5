//! # slotgate-core
//!
//! Core crate for Slotgate. Contains the store trait the limiter talks to,
//! configuration schemas, the limit descriptor and holder identifiers,
//! and the unified error type.
//!
//! This crate has **no** internal dependencies on other Slotgate crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::GateError;
pub use result::GateResult;
pub use traits::SlotStore;
pub use types::{HolderId, LimitDescriptor};

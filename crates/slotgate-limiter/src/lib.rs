//! # slotgate-limiter
//!
//! Lets independent processes agree, through a shared store, on how many of
//! them may run a named section of code at once.
//!
//! - [`SlotLimiter`] runs a scope once a slot is free and always releases it.
//! - [`StaleLockCleaner`] evicts holder entries whose lease has expired.
//! - [`KeyEnumerator`] lists bookkeeping keys by glob pattern.
//! - [`Gate`] bundles the three over one store.

pub mod cleaner;
pub mod gate;
pub mod keys;
pub mod limiter;

pub use cleaner::StaleLockCleaner;
pub use gate::Gate;
pub use keys::KeyEnumerator;
pub use limiter::{Admission, Attempt, SlotLimiter};

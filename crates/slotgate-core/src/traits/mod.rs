//! Core traits defined in `slotgate-core` and implemented by other crates.

pub mod slot_store;

pub use slot_store::{ScanPage, SlotStore};

//! Shared domain types.

pub mod descriptor;
pub mod holder;

pub use descriptor::LimitDescriptor;
pub use holder::HolderId;

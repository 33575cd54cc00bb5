//! Convenience result type alias for Slotgate.

use crate::error::GateError;

/// A specialized `Result` type for Slotgate operations.
pub type GateResult<T> = Result<T, GateError>;

//! Error type shared by the fallible map operations.

use std::collections::TryReserveError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    /// `at`/`at_mut` was asked for a key that is not present.
    KeyNotFound,
    /// Allocating a larger bucket array failed; the map was left untouched.
    AllocationFailure(TryReserveError),
    /// The requested bucket count does not fit in `usize`.
    CapacityOverflow,
    /// A maximum load factor must be finite and strictly positive.
    InvalidLoadFactor(f32),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::KeyNotFound => write!(f, "key is not found"),
            MapError::AllocationFailure(e) => {
                write!(f, "failed to allocate bucket array: {}", e)
            }
            MapError::CapacityOverflow => write!(f, "bucket count overflow"),
            MapError::InvalidLoadFactor(lf) => {
                write!(f, "invalid max load factor {}", lf)
            }
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::AllocationFailure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TryReserveError> for MapError {
    fn from(e: TryReserveError) -> Self {
        MapError::AllocationFailure(e)
    }
}

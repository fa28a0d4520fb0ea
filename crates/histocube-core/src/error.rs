//! Error types for histocube-core
//!
//! Provides a unified error type shared by the store, population and export
//! crates. Each variant captures enough context for diagnostics without
//! exposing internal implementation details.

use thiserror::Error;

/// Histocube error type
#[derive(Error, Debug)]
pub enum Error {
    /// Container file has a bad magic tag, unsupported version or a
    /// truncated/corrupt layer directory
    #[error("format error: {0}")]
    Format(String),

    /// Store file does not exist
    #[error("store not found: {0}")]
    StoreNotFound(String),

    /// Store file already exists and truncation was not requested
    #[error("store already exists: {0}")]
    AlreadyExists(String),

    /// No layer with the given name
    #[error("layer not found: {0}")]
    LayerNotFound(String),

    /// Invalid parameter value (bad bin domain, duplicate layer name,
    /// zero feature count, bad bin index, mismatched buffer size)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Feature row range outside `[0, num_features)`
    #[error("row range [{start}, {end}] outside 0..{num_features}")]
    RangeOutOfBounds {
        start: u64,
        end: u64,
        num_features: u64,
    },

    /// Zone and value rasters (or an output sink) have different pixel grids
    #[error("raster grid mismatch: {}x{} vs {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    GridMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Operation on a store handle that has been closed
    #[error("store handle is closed")]
    ClosedHandle,

    /// Mutating operation on a store opened read-only
    #[error("store is opened read-only")]
    ReadOnly,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for histocube operations
pub type Result<T> = std::result::Result<T, Error>;

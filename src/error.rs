//! Error types for the expression/assignment engine.
//!
//! - [`Error`] — the single failure type surfaced at every API boundary,
//!   no local recovery attempted.

/// Failure kinds produced by shape algebra, element access, reshape and
/// assignment.
///
/// The fast path and the stepper path of the assignment engine report the
/// same variant for the same inputs — internal strategy selection is never
/// observable through the error type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Two shapes disagree on an axis where neither extent is 1.
    #[error(
        "shapes are not broadcast-compatible at axis {axis}: lhs extent {lhs_extent}, rhs extent {rhs_extent}"
    )]
    BroadcastIncompatible {
        /// Axis (counted from the trailing axis) where the mismatch occurs.
        axis: usize,
        /// Left-hand extent at `axis`.
        lhs_extent: usize,
        /// Right-hand extent at `axis`.
        rhs_extent: usize,
    },

    /// A checked element access used an index at or beyond the extent of
    /// its axis.
    #[error("index {index} out of range for axis {axis} with extent {extent}")]
    IndexOutOfRange {
        /// Axis the out-of-range index was supplied for.
        axis: usize,
        /// The offending index.
        index: usize,
        /// The axis's extent.
        extent: usize,
    },

    /// `reshape(shape, strides)` was called with mismatched lengths.
    #[error("strides length {strides_ndim} does not match shape length {shape_ndim}")]
    DimensionMismatch {
        /// `shape.ndim()`.
        shape_ndim: usize,
        /// `strides.ndim()`.
        strides_ndim: usize,
    },

    /// The backing buffer allocation was refused by the global allocator.
    #[error("allocation of {size} bytes (align {align}) failed")]
    AllocationFailed {
        /// Requested allocation size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        align: usize,
    },

    /// An operation that requires a non-empty axis was invoked on a shape
    /// whose extent along that axis is 0.
    #[error("axis {axis} has extent 0")]
    EmptyAxis {
        /// The offending axis.
        axis: usize,
    },
}

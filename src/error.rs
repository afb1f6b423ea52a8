//! Error types for dense CRF inference.

use thiserror::Error;

/// Fatal conditions raised by configuration or per-image preconditions.
///
/// None of these are retried or recovered internally; the host validates
/// inputs before invocation to avoid triggering them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrfError {
    #[error("{kind} kernel weights and bandwidths must have the same length (weights={weights}, bandwidths={bandwidths})")]
    KernelListMismatch {
        kind: &'static str,
        weights: usize,
        bandwidths: usize,
    },
    #[error("color kernels declared but the engine will never receive color input")]
    ColorKernelsWithoutColor,
    #[error("color input promised but no color kernels declared")]
    NoColorKernels,
    #[error("image needs {requested} buffer elements but only {capacity} are allocated; call reshape first")]
    CapacityExceeded { requested: usize, capacity: usize },
    #[error("configuration declares color kernels but no color input was supplied")]
    MissingColor,
    #[error("color input must have exactly 3 channels, got {channels}")]
    ColorChannelMismatch { channels: usize },
    #[error("color buffer holds {got} values, expected {expected} for the padded region")]
    ColorBufferMismatch { got: usize, expected: usize },
    #[error("score buffer holds {got} values, expected {expected} for the padded region")]
    ScoreBufferMismatch { got: usize, expected: usize },
    #[error("output buffer holds {got} values, expected {expected} for the padded region")]
    OutputBufferMismatch { got: usize, expected: usize },
    #[error("backward-mode differentiation is not implemented for mean-field inference")]
    UnsupportedBackward,
}

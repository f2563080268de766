//! Errors raised at the contraction boundary.

use crate::symm::EriSymm;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JKError {
    /// Basis dimension is zero.
    #[error("basis dimension must be positive")]
    EmptyBasis,

    /// Buffer length for the basis dimension does not fit in `usize`.
    #[error("basis dimension {n} is too large to address {symm} integrals")]
    TooLarge { n: usize, symm: EriSymm },

    /// Buffer length does not agree with the basis dimension and storage class.
    #[error("{what} has {found} elements, expected {expected}")]
    ShapeMismatch { what: &'static str, expected: usize, found: usize },

    /// Kernel was written for another storage class.
    #[error("kernel `{kernel}` reads {expected} integrals, but the contraction runs on {found}")]
    KernelMismatch { kernel: &'static str, expected: EriSymm, found: EriSymm },

    /// Density matrix tensor is not a square matrix.
    #[error("density matrix must be square, got shape {0:?}")]
    NotSquare(Vec<usize>),

    /// Integral buffer length matches none of the packed layouts.
    #[error("cannot infer integral symmetry from {len} elements for basis dimension {n}")]
    UnknownLayout { len: usize, n: usize },

    #[error("unknown symmetry class `{0}`")]
    UnknownSymm(String),

    #[error("unknown kernel `{0}`")]
    UnknownKernel(String),

    #[error("unknown contraction `{0}`")]
    UnknownContraction(String),

    /// Input scan found NaN or infinity.
    #[error("non-finite value in {what} at position {index}")]
    NonFinite { what: &'static str, index: usize },

    #[error("contraction cancelled")]
    Cancelled,

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

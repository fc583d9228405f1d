//! Error types for the alpine-solver library
//!
//! This module provides the main error and result types used throughout the
//! library. All errors use the `thiserror` crate for automatic trait
//! implementations.

use thiserror::Error;

/// Main result type used throughout the alpine-solver library
pub type AlpineResult<T> = Result<T, SolverError>;

/// Main error type for the alpine-solver library
#[derive(Debug, Clone, Error)]
pub enum SolverError {
    /// A vector or matrix did not have the size the caller promised
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Number of multiplier blocks does not match the number of constraints
    #[error(
        "Specified number of multipliers ({provided}) is not the same as the \
         number of constraints ({expected})"
    )]
    MultiplierCount { provided: usize, expected: usize },

    /// A solver buffer picked up NaN entries
    #[error("Computation produced NaN entries in `{name}`")]
    NaN { name: &'static str },

    /// A factorization signature contained entries other than -1, 0, 1
    #[error("Matrix signature should only have 0s, 1s, and -1s")]
    InvalidSignature,

    /// The inertia-correction loop exhausted its regularization budget
    #[error("Inertia could not be corrected: regularization exceeded {delta_max:.3e}")]
    InertiaCorrectionFailed { delta_max: f64 },

    /// Numeric factorization failed
    #[error("Factorization failed: {0}")]
    Factorization(String),

    /// Invalid solver parameters provided
    #[error("Invalid solver parameters: {0}")]
    InvalidParameters(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SolverError::MultiplierCount {
            provided: 2,
            expected: 3,
        };
        assert!(error.to_string().contains("(2)"));
        assert!(error.to_string().contains("(3)"));

        let error = SolverError::NaN { name: "kkt_rhs" };
        assert_eq!(
            error.to_string(),
            "Computation produced NaN entries in `kkt_rhs`"
        );
    }

    #[test]
    fn test_result_alias() {
        let ok: AlpineResult<i32> = Ok(1);
        assert!(ok.is_ok());
        let err: AlpineResult<i32> = Err(SolverError::InvalidSignature);
        assert!(err.is_err());
    }
}

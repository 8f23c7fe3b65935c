//! Error types for orbit determination
//!
//! Fatal conditions are reported through [`OdError`]. Soft integrator
//! outcomes (degraded accuracy, step budget exhausted, stiffness) are not
//! errors; they travel as [`crate::integrator::IntegrationStatus`] alongside
//! the best available state.

/// Fatal errors raised by the numerical core
#[derive(Debug, Clone, PartialEq)]
pub enum OdError {
    /// Operand shapes are incompatible (e.g. measurement Jacobian vs. state)
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A structurally invalid argument (bad shape for inverse, out-of-order
    /// observations, empty tables, ...)
    InvalidArgument(String),

    /// Gauss-Jordan elimination hit a pivot below the singularity threshold
    SingularMatrix,

    /// Requested gravity degree/order exceeds the loaded coefficient tables
    UnsupportedDegree {
        requested: (usize, usize),
        available: (usize, usize),
    },

    /// Integrator tolerances are non-positive or otherwise unusable
    InvalidParameters(String),

    /// The innovation covariance (R + H P H^T) could not be inverted
    SingularInnovationCovariance,
}

impl std::fmt::Display for OdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DimensionMismatch { expected, found } => {
                write!(
                    f,
                    "dimension mismatch: expected {}x{}, found {}x{}",
                    expected.0, expected.1, found.0, found.1
                )
            }
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Self::SingularMatrix => write!(f, "matrix is singular or near-singular"),
            Self::UnsupportedDegree {
                requested,
                available,
            } => {
                write!(
                    f,
                    "gravity field degree/order {}x{} exceeds loaded tables ({}x{})",
                    requested.0, requested.1, available.0, available.1
                )
            }
            Self::InvalidParameters(msg) => write!(f, "invalid parameters: {}", msg),
            Self::SingularInnovationCovariance => {
                write!(f, "innovation covariance is singular")
            }
        }
    }
}

impl std::error::Error for OdError {}

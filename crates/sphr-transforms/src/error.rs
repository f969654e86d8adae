use thiserror::Error;

use sphr_sampling::SamplingError;
use sphr_wigner::WignerError;

pub type TransformResult<T> = Result<T, TransformError>;

/// Input-contract violations of the transform engine. Every variant is
/// raised before any computation begins; there are no retries and no
/// partial results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Wigner(#[from] WignerError),
    #[error("spin {spin} is invalid for band-limit {band_limit} (need |spin| < L)")]
    InvalidSpin { spin: i64, band_limit: usize },
    #[error("harmonic lower bound {l_lower} is invalid for band-limit {band_limit}")]
    InvalidLowerBound { l_lower: usize, band_limit: usize },
    #[error("azimuthal band-limit {azimuthal_band} is invalid for band-limit {band_limit}")]
    InvalidAzimuthalBand {
        azimuthal_band: usize,
        band_limit: usize,
    },
    #[error("{what} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("kernel was built for different parameters: {detail}")]
    KernelMismatch { detail: String },
    #[error("precompute bundle was built for different parameters: {detail}")]
    PrecomputeMismatch { detail: String },
    #[error("non-finite input rejected in hardened mode")]
    NonFiniteInput,
}

#![deny(unsafe_code)]

//! Spherical-harmonic and Wigner (SO(3)) transforms by separation of
//! variables with FFTs, over the Mw, Mwss, Driscoll-Healy, Gauss-Legendre
//! and HEALPix sampling schemes, with on-the-fly Wigner-d recursion or
//! precomputed kernels, and optional reality acceleration.
//!
//! ## Module layout
//!
//! | Module        | Contents                                            |
//! |---------------|-----------------------------------------------------|
//! | `spherical`   | scalar forward/inverse transforms                   |
//! | `so3`         | Wigner forward/inverse transforms                   |
//! | `construct`   | kernel builder ([`SpinKernel`], [`WignerKernel`])   |
//! | `resampling`  | Mw <-> doubled-Mwss grid conversion                 |
//! | `healpix_fft` | ragged per-ring FFT adapter                         |
//! | `signal`      | pixel-space containers                              |
//! | `options`     | per-call configuration                              |
//!
//! Determinism: for fixed inputs the outputs are reproducible up to the
//! ordering of floating-point summations; callers should treat results as
//! exact only to roughly 1e-12 relative error.

pub mod construct;
pub mod error;
mod fft;
pub mod healpix_fft;
pub mod options;
pub mod resampling;
pub mod signal;
pub mod so3;
pub mod spherical;

pub use construct::{
    KernelRecursion, SpinKernel, WignerKernel, spin_spherical_kernel, wigner_kernel,
};
pub use error::{TransformError, TransformResult};
pub use options::TransformOptions;
pub use signal::{PixelSignal, So3Signal};

use std::f64::consts::PI;

pub(crate) fn parity(x: i64) -> f64 {
    if x.rem_euclid(2) == 0 { 1.0 } else { -1.0 }
}

pub(crate) fn elfactor(el: usize) -> f64 {
    ((2 * el + 1) as f64 / (4.0 * PI)).sqrt()
}

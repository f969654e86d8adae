#![forbid(unsafe_code)]

//! Sampling geometry and quadrature weights on the sphere.
//!
//! Pure functions of (band-limit, scheme, resolution): polar ring positions,
//! per-ring azimuthal sample counts and offsets, array shapes, and the
//! integration weights consumed by forward transforms. No state is held
//! anywhere in this crate.

pub mod grid;
pub mod healpix;
pub mod quadrature;

pub use grid::{
    FShape, SamplingError, Scheme, f_shape, flm_shape, flmn_shape, ftm_shape, m_offset, ntheta,
    nphi_equiang, phis_equiang, thetas,
};
pub use healpix::{
    npix, nphi_ring, ntheta_healpix, p2phi_ring, ring_phase_shift, ring_starts, thetas_healpix,
};
pub use quadrature::{mw_weights, quad_weights, quad_weights_transform};

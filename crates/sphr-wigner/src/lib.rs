#![forbid(unsafe_code)]

//! Wigner-d matrix generation.
//!
//! Two independent engines:
//!
//! - [`recursion`] — the Price-McEwen on-the-fly recursion over azimuthal
//!   order, producing one slice (fixed second index) of the Wigner-d matrix
//!   for all degrees and all sampled polar angles at once, with on-the-fly
//!   renormalisation against over/under-flow.
//! - [`trapani`] — the Trapani-Navaza closed-form recursion over degree,
//!   producing the full Wigner-d plane at pi/2. Consumed only by kernel
//!   construction.

pub mod recursion;
pub mod trapani;

pub use recursion::{
    Precomputes, WignerError, WignerPrecomputes, compute_all_slices, generate_precomputes,
    generate_precomputes_wigner,
};

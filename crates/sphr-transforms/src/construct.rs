//! Kernel / precompute builder.
//!
//! Kernels are the quadrature-and-recursion product ready for direct
//! contraction: Wigner-d slices at every ring, per-degree normalisation,
//! ring quadrature weights on the forward side, and (HEALPix) the per-ring
//! azimuthal phase table carried alongside the real tensor. Immutable once
//! built and keyed by their generating parameters.

use std::f64::consts::PI;

use ndarray::{Array2, Array3, Array4};
use num_complex::Complex64;

use sphr_runtime::{Notice, NoticeKind, record_notice};
use sphr_sampling::{Scheme, healpix, quad_weights_transform};
use sphr_wigner::{compute_all_slices, generate_precomputes, trapani};

use crate::elfactor;
use crate::error::{TransformError, TransformResult};

/// Which Wigner-d generator drives kernel construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelRecursion {
    /// Per-ring slices from the Price-McEwen recursion.
    #[default]
    PriceMcEwen,
    /// Plane recursion at pi/2 combined through the Fourier decomposition
    /// d^l_{mn}(theta) = i^{m-n} sum_k d^l_{km} d^l_{kn} e^{-ik theta}.
    TrapaniHalfPi,
}

fn i_pow(e: i64) -> Complex64 {
    match e.rem_euclid(4) {
        0 => Complex64::new(1.0, 0.0),
        1 => Complex64::new(0.0, 1.0),
        2 => Complex64::new(-1.0, 0.0),
        _ => Complex64::new(0.0, -1.0),
    }
}

/// Wigner-d slices [2L-1, n_theta, L] at the given angles for slice index
/// m' = -spin, via the selected generator.
fn dl_slices(
    l: usize,
    spin: i64,
    scheme: Scheme,
    nside: Option<usize>,
    forward: bool,
    recursion: KernelRecursion,
) -> TransformResult<Array3<f64>> {
    match recursion {
        KernelRecursion::PriceMcEwen => {
            let pre = generate_precomputes(l, spin, scheme, nside, forward)?;
            Ok(compute_all_slices(&pre))
        }
        KernelRecursion::TrapaniHalfPi => {
            let beta = sphr_wigner::recursion::recursion_thetas(l, scheme, nside, forward)?;
            dl_slices_halfpi(&beta, l, spin)
        }
    }
}

fn dl_slices_halfpi(beta: &[f64], l: usize, spin: i64) -> TransformResult<Array3<f64>> {
    let mm = -spin;
    let mm_abs = mm.unsigned_abs() as usize;
    let li = l as i64;
    let idx = |m: i64| (m + li - 1) as usize;
    let mut plane = Array2::<f64>::zeros((2 * l - 1, 2 * l - 1));
    let mut dl = Array3::<f64>::zeros((2 * l - 1, beta.len(), l));
    for el in 0..l {
        trapani::compute_full(&mut plane, l, el)?;
        if el < mm_abs {
            continue;
        }
        let eli = el as i64;
        for (t, &b) in beta.iter().enumerate() {
            for m in -eli..=eli {
                let mut acc = Complex64::new(0.0, 0.0);
                for k in -eli..=eli {
                    acc += plane[[idx(k), idx(m)]]
                        * plane[[idx(k), idx(mm)]]
                        * Complex64::from_polar(1.0, -(k as f64) * b);
                }
                dl[[idx(m), t, el]] = (i_pow(m - mm) * acc).re;
            }
        }
    }
    Ok(dl)
}

fn healpix_phase_table(l: usize, nside: usize, forward: bool) -> Array2<Complex64> {
    let ntheta = healpix::ntheta_healpix(nside);
    let mut table = Array2::<Complex64>::zeros((ntheta, 2 * l - 1));
    for t in 0..ntheta {
        let row = healpix::ring_phase_shift(l, t, nside, forward);
        for (j, v) in row.into_iter().enumerate() {
            table[[t, j]] = v;
        }
    }
    table
}

/// Precomputed kernel for the scalar (spin) spherical transform.
///
/// `data` has shape [n_rings, L, n_m] with n_m = 2L-1, or L under reality;
/// HEALPix kernels carry the factorised complex phase table in `phase`.
#[derive(Debug, Clone)]
pub struct SpinKernel {
    pub(crate) band_limit: usize,
    pub(crate) spin: i64,
    pub(crate) scheme: Scheme,
    pub(crate) nside: Option<usize>,
    pub(crate) forward: bool,
    pub(crate) reality: bool,
    pub(crate) data: Array3<f64>,
    pub(crate) phase: Option<Array2<Complex64>>,
}

impl SpinKernel {
    #[must_use]
    pub fn band_limit(&self) -> usize {
        self.band_limit
    }

    #[must_use]
    pub fn forward(&self) -> bool {
        self.forward
    }

    pub(crate) fn ensure_matches(
        &self,
        l: usize,
        spin: i64,
        scheme: Scheme,
        nside: Option<usize>,
        forward: bool,
        reality: bool,
    ) -> TransformResult<()> {
        let ok = self.band_limit == l
            && self.spin == spin
            && self.scheme == scheme
            && self.nside == nside
            && self.forward == forward
            && self.reality == reality;
        if ok {
            Ok(())
        } else {
            Err(TransformError::KernelMismatch {
                detail: format!(
                    "have (L={}, spin={}, scheme={}, forward={}, reality={}), \
                     need (L={l}, spin={spin}, scheme={scheme}, forward={forward}, reality={reality})",
                    self.band_limit, self.spin, self.scheme, self.forward, self.reality,
                ),
            })
        }
    }
}

/// Precomputed kernel for the Wigner (SO(3)) transform:
/// [2N-1, n_rings, L, 2L-1], one slice per azimuthal order.
#[derive(Debug, Clone)]
pub struct WignerKernel {
    pub(crate) band_limit: usize,
    pub(crate) azimuthal_band: usize,
    pub(crate) scheme: Scheme,
    pub(crate) nside: Option<usize>,
    pub(crate) forward: bool,
    pub(crate) data: Array4<f64>,
    pub(crate) phase: Option<Array2<Complex64>>,
}

impl WignerKernel {
    #[must_use]
    pub fn band_limit(&self) -> usize {
        self.band_limit
    }

    pub(crate) fn ensure_matches(
        &self,
        l: usize,
        n: usize,
        scheme: Scheme,
        nside: Option<usize>,
        forward: bool,
    ) -> TransformResult<()> {
        let ok = self.band_limit == l
            && self.azimuthal_band == n
            && self.scheme == scheme
            && self.nside == nside
            && self.forward == forward;
        if ok {
            Ok(())
        } else {
            Err(TransformError::KernelMismatch {
                detail: format!(
                    "have (L={}, N={}, scheme={}, forward={}), need (L={l}, N={n}, scheme={scheme}, forward={forward})",
                    self.band_limit, self.azimuthal_band, self.scheme, self.forward,
                ),
            })
        }
    }
}

/// Build the scalar transform kernel for (L, spin, scheme, direction).
///
/// Per ring: the Wigner-d slice at the ring's angle for every degree at or
/// above |spin|, times sqrt((2l+1)/4pi), times the ring quadrature weight on
/// the forward side. Forward Mw/Mwss kernels live on the doubled grid.
pub fn spin_spherical_kernel(
    l: usize,
    spin: i64,
    reality: bool,
    scheme: Scheme,
    nside: Option<usize>,
    forward: bool,
    recursion: KernelRecursion,
) -> TransformResult<SpinKernel> {
    if spin.unsigned_abs() as usize >= l {
        return Err(TransformError::InvalidSpin {
            spin,
            band_limit: l,
        });
    }
    let reality = if reality && spin != 0 {
        record_notice(Notice::new(
            NoticeKind::RealityDowngrade,
            "construct",
            format!("reality kernels support spin 0 only; building a complex kernel for spin {spin}"),
        ));
        false
    } else {
        reality
    };

    let dl = dl_slices(l, spin, scheme, nside, forward, recursion)?;
    let ntheta = dl.dim().1;
    let weights = if forward {
        Some(quad_weights_transform(l, scheme, nside)?)
    } else {
        None
    };

    let m_start = if reality { l - 1 } else { 0 };
    let nm = 2 * l - 1 - m_start;
    let mut data = Array3::<f64>::zeros((ntheta, l, nm));
    for t in 0..ntheta {
        let w = weights.as_ref().map_or(1.0, |w| w[t]);
        for el in spin.unsigned_abs() as usize..l {
            let c = elfactor(el) * w;
            for jj in 0..nm {
                data[[t, el, jj]] = dl[[m_start + jj, t, el]] * c;
            }
        }
    }
    let phase = match scheme {
        Scheme::Healpix => {
            let nside = nside.ok_or(sphr_sampling::SamplingError::NsideRequired)?;
            Some(healpix_phase_table(l, nside, forward))
        }
        _ => None,
    };
    Ok(SpinKernel {
        band_limit: l,
        spin,
        scheme,
        nside,
        forward,
        reality,
        data,
        phase,
    })
}

/// Build the Wigner transform kernel for (L, N, scheme, direction).
///
/// Slice n is the d-slice at spin -n with no per-degree factor; the forward
/// side is scaled by the ring weight and 2pi/(2N-1), the inverse side by
/// (2l+1)/(8 pi^2).
pub fn wigner_kernel(
    l: usize,
    n: usize,
    scheme: Scheme,
    nside: Option<usize>,
    forward: bool,
    recursion: KernelRecursion,
) -> TransformResult<WignerKernel> {
    if n == 0 || n > l {
        return Err(TransformError::InvalidAzimuthalBand {
            azimuthal_band: n,
            band_limit: l,
        });
    }
    let weights = if forward {
        Some(quad_weights_transform(l, scheme, nside)?)
    } else {
        None
    };
    let ntheta = sphr_wigner::recursion::recursion_thetas(l, scheme, nside, forward)?.len();
    let mut data = Array4::<f64>::zeros((2 * n - 1, ntheta, l, 2 * l - 1));
    for order in -(n as i64 - 1)..n as i64 {
        let dl = dl_slices(l, -order, scheme, nside, forward, recursion)?;
        let n_idx = (order + n as i64 - 1) as usize;
        for t in 0..ntheta {
            let w = weights.as_ref().map_or(1.0, |w| w[t]);
            for el in order.unsigned_abs() as usize..l {
                let c = if forward {
                    w * 2.0 * PI / (2 * n - 1) as f64
                } else {
                    (2 * el + 1) as f64 / (8.0 * PI * PI)
                };
                for jm in 0..2 * l - 1 {
                    data[[n_idx, t, el, jm]] = dl[[jm, t, el]] * c;
                }
            }
        }
    }
    let phase = match scheme {
        Scheme::Healpix => {
            let nside = nside.ok_or(sphr_sampling::SamplingError::NsideRequired)?;
            Some(healpix_phase_table(l, nside, forward))
        }
        _ => None,
    };
    Ok(WignerKernel {
        band_limit: l,
        azimuthal_band: n,
        scheme,
        nside,
        forward,
        data,
        phase,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphr_runtime::{assert_close, take_notices};

    #[test]
    fn halfpi_and_price_mcewen_kernels_agree() {
        for spin in [0i64, 1, -2] {
            let a = spin_spherical_kernel(5, spin, false, Scheme::Dh, None, false,
                KernelRecursion::PriceMcEwen)
            .unwrap();
            let b = spin_spherical_kernel(5, spin, false, Scheme::Dh, None, false,
                KernelRecursion::TrapaniHalfPi)
            .unwrap();
            assert_eq!(a.data.dim(), b.data.dim());
            for (x, y) in a.data.iter().zip(b.data.iter()) {
                assert_close(*x, *y, 1e-11, 1e-11);
            }
        }
    }

    #[test]
    fn forward_kernel_carries_quadrature_weights() {
        let inv = spin_spherical_kernel(4, 0, false, Scheme::Gl, None, false,
            KernelRecursion::PriceMcEwen)
        .unwrap();
        let fwd = spin_spherical_kernel(4, 0, false, Scheme::Gl, None, true,
            KernelRecursion::PriceMcEwen)
        .unwrap();
        let w = quad_weights_transform(4, Scheme::Gl, None).unwrap();
        for t in 0..4 {
            for el in 0..4 {
                for jm in 0..7 {
                    assert_close(fwd.data[[t, el, jm]], inv.data[[t, el, jm]] * w[t], 1e-12, 1e-12);
                }
            }
        }
    }

    #[test]
    fn mw_forward_kernel_is_built_on_the_doubled_grid() {
        let l = 3;
        let fwd = spin_spherical_kernel(l, 0, false, Scheme::Mw, None, true,
            KernelRecursion::PriceMcEwen)
        .unwrap();
        assert_eq!(fwd.data.dim(), (2 * l + 1, l, 2 * l - 1));
        let inv = spin_spherical_kernel(l, 0, false, Scheme::Mw, None, false,
            KernelRecursion::PriceMcEwen)
        .unwrap();
        assert_eq!(inv.data.dim(), (l, l, 2 * l - 1));
    }

    #[test]
    fn reality_kernel_keeps_non_negative_orders_only() {
        let l = 4;
        let full = spin_spherical_kernel(l, 0, false, Scheme::Dh, None, false,
            KernelRecursion::PriceMcEwen)
        .unwrap();
        let half = spin_spherical_kernel(l, 0, true, Scheme::Dh, None, false,
            KernelRecursion::PriceMcEwen)
        .unwrap();
        assert_eq!(half.data.dim(), (2 * l, l, l));
        for t in 0..2 * l {
            for el in 0..l {
                for j in 0..l {
                    assert_close(
                        half.data[[t, el, j]],
                        full.data[[t, el, l - 1 + j]],
                        1e-15,
                        0.0,
                    );
                }
            }
        }
    }

    #[test]
    fn reality_kernel_downgrades_for_nonzero_spin() {
        let _ = take_notices();
        let k = spin_spherical_kernel(4, 1, true, Scheme::Dh, None, false,
            KernelRecursion::PriceMcEwen)
        .unwrap();
        assert!(!k.reality);
        assert_eq!(k.data.dim(), (8, 4, 7));
        assert!(
            take_notices()
                .iter()
                .any(|n| n.kind == sphr_runtime::NoticeKind::RealityDowngrade)
        );
    }

    #[test]
    fn healpix_kernel_factorises_the_phase() {
        let k = spin_spherical_kernel(4, 0, false, Scheme::Healpix, Some(2), false,
            KernelRecursion::PriceMcEwen)
        .unwrap();
        let phase = k.phase.as_ref().expect("healpix kernels carry a phase table");
        assert_eq!(phase.dim(), (7, 7));
        for v in phase.iter() {
            assert_close(v.norm(), 1.0, 1e-13, 0.0);
        }
    }

    #[test]
    fn wigner_kernel_shapes_and_scalings() {
        let l = 3;
        let n = 2;
        let inv = wigner_kernel(l, n, Scheme::Dh, None, false, KernelRecursion::PriceMcEwen)
            .unwrap();
        assert_eq!(inv.data.dim(), (2 * n - 1, 2 * l, l, 2 * l - 1));
        // Inverse scaling is (2l+1)/(8 pi^2) against the raw slice.
        let pre = generate_precomputes(l, 0, Scheme::Dh, None, false).unwrap();
        let dl = compute_all_slices(&pre);
        let n_idx = n - 1; // order 0
        for t in 0..2 * l {
            for el in 0..l {
                let c = (2 * el + 1) as f64 / (8.0 * PI * PI);
                for jm in 0..2 * l - 1 {
                    assert_close(
                        inv.data[[n_idx, t, el, jm]],
                        dl[[jm, t, el]] * c,
                        1e-12,
                        1e-12,
                    );
                }
            }
        }
    }

    #[test]
    fn wigner_kernel_rejects_oversized_azimuthal_band() {
        assert!(matches!(
            wigner_kernel(3, 4, Scheme::Dh, None, false, KernelRecursion::PriceMcEwen),
            Err(TransformError::InvalidAzimuthalBand { .. })
        ));
    }
}

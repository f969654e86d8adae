//! Forward and inverse spin-spherical-harmonic transforms by separation of
//! variables: a per-ring harmonic contraction (on-the-fly recursion or
//! precomputed kernel) joined to an azimuthal FFT.

use ndarray::{Array2, s};
use num_complex::Complex64;

use sphr_runtime::{Notice, NoticeKind, record_notice};
use sphr_sampling::{
    Scheme, f_shape, flm_shape, ftm_shape, healpix, m_offset, nphi_equiang,
    quad_weights_transform,
};
use sphr_wigner::{Precomputes, compute_all_slices, generate_precomputes};

use crate::construct::SpinKernel;
use crate::error::{TransformError, TransformResult};
use crate::fft;
use crate::healpix_fft::{healpix_fft, healpix_ifft};
use crate::options::TransformOptions;
use crate::resampling::{mw_to_mwss, upsample_by_two_mwss};
use crate::signal::PixelSignal;
use crate::{elfactor, parity};

/// Validate the shared parameter contract and resolve the effective reality
/// flag (reality with nonzero spin downgrades to the complex path).
pub(crate) fn resolve_reality(
    l: usize,
    spin: i64,
    opts: &TransformOptions,
) -> TransformResult<bool> {
    if spin.unsigned_abs() as usize >= l {
        return Err(TransformError::InvalidSpin {
            spin,
            band_limit: l,
        });
    }
    if opts.l_lower >= l {
        return Err(TransformError::InvalidLowerBound {
            l_lower: opts.l_lower,
            band_limit: l,
        });
    }
    if opts.reality && spin != 0 {
        record_notice(Notice::new(
            NoticeKind::RealityDowngrade,
            "spherical",
            format!("reality acceleration supports spin 0 only; spin {spin} uses the complex path"),
        ));
        return Ok(false);
    }
    Ok(opts.reality)
}

fn check_flm_shape(flm: &Array2<Complex64>, l: usize) -> TransformResult<()> {
    if flm.dim() != flm_shape(l) {
        return Err(TransformError::ShapeMismatch {
            what: "flm",
            expected: vec![l, 2 * l - 1],
            actual: vec![flm.nrows(), flm.ncols()],
        });
    }
    Ok(())
}

fn owned_or_borrowed<'a>(
    precomps: Option<&'a Precomputes>,
    l: usize,
    spin: i64,
    scheme: Scheme,
    nside: Option<usize>,
    forward: bool,
    owned: &'a mut Option<Precomputes>,
) -> TransformResult<&'a Precomputes> {
    match precomps {
        Some(p) => {
            if !p.matches(l, spin, scheme, nside, forward) {
                return Err(TransformError::PrecomputeMismatch {
                    detail: format!(
                        "have (L={}, spin={}), need (L={l}, spin={spin}, scheme={scheme}, forward={forward})",
                        p.band_limit(),
                        p.spin(),
                    ),
                });
            }
            Ok(p)
        }
        None => {
            let generated = generate_precomputes(l, spin, scheme, nside, forward)?;
            Ok(owned.insert(generated))
        }
    }
}

/// Inverse spin-spherical-harmonic transform.
///
/// Contracts the coefficients against the Wigner-d slices (on-the-fly
/// recursion, or `kernel` when given) per ring and finishes with an inverse
/// azimuthal FFT. Output shape is the scheme's pixel shape for (L, nside).
pub fn inverse(
    flm: &Array2<Complex64>,
    l: usize,
    spin: i64,
    opts: &TransformOptions,
    kernel: Option<&SpinKernel>,
    precomps: Option<&Precomputes>,
) -> TransformResult<PixelSignal> {
    let reality = resolve_reality(l, spin, opts)?;
    check_flm_shape(flm, l)?;
    if opts.mode.checks_finite() && !flm.iter().all(|z| z.re.is_finite() && z.im.is_finite()) {
        return Err(TransformError::NonFiniteInput);
    }
    let scheme = opts.scheme;
    let (ntheta, ftm_w) = ftm_shape(l, scheme, opts.nside)?;
    let m_off = m_offset(scheme);
    let m_start = if reality { l - 1 } else { 0 };
    let lmin = opts.l_lower.max(spin.unsigned_abs() as usize);

    let mut ftm = Array2::<Complex64>::zeros((ntheta, ftm_w));
    match kernel {
        Some(k) => {
            k.ensure_matches(l, spin, scheme, opts.nside, false, reality)?;
            for t in 0..ntheta {
                for el in lmin..l {
                    for jm in m_start..2 * l - 1 {
                        ftm[[t, m_off + jm]] +=
                            k.data[[t, el, jm - m_start]] * flm[[el, jm]];
                    }
                }
            }
            if let Some(phase) = &k.phase {
                for t in 0..ntheta {
                    for jm in m_start..2 * l - 1 {
                        ftm[[t, m_off + jm]] *= phase[[t, jm]];
                    }
                }
            }
        }
        None => {
            let mut owned = None;
            let pre = owned_or_borrowed(precomps, l, spin, scheme, opts.nside, false, &mut owned)?;
            let dl = compute_all_slices(pre);
            for t in 0..ntheta {
                for el in lmin..l {
                    let elf = elfactor(el);
                    for jm in m_start..2 * l - 1 {
                        ftm[[t, m_off + jm]] += dl[[jm, t, el]] * elf * flm[[el, jm]];
                    }
                }
            }
            if scheme == Scheme::Healpix {
                let nside = opts
                    .nside
                    .ok_or(sphr_sampling::SamplingError::NsideRequired)?;
                for t in 0..ntheta {
                    let phase = healpix::ring_phase_shift(l, t, nside, false);
                    for jm in m_start..2 * l - 1 {
                        ftm[[t, m_off + jm]] *= phase[jm];
                    }
                }
            }
        }
    }
    fft::scale_2(&mut ftm, parity(spin));

    inverse_finish(ftm, l, scheme, opts.nside, reality)
}

/// Azimuthal synthesis shared by the scalar and Wigner inverse paths.
pub(crate) fn inverse_finish(
    mut ftm: Array2<Complex64>,
    l: usize,
    scheme: Scheme,
    nside: Option<usize>,
    reality: bool,
) -> TransformResult<PixelSignal> {
    let m_off = m_offset(scheme);
    let m_start = if reality { l - 1 } else { 0 };
    if scheme == Scheme::Healpix {
        let nside = nside.ok_or(sphr_sampling::SamplingError::NsideRequired)?;
        if reality {
            // Reconstruct negative orders by conjugate symmetry before the
            // ragged inverse FFT.
            let ntheta = ftm.nrows();
            for t in 0..ntheta {
                for i in 0..l - 1 {
                    ftm[[t, m_off + i]] = ftm[[t, m_off + 2 * l - 2 - i]].conj();
                }
            }
        }
        let mut f = healpix_ifft(&ftm, l, nside);
        if reality {
            f.mapv_inplace(|z| Complex64::new(z.re, 0.0));
        }
        Ok(PixelSignal::Rings(f))
    } else if reality {
        let half = ftm.slice(s![.., m_start + m_off..]).to_owned();
        Ok(PixelSignal::Grid(fft::irfft_rows(
            &half,
            nphi_equiang(l, scheme)?,
        )))
    } else {
        fft::ifftshift_rows(&mut ftm);
        fft::fft_rows(&mut ftm, true);
        Ok(PixelSignal::Grid(ftm))
    }
}

/// Forward preprocessing shared by the scalar and Wigner forward paths:
/// resample Mw/Mwss input onto the doubled grid, run the azimuthal FFT, and
/// slice the Fourier grid down to the orders the contraction consumes.
/// Returns (ftm columns m_start.., effective scheme).
pub(crate) fn forward_ftm(
    f: &PixelSignal,
    l: usize,
    spin: i64,
    scheme: Scheme,
    nside: Option<usize>,
    reality: bool,
) -> TransformResult<(Array2<Complex64>, Scheme)> {
    let m_start = if reality { l - 1 } else { 0 };
    match scheme {
        Scheme::Healpix => {
            let nside = nside.ok_or(sphr_sampling::SamplingError::NsideRequired)?;
            let ftm = healpix_fft(f.expect_rings()?, l, nside);
            // Drop the m = -L padding column, then the negative orders under
            // reality.
            let used = ftm.slice(s![.., 1 + m_start..]).to_owned();
            Ok((used, scheme))
        }
        Scheme::Mw | Scheme::Mwss => {
            let grid = f.expect_grid()?;
            let doubled = if scheme == Scheme::Mw {
                upsample_by_two_mwss(&mw_to_mwss(grid, l, spin)?, l, spin)?
            } else {
                upsample_by_two_mwss(grid, l, spin)?
            };
            if reality {
                let half = fft::rfft_rows(&doubled);
                // nphi = 2L: drop the Nyquist column to align with m < L.
                Ok((half.slice(s![.., ..l]).to_owned(), Scheme::Mwss))
            } else {
                let mut g = doubled;
                fft::fft_rows(&mut g, false);
                fft::fftshift_rows(&mut g);
                Ok((g.slice(s![.., 1..]).to_owned(), Scheme::Mwss))
            }
        }
        _ => {
            let grid = f.expect_grid()?;
            if reality {
                let half = fft::rfft_rows(grid);
                Ok((half, scheme))
            } else {
                let mut g = grid.clone();
                fft::fft_rows(&mut g, false);
                fft::fftshift_rows(&mut g);
                Ok((g, scheme))
            }
        }
    }
}

/// Forward spin-spherical-harmonic transform.
///
/// Validates the pixel shape, resamples Mw/Mwss input onto the doubled grid,
/// runs the azimuthal FFT, contracts against quadrature-weighted Wigner-d
/// slices (on-the-fly or `kernel`), and reconstructs negative orders under
/// reality. Output shape is [L, 2L-1] with |m| > l entries zero.
pub fn forward(
    f: &PixelSignal,
    l: usize,
    spin: i64,
    opts: &TransformOptions,
    kernel: Option<&SpinKernel>,
    precomps: Option<&Precomputes>,
) -> TransformResult<Array2<Complex64>> {
    let reality = resolve_reality(l, spin, opts)?;
    let scheme = opts.scheme;
    let expected = f_shape(l, scheme, opts.nside)?;
    f.validate_shape("signal", &expected)?;
    if opts.mode.checks_finite() && !f.is_finite() {
        return Err(TransformError::NonFiniteInput);
    }
    let lmin = opts.l_lower.max(spin.unsigned_abs() as usize);
    let m_start = if reality { l - 1 } else { 0 };

    let (ftm, _scheme_eff) = forward_ftm(f, l, spin, scheme, opts.nside, reality)?;
    let ntheta = ftm.nrows();

    let mut flm = Array2::<Complex64>::zeros(flm_shape(l));
    match kernel {
        Some(k) => {
            k.ensure_matches(l, spin, scheme, opts.nside, true, reality)?;
            match &k.phase {
                Some(phase) => {
                    for t in 0..ntheta {
                        for el in lmin..l {
                            for jj in 0..2 * l - 1 - m_start {
                                flm[[el, m_start + jj]] += k.data[[t, el, jj]]
                                    * (ftm[[t, jj]] * phase[[t, m_start + jj]]);
                            }
                        }
                    }
                }
                None => {
                    for t in 0..ntheta {
                        for el in lmin..l {
                            for jj in 0..2 * l - 1 - m_start {
                                flm[[el, m_start + jj]] += k.data[[t, el, jj]] * ftm[[t, jj]];
                            }
                        }
                    }
                }
            }
        }
        None => {
            let mut owned = None;
            let pre = owned_or_borrowed(precomps, l, spin, scheme, opts.nside, true, &mut owned)?;
            let dl = compute_all_slices(pre);
            let weights = quad_weights_transform(l, scheme, opts.nside)?;
            let hp_phase: Option<Vec<Vec<Complex64>>> = if scheme == Scheme::Healpix {
                let nside = opts
                    .nside
                    .ok_or(sphr_sampling::SamplingError::NsideRequired)?;
                Some(
                    (0..ntheta)
                        .map(|t| healpix::ring_phase_shift(l, t, nside, true))
                        .collect(),
                )
            } else {
                None
            };
            for t in 0..ntheta {
                for el in lmin..l {
                    let c = weights[t] * elfactor(el);
                    for jj in 0..2 * l - 1 - m_start {
                        let mut v = ftm[[t, jj]];
                        if let Some(phase) = &hp_phase {
                            v *= phase[t][m_start + jj];
                        }
                        flm[[el, m_start + jj]] += c * dl[[m_start + jj, t, el]] * v;
                    }
                }
            }
        }
    }

    if reality {
        for el in 0..l {
            for j in 0..l - 1 {
                flm[[el, j]] = parity((l - 1 - j) as i64) * flm[[el, 2 * l - 2 - j]].conj();
            }
        }
    }
    flm.mapv_inplace(|z| z * parity(spin));
    Ok(flm)
}

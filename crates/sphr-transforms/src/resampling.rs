//! Resampling between the minimal equiangular grid and its
//! sampling-theorem-complete doubled variant.
//!
//! All conversions go through the Fourier domain of the periodically
//! extended signal on the torus, so they are exact for band-limited fields.
//! Used only on the forward path of the Mw/Mwss schemes.

use ndarray::Array2;
use num_complex::Complex64;

use sphr_sampling::Scheme;

use crate::error::{TransformError, TransformResult};
use crate::fft;
use crate::parity;

/// Signed Fourier index of DFT slot j for length n.
fn signed_freq(j: usize, n: usize) -> i64 {
    if j <= (n - 1) / 2 {
        j as i64
    } else {
        j as i64 - n as i64
    }
}

/// Extend a spin-weighted signal on theta in [0, pi] to the full torus,
/// reflecting each azimuthal Fourier mode with the factor (-1)^{m+spin}.
///
/// Mw: [L, 2L-1] -> [2L-1, 2L-1]; Mwss: [L+1, 2L] -> [2L, 2L].
pub fn periodic_extension(
    f: &Array2<Complex64>,
    l: usize,
    spin: i64,
    scheme: Scheme,
) -> TransformResult<Array2<Complex64>> {
    let (ntheta_in, ntheta_ext) = match scheme {
        Scheme::Mw => (l, 2 * l - 1),
        Scheme::Mwss => (l + 1, 2 * l),
        _ => {
            return Err(TransformError::ShapeMismatch {
                what: "periodic extension scheme",
                expected: vec![],
                actual: vec![],
            });
        }
    };
    let nphi = f.ncols();
    if f.nrows() != ntheta_in {
        return Err(TransformError::ShapeMismatch {
            what: "periodic extension input",
            expected: vec![ntheta_in, nphi],
            actual: vec![f.nrows(), f.ncols()],
        });
    }

    let mut ext = Array2::<Complex64>::zeros((ntheta_ext, nphi));
    for t in 0..ntheta_in {
        for p in 0..nphi {
            ext[[t, p]] = f[[t, p]];
        }
    }
    fft::fft_rows(&mut ext, false);
    for t in ntheta_in..ntheta_ext {
        let src = match scheme {
            Scheme::Mw => 2 * l - 2 - t,
            _ => 2 * l - t,
        };
        for j in 0..nphi {
            let sign = parity(signed_freq(j, nphi) + spin);
            ext[[t, j]] = sign * ext[[src, j]];
        }
    }
    fft::fft_rows(&mut ext, true);
    fft::scale_2(&mut ext, 1.0 / nphi as f64);
    Ok(ext)
}

/// Trigonometric interpolation along theta: column spectra of the torus
/// extension are zero-padded from n_in to n_out slots and re-synthesised.
/// `phase_align` rotates each mode by exp(-i k pi / n_in), aligning the Mw
/// grid's half-sample theta origin.
fn theta_resample(
    ext: &Array2<Complex64>,
    n_out: usize,
    keep_rows: usize,
    phase_align: bool,
) -> Array2<Complex64> {
    let (n_in, nphi) = ext.dim();
    let mut spec = ext.clone();
    fft::fft_cols(&mut spec, false);
    fft::scale_2(&mut spec, 1.0 / n_in as f64);

    let mut padded = Array2::<Complex64>::zeros((n_out, nphi));
    for j in 0..n_in {
        let k = signed_freq(j, n_in);
        let slot = if k >= 0 {
            k as usize
        } else {
            (n_out as i64 + k) as usize
        };
        for p in 0..nphi {
            let mut v = spec[[j, p]];
            if phase_align {
                v *= Complex64::from_polar(1.0, -k as f64 * std::f64::consts::PI / n_in as f64);
            }
            padded[[slot, p]] = v;
        }
    }
    fft::fft_cols(&mut padded, true);

    let mut out = Array2::<Complex64>::zeros((keep_rows, nphi));
    for t in 0..keep_rows {
        for p in 0..nphi {
            out[[t, p]] = padded[[t, p]];
        }
    }
    out
}

/// Zero-padded Fourier interpolation along phi from the current column
/// count to n_out columns.
fn phi_resample(f: &Array2<Complex64>, n_out: usize) -> Array2<Complex64> {
    let (rows, n_in) = f.dim();
    let mut spec = f.clone();
    fft::fft_rows(&mut spec, false);
    fft::scale_2(&mut spec, 1.0 / n_in as f64);

    let mut padded = Array2::<Complex64>::zeros((rows, n_out));
    for j in 0..n_in {
        let k = signed_freq(j, n_in);
        let slot = if k >= 0 {
            k as usize
        } else {
            (n_out as i64 + k) as usize
        };
        for r in 0..rows {
            padded[[r, slot]] = spec[[r, j]];
        }
    }
    fft::fft_rows(&mut padded, true);
    padded
}

/// Convert an Mw signal [L, 2L-1] onto the Mwss grid [L+1, 2L].
pub fn mw_to_mwss(
    f: &Array2<Complex64>,
    l: usize,
    spin: i64,
) -> TransformResult<Array2<Complex64>> {
    let ext = periodic_extension(f, l, spin, Scheme::Mw)?;
    let on_mwss_theta = theta_resample(&ext, 2 * l, l + 1, true);
    Ok(phi_resample(&on_mwss_theta, 2 * l))
}

/// Upsample an Mwss signal from band-limit L to the 2L grid:
/// [L+1, 2L] -> [2L+1, 2L]. The phi resolution is unchanged.
pub fn upsample_by_two_mwss(
    f: &Array2<Complex64>,
    l: usize,
    spin: i64,
) -> TransformResult<Array2<Complex64>> {
    let ext = periodic_extension(f, l, spin, Scheme::Mwss)?;
    Ok(theta_resample(&ext, 4 * l, 2 * l + 1, false))
}

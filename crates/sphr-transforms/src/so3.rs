//! Forward and inverse Wigner transforms (Fourier transforms on SO(3)).
//!
//! Signals are stored [gamma, beta, alpha] following the zyz Euler
//! convention, so each fixed gamma is a spin signal on the sphere. The
//! transform loops the spherical machinery over azimuthal order n with spin
//! set to -n and finishes with an FFT over the gamma axis.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, Array3, Axis, s};
use num_complex::Complex64;

use sphr_sampling::{FShape, Scheme, f_shape, flmn_shape, ftm_shape, m_offset};
use sphr_wigner::WignerPrecomputes;

use crate::construct::WignerKernel;
use crate::error::{TransformError, TransformResult};
use crate::fft;
use crate::options::TransformOptions;
use crate::parity;
use crate::signal::{PixelSignal, So3Signal};
use crate::spherical;

fn validate(l: usize, n: usize, opts: &TransformOptions) -> TransformResult<()> {
    if n == 0 || n > l {
        return Err(TransformError::InvalidAzimuthalBand {
            azimuthal_band: n,
            band_limit: l,
        });
    }
    if opts.l_lower >= l {
        return Err(TransformError::InvalidLowerBound {
            l_lower: opts.l_lower,
            band_limit: l,
        });
    }
    Ok(())
}

fn plane_dims(fsh: &FShape) -> (usize, usize) {
    match fsh {
        FShape::Grid { ntheta, nphi } => (*ntheta, *nphi),
        FShape::Rings { npix } => (*npix, 1),
    }
}

fn write_plane(fban: &mut Array3<Complex64>, n_idx: usize, plane: &PixelSignal, scale: f64) {
    match plane {
        PixelSignal::Grid(a) => {
            for t in 0..a.nrows() {
                for p in 0..a.ncols() {
                    fban[[n_idx, t, p]] = scale * a[[t, p]];
                }
            }
        }
        PixelSignal::Rings(a) => {
            for p in 0..a.len() {
                fban[[n_idx, p, 0]] = scale * a[p];
            }
        }
    }
}

fn plane_signal(fban: &Array3<Complex64>, idx: usize, fsh: &FShape) -> PixelSignal {
    match fsh {
        FShape::Grid { .. } => PixelSignal::Grid(fban.index_axis(Axis(0), idx).to_owned()),
        FShape::Rings { npix } => {
            let mut rings = Array1::<Complex64>::zeros(*npix);
            for p in 0..*npix {
                rings[p] = fban[[idx, p, 0]];
            }
            PixelSignal::Rings(rings)
        }
    }
}

fn validate_wigner_precomps(
    precomps: Option<&WignerPrecomputes>,
    l: usize,
    n: usize,
    scheme: Scheme,
    nside: Option<usize>,
    forward: bool,
) -> TransformResult<Option<&WignerPrecomputes>> {
    if let Some(w) = precomps {
        if !w.matches(l, n, scheme, nside, forward) {
            return Err(TransformError::PrecomputeMismatch {
                detail: format!(
                    "have (L={}, N={}), need (L={l}, N={n}, scheme={scheme}, forward={forward})",
                    w.band_limit(),
                    w.azimuthal_band(),
                ),
            });
        }
    }
    Ok(precomps)
}

/// Inverse Wigner transform: flmn [2N-1, L, 2L-1] to a signal on SO(3).
pub fn inverse(
    flmn: &Array3<Complex64>,
    l: usize,
    n: usize,
    opts: &TransformOptions,
    kernel: Option<&WignerKernel>,
    precomps: Option<&WignerPrecomputes>,
) -> TransformResult<So3Signal> {
    validate(l, n, opts)?;
    if flmn.dim() != flmn_shape(l, n) {
        let d = flmn.dim();
        return Err(TransformError::ShapeMismatch {
            what: "flmn",
            expected: vec![2 * n - 1, l, 2 * l - 1],
            actual: vec![d.0, d.1, d.2],
        });
    }
    if opts.mode.checks_finite() && !flmn.iter().all(|z| z.re.is_finite() && z.im.is_finite()) {
        return Err(TransformError::NonFiniteInput);
    }
    let scheme = opts.scheme;
    let fsh = f_shape(l, scheme, opts.nside)?;
    let (a_dim, b_dim) = plane_dims(&fsh);
    let reality = opts.reality;
    let n_start: i64 = if reality { 0 } else { -(n as i64 - 1) };

    let mut fban = Array3::<Complex64>::zeros((2 * n - 1, a_dim, b_dim));
    match kernel {
        Some(k) => {
            k.ensure_matches(l, n, scheme, opts.nside, false)?;
            let (ntheta, ftm_w) = ftm_shape(l, scheme, opts.nside)?;
            let m_off = m_offset(scheme);
            for order in n_start..n as i64 {
                let n_idx = (order + n as i64 - 1) as usize;
                let lmin = opts.l_lower.max(order.unsigned_abs() as usize);
                let mut ftm = Array2::<Complex64>::zeros((ntheta, ftm_w));
                for t in 0..ntheta {
                    for el in lmin..l {
                        for jm in 0..2 * l - 1 {
                            ftm[[t, m_off + jm]] +=
                                k.data[[n_idx, t, el, jm]] * flmn[[n_idx, el, jm]];
                        }
                    }
                }
                if let Some(phase) = &k.phase {
                    for t in 0..ntheta {
                        for jm in 0..2 * l - 1 {
                            ftm[[t, m_off + jm]] *= phase[[t, jm]];
                        }
                    }
                }
                let plane = spherical::inverse_finish(ftm, l, scheme, opts.nside, false)?;
                write_plane(&mut fban, n_idx, &plane, 1.0);
            }
        }
        None => {
            let precomps =
                validate_wigner_precomps(precomps, l, n, scheme, opts.nside, false)?;
            let mut work = flmn.clone();
            for el in opts.l_lower..l {
                let factor = ((2 * el + 1) as f64 / (16.0 * PI * PI * PI)).sqrt();
                for n_idx in 0..2 * n - 1 {
                    for jm in 0..2 * l - 1 {
                        work[[n_idx, el, jm]] *= factor;
                    }
                }
            }
            for order in n_start..n as i64 {
                let n_idx = (order + n as i64 - 1) as usize;
                let inner_opts = TransformOptions {
                    reality: reality && order == 0,
                    ..*opts
                };
                let slice = work.index_axis(Axis(0), n_idx).to_owned();
                let plane = spherical::inverse(
                    &slice,
                    l,
                    -order,
                    &inner_opts,
                    None,
                    precomps.map(|w| w.order(order)),
                )?;
                write_plane(&mut fban, n_idx, &plane, parity(order));
            }
        }
    }

    let out = if reality {
        let half = fban.slice(s![n - 1.., .., ..]).to_owned();
        fft::irfft_axis0(&half, 2 * n - 1)
    } else {
        fft::ifftshift_axis0(&mut fban);
        fft::fft_axis0(&mut fban, true);
        fban
    };
    Ok(match fsh {
        FShape::Grid { .. } => So3Signal::Grid(out),
        FShape::Rings { .. } => So3Signal::Rings(out.index_axis_move(Axis(2), 0)),
    })
}

/// Forward Wigner transform: a signal on SO(3) to flmn [2N-1, L, 2L-1].
pub fn forward(
    f: &So3Signal,
    l: usize,
    n: usize,
    opts: &TransformOptions,
    kernel: Option<&WignerKernel>,
    precomps: Option<&WignerPrecomputes>,
) -> TransformResult<Array3<Complex64>> {
    validate(l, n, opts)?;
    let scheme = opts.scheme;
    let fsh = f_shape(l, scheme, opts.nside)?;
    f.validate_shape("signal", 2 * n - 1, &fsh)?;
    if opts.mode.checks_finite() && !f.is_finite() {
        return Err(TransformError::NonFiniteInput);
    }
    let reality = opts.reality;
    let n_start: i64 = if reality { 0 } else { -(n as i64 - 1) };

    let f3: Array3<Complex64> = match f {
        So3Signal::Grid(a) => a.clone(),
        So3Signal::Rings(a) => a.clone().insert_axis(Axis(2)),
    };
    let mut fban = if reality {
        fft::rfft_axis0(&f3)
    } else {
        let mut g = f3;
        fft::fft_axis0(&mut g, false);
        fft::fftshift_axis0(&mut g);
        g
    };

    let mut flmn = Array3::<Complex64>::zeros(flmn_shape(l, n));
    match kernel {
        Some(k) => {
            k.ensure_matches(l, n, scheme, opts.nside, true)?;
            for order in n_start..n as i64 {
                let n_idx = (order + n as i64 - 1) as usize;
                let fb_idx = (order - n_start) as usize;
                let plane = plane_signal(&fban, fb_idx, &fsh);
                let (ftm, _) =
                    spherical::forward_ftm(&plane, l, -order, scheme, opts.nside, false)?;
                let ntheta = ftm.nrows();
                let lmin = opts.l_lower.max(order.unsigned_abs() as usize);
                for t in 0..ntheta {
                    for el in lmin..l {
                        for jm in 0..2 * l - 1 {
                            let mut v = ftm[[t, jm]];
                            if let Some(phase) = &k.phase {
                                v *= phase[[t, jm]];
                            }
                            flmn[[n_idx, el, jm]] += k.data[[n_idx, t, el, jm]] * v;
                        }
                    }
                }
            }
        }
        None => {
            let precomps =
                validate_wigner_precomps(precomps, l, n, scheme, opts.nside, true)?;
            fft::scale_3(&mut fban, 2.0 * PI / (2 * n - 1) as f64);
            for order in n_start..n as i64 {
                let n_idx = (order + n as i64 - 1) as usize;
                let fb_idx = (order - n_start) as usize;
                let plane = plane_signal(&fban, fb_idx, &fsh);
                let inner_opts = TransformOptions {
                    reality: reality && order == 0,
                    ..*opts
                };
                let flm = spherical::forward(
                    &plane,
                    l,
                    -order,
                    &inner_opts,
                    None,
                    precomps.map(|w| w.order(order)),
                )?;
                let sgn = parity(order);
                for el in 0..l {
                    for jm in 0..2 * l - 1 {
                        flmn[[n_idx, el, jm]] = sgn * flm[[el, jm]];
                    }
                }
            }
            for el in opts.l_lower..l {
                let factor = (4.0 * PI / (2 * el + 1) as f64).sqrt();
                for n_idx in 0..2 * n - 1 {
                    for jm in 0..2 * l - 1 {
                        flmn[[n_idx, el, jm]] *= factor;
                    }
                }
            }
        }
    }

    if reality {
        for order in 1..n as i64 {
            let dst = (n as i64 - 1 - order) as usize;
            let src = (n as i64 - 1 + order) as usize;
            let sgn_n = parity(order);
            for el in 0..l {
                for j in 0..2 * l - 1 {
                    let col = 2 * l - 2 - j;
                    let sgn_m = parity(col as i64 - (l as i64 - 1));
                    flmn[[dst, el, j]] = (flmn[[src, el, col]] * sgn_m * sgn_n).conj();
                }
            }
        }
    }
    Ok(flmn)
}

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::grid::{Scheme, SamplingError, SamplingResult};
use crate::healpix;

/// Fourier coefficients of sin(theta) over [0, pi]:
/// mw_weights(m) = int_0^pi sin(theta) e^{i m theta} d(theta).
#[must_use]
pub fn mw_weights(m: i64) -> Complex64 {
    if m == 1 {
        Complex64::new(0.0, PI / 2.0)
    } else if m == -1 {
        Complex64::new(0.0, -PI / 2.0)
    } else if m % 2 == 0 {
        Complex64::new(2.0 / (1.0 - (m * m) as f64), 0.0)
    } else {
        Complex64::new(0.0, 0.0)
    }
}

/// Periodic weights w[t] = (1/n) sum_m mw_weights(m) e^{-i m theta_t} on the
/// given theta grid, restricted to the stated m range.
fn periodic_weights(thetas_ext: &[f64], m_lo: i64, m_hi: i64) -> Vec<f64> {
    let n = thetas_ext.len() as f64;
    thetas_ext
        .iter()
        .map(|&theta| {
            let mut acc = Complex64::new(0.0, 0.0);
            for m in m_lo..=m_hi {
                acc += mw_weights(m) * Complex64::from_polar(1.0, -(m as f64) * theta);
            }
            acc.re / n
        })
        .collect()
}

/// Theta-only weights on the Mw grid (L rings), exact for integrands
/// band-limited at 2(L-1). The periodic torus weights are folded back onto
/// [0, pi] through the reflection t <-> 2L-2-t.
#[must_use]
pub fn quad_weights_mw_theta_only(l: usize) -> Vec<f64> {
    let n = 2 * l - 1;
    let thetas_ext: Vec<f64> = (0..n)
        .map(|t| PI * (2 * t + 1) as f64 / n as f64)
        .collect();
    let wr = periodic_weights(&thetas_ext, -(l as i64 - 1), l as i64 - 1);
    let mut q: Vec<f64> = wr[..l].to_vec();
    for (i, item) in q.iter_mut().enumerate().take(l - 1) {
        *item += wr[n - 1 - i];
    }
    q
}

/// Theta-only weights on the Mwss grid (L+1 rings including both poles).
#[must_use]
pub fn quad_weights_mwss_theta_only(l: usize) -> Vec<f64> {
    let n = 2 * l;
    let thetas_ext: Vec<f64> = (0..n).map(|t| PI * t as f64 / l as f64).collect();
    let wr = periodic_weights(&thetas_ext, -(l as i64), l as i64 - 1);
    let mut q: Vec<f64> = wr[..=l].to_vec();
    for (t, item) in q.iter_mut().enumerate().take(l).skip(1) {
        *item += wr[n - t];
    }
    q
}

/// Driscoll-Healy theta weight at a single ring.
fn quad_weight_dh_theta_only(theta: f64, l: usize) -> f64 {
    let mut w = 0.0;
    for k in 0..l {
        w += ((2 * k + 1) as f64 * theta).sin() / (2 * k + 1) as f64;
    }
    w * 2.0 / l as f64 * theta.sin()
}

fn quad_weights_dh(l: usize) -> Vec<f64> {
    (0..2 * l)
        .map(|t| {
            let theta = PI * (2 * t + 1) as f64 / (4 * l) as f64;
            quad_weight_dh_theta_only(theta, l) * 2.0 * PI / (2 * l - 1) as f64
        })
        .collect()
}

/// Gauss-Legendre nodes (descending in x = cos theta, so theta ascends) and
/// weights of degree L, by Newton iteration on the Legendre recurrence.
#[must_use]
pub fn gl_nodes_and_weights(l: usize) -> (Vec<f64>, Vec<f64>) {
    let n = l;
    let mut nodes = vec![0.0f64; n];
    let mut weights = vec![0.0f64; n];
    let m = n.div_ceil(2);
    for i in 0..m {
        // Chebyshev-based initial guess for the i-th positive root.
        let mut z = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut pp = 0.0;
        for _ in 0..100 {
            // Legendre recurrence up to degree n at z.
            let mut p1 = 1.0;
            let mut p2 = 0.0;
            for j in 0..n {
                let p3 = p2;
                p2 = p1;
                p1 = ((2 * j + 1) as f64 * z * p2 - j as f64 * p3) / (j + 1) as f64;
            }
            pp = n as f64 * (z * p1 - p2) / (z * z - 1.0);
            let dz = p1 / pp;
            z -= dz;
            if dz.abs() < 1e-15 {
                break;
            }
        }
        let w = 2.0 / ((1.0 - z * z) * pp * pp);
        nodes[i] = z;
        nodes[n - 1 - i] = -z;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }
    (nodes, weights)
}

fn quad_weights_gl(l: usize) -> Vec<f64> {
    let (_, w) = gl_nodes_and_weights(l);
    w.iter().map(|&x| x * 2.0 * PI / (2 * l - 1) as f64).collect()
}

fn quad_weights_hp(nside: usize) -> Vec<f64> {
    let w = 4.0 * PI / healpix::npix(nside) as f64;
    vec![w; healpix::ntheta_healpix(nside)]
}

fn resolve_nside(l: usize, nside: Option<usize>) -> SamplingResult<usize> {
    let nside = nside.ok_or(SamplingError::NsideRequired)?;
    if nside == 0 || l < 2 * nside {
        return Err(SamplingError::HealpixResolution {
            nside,
            band_limit: l,
        });
    }
    Ok(nside)
}

/// Per-ring quadrature weights on a scheme's own grid (theta weight times
/// the 2*pi/nphi longitude factor; HEALPix uses the pixel solid angle).
pub fn quad_weights(l: usize, scheme: Scheme, nside: Option<usize>) -> SamplingResult<Vec<f64>> {
    if l == 0 {
        return Err(SamplingError::BandLimitZero);
    }
    Ok(match scheme {
        Scheme::Mw => quad_weights_mw_theta_only(l)
            .into_iter()
            .map(|w| w * 2.0 * PI / (2 * l - 1) as f64)
            .collect(),
        Scheme::Mwss => quad_weights_mwss_theta_only(l)
            .into_iter()
            .map(|w| w * 2.0 * PI / (2 * l) as f64)
            .collect(),
        Scheme::Dh => quad_weights_dh(l),
        Scheme::Gl => quad_weights_gl(l),
        Scheme::Healpix => quad_weights_hp(resolve_nside(l, nside)?),
    })
}

/// Weights consumed by forward transforms. The Mw and Mwss schemes are
/// analysed on the doubled (2L)-Mwss grid after upsampling, so their rule is
/// the band-2L Mwss rule; spin never enters (it is absorbed by the periodic
/// extension).
pub fn quad_weights_transform(
    l: usize,
    scheme: Scheme,
    nside: Option<usize>,
) -> SamplingResult<Vec<f64>> {
    if l == 0 {
        return Err(SamplingError::BandLimitZero);
    }
    match scheme {
        Scheme::Mw | Scheme::Mwss => Ok(quad_weights_mwss_theta_only(2 * l)
            .into_iter()
            .map(|w| w * 2.0 * PI / (2 * l) as f64)
            .collect()),
        _ => quad_weights(l, scheme, nside),
    }
}

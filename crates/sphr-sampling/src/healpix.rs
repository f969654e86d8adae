use std::f64::consts::PI;

use num_complex::Complex64;

/// Total pixel count: 12 * nside^2.
#[must_use]
pub const fn npix(nside: usize) -> usize {
    12 * nside * nside
}

/// Number of iso-latitude rings: 4 * nside - 1.
#[must_use]
pub const fn ntheta_healpix(nside: usize) -> usize {
    4 * nside - 1
}

/// Azimuthal sample count of ring t (0-based from the north pole).
#[must_use]
pub fn nphi_ring(t: usize, nside: usize) -> usize {
    let i = t + 1;
    if i < nside {
        4 * i
    } else if i <= 3 * nside {
        4 * nside
    } else {
        4 * (4 * nside - i)
    }
}

/// Flat start index of every ring in the ring-ordered pixel buffer, plus a
/// trailing entry equal to npix.
#[must_use]
pub fn ring_starts(nside: usize) -> Vec<usize> {
    let rings = ntheta_healpix(nside);
    let mut starts = Vec::with_capacity(rings + 1);
    let mut acc = 0usize;
    for t in 0..rings {
        starts.push(acc);
        acc += nphi_ring(t, nside);
    }
    starts.push(acc);
    starts
}

/// z = cos(theta) of ring t from the standard cap/belt formulas.
fn ring_z(t: usize, nside: usize) -> f64 {
    let i = t + 1;
    let ns = nside as f64;
    if i < nside {
        let ii = i as f64;
        1.0 - ii * ii / (3.0 * ns * ns)
    } else if i <= 3 * nside {
        4.0 / 3.0 - 2.0 * i as f64 / (3.0 * ns)
    } else {
        let ii = (4 * nside - i) as f64;
        -(1.0 - ii * ii / (3.0 * ns * ns))
    }
}

/// Polar angles of all rings, ascending from the north pole.
#[must_use]
pub fn thetas_healpix(nside: usize) -> Vec<f64> {
    (0..ntheta_healpix(nside))
        .map(|t| ring_z(t, nside).acos())
        .collect()
}

/// Longitude of sample p on ring t. Cap rings carry a half-pixel shift;
/// belt rings alternate between shifted and unshifted.
#[must_use]
pub fn p2phi_ring(t: usize, p: usize, nside: usize) -> f64 {
    let i = t + 1;
    let (factor, shift) = if i < nside {
        (PI / (2.0 * i as f64), 0.5)
    } else if i <= 3 * nside {
        let parity = (i + 1 - nside) % 2;
        (PI / (2.0 * nside as f64), 0.5 * parity as f64)
    } else {
        (PI / (2.0 * (4 * nside - i) as f64), 0.5)
    };
    factor * (p as f64 + shift)
}

/// Phase-shift vector aligning ring t's start longitude, for all true
/// azimuthal orders m in -(L-1)..=(L-1): exp(-+ i m phi_0).
#[must_use]
pub fn ring_phase_shift(l: usize, t: usize, nside: usize, forward: bool) -> Vec<Complex64> {
    let phi0 = p2phi_ring(t, 0, nside);
    let sign = if forward { -1.0 } else { 1.0 };
    (-(l as i64 - 1)..l as i64)
        .map(|m| Complex64::from_polar(1.0, sign * m as f64 * phi0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphr_runtime::assert_close;

    #[test]
    fn ring_lengths_sum_to_npix() {
        for nside in [1usize, 2, 4, 8] {
            let total: usize = (0..ntheta_healpix(nside))
                .map(|t| nphi_ring(t, nside))
                .sum();
            assert_eq!(total, npix(nside));
            let starts = ring_starts(nside);
            assert_eq!(starts[0], 0);
            assert_eq!(*starts.last().unwrap(), npix(nside));
        }
    }

    #[test]
    fn nside_two_ring_layout() {
        // Rings of nside=2: caps 4, belt 8,8,8,8,8, caps 4.
        let lens: Vec<usize> = (0..ntheta_healpix(2)).map(|t| nphi_ring(t, 2)).collect();
        assert_eq!(lens, vec![4, 8, 8, 8, 8, 8, 4]);
    }

    #[test]
    fn equator_ring_is_at_half_pi() {
        // Ring i = 2*nside sits on the equator.
        let nside = 4;
        let t_eq = 2 * nside - 1;
        assert_close(thetas_healpix(nside)[t_eq], PI / 2.0, 1e-14, 0.0);
    }

    #[test]
    fn belt_shift_alternates() {
        // nside=1: all three rings are belt rings; shifts 1/2, 0, 1/2.
        assert_close(p2phi_ring(0, 0, 1), PI / 4.0, 1e-15, 0.0);
        assert_close(p2phi_ring(1, 0, 1), 0.0, 1e-15, 0.0);
        assert_close(p2phi_ring(2, 0, 1), PI / 4.0, 1e-15, 0.0);
    }

    #[test]
    fn phase_shift_is_unit_modulus_and_conjugate_paired() {
        let l = 4;
        let fwd = ring_phase_shift(l, 1, 2, true);
        let inv = ring_phase_shift(l, 1, 2, false);
        assert_eq!(fwd.len(), 2 * l - 1);
        for (a, b) in fwd.iter().zip(inv.iter()) {
            assert_close(a.norm(), 1.0, 1e-14, 0.0);
            assert_close((a - b.conj()).norm(), 0.0, 1e-14, 0.0);
        }
    }
}

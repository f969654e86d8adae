//! Ragged per-ring FFTs for the HEALPix scheme.
//!
//! Every ring has its own sample count, so the azimuthal step runs one
//! unscaled FFT per ring and maps between the ring's nphi Fourier bins and
//! the common 2L-wide m-grid: `spectral_periodic_extension` replicates ring
//! coefficients across their aliases, `spectral_folding` is its exact
//! adjoint. Ring start-longitude phase corrections are applied by the
//! contraction layer, not here.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use sphr_sampling::healpix;

use crate::fft;

/// Map m-grid slot j (m = j - L) onto the ring's centred Fourier bin,
/// aliasing modulo nphi.
fn alias_bin(j: usize, l: usize, nphi: usize) -> usize {
    (j as i64 - l as i64 + (nphi / 2) as i64).rem_euclid(nphi as i64) as usize
}

/// Extend one ring's centred spectrum (length nphi) to the 2L-wide m-grid.
pub(crate) fn spectral_periodic_extension(
    ring: &[Complex64],
    l: usize,
) -> Vec<Complex64> {
    let nphi = ring.len();
    (0..2 * l).map(|j| ring[alias_bin(j, l, nphi)]).collect()
}

/// Fold a 2L-wide m-grid spectrum onto the ring's nphi centred bins,
/// summing aliases.
pub(crate) fn spectral_folding(fm: &[Complex64], nphi: usize, l: usize) -> Vec<Complex64> {
    let mut ring = vec![Complex64::new(0.0, 0.0); nphi];
    for (j, &v) in fm.iter().enumerate() {
        ring[alias_bin(j, l, nphi)] += v;
    }
    ring
}

/// Forward ragged FFT: flat ring buffer [12 nside^2] to ftm [4 nside - 1, 2L].
pub fn healpix_fft(f: &Array1<Complex64>, l: usize, nside: usize) -> Array2<Complex64> {
    let ntheta = healpix::ntheta_healpix(nside);
    let starts = healpix::ring_starts(nside);
    let mut ftm = Array2::<Complex64>::zeros((ntheta, 2 * l));
    for t in 0..ntheta {
        let nphi = healpix::nphi_ring(t, nside);
        let mut lane: Vec<Complex64> = (0..nphi).map(|p| f[starts[t] + p]).collect();
        fft::fft_lane(&mut lane, false);
        // Centre the spectrum: bin h = nphi/2 holds m = 0 after the shift.
        let mut centred = vec![Complex64::new(0.0, 0.0); nphi];
        for (i, &v) in lane.iter().enumerate() {
            centred[fft::fftshift_index(i, nphi)] = v;
        }
        let ext = spectral_periodic_extension(&centred, l);
        for (j, v) in ext.into_iter().enumerate() {
            ftm[[t, j]] = v;
        }
    }
    ftm
}

/// Inverse ragged FFT: ftm [4 nside - 1, 2L] to flat ring buffer.
pub fn healpix_ifft(ftm: &Array2<Complex64>, l: usize, nside: usize) -> Array1<Complex64> {
    let ntheta = healpix::ntheta_healpix(nside);
    let starts = healpix::ring_starts(nside);
    let mut f = Array1::<Complex64>::zeros(healpix::npix(nside));
    for t in 0..ntheta {
        let nphi = healpix::nphi_ring(t, nside);
        let row: Vec<Complex64> = (0..2 * l).map(|j| ftm[[t, j]]).collect();
        let centred = spectral_folding(&row, nphi, l);
        // Undo the centring and synthesise the ring (unscaled inverse).
        let mut lane = vec![Complex64::new(0.0, 0.0); nphi];
        for (i, slot) in lane.iter_mut().enumerate() {
            *slot = centred[fft::fftshift_index(i, nphi)];
        }
        fft::fft_lane(&mut lane, true);
        for (p, v) in lane.into_iter().enumerate() {
            f[starts[t] + p] = v;
        }
    }
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphr_runtime::assert_close;

    #[test]
    fn extension_and_folding_are_adjoint() {
        let l = 6;
        let nphi = 8;
        let ring: Vec<Complex64> = (0..nphi)
            .map(|i| Complex64::new(i as f64 + 0.5, -(i as f64)))
            .collect();
        let grid: Vec<Complex64> = (0..2 * l)
            .map(|j| Complex64::new((j as f64).cos(), 0.25 * j as f64))
            .collect();
        let lhs: Complex64 = spectral_folding(&grid, nphi, l)
            .iter()
            .zip(ring.iter())
            .map(|(a, b)| a * b)
            .sum();
        let rhs: Complex64 = grid
            .iter()
            .zip(spectral_periodic_extension(&ring, l).iter())
            .map(|(a, b)| a * b)
            .sum();
        assert_close((lhs - rhs).norm(), 0.0, 1e-10, 0.0);
    }

    #[test]
    fn in_band_modes_survive_the_round_trip() {
        // A ring signal band-limited within its own nphi is recovered by
        // fft -> extend -> fold -> ifft up to the alias multiplicity of the
        // out-of-ring slots, which are zero here.
        let l = 4;
        let nphi = 8;
        let mut centred = vec![Complex64::new(0.0, 0.0); nphi];
        centred[nphi / 2] = Complex64::new(1.0, 0.0); // m = 0
        centred[nphi / 2 + 2] = Complex64::new(0.0, 1.5); // m = 2
        let ext = spectral_periodic_extension(&centred, l);
        assert_eq!(ext.len(), 2 * l);
        // m-grid slot j = m + L.
        assert_close((ext[l] - centred[nphi / 2]).norm(), 0.0, 1e-15, 0.0);
        assert_close((ext[l + 2] - centred[nphi / 2 + 2]).norm(), 0.0, 1e-15, 0.0);
        let folded = spectral_folding(&ext, nphi, l);
        // 2L = nphi here, so folding is exactly one alias per bin.
        for i in 0..nphi {
            assert_close((folded[i] - centred[i]).norm(), 0.0, 1e-15, 0.0);
        }
    }

    #[test]
    fn ragged_shapes_line_up() {
        let l = 4;
        let nside = 2;
        let f = Array1::<Complex64>::from_elem(48, Complex64::new(1.0, 0.0));
        let ftm = healpix_fft(&f, l, nside);
        assert_eq!(ftm.dim(), (7, 8));
        let back = healpix_ifft(&ftm, l, nside);
        assert_eq!(back.len(), 48);
    }

    #[test]
    fn constant_signal_concentrates_at_m_zero() {
        let l = 4;
        let nside = 2;
        let f = Array1::<Complex64>::from_elem(48, Complex64::new(2.0, 0.0));
        let ftm = healpix_fft(&f, l, nside);
        for t in 0..7 {
            let nphi = sphr_sampling::nphi_ring(t, nside) as f64;
            // m = 0 lives at column L; within-ring bins see the full DFT sum.
            assert_close(ftm[[t, l]].re, 2.0 * nphi, 1e-12, 1e-12);
            for j in 0..2 * l {
                let m = j as i64 - l as i64;
                if m.rem_euclid(nphi as i64) != 0 {
                    assert_close(ftm[[t, j]].norm(), 0.0, 1e-12, 0.0);
                }
            }
        }
    }
}

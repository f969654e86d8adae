//! Thin FFT layer over rustfft.
//!
//! All transforms are unscaled in both directions; every normalisation the
//! engine needs is applied explicitly at the call site. Plans are shared
//! process-wide, keyed by (length, direction). `rfft`/`irfft` are built on
//! the complex backend through the half-spectrum / Hermitian-rebuild route.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use ndarray::{Array2, Array3};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

type PlanMap = HashMap<(usize, bool), Arc<dyn Fft<f64>>>;

static PLAN_CACHE: OnceLock<Mutex<PlanMap>> = OnceLock::new();

fn plan(len: usize, inverse: bool) -> Arc<dyn Fft<f64>> {
    let cache = PLAN_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().unwrap_or_else(|e| e.into_inner());
    guard
        .entry((len, inverse))
        .or_insert_with(|| {
            let mut planner = FftPlanner::<f64>::new();
            if inverse {
                planner.plan_fft_inverse(len)
            } else {
                planner.plan_fft_forward(len)
            }
        })
        .clone()
}

/// In-place unscaled transform of one lane.
pub(crate) fn fft_lane(buf: &mut [Complex64], inverse: bool) {
    if buf.len() < 2 {
        return;
    }
    plan(buf.len(), inverse).process(buf);
}

/// Unscaled transform of every row (axis 1) of a 2-D array.
pub(crate) fn fft_rows(a: &mut Array2<Complex64>, inverse: bool) {
    let (rows, cols) = a.dim();
    let mut buf = vec![Complex64::new(0.0, 0.0); cols];
    for r in 0..rows {
        for c in 0..cols {
            buf[c] = a[[r, c]];
        }
        fft_lane(&mut buf, inverse);
        for c in 0..cols {
            a[[r, c]] = buf[c];
        }
    }
}

/// Unscaled transform of every column (axis 0) of a 2-D array.
pub(crate) fn fft_cols(a: &mut Array2<Complex64>, inverse: bool) {
    let (rows, cols) = a.dim();
    let mut buf = vec![Complex64::new(0.0, 0.0); rows];
    for c in 0..cols {
        for r in 0..rows {
            buf[r] = a[[r, c]];
        }
        fft_lane(&mut buf, inverse);
        for r in 0..rows {
            a[[r, c]] = buf[r];
        }
    }
}

/// Unscaled transform along axis 0 of a 3-D array.
pub(crate) fn fft_axis0(a: &mut Array3<Complex64>, inverse: bool) {
    let (n0, n1, n2) = a.dim();
    let mut buf = vec![Complex64::new(0.0, 0.0); n0];
    for i in 0..n1 {
        for j in 0..n2 {
            for k in 0..n0 {
                buf[k] = a[[k, i, j]];
            }
            fft_lane(&mut buf, inverse);
            for k in 0..n0 {
                a[[k, i, j]] = buf[k];
            }
        }
    }
}

pub(crate) fn scale_2(a: &mut Array2<Complex64>, scale: f64) {
    a.mapv_inplace(|z| z * scale);
}

pub(crate) fn scale_3(a: &mut Array3<Complex64>, scale: f64) {
    a.mapv_inplace(|z| z * scale);
}

/// Index map of numpy's fftshift: out[(i + n/2) % n] = in[i].
pub(crate) fn fftshift_index(i: usize, n: usize) -> usize {
    (i + n / 2) % n
}

/// Index map of numpy's ifftshift: out[i] = in[(i + n/2) % n].
fn shift_lane(buf: &[Complex64], out: &mut [Complex64], forward_shift: bool) {
    let n = buf.len();
    for i in 0..n {
        if forward_shift {
            out[fftshift_index(i, n)] = buf[i];
        } else {
            out[i] = buf[fftshift_index(i, n)];
        }
    }
}

fn shift_rows(a: &mut Array2<Complex64>, forward_shift: bool) {
    let (rows, cols) = a.dim();
    let mut buf = vec![Complex64::new(0.0, 0.0); cols];
    let mut out = vec![Complex64::new(0.0, 0.0); cols];
    for r in 0..rows {
        for c in 0..cols {
            buf[c] = a[[r, c]];
        }
        shift_lane(&buf, &mut out, forward_shift);
        for c in 0..cols {
            a[[r, c]] = out[c];
        }
    }
}

pub(crate) fn fftshift_rows(a: &mut Array2<Complex64>) {
    shift_rows(a, true);
}

pub(crate) fn ifftshift_rows(a: &mut Array2<Complex64>) {
    shift_rows(a, false);
}

fn shift_axis0(a: &mut Array3<Complex64>, forward_shift: bool) {
    let (n0, n1, n2) = a.dim();
    let mut buf = vec![Complex64::new(0.0, 0.0); n0];
    let mut out = vec![Complex64::new(0.0, 0.0); n0];
    for i in 0..n1 {
        for j in 0..n2 {
            for k in 0..n0 {
                buf[k] = a[[k, i, j]];
            }
            shift_lane(&buf, &mut out, forward_shift);
            for k in 0..n0 {
                a[[k, i, j]] = out[k];
            }
        }
    }
}

pub(crate) fn fftshift_axis0(a: &mut Array3<Complex64>) {
    shift_axis0(a, true);
}

pub(crate) fn ifftshift_axis0(a: &mut Array3<Complex64>) {
    shift_axis0(a, false);
}

/// Real-input FFT of every row: unscaled half spectrum, n/2+1 columns.
pub(crate) fn rfft_rows(a: &Array2<Complex64>) -> Array2<Complex64> {
    let (rows, cols) = a.dim();
    let half = cols / 2 + 1;
    let mut out = Array2::<Complex64>::zeros((rows, half));
    let mut buf = vec![Complex64::new(0.0, 0.0); cols];
    for r in 0..rows {
        for c in 0..cols {
            buf[c] = Complex64::new(a[[r, c]].re, 0.0);
        }
        fft_lane(&mut buf, false);
        for c in 0..half {
            out[[r, c]] = buf[c];
        }
    }
    out
}

/// Rebuild a full Hermitian spectrum of length n from its half spectrum.
pub(crate) fn rebuild_hermitian(half: &[Complex64], n: usize) -> Vec<Complex64> {
    let mut full = vec![Complex64::new(0.0, 0.0); n];
    for (k, &v) in half.iter().enumerate().take(n / 2 + 1) {
        full[k] = v;
    }
    for k in half.len().min(n / 2 + 1)..=n / 2 {
        full[k] = Complex64::new(0.0, 0.0);
    }
    for k in n / 2 + 1..n {
        full[k] = full[n - k].conj();
    }
    if n % 2 == 0 && n / 2 < full.len() {
        full[n / 2].im = 0.0;
    }
    full
}

/// Inverse real FFT of every row: unscaled inverse of the rebuilt Hermitian
/// spectrum, real output of length n per row (held in the real parts).
pub(crate) fn irfft_rows(half: &Array2<Complex64>, n: usize) -> Array2<Complex64> {
    let rows = half.nrows();
    let cols = half.ncols();
    let mut out = Array2::<Complex64>::zeros((rows, n));
    for r in 0..rows {
        let lane: Vec<Complex64> = (0..cols).map(|c| half[[r, c]]).collect();
        let mut full = rebuild_hermitian(&lane, n);
        fft_lane(&mut full, true);
        for (c, v) in full.iter().enumerate() {
            out[[r, c]] = Complex64::new(v.re, 0.0);
        }
    }
    out
}

/// Real-input FFT along axis 0 of a 3-D array: n0/2+1 planes.
pub(crate) fn rfft_axis0(a: &Array3<Complex64>) -> Array3<Complex64> {
    let (n0, n1, n2) = a.dim();
    let half = n0 / 2 + 1;
    let mut out = Array3::<Complex64>::zeros((half, n1, n2));
    let mut buf = vec![Complex64::new(0.0, 0.0); n0];
    for i in 0..n1 {
        for j in 0..n2 {
            for k in 0..n0 {
                buf[k] = Complex64::new(a[[k, i, j]].re, 0.0);
            }
            fft_lane(&mut buf, false);
            for k in 0..half {
                out[[k, i, j]] = buf[k];
            }
        }
    }
    out
}

/// Inverse real FFT along axis 0: unscaled, n0 output planes.
pub(crate) fn irfft_axis0(half: &Array3<Complex64>, n0: usize) -> Array3<Complex64> {
    let (h, n1, n2) = half.dim();
    let mut out = Array3::<Complex64>::zeros((n0, n1, n2));
    for i in 0..n1 {
        for j in 0..n2 {
            let lane: Vec<Complex64> = (0..h).map(|k| half[[k, i, j]]).collect();
            let mut full = rebuild_hermitian(&lane, n0);
            fft_lane(&mut full, true);
            for (k, v) in full.iter().enumerate() {
                out[[k, i, j]] = Complex64::new(v.re, 0.0);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphr_runtime::assert_close;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn forward_inverse_round_trip_scales_by_n() {
        let mut a = Array2::from_shape_vec(
            (1, 4),
            vec![c(1.0, 0.0), c(2.0, -1.0), c(0.5, 0.25), c(-3.0, 2.0)],
        )
        .unwrap();
        let original = a.clone();
        fft_rows(&mut a, false);
        fft_rows(&mut a, true);
        scale_2(&mut a, 1.0 / 4.0);
        for i in 0..4 {
            assert_close((a[[0, i]] - original[[0, i]]).norm(), 0.0, 1e-12, 0.0);
        }
    }

    #[test]
    fn shifts_match_numpy_for_odd_and_even_lengths() {
        // odd n = 5: fftshift rolls by 2.
        let mut a =
            Array2::from_shape_vec((1, 5), (0..5).map(|i| c(i as f64, 0.0)).collect()).unwrap();
        fftshift_rows(&mut a);
        let shifted: Vec<f64> = (0..5).map(|i| a[[0, i]].re).collect();
        assert_eq!(shifted, vec![3.0, 4.0, 0.0, 1.0, 2.0]);
        ifftshift_rows(&mut a);
        let back: Vec<f64> = (0..5).map(|i| a[[0, i]].re).collect();
        assert_eq!(back, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        // even n = 4: fftshift swaps halves and is self-inverse.
        let mut b =
            Array2::from_shape_vec((1, 4), (0..4).map(|i| c(i as f64, 0.0)).collect()).unwrap();
        fftshift_rows(&mut b);
        let swapped: Vec<f64> = (0..4).map(|i| b[[0, i]].re).collect();
        assert_eq!(swapped, vec![2.0, 3.0, 0.0, 1.0]);
    }

    #[test]
    fn rfft_matches_full_fft_on_real_input() {
        let vals = [1.0, -2.0, 0.5, 3.0, 4.0];
        let a = Array2::from_shape_vec((1, 5), vals.iter().map(|&x| c(x, 0.0)).collect()).unwrap();
        let half = rfft_rows(&a);
        assert_eq!(half.ncols(), 3);
        let mut full = a.clone();
        fft_rows(&mut full, false);
        for k in 0..3 {
            assert_close((half[[0, k]] - full[[0, k]]).norm(), 0.0, 1e-12, 0.0);
        }
    }

    #[test]
    fn irfft_round_trips_rfft_with_explicit_scale() {
        for n in [4usize, 5, 6, 7] {
            let a = Array2::from_shape_vec(
                (1, n),
                (0..n).map(|i| c((i as f64).sin() + 0.3, 0.0)).collect(),
            )
            .unwrap();
            let half = rfft_rows(&a);
            let mut back = irfft_rows(&half, n);
            scale_2(&mut back, 1.0 / n as f64);
            for i in 0..n {
                assert_close(back[[0, i]].re, a[[0, i]].re, 1e-12, 1e-12);
                assert_close(back[[0, i]].im, 0.0, 1e-12, 0.0);
            }
        }
    }

    #[test]
    fn axis0_transform_agrees_with_lane_transform() {
        let n0 = 3;
        let mut a = Array3::<Complex64>::zeros((n0, 2, 2));
        for k in 0..n0 {
            for i in 0..2 {
                for j in 0..2 {
                    a[[k, i, j]] = c((k * 4 + i * 2 + j) as f64, (k as f64) - 1.0);
                }
            }
        }
        let mut lane: Vec<Complex64> = (0..n0).map(|k| a[[k, 1, 0]]).collect();
        fft_axis0(&mut a, false);
        fft_lane(&mut lane, false);
        for k in 0..n0 {
            assert_close((a[[k, 1, 0]] - lane[k]).norm(), 0.0, 1e-12, 0.0);
        }
    }
}

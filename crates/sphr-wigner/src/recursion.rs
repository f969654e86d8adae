use ndarray::{Array2, Array3};
use thiserror::Error;

use sphr_sampling::{SamplingError, Scheme, thetas};

pub type WignerResult<T> = Result<T, WignerError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WignerError {
    #[error("spin {spin} is out of range for band-limit {band_limit} (need |spin| < L)")]
    SpinOutOfRange { spin: i64, band_limit: usize },
    #[error("azimuthal band-limit must be at least 1")]
    AzimuthalBandZero,
    #[error("degree {degree} is out of range for band-limit {band_limit}")]
    DegreeOutOfRange { degree: usize, band_limit: usize },
    #[error("Wigner-d plane has shape {actual:?}, expected {expected:?}")]
    PlaneShape {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error(transparent)]
    Sampling(#[from] SamplingError),
}

/// Rings where sin(theta) vanishes to this tolerance are excluded from the
/// recurrence (which divides by sin) and filled from the closed forms.
const POLE_TOL: f64 = 1e-13;

/// Immutable recursion coefficient bundle for the Price-McEwen engine.
///
/// Pure function of its generating parameters; O(L^2) memory. Valid only for
/// the (L, spin, scheme, nside, forward) tuple it was built for, and never
/// mutated by [`compute_all_slices`].
#[derive(Debug, Clone, PartialEq)]
pub struct Precomputes {
    band_limit: usize,
    spin: i64,
    scheme: Scheme,
    nside: Option<usize>,
    forward: bool,
    beta: Vec<f64>,
    /// log |d^l_{l, -+mm}|, the renormalisation seed of each recursion branch.
    lrenorm: Array3<f64>,
    /// Recurrence multiplier (m cos(beta) - m') / sin(beta), per branch.
    lamb: Array3<f64>,
    /// Symmetry/sign table folding the positive-m reflection into the output.
    vsign: Array2<f64>,
    /// Recurrence coefficients 2/sqrt(m(2l+1-m)), rolled per degree.
    cpi: Array2<f64>,
    /// Ratio coefficients cpi[m]/cpi[m-1], rolled per degree.
    cp2: Array2<f64>,
    cot: Vec<f64>,
    /// +1 for a theta = 0 ring, -1 for theta = pi, 0 otherwise.
    pole: Vec<i8>,
}

impl Precomputes {
    #[must_use]
    pub fn band_limit(&self) -> usize {
        self.band_limit
    }

    #[must_use]
    pub fn spin(&self) -> i64 {
        self.spin
    }

    #[must_use]
    pub fn ntheta(&self) -> usize {
        self.beta.len()
    }

    #[must_use]
    pub fn angles(&self) -> &[f64] {
        &self.beta
    }

    /// Whether this bundle was generated for the given parameter tuple.
    #[must_use]
    pub fn matches(
        &self,
        l: usize,
        spin: i64,
        scheme: Scheme,
        nside: Option<usize>,
        forward: bool,
    ) -> bool {
        self.band_limit == l
            && self.spin == spin
            && self.scheme == scheme
            && self.nside == nside
            && self.forward == forward
    }
}

fn parity(x: i64) -> f64 {
    if x.rem_euclid(2) == 0 { 1.0 } else { -1.0 }
}

/// Recursion angles for (L, scheme, direction). Forward transforms of the
/// Mw/Mwss schemes run on the doubled sampling-theorem-complete grid.
pub fn recursion_thetas(
    l: usize,
    scheme: Scheme,
    nside: Option<usize>,
    forward: bool,
) -> WignerResult<Vec<f64>> {
    let beta = if forward && matches!(scheme, Scheme::Mw | Scheme::Mwss) {
        thetas(2 * l, Scheme::Mwss, None)?
    } else {
        thetas(l, scheme, nside)?
    };
    Ok(beta)
}

/// Build the recursion coefficient bundle for (L, spin, scheme, direction).
pub fn generate_precomputes(
    l: usize,
    spin: i64,
    scheme: Scheme,
    nside: Option<usize>,
    forward: bool,
) -> WignerResult<Precomputes> {
    if spin.unsigned_abs() as usize >= l {
        return Err(WignerError::SpinOutOfRange {
            spin,
            band_limit: l,
        });
    }
    let beta = recursion_thetas(l, scheme, nside, forward)?;
    Ok(generate_precomputes_at(&beta, l, spin, scheme, nside, forward))
}

/// Core bundle construction from explicit polar angles.
fn generate_precomputes_at(
    beta: &[f64],
    l: usize,
    spin: i64,
    scheme: Scheme,
    nside: Option<usize>,
    forward: bool,
) -> Precomputes {
    let mm = -spin;
    let mm_abs = mm.unsigned_abs() as usize;
    let ntheta = beta.len();
    let li = l as i64;

    let mut pole = vec![0i8; ntheta];
    let mut c = vec![0.0; ntheta];
    let mut s = vec![0.0; ntheta];
    let mut cot = vec![0.0; ntheta];
    let mut lt = vec![0.0; ntheta];
    let mut lc2 = vec![0.0; ntheta];
    for (t, &b) in beta.iter().enumerate() {
        let (sb, cb) = b.sin_cos();
        if sb.abs() < POLE_TOL {
            pole[t] = if cb > 0.0 { 1 } else { -1 };
            // Placeholders; pole rings never enter the recurrence.
            c[t] = if cb > 0.0 { 1.0 } else { -1.0 };
            s[t] = 1.0;
            continue;
        }
        c[t] = cb;
        s[t] = sb;
        cot[t] = cb / sb;
        lt[t] = (-b / 2.0).tan().abs().ln();
        lc2[t] = (b / 2.0).cos().abs().ln();
    }

    // Indexing boundaries of the two recursion branches.
    let half = |branch: usize, el: i64| -> i64 {
        if branch == 0 { el + mm + 1 } else { el - mm + 1 }
    };

    // Recurrence coefficients cp(m) = 2/sqrt(m(2l+1-m)), plus their ratio,
    // rolled so each degree reads its own step at the shared global index.
    let mut cpi_raw = Array2::<f64>::zeros((l + 1, l));
    let mut cp2_raw = Array2::<f64>::zeros((l + 1, l));
    for el in 0..l {
        if el > 0 {
            cpi_raw[[0, el]] = 2.0 / (2.0 * el as f64).sqrt();
        }
        for m in 2..=l {
            let denom = (m as i64) * (2 * el as i64 + 1 - m as i64);
            if denom > 0 {
                cpi_raw[[m - 1, el]] = 2.0 / (denom as f64).sqrt();
                if cpi_raw[[m - 2, el]] != 0.0 {
                    cp2_raw[[m - 1, el]] = cpi_raw[[m - 1, el]] / cpi_raw[[m - 2, el]];
                }
            }
        }
    }
    let mut cpi = Array2::<f64>::zeros((l + 1, l));
    let mut cp2 = Array2::<f64>::zeros((l + 1, l));
    for el in 0..l {
        let shift = (l - 1 - el) as i64;
        for j in 0..=l {
            let src = (j as i64 - shift).rem_euclid(l as i64 + 1) as usize;
            cpi[[j, el]] = cpi_raw[[src, el]];
            cp2[[j, el]] = cp2_raw[[src, el]];
        }
    }

    // Sign table: edge-element signs plus the positive-m reflection
    // d^l_{m,m'} = (-1)^{m-m'} d^l_{-m,-m'}.
    let mut vsign = Array2::<f64>::zeros((2 * l - 1, l));
    for r in 0..2 * l - 1 {
        let msign = if r < l - 1 { parity(r as i64) } else { 1.0 };
        let edge = if r < l - 1 { parity(mm + 1 + li) } else { 1.0 };
        for el in 0..l {
            vsign[[r, el]] = msign * edge * parity(mm + el as i64);
        }
    }

    // Renormalisation seeds log |d^l_{l, l-j+1}| accumulated iteratively
    // (one shared first-row iterate, scattered when j hits a branch's slice).
    let mut lrenorm = Array3::<f64>::from_elem((2, ntheta, l), f64::NEG_INFINITY);
    let mut lfr = Array2::<f64>::zeros((ntheta, l));
    for t in 0..ntheta {
        for el in 0..l {
            lfr[[t, el]] = 2.0 * el as f64 * lc2[t];
        }
    }
    for branch in 0..2 {
        for el in mm_abs..l {
            if half(branch, el as i64) == 1 {
                for t in 0..ntheta {
                    lrenorm[[branch, t, el]] = lfr[[t, el]];
                }
            }
        }
    }
    for j in 2..(l as i64 + mm.abs() + 2) {
        for el in 0..l {
            let num = 2 * el as i64 + 2 - j;
            if num <= 0 {
                for t in 0..ntheta {
                    lfr[[t, el]] = f64::NEG_INFINITY;
                }
            } else {
                let step = 0.5 * (num as f64 / (j - 1) as f64).ln();
                for t in 0..ntheta {
                    lfr[[t, el]] += step + lt[t];
                }
            }
        }
        for branch in 0..2 {
            for el in mm_abs..l {
                if half(branch, el as i64) == j {
                    for t in 0..ntheta {
                        lrenorm[[branch, t, el]] = lfr[[t, el]];
                    }
                }
            }
        }
    }

    // Recurrence multiplier, seeded at the m = -l edge of each degree.
    let mut lamb = Array3::<f64>::zeros((2, ntheta, l));
    for branch in 0..2 {
        for t in 0..ntheta {
            if pole[t] != 0 {
                continue;
            }
            for el in 0..l {
                let elf = el as f64;
                lamb[[branch, t, el]] = ((elf + 1.0) * (1.0 - c[t])
                    - half(branch, el as i64) as f64
                    + c[t])
                    / s[t]
                    - (l - 1 - el) as f64 * cot[t];
            }
        }
    }

    Precomputes {
        band_limit: l,
        spin,
        scheme,
        nside,
        forward,
        beta: beta.to_vec(),
        lrenorm,
        lamb,
        vsign,
        cpi,
        cp2,
        cot,
        pole,
    }
}

/// Per-order stack of bundles for the Wigner (SO(3)) transform: one bundle
/// per azimuthal order n in -(N-1)..=(N-1), built at spin -n, indexed
/// n + N - 1.
#[derive(Debug, Clone)]
pub struct WignerPrecomputes {
    band_limit: usize,
    azimuthal_band: usize,
    per_order: Vec<Precomputes>,
}

impl WignerPrecomputes {
    #[must_use]
    pub fn band_limit(&self) -> usize {
        self.band_limit
    }

    #[must_use]
    pub fn azimuthal_band(&self) -> usize {
        self.azimuthal_band
    }

    /// Bundle for azimuthal order n.
    #[must_use]
    pub fn order(&self, n: i64) -> &Precomputes {
        &self.per_order[(n + self.azimuthal_band as i64 - 1) as usize]
    }

    #[must_use]
    pub fn matches(
        &self,
        l: usize,
        n: usize,
        scheme: Scheme,
        nside: Option<usize>,
        forward: bool,
    ) -> bool {
        self.band_limit == l
            && self.azimuthal_band == n
            && self
                .per_order
                .iter()
                .enumerate()
                .all(|(i, p)| p.matches(l, -(i as i64 - (n as i64 - 1)), scheme, nside, forward))
    }
}

/// Build recursion bundles for every azimuthal order of a Wigner transform.
pub fn generate_precomputes_wigner(
    l: usize,
    n: usize,
    scheme: Scheme,
    nside: Option<usize>,
    forward: bool,
) -> WignerResult<WignerPrecomputes> {
    if n == 0 {
        return Err(WignerError::AzimuthalBandZero);
    }
    let mut per_order = Vec::with_capacity(2 * n - 1);
    for order in -(n as i64 - 1)..n as i64 {
        per_order.push(generate_precomputes(l, -order, scheme, nside, forward)?);
    }
    Ok(WignerPrecomputes {
        band_limit: l,
        azimuthal_band: n,
        per_order,
    })
}

/// Compute the Wigner-d slice d^l_{m,-spin}(theta) for every order, ring and
/// degree: output shape [2L-1, n_theta, L], indexed dl[m+L-1, t, l].
///
/// Negative m is computed directly by the stabilised three-term recurrence;
/// positive m follows from the symmetry folded into the bundle's sign table.
/// Each iterate is rescaled to O(1) with the log factor tracked in the
/// renormalisation buffer, and re-exponentiated on output. Degrees below
/// |spin| are identically zero.
#[must_use]
pub fn compute_all_slices(pre: &Precomputes) -> Array3<f64> {
    let l = pre.band_limit;
    let ntheta = pre.ntheta();
    let mm = -pre.spin;
    let mm_abs = mm.unsigned_abs() as usize;
    let mut dl = Array3::<f64>::zeros((2 * l - 1, ntheta, l));

    if l == 1 {
        // Only the scalar degree exists: d^0_{0,0} = 1 at every angle.
        for t in 0..ntheta {
            dl[[0, t, 0]] = 1.0;
        }
        return dl;
    }

    // Working copies: the bundle stays immutable across calls.
    let mut lamb = pre.lamb.clone();
    let mut lrenorm = pre.lrenorm.clone();

    let lind = l - 1;
    for branch in 0..2 {
        let sind: i64 = if branch == 0 { 0 } else { 2 * l as i64 - 2 };
        let sgn: i64 = if branch == 0 { 1 } else { -1 };

        // Double-buffered iterates: previous and current recursion rows.
        let mut iter0 = Array2::<f64>::ones((ntheta, l));
        let mut iter1 = Array2::<f64>::ones((ntheta, l));
        for t in 0..ntheta {
            if pre.pole[t] != 0 {
                continue;
            }
            for el in lind.max(mm_abs)..l {
                iter1[[t, el]] = pre.cpi[[0, el]] * lamb[[branch, t, el]];
            }
        }

        // Seed rows: the m = -l edge (value 1 before renormalisation) and
        // its first recursion step.
        for t in 0..ntheta {
            if pre.pole[t] != 0 {
                continue;
            }
            for el in lind.max(mm_abs)..l {
                dl[[sind as usize, t, el]] =
                    iter0[[t, el]] * pre.vsign[[sind as usize, el]] * lrenorm[[branch, t, el]].exp();
            }
            let row1 = (sind + sgn) as usize;
            for el in (lind - 1).max(mm_abs)..l {
                dl[[row1, t, el]] =
                    iter1[[t, el]] * pre.vsign[[row1, el]] * lrenorm[[branch, t, el]].exp();
            }
        }

        let mut entry = Array2::<f64>::zeros((ntheta, l));
        for step in 2..l {
            let lmin = (l - 1 - step).max(mm_abs);
            let row = (sind + sgn * step as i64) as usize;
            for t in 0..ntheta {
                if pre.pole[t] != 0 {
                    continue;
                }
                for el in 0..l {
                    lamb[[branch, t, el]] += pre.cot[t];
                }
                for el in lmin..l {
                    entry[[t, el]] = pre.cpi[[step - 1, el]] * iter1[[t, el]] * lamb[[branch, t, el]]
                        - pre.cp2[[step - 1, el]] * iter0[[t, el]];
                }
                // A degree joining the recursion starts at its m = -l edge,
                // which is exactly 1 under renormalisation.
                if l - 1 - step >= mm_abs {
                    entry[[t, l - 1 - step]] = 1.0;
                }
                for el in lmin..l {
                    let e = entry[[t, el]];
                    dl[[row, t, el]] =
                        e * pre.vsign[[row, el]] * lrenorm[[branch, t, el]].exp();
                    let big = e.abs();
                    let bigi = 1.0 / big;
                    iter0[[t, el]] = bigi * iter1[[t, el]];
                    iter1[[t, el]] = bigi * e;
                    lrenorm[[branch, t, el]] += big.ln();
                }
            }
        }
    }

    // Closed forms at the poles: d^l_{m,m'}(0) = delta_{m,m'} and
    // d^l_{m,m'}(pi) = (-1)^{l-m'} delta_{m,-m'}.
    for t in 0..ntheta {
        match pre.pole[t] {
            1 => {
                for r in 0..2 * l - 1 {
                    for el in 0..l {
                        dl[[r, t, el]] = 0.0;
                    }
                }
                let row = (mm + l as i64 - 1) as usize;
                for el in mm_abs..l {
                    dl[[row, t, el]] = 1.0;
                }
            }
            -1 => {
                for r in 0..2 * l - 1 {
                    for el in 0..l {
                        dl[[r, t, el]] = 0.0;
                    }
                }
                let row = (-mm + l as i64 - 1) as usize;
                for el in mm_abs..l {
                    dl[[row, t, el]] = parity(el as i64 + mm);
                }
            }
            _ => {}
        }
    }

    dl
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphr_runtime::assert_close;
    use std::f64::consts::PI;

    fn slices_at(beta: &[f64], l: usize, spin: i64) -> Array3<f64> {
        let pre = generate_precomputes_at(beta, l, spin, Scheme::Mw, None, false);
        compute_all_slices(&pre)
    }

    #[test]
    fn rejects_spin_at_band_limit() {
        assert_eq!(
            generate_precomputes(4, 4, Scheme::Mw, None, false),
            Err(WignerError::SpinOutOfRange {
                spin: 4,
                band_limit: 4
            })
        );
    }

    #[test]
    fn degree_zero_slice_is_unity() {
        let dl = slices_at(&[0.7, 1.9], 1, 0);
        assert_close(dl[[0, 0, 0]], 1.0, 1e-15, 0.0);
        assert_close(dl[[0, 1, 0]], 1.0, 1e-15, 0.0);
    }

    #[test]
    fn degree_one_matches_closed_forms() {
        let beta = [0.4, PI / 3.0, 2.2];
        let l = 2;
        let dl = slices_at(&beta, l, 0);
        for (t, &b) in beta.iter().enumerate() {
            // d^1_{-1,0} = sin/sqrt(2), d^1_{0,0} = cos, d^1_{1,0} = -sin/sqrt(2)
            assert_close(dl[[0, t, 1]], b.sin() / 2.0f64.sqrt(), 1e-12, 1e-12);
            assert_close(dl[[1, t, 1]], b.cos(), 1e-12, 1e-12);
            assert_close(dl[[2, t, 1]], -b.sin() / 2.0f64.sqrt(), 1e-12, 1e-12);
            // Degree 0 present at the m = 0 row.
            assert_close(dl[[1, t, 0]], 1.0, 1e-12, 0.0);
        }
    }

    #[test]
    fn degree_two_matches_closed_forms() {
        let beta = [PI / 3.0, 1.1];
        let l = 3;
        let dl = slices_at(&beta, l, 0);
        for (t, &b) in beta.iter().enumerate() {
            let (sb, cb) = b.sin_cos();
            let d20 = 6.0f64.sqrt() / 4.0 * sb * sb;
            let d10 = (3.0f64 / 2.0).sqrt() * sb * cb;
            let d00 = 0.5 * (3.0 * cb * cb - 1.0);
            assert_close(dl[[0, t, 2]], d20, 1e-12, 1e-12);
            assert_close(dl[[1, t, 2]], d10, 1e-12, 1e-12);
            assert_close(dl[[2, t, 2]], d00, 1e-12, 1e-12);
            assert_close(dl[[3, t, 2]], -d10, 1e-12, 1e-12);
            assert_close(dl[[4, t, 2]], d20, 1e-12, 1e-12);
        }
    }

    #[test]
    fn spin_one_slice_matches_closed_forms() {
        // Slice m' = -spin = 1: d^1_{m,1}.
        let beta = [0.9, 2.0];
        let dl = slices_at(&beta, 2, -1);
        for (t, &b) in beta.iter().enumerate() {
            let cb = b.cos();
            assert_close(dl[[0, t, 1]], (1.0 - cb) / 2.0, 1e-12, 1e-12);
            assert_close(dl[[1, t, 1]], b.sin() / 2.0f64.sqrt(), 1e-12, 1e-12);
            assert_close(dl[[2, t, 1]], (1.0 + cb) / 2.0, 1e-12, 1e-12);
        }
    }

    #[test]
    fn degrees_below_spin_are_zero() {
        let l = 5;
        let spin = 4; // maximum valid magnitude
        let dl = slices_at(&[0.3, 1.4, 2.8], l, spin);
        for r in 0..2 * l - 1 {
            for t in 0..3 {
                for el in 0..spin as usize {
                    assert_eq!(dl[[r, t, el]], 0.0, "row {r} ring {t} degree {el}");
                }
            }
        }
        // The surviving degree is a genuine d-function, not all zeros.
        let norm: f64 = (0..2 * l - 1).map(|r| dl[[r, 0, 4]].powi(2)).sum();
        assert_close(norm, 1.0, 1e-10, 1e-10);
    }

    #[test]
    fn rows_are_orthonormal_across_orders() {
        // sum_m d^l_{m,m'}(beta)^2 = 1 for every degree and angle.
        let l = 8;
        let beta = [0.35, 1.2, 2.6];
        let dl = slices_at(&beta, l, 0);
        for t in 0..beta.len() {
            for el in 0..l {
                let norm: f64 = (0..2 * l - 1).map(|r| dl[[r, t, el]].powi(2)).sum();
                assert_close(norm, 1.0, 1e-10, 1e-10);
            }
        }
    }

    #[test]
    fn pole_rings_take_the_closed_forms() {
        let l = 4;
        let dl = slices_at(&[0.0, 1.0, PI], l, 0);
        for el in 0..l {
            for r in 0..2 * l - 1 {
                let north = if r == l - 1 { 1.0 } else { 0.0 };
                let south = if r == l - 1 { parity(el as i64) } else { 0.0 };
                assert_close(dl[[r, 0, el]], north, 1e-15, 0.0);
                assert_close(dl[[r, 2, el]], south, 1e-15, 0.0);
            }
        }
    }

    #[test]
    fn bundle_is_not_mutated_by_slice_computation() {
        let pre = generate_precomputes(6, 1, Scheme::Dh, None, false).unwrap();
        let lamb_before = pre.lamb.clone();
        let first = compute_all_slices(&pre);
        let second = compute_all_slices(&pre);
        assert_eq!(pre.lamb, lamb_before);
        assert_eq!(first, second);
    }

    #[test]
    fn forward_mw_bundle_runs_on_the_doubled_grid() {
        let l = 4;
        let pre = generate_precomputes(l, 0, Scheme::Mw, None, true).unwrap();
        assert_eq!(pre.ntheta(), 2 * l + 1);
        assert!(pre.matches(l, 0, Scheme::Mw, None, true));
        assert!(!pre.matches(l, 0, Scheme::Mw, None, false));
    }

    #[test]
    fn wigner_precomputes_stack_per_order() {
        let stack = generate_precomputes_wigner(3, 2, Scheme::Dh, None, false).unwrap();
        assert!(stack.matches(3, 2, Scheme::Dh, None, false));
        assert_eq!(stack.order(1).spin(), -1);
        assert_eq!(stack.order(-1).spin(), 1);
        assert_eq!(stack.order(0).spin(), 0);
    }
}

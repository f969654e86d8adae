//! Trapani-Navaza recursion for the Wigner-d plane at pi/2.
//!
//! The plane for degree l is built from the plane for l-1: an eighth
//! (0 <= m' <= m <= l) is computed directly from the two closed-form update
//! equations, and the remainder is filled by successive symmetry
//! reflections. Indexing is dl[m + L - 1, m' + L - 1]. The recursion may
//! lose accuracy above l of roughly 1024; that regime is reported as a
//! non-fatal notice, never a failure.

use ndarray::Array2;

use sphr_runtime::{Notice, NoticeKind, record_notice};

use crate::recursion::{WignerError, WignerResult};

/// Band-limit beyond which the recursion is documented as unstable.
pub const STABLE_BAND_LIMIT: usize = 1024;

fn arg_checks(dl: &Array2<f64>, l: usize, el: usize) -> WignerResult<()> {
    if el >= l {
        return Err(WignerError::DegreeOutOfRange {
            degree: el,
            band_limit: l,
        });
    }
    let expected = (2 * l - 1, 2 * l - 1);
    if dl.dim() != expected {
        return Err(WignerError::PlaneShape {
            expected,
            actual: dl.dim(),
        });
    }
    Ok(())
}

fn idx(l: usize, m: i64) -> usize {
    (m + l as i64 - 1) as usize
}

/// Compute the eighth of the plane 0 <= m' <= m <= el for degree el from the
/// plane for el-1 (the el = 0 call seeds the recursion and ignores `dl`'s
/// previous contents at the origin).
pub fn compute_eighth(dl: &mut Array2<f64>, l: usize, el: usize) -> WignerResult<()> {
    arg_checks(dl, l, el)?;
    if l > STABLE_BAND_LIMIT {
        record_notice(Notice::new(
            NoticeKind::StabilityRisk,
            "trapani",
            format!("pi/2 recursion may be unstable beyond degree {STABLE_BAND_LIMIT} (band-limit {l})"),
        ));
    }

    if el == 0 {
        dl[[idx(l, 0), idx(l, 0)]] = 1.0;
        return Ok(());
    }

    let eli = el as i64;
    let elf = el as f64;

    // Top row m = el from the el-1 plane.
    let mut dmm = vec![0.0f64; el + 1];
    dmm[0] = -((2.0 * elf - 1.0) / (2.0 * elf)).sqrt() * dl[[idx(l, eli - 1), idx(l, 0)]];
    for mm in 1..=eli {
        let mmf = mm as f64;
        dmm[mm as usize] = elf.sqrt() / 2.0f64.sqrt() * (2.0 * elf - 1.0).sqrt()
            / (elf + mmf).sqrt()
            / (elf + mmf - 1.0).sqrt()
            * dl[[idx(l, eli - 1), idx(l, mm - 1)]];
    }
    for mm in 0..=eli {
        dl[[idx(l, eli), idx(l, mm)]] = dmm[mm as usize];
    }

    // Remaining rows, recursing m downward from el-1.
    for mm in 0..=eli {
        let mmf = mm as f64;
        let m = eli - 1;
        dl[[idx(l, m), idx(l, mm)]] = 2.0 * mmf / (elf - m as f64).sqrt()
            / (elf + m as f64 + 1.0).sqrt()
            * dl[[idx(l, m + 1), idx(l, mm)]];
        let mut m = eli - 2;
        while m >= mm {
            let mf = m as f64;
            let t1 = 2.0 * mmf / (elf - mf).sqrt() / (elf + mf + 1.0).sqrt()
                * dl[[idx(l, m + 1), idx(l, mm)]];
            let t2 = (elf - mf - 1.0).sqrt() * (elf + mf + 2.0).sqrt() / (elf - mf).sqrt()
                / (elf + mf + 1.0).sqrt()
                * dl[[idx(l, m + 2), idx(l, mm)]];
            dl[[idx(l, m), idx(l, mm)]] = t1 - t2;
            m -= 1;
        }
    }

    Ok(())
}

/// Fill the quarter 0 <= m, m' <= el from the eighth by the diagonal
/// symmetry d_{m,m'} = (-1)^{m+m'} d_{m',m}.
pub fn fill_eighth2quarter(dl: &mut Array2<f64>, l: usize, el: usize) -> WignerResult<()> {
    arg_checks(dl, l, el)?;
    let eli = el as i64;
    for m in 0..=eli {
        for mm in m + 1..=eli {
            let sign = if (m + mm) % 2 == 0 { 1.0 } else { -1.0 };
            dl[[idx(l, m), idx(l, mm)]] = sign * dl[[idx(l, mm), idx(l, m)]];
        }
    }
    Ok(())
}

/// Fill the half -el <= m <= el, 0 <= m' <= el from the quarter by the
/// order-sign symmetry d_{-m,m'} = (-1)^{el+m'} d_{m,m'}.
pub fn fill_quarter2half(dl: &mut Array2<f64>, l: usize, el: usize) -> WignerResult<()> {
    arg_checks(dl, l, el)?;
    let eli = el as i64;
    for mm in 0..=eli {
        let sign = if (eli + mm) % 2 == 0 { 1.0 } else { -1.0 };
        for m in -eli..0 {
            dl[[idx(l, m), idx(l, mm)]] = sign * dl[[idx(l, -m), idx(l, mm)]];
        }
    }
    Ok(())
}

/// Fill the full plane from the half by the second-index reflection
/// d_{m,-m'} = (-1)^{el+|m|} d_{m,m'}.
pub fn fill_half2full(dl: &mut Array2<f64>, l: usize, el: usize) -> WignerResult<()> {
    arg_checks(dl, l, el)?;
    let eli = el as i64;
    for mm in -eli..0 {
        for m in -eli..=eli {
            let sign = if (eli + m.abs()) % 2 == 0 { 1.0 } else { -1.0 };
            dl[[idx(l, m), idx(l, mm)]] = sign * dl[[idx(l, m), idx(l, -mm)]];
        }
    }
    Ok(())
}

/// Compute the full Wigner-d plane at pi/2 for degree el from the plane for
/// el-1: direct eighth, then the three symmetry fills.
pub fn compute_full(dl: &mut Array2<f64>, l: usize, el: usize) -> WignerResult<()> {
    compute_eighth(dl, l, el)?;
    fill_eighth2quarter(dl, l, el)?;
    fill_quarter2half(dl, l, el)?;
    fill_half2full(dl, l, el)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphr_runtime::{assert_close, take_notices};

    fn planes_up_to(l: usize, el: usize) -> Array2<f64> {
        let mut dl = Array2::<f64>::zeros((2 * l - 1, 2 * l - 1));
        for degree in 0..=el {
            compute_full(&mut dl, l, degree).unwrap();
        }
        dl
    }

    #[test]
    fn rejects_degree_at_band_limit() {
        let mut dl = Array2::<f64>::zeros((7, 7));
        assert_eq!(
            compute_eighth(&mut dl, 4, 4),
            Err(WignerError::DegreeOutOfRange {
                degree: 4,
                band_limit: 4
            })
        );
    }

    #[test]
    fn rejects_wrong_plane_shape() {
        let mut dl = Array2::<f64>::zeros((5, 5));
        assert_eq!(
            compute_eighth(&mut dl, 4, 1),
            Err(WignerError::PlaneShape {
                expected: (7, 7),
                actual: (5, 5)
            })
        );
    }

    #[test]
    fn degree_one_plane_matches_closed_forms() {
        let l = 3;
        let dl = planes_up_to(l, 1);
        let r = 1.0 / 2.0f64.sqrt();
        // d^1 at pi/2, indexed [m+L-1, m'+L-1].
        assert_close(dl[[idx(l, 1), idx(l, 1)]], 0.5, 1e-14, 0.0);
        assert_close(dl[[idx(l, 1), idx(l, 0)]], -r, 1e-14, 0.0);
        assert_close(dl[[idx(l, 1), idx(l, -1)]], 0.5, 1e-14, 0.0);
        assert_close(dl[[idx(l, 0), idx(l, 1)]], r, 1e-14, 0.0);
        assert_close(dl[[idx(l, 0), idx(l, 0)]], 0.0, 1e-14, 0.0);
        assert_close(dl[[idx(l, 0), idx(l, -1)]], -r, 1e-14, 0.0);
        assert_close(dl[[idx(l, -1), idx(l, 1)]], 0.5, 1e-14, 0.0);
        assert_close(dl[[idx(l, -1), idx(l, 0)]], r, 1e-14, 0.0);
        assert_close(dl[[idx(l, -1), idx(l, -1)]], 0.5, 1e-14, 0.0);
    }

    #[test]
    fn degree_two_spot_values() {
        let l = 4;
        let dl = planes_up_to(l, 2);
        // d^2_{2,2}(pi/2) = 1/4, d^2_{0,0}(pi/2) = -1/2,
        // d^2_{2,0}(pi/2) = sqrt(6)/4.
        assert_close(dl[[idx(l, 2), idx(l, 2)]], 0.25, 1e-14, 0.0);
        assert_close(dl[[idx(l, 0), idx(l, 0)]], -0.5, 1e-14, 0.0);
        assert_close(dl[[idx(l, 2), idx(l, 0)]], 6.0f64.sqrt() / 4.0, 1e-14, 0.0);
    }

    #[test]
    fn plane_satisfies_the_index_negation_symmetry() {
        let l = 5;
        let el = 4;
        let dl = planes_up_to(l, el);
        for m in -(el as i64)..=el as i64 {
            for mm in -(el as i64)..=el as i64 {
                let sign = if (m - mm) % 2 == 0 { 1.0 } else { -1.0 };
                assert_close(
                    dl[[idx(l, m), idx(l, mm)]],
                    sign * dl[[idx(l, -m), idx(l, -mm)]],
                    1e-12,
                    1e-12,
                );
            }
        }
    }

    #[test]
    fn plane_rows_are_orthonormal() {
        // d^l(pi/2) is an orthogonal matrix on the (2l+1)-block.
        let l = 6;
        let el = 5;
        let dl = planes_up_to(l, el);
        for a in -(el as i64)..=el as i64 {
            for b in -(el as i64)..=el as i64 {
                let dot: f64 = (-(el as i64)..=el as i64)
                    .map(|m| dl[[idx(l, m), idx(l, a)]] * dl[[idx(l, m), idx(l, b)]])
                    .sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert_close(dot, expected, 1e-11, 1e-11);
            }
        }
    }

    #[test]
    fn fills_reproduce_directly_computed_seeds() {
        // Re-run the direct eighth on a copy of the filled plane: the filled
        // values in the eighth must be untouched by the fills.
        let l = 5;
        let el = 3;
        let filled = planes_up_to(l, el);
        let mut direct = planes_up_to(l, el - 1);
        compute_eighth(&mut direct, l, el).unwrap();
        for m in 0..=el as i64 {
            for mm in 0..=m {
                assert_close(
                    filled[[idx(l, m), idx(l, mm)]],
                    direct[[idx(l, m), idx(l, mm)]],
                    1e-13,
                    1e-13,
                );
            }
        }
    }

    #[test]
    fn oversized_band_limit_reports_a_stability_notice() {
        let _ = take_notices();
        let l = STABLE_BAND_LIMIT + 1;
        let mut dl = Array2::<f64>::zeros((2 * l - 1, 2 * l - 1));
        compute_eighth(&mut dl, l, 0).unwrap();
        let notices = take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, sphr_runtime::NoticeKind::StabilityRisk);
    }
}

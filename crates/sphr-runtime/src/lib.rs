#![forbid(unsafe_code)]

//! Runtime plumbing shared by every sphr crate.
//!
//! ## Module layout
//!
//! | Module   | Contents                                              |
//! |----------|-------------------------------------------------------|
//! | `mode`   | [`RuntimeMode`] enum (Strict / Hardened)              |
//! | `notice` | [`Notice`] ledger for non-fatal diagnostics           |
//!
//! Assertion helpers for numerical tests live at the crate root so test
//! modules across the workspace share one tolerance convention.

pub mod mode;
pub mod notice;

pub use mode::RuntimeMode;
pub use notice::{Notice, NoticeKind, record_notice, take_notices};

/// Assert two f64 values are close within combined absolute and relative
/// tolerance: |actual - expected| <= atol + rtol * |expected|.
pub fn assert_close(actual: f64, expected: f64, atol: f64, rtol: f64) {
    let tol = atol + rtol * expected.abs();
    assert!(
        (actual - expected).abs() <= tol,
        "assert_close failed: actual={actual} expected={expected} diff={} tol={tol}",
        (actual - expected).abs()
    );
}

/// Assert two f64 slices are element-wise close within tolerance.
pub fn assert_close_slice(actual: &[f64], expected: &[f64], atol: f64, rtol: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "assert_close_slice: length mismatch: actual={} expected={}",
        actual.len(),
        expected.len()
    );
    for (idx, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let tol = atol + rtol * e.abs();
        assert!(
            (a - e).abs() <= tol,
            "assert_close_slice[{idx}]: actual={a} expected={e} diff={} tol={tol}",
            (a - e).abs()
        );
    }
}

/// Assert two complex values (re, im) are close within tolerance.
pub fn assert_close_complex(actual: (f64, f64), expected: (f64, f64), atol: f64, rtol: f64) {
    assert_close(actual.0, expected.0, atol, rtol);
    assert_close(actual.1, expected.1, atol, rtol);
}

/// Check whether a value is within combined tolerance of expected.
#[must_use]
pub fn within_tolerance(actual: f64, expected: f64, atol: f64, rtol: f64) -> bool {
    (actual - expected).abs() <= atol + rtol * expected.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_close_accepts_exact() {
        assert_close(1.0, 1.0, 1e-12, 1e-12);
    }

    #[test]
    fn assert_close_accepts_within_rtol() {
        assert_close(100.0 + 1e-10, 100.0, 0.0, 1e-11);
    }

    #[test]
    #[should_panic(expected = "assert_close failed")]
    fn assert_close_rejects_far() {
        assert_close(1.0, 2.0, 1e-12, 1e-12);
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn assert_close_slice_rejects_length_mismatch() {
        assert_close_slice(&[1.0, 2.0], &[1.0], 1e-12, 1e-12);
    }

    #[test]
    fn within_tolerance_boundaries() {
        assert!(within_tolerance(1.0, 1.0, 1e-12, 1e-12));
        assert!(!within_tolerance(1.0, 2.0, 1e-12, 1e-12));
    }
}

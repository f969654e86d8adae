use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;

use sphr_sampling::FShape;

use crate::error::{TransformError, TransformResult};

/// Pixel-space signal on the sphere. Equiangular schemes use a regular
/// [n_theta, n_phi] grid; HEALPix uses the flattened ring buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelSignal {
    Grid(Array2<Complex64>),
    Rings(Array1<Complex64>),
}

impl PixelSignal {
    pub fn expect_grid(&self) -> TransformResult<&Array2<Complex64>> {
        match self {
            Self::Grid(a) => Ok(a),
            Self::Rings(a) => Err(TransformError::ShapeMismatch {
                what: "pixel signal",
                expected: vec![0, 0],
                actual: vec![a.len()],
            }),
        }
    }

    pub fn expect_rings(&self) -> TransformResult<&Array1<Complex64>> {
        match self {
            Self::Rings(a) => Ok(a),
            Self::Grid(a) => Err(TransformError::ShapeMismatch {
                what: "pixel signal",
                expected: vec![0],
                actual: vec![a.nrows(), a.ncols()],
            }),
        }
    }

    /// Fail-fast shape validation against the scheme's expected shape.
    pub fn validate_shape(&self, what: &'static str, expected: &FShape) -> TransformResult<()> {
        match (self, expected) {
            (Self::Grid(a), FShape::Grid { ntheta, nphi }) => {
                if a.dim() != (*ntheta, *nphi) {
                    return Err(TransformError::ShapeMismatch {
                        what,
                        expected: vec![*ntheta, *nphi],
                        actual: vec![a.nrows(), a.ncols()],
                    });
                }
                Ok(())
            }
            (Self::Rings(a), FShape::Rings { npix }) => {
                if a.len() != *npix {
                    return Err(TransformError::ShapeMismatch {
                        what,
                        expected: vec![*npix],
                        actual: vec![a.len()],
                    });
                }
                Ok(())
            }
            (Self::Grid(a), FShape::Rings { npix }) => Err(TransformError::ShapeMismatch {
                what,
                expected: vec![*npix],
                actual: vec![a.nrows(), a.ncols()],
            }),
            (Self::Rings(a), FShape::Grid { ntheta, nphi }) => Err(TransformError::ShapeMismatch {
                what,
                expected: vec![*ntheta, *nphi],
                actual: vec![a.len()],
            }),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Self::Grid(a) => a.iter().all(|z| z.re.is_finite() && z.im.is_finite()),
            Self::Rings(a) => a.iter().all(|z| z.re.is_finite() && z.im.is_finite()),
        }
    }
}

/// Signal on SO(3), stored [gamma, beta, alpha] (equiangular) or
/// [gamma, pixel] (HEALPix).
#[derive(Debug, Clone, PartialEq)]
pub enum So3Signal {
    Grid(Array3<Complex64>),
    Rings(Array2<Complex64>),
}

impl So3Signal {
    pub fn expect_grid(&self) -> TransformResult<&Array3<Complex64>> {
        match self {
            Self::Grid(a) => Ok(a),
            Self::Rings(a) => Err(TransformError::ShapeMismatch {
                what: "SO(3) signal",
                expected: vec![0, 0, 0],
                actual: vec![a.nrows(), a.ncols()],
            }),
        }
    }

    pub fn expect_rings(&self) -> TransformResult<&Array2<Complex64>> {
        match self {
            Self::Rings(a) => Ok(a),
            Self::Grid(a) => {
                let d = a.dim();
                Err(TransformError::ShapeMismatch {
                    what: "SO(3) signal",
                    expected: vec![0, 0],
                    actual: vec![d.0, d.1, d.2],
                })
            }
        }
    }

    /// Validate [2N-1, <scheme shape>] against the expected pixel shape.
    pub fn validate_shape(
        &self,
        what: &'static str,
        n_gamma: usize,
        expected: &FShape,
    ) -> TransformResult<()> {
        match (self, expected) {
            (Self::Grid(a), FShape::Grid { ntheta, nphi }) => {
                if a.dim() != (n_gamma, *ntheta, *nphi) {
                    let d = a.dim();
                    return Err(TransformError::ShapeMismatch {
                        what,
                        expected: vec![n_gamma, *ntheta, *nphi],
                        actual: vec![d.0, d.1, d.2],
                    });
                }
                Ok(())
            }
            (Self::Rings(a), FShape::Rings { npix }) => {
                if a.dim() != (n_gamma, *npix) {
                    return Err(TransformError::ShapeMismatch {
                        what,
                        expected: vec![n_gamma, *npix],
                        actual: vec![a.nrows(), a.ncols()],
                    });
                }
                Ok(())
            }
            (Self::Grid(a), FShape::Rings { npix }) => {
                let d = a.dim();
                Err(TransformError::ShapeMismatch {
                    what,
                    expected: vec![n_gamma, *npix],
                    actual: vec![d.0, d.1, d.2],
                })
            }
            (Self::Rings(a), FShape::Grid { ntheta, nphi }) => Err(TransformError::ShapeMismatch {
                what,
                expected: vec![n_gamma, *ntheta, *nphi],
                actual: vec![a.nrows(), a.ncols()],
            }),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Self::Grid(a) => a.iter().all(|z| z.re.is_finite() && z.im.is_finite()),
            Self::Rings(a) => a.iter().all(|z| z.re.is_finite() && z.im.is_finite()),
        }
    }
}

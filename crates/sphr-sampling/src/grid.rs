use std::f64::consts::PI;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

use crate::healpix;
use crate::quadrature;

pub type SamplingResult<T> = Result<T, SamplingError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SamplingError {
    #[error("band-limit must be at least 1")]
    BandLimitZero,
    #[error("unrecognised sampling scheme: {0:?}")]
    UnknownScheme(String),
    #[error("nside is required for the HEALPix scheme")]
    NsideRequired,
    #[error("HEALPix resolution nside={nside} is not alias-free for band-limit {band_limit} (need band-limit >= 2*nside)")]
    HealpixResolution { nside: usize, band_limit: usize },
}

/// Closed set of supported sampling schemes.
///
/// `Mw` is the minimal equiangular grid, `Mwss` its sampling-theorem-complete
/// doubled variant, `Dh` Driscoll–Healy, `Gl` Gauss–Legendre, and `Healpix`
/// the irregular-ring pixelisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Mw,
    Mwss,
    Dh,
    Gl,
    Healpix,
}

impl Scheme {
    pub const ALL: [Self; 5] = [Self::Mw, Self::Mwss, Self::Dh, Self::Gl, Self::Healpix];

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Mw => "mw",
            Self::Mwss => "mwss",
            Self::Dh => "dh",
            Self::Gl => "gl",
            Self::Healpix => "healpix",
        }
    }

    /// Whether the first Fourier slot of the ftm grid is padding (the
    /// m = -L column of an even-width spectrum).
    #[must_use]
    pub const fn has_m_padding(self) -> bool {
        matches!(self, Self::Mwss | Self::Healpix)
    }
}

impl Display for Scheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Scheme {
    type Err = SamplingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mw" => Ok(Self::Mw),
            "mwss" => Ok(Self::Mwss),
            "dh" => Ok(Self::Dh),
            "gl" => Ok(Self::Gl),
            "healpix" => Ok(Self::Healpix),
            other => Err(SamplingError::UnknownScheme(other.to_string())),
        }
    }
}

/// Pixel-space shape of a signal for a given scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FShape {
    /// Regular [n_theta, n_phi] grid (equiangular schemes).
    Grid { ntheta: usize, nphi: usize },
    /// Flattened ring buffer (HEALPix).
    Rings { npix: usize },
}

fn validate_l(l: usize) -> SamplingResult<()> {
    if l == 0 {
        return Err(SamplingError::BandLimitZero);
    }
    Ok(())
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

/// Number of polar rings for (band-limit, scheme, resolution).
pub fn ntheta(l: usize, scheme: Scheme, nside: Option<usize>) -> SamplingResult<usize> {
    validate_l(l)?;
    Ok(match scheme {
        Scheme::Mw => l,
        Scheme::Mwss => l + 1,
        Scheme::Dh => 2 * l,
        Scheme::Gl => l,
        Scheme::Healpix => healpix::ntheta_healpix(resolve_nside(l, nside)?),
    })
}

/// Polar sample positions in radians, ascending from the north pole.
pub fn thetas(l: usize, scheme: Scheme, nside: Option<usize>) -> SamplingResult<Vec<f64>> {
    validate_l(l)?;
    Ok(match scheme {
        Scheme::Mw => (0..l)
            .map(|t| PI * (2 * t + 1) as f64 / (2 * l - 1) as f64)
            .collect(),
        Scheme::Mwss => (0..=l).map(|t| PI * t as f64 / l as f64).collect(),
        Scheme::Dh => (0..2 * l)
            .map(|t| PI * (2 * t + 1) as f64 / (4 * l) as f64)
            .collect(),
        Scheme::Gl => {
            let (nodes, _) = quadrature::gl_nodes_and_weights(l);
            nodes.iter().map(|&x| x.acos()).collect()
        }
        Scheme::Healpix => healpix::thetas_healpix(resolve_nside(l, nside)?),
    })
}

/// Azimuthal sample count of the equiangular schemes.
pub fn nphi_equiang(l: usize, scheme: Scheme) -> SamplingResult<usize> {
    validate_l(l)?;
    match scheme {
        Scheme::Mw | Scheme::Dh | Scheme::Gl => Ok(2 * l - 1),
        Scheme::Mwss => Ok(2 * l),
        Scheme::Healpix => Err(SamplingError::UnknownScheme(
            "healpix rings are not equiangular in phi".to_string(),
        )),
    }
}

/// Azimuthal sample positions of the equiangular schemes (origin at phi = 0).
pub fn phis_equiang(l: usize, scheme: Scheme) -> SamplingResult<Vec<f64>> {
    let nphi = nphi_equiang(l, scheme)?;
    Ok((0..nphi)
        .map(|p| 2.0 * PI * p as f64 / nphi as f64)
        .collect())
}

/// Offset of the first meaningful Fourier order in the ftm grid.
#[must_use]
pub const fn m_offset(scheme: Scheme) -> usize {
    if scheme.has_m_padding() { 1 } else { 0 }
}

/// Shape of the harmonic coefficient array: [L, 2L-1].
#[must_use]
pub const fn flm_shape(l: usize) -> (usize, usize) {
    (l, 2 * l - 1)
}

/// Shape of the Wigner coefficient array: [2N-1, L, 2L-1].
#[must_use]
pub const fn flmn_shape(l: usize, n: usize) -> (usize, usize, usize) {
    (2 * n - 1, l, 2 * l - 1)
}

/// Pixel-space signal shape for (band-limit, scheme, resolution).
pub fn f_shape(l: usize, scheme: Scheme, nside: Option<usize>) -> SamplingResult<FShape> {
    validate_l(l)?;
    Ok(match scheme {
        Scheme::Healpix => FShape::Rings {
            npix: healpix::npix(resolve_nside(l, nside)?),
        },
        _ => FShape::Grid {
            ntheta: ntheta(l, scheme, None)?,
            nphi: nphi_equiang(l, scheme)?,
        },
    })
}

/// Shape of the intermediate per-ring Fourier array: [n_rings, 2L-1+offset].
pub fn ftm_shape(l: usize, scheme: Scheme, nside: Option<usize>) -> SamplingResult<(usize, usize)> {
    Ok((ntheta(l, scheme, nside)?, 2 * l - 1 + m_offset(scheme)))
}

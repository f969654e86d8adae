use sphr_runtime::RuntimeMode;
use sphr_sampling::Scheme;

/// Common options threaded through every transform entry point.
///
/// Resolution (`nside`) is required and validated for the HEALPix scheme and
/// ignored otherwise. `reality` requests the conjugate-symmetry accelerated
/// path; for nonzero spin it downgrades silently to the complex path with a
/// recorded notice. `l_lower` restricts the contraction to degrees at or
/// above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    pub scheme: Scheme,
    pub nside: Option<usize>,
    pub reality: bool,
    pub l_lower: usize,
    pub mode: RuntimeMode,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            scheme: Scheme::Mw,
            nside: None,
            reality: false,
            l_lower: 0,
            mode: RuntimeMode::Strict,
        }
    }
}

impl TransformOptions {
    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    #[must_use]
    pub fn with_nside(mut self, nside: usize) -> Self {
        self.nside = Some(nside);
        self
    }

    #[must_use]
    pub fn with_reality(mut self, reality: bool) -> Self {
        self.reality = reality;
        self
    }

    #[must_use]
    pub fn with_l_lower(mut self, l_lower: usize) -> Self {
        self.l_lower = l_lower;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict_complex_mw() {
        let opts = TransformOptions::default();
        assert_eq!(opts.scheme, Scheme::Mw);
        assert_eq!(opts.nside, None);
        assert!(!opts.reality);
        assert_eq!(opts.l_lower, 0);
        assert_eq!(opts.mode, RuntimeMode::Strict);
    }

    #[test]
    fn builders_compose() {
        let opts = TransformOptions::default()
            .with_scheme(Scheme::Healpix)
            .with_nside(4)
            .with_reality(true)
            .with_l_lower(2)
            .with_mode(RuntimeMode::Hardened);
        assert_eq!(opts.scheme, Scheme::Healpix);
        assert_eq!(opts.nside, Some(4));
        assert!(opts.reality);
        assert_eq!(opts.l_lower, 2);
        assert_eq!(opts.mode, RuntimeMode::Hardened);
    }
}

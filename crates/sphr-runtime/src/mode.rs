use serde::{Deserialize, Serialize};

/// Validation posture threaded through every top-level entry point.
///
/// `Strict` trusts its inputs and validates shapes/parameters only.
/// `Hardened` additionally rejects non-finite input values before any
/// computation begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RuntimeMode {
    #[default]
    Strict,
    Hardened,
}

impl RuntimeMode {
    #[must_use]
    pub const fn checks_finite(self) -> bool {
        matches!(self, Self::Hardened)
    }
}

//! Asset bundle lifecycle.

use std::fmt;

/// Process-wide state of the asset bundle.
///
/// ```text
/// Unloaded -> Loading -> Ready
///                     -> LoadFailed -> Loading -> Ready | LoadFailed
/// ```
///
/// A render failure is request-scoped and never moves the bundle out of `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// No load has been attempted yet.
    Unloaded,
    /// A load attempt is in flight.
    Loading,
    /// All three artifacts are loaded and cached.
    Ready,
    /// The last load attempt failed; the next request retries.
    LoadFailed,
}

impl LoadPhase {
    /// Whether a call to `ensure_loaded` would need to do I/O.
    pub fn needs_load(&self) -> bool {
        matches!(self, Self::Unloaded | Self::LoadFailed)
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::LoadFailed => write!(f, "load_failed"),
        }
    }
}

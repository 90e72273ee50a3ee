//! Runtime boot state.

/// Where a runtime session is in its boot sequence.
///
/// ```text
///   NotBooted ──▶ Booting ──▶ Ready
///                    │
///                    └──────▶ BootFailed   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootState {
    /// Nothing has been attempted yet.
    #[default]
    NotBooted,
    /// Boot is in flight.
    Booting,
    /// The runtime is up; capabilities may be used.
    Ready,
    /// Boot failed. No retry happens for this session.
    BootFailed,
}

impl std::fmt::Display for BootState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootState::NotBooted => write!(f, "NotBooted"),
            BootState::Booting => write!(f, "Booting"),
            BootState::Ready => write!(f, "Ready"),
            BootState::BootFailed => write!(f, "BootFailed"),
        }
    }
}

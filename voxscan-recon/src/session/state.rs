use std::fmt;

/// Lifecycle of a scan session.
///
/// `Idle -> Scanning -> Processing -> ViewingResult`, and back to `Idle` on
/// reset from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Scanning,
    Processing,
    ViewingResult,
}

impl SessionState {
    /// Whether the final point set (rather than the live preview) is what
    /// should be drawn.
    pub fn shows_result(self) -> bool {
        self != SessionState::Scanning
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Scanning => "scanning",
            SessionState::Processing => "processing",
            SessionState::ViewingResult => "viewing result",
        };
        f.write_str(name)
    }
}

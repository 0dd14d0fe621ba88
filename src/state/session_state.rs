/// Crawl session lifecycle states
///
/// ```text
/// INIT -> RUNNING -> COMPLETE | LIMIT_REACHED | INTERRUPTED -> CHECKPOINT_SAVE -> TERMINATED
/// ```
use std::fmt;

/// Represents the current state of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Configuration loaded; restoring a checkpoint or seeding
    Init,

    /// Processing the frontier one URL per cycle
    Running,

    // ===== Terminal Outcomes =====
    /// The frontier is empty
    Complete,

    /// The page cap was hit
    LimitReached,

    /// A termination signal or fatal error stopped the loop
    Interrupted,

    // ===== Shutdown =====
    /// Writing the final checkpoint
    CheckpointSave,

    /// The session is finished; state may be discarded
    Terminated,
}

impl SessionState {
    /// Returns true for the three states that end the RUNNING loop
    pub fn is_outcome(&self) -> bool {
        matches!(self, Self::Complete | Self::LimitReached | Self::Interrupted)
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match (self, next) {
            (Self::Init, Self::Running) => true,
            // A fatal error during INIT still ends through the normal shutdown path
            (Self::Init, Self::Interrupted) => true,
            (Self::Running, next) => next.is_outcome(),
            (state, Self::CheckpointSave) => state.is_outcome(),
            (Self::CheckpointSave, Self::Terminated) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::LimitReached => "LIMIT_REACHED",
            Self::Interrupted => "INTERRUPTED",
            Self::CheckpointSave => "CHECKPOINT_SAVE",
            Self::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use std::fmt::Display;

/// Where the player is within the current exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No countdown. Waiting for a repetition series to be confirmed.
    Idle,
    Work { remaining: u32 },
    Rest { remaining: u32 },
    /// Terminal.
    Done,
}

impl Phase {
    pub fn seconds_left(&self) -> u32 {
        match *self {
            Phase::Work { remaining } | Phase::Rest { remaining } => remaining,
            Phase::Idle | Phase::Done => 0,
        }
    }

    /// True for the phases a tick source drives.
    pub fn is_counting(&self) -> bool {
        matches!(self, Phase::Work { .. } | Phase::Rest { .. })
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Phase::Done)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Work { .. } => "work",
            Phase::Rest { .. } => "rest",
            Phase::Done => "done",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

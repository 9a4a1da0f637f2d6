use mania_data::Record;

use crate::gameplay::{JudgmentResult, Stats};
use crate::time::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing scheduled; ticks and input have no judgment effect.
    Idle,
    Countdown,
    Playing,
    Ended,
}

/// Everything an observer (UI, persistence) can learn from a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatsChanged(Stats),
    SongLoaded {
        title: String,
        artist: String,
        duration: Millis,
    },
    ProgressChanged {
        current: Millis,
        total: Millis,
    },
    Judged(JudgmentResult),
    PhaseChanged(Phase),
    /// Emitted once per completed play; never after a reset.
    SessionEnded(Record),
}

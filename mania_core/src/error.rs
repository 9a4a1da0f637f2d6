use std::path::PathBuf;

use thiserror::Error;

use crate::session::Phase;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("judge window must satisfy 0 <= perfect < great < good < miss (got {perfect}/{great}/{good}/{miss})")]
    JudgeWindowOrder {
        perfect: i64,
        great: i64,
        good: i64,
        miss: i64,
    },

    #[error("pre-game delay must be >= 0 (got {0} ms)")]
    NegativePreGameDelay(i64),

    #[error("scroll speed must be a positive finite number (got {0})")]
    ScrollSpeed(f64),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no audio source could be resolved for {title:?} (looked in {dir:?})")]
    AudioUnavailable { title: String, dir: Option<PathBuf> },

    #[error("config can only change between sessions (current phase: {0:?})")]
    ConfigLocked(Phase),
}

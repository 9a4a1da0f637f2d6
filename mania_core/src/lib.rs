//! Timing and judgment core for a four-lane rhythm game.
//!
//! Data flow: [`chart::parse_chart`] builds a sorted note timeline, a
//! [`session::Session`] drives it tick by tick through the [`time::Clock`] and
//! the [`gameplay::JudgmentEngine`], and observers read [`session::SessionEvent`]s.

pub mod audio;
pub mod chart;
pub mod config;
pub mod error;
pub mod gameplay;
pub mod input;
pub mod session;
pub mod time;

pub use error::{ConfigError, SessionError};
pub use mania_data::{Grade, Record};

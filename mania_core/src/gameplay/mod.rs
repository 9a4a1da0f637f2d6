pub mod judge;
pub mod score;

pub use judge::{Feedback, JudgmentEngine, JudgmentResult};
pub use score::{JudgmentLabel, ScoreState, Severity, Stats};

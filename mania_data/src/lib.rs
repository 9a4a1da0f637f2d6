pub mod history;
pub mod record;

pub use history::HistoryStore;
pub use record::{chart_hash, history_id, Grade, Record, RecordJudgment, MAX_SCORE};

use chrono::NaiveDateTime;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

pub const MAX_SCORE: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
}

impl Grade {
    /// Letter grade for a normalized score. Depends on nothing but `score`.
    pub fn from_score(score: u32) -> Self {
        if score >= 970_000 {
            Grade::S
        } else if score >= 900_000 {
            Grade::A
        } else if score >= 800_000 {
            Grade::B
        } else {
            Grade::C
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The thresholds in effect when a record was set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordJudgment {
    pub perfect: i64,
    pub miss: i64,
}

/// Final snapshot of one finished play. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub hash: String,
    pub score: u32,
    pub acc: f64,
    pub combo: u32,
    pub grade: Grade,
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
    pub date: NaiveDateTime,
    pub judgment: RecordJudgment,
}

/// Chart identity string records are grouped under.
pub fn chart_hash(artist: &str, title: &str, version: &str) -> String {
    format!("{artist}{title}{version}")
}

/// File-system safe identifier derived from a chart hash (lowercase hex MD5).
pub fn history_id(hash: &str) -> String {
    format!("{:x}", Md5::digest(hash.as_bytes()))
}

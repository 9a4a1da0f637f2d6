use mania_data::{Grade, MAX_SCORE};

/// Outcome of one judgable event, head or tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JudgmentLabel {
    Perfect,
    Great,
    Good,
    /// Head caught between the good and miss thresholds: note consumed, counted as a miss.
    Bad,
    Miss,
    MissOverhold,
    MissEarlyRelease,
}

/// Colour class for transient feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Perfect,
    Great,
    Good,
    Bad,
    Miss,
}

impl JudgmentLabel {
    pub fn weight(self) -> u32 {
        match self {
            JudgmentLabel::Perfect => 300,
            JudgmentLabel::Great => 200,
            JudgmentLabel::Good => 50,
            _ => 0,
        }
    }

    pub fn accuracy(self) -> f64 {
        match self {
            JudgmentLabel::Perfect => 1.0,
            JudgmentLabel::Great => 0.8,
            JudgmentLabel::Good => 0.5,
            _ => 0.0,
        }
    }

    pub fn breaks_combo(self) -> bool {
        self.weight() == 0
    }

    /// Whether the judgment consumed a note through player input (as opposed to a timeout).
    pub fn is_hit(self) -> bool {
        matches!(
            self,
            JudgmentLabel::Perfect | JudgmentLabel::Great | JudgmentLabel::Good | JudgmentLabel::Bad
        )
    }

    pub fn severity(self) -> Severity {
        match self {
            JudgmentLabel::Perfect => Severity::Perfect,
            JudgmentLabel::Great => Severity::Great,
            JudgmentLabel::Good => Severity::Good,
            JudgmentLabel::Bad => Severity::Bad,
            JudgmentLabel::Miss | JudgmentLabel::MissOverhold | JudgmentLabel::MissEarlyRelease => {
                Severity::Miss
            }
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            JudgmentLabel::Perfect => "PERFECT",
            JudgmentLabel::Great => "GREAT",
            JudgmentLabel::Good => "GOOD",
            JudgmentLabel::Bad => "BAD",
            JudgmentLabel::Miss => "MISS",
            JudgmentLabel::MissOverhold => "MISS (Overhold)",
            JudgmentLabel::MissEarlyRelease => "MISS (Early)",
        }
    }
}

/// Snapshot handed to observers after every change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub score: u32,
    pub accuracy: f64,
}

/// Running score for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreState {
    raw_score: u64,
    max_possible_score: u64,
    score: u32,
    combo: u32,
    max_combo: u32,
    total_hits: u32,
    total_acc_weight: f64,
    perfect: u32,
    great: u32,
    good: u32,
    miss: u32,
}

impl ScoreState {
    pub fn new(max_possible_score: u64) -> Self {
        Self {
            raw_score: 0,
            max_possible_score: max_possible_score.max(1),
            score: 0,
            combo: 0,
            max_combo: 0,
            total_hits: 0,
            total_acc_weight: 0.0,
            perfect: 0,
            great: 0,
            good: 0,
            miss: 0,
        }
    }

    /// Books one judgment: combo, counters, accuracy and score.
    pub fn record(&mut self, label: JudgmentLabel) {
        if label.is_hit() {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        }
        self.total_hits += 1;
        self.total_acc_weight += label.accuracy();

        match label {
            JudgmentLabel::Perfect => self.perfect += 1,
            JudgmentLabel::Great => self.great += 1,
            JudgmentLabel::Good => self.good += 1,
            JudgmentLabel::Bad
            | JudgmentLabel::Miss
            | JudgmentLabel::MissOverhold
            | JudgmentLabel::MissEarlyRelease => self.miss += 1,
        }
        if label.breaks_combo() {
            self.combo = 0;
        }

        self.apply_weight(label.weight());
    }

    /// Adds `weight` to the raw score and renormalizes to `0..=MAX_SCORE`.
    pub fn apply_weight(&mut self, weight: u32) {
        self.raw_score += u64::from(weight);
        let normalized = self.raw_score.saturating_mul(u64::from(MAX_SCORE)) / self.max_possible_score;
        self.score = normalized.min(u64::from(MAX_SCORE)) as u32;
    }

    /// 100 until the first judgment, then the mean accuracy fraction as a percentage.
    pub fn accuracy_percent(&self) -> f64 {
        if self.total_hits == 0 {
            100.0
        } else {
            self.total_acc_weight / f64::from(self.total_hits) * 100.0
        }
    }

    pub fn grade(&self) -> Grade {
        Grade::from_score(self.score)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn raw_score(&self) -> u64 {
        self.raw_score
    }

    pub fn max_possible_score(&self) -> u64 {
        self.max_possible_score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn total_hits(&self) -> u32 {
        self.total_hits
    }

    pub fn stats(&self) -> Stats {
        Stats {
            perfect: self.perfect,
            great: self.great,
            good: self.good,
            miss: self.miss,
            combo: self.combo,
            max_combo: self.max_combo,
            score: self.score,
            accuracy: self.accuracy_percent(),
        }
    }
}

use crate::chart::{Note, NoteKind, NoteState, LANES};
use crate::config::JudgeWindow;
use crate::gameplay::score::{JudgmentLabel, ScoreState};
use crate::time::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgmentResult {
    pub note_index: usize,
    pub column: usize,
    pub label: JudgmentLabel,
    pub weight: u32,
    /// `logical_time - target`; negative means early.
    pub delta: Millis,
}

/// Most recent judgment, for transient on-screen feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub label: JudgmentLabel,
    /// Logical time of the judgment; display timers restart from here.
    pub at: Millis,
}

/// Owns the note timeline and score for one session and runs the per-note state machine.
#[derive(Debug, Clone)]
pub struct JudgmentEngine {
    notes: Vec<Note>,
    window: JudgeWindow,
    score: ScoreState,
    /// Note indices per lane, in timeline order.
    lane_notes: [Vec<usize>; LANES],
    /// Per lane, position in `lane_notes` before which no note is `Pending`.
    lane_cursor: [usize; LANES],
    /// Per lane, holds whose head was caught, oldest first.
    holding: [Vec<usize>; LANES],
    last_judgment: Option<Feedback>,
}

impl JudgmentEngine {
    /// `notes` must be sorted by head time, as [`crate::chart::Chart`] guarantees.
    pub fn new(notes: Vec<Note>, window: JudgeWindow) -> Self {
        let judgable: u64 = notes.iter().map(|n| u64::from(n.judgable_events())).sum();
        let mut lane_notes: [Vec<usize>; LANES] = Default::default();
        for (idx, note) in notes.iter().enumerate() {
            if let Some(lane) = lane_notes.get_mut(note.column) {
                lane.push(idx);
            } else {
                log::warn!("note {idx} has out-of-range column {}; it will never be judged", note.column);
            }
        }

        let mut engine = Self {
            notes,
            window,
            score: ScoreState::new(judgable.saturating_mul(u64::from(crate::chart::MAX_WEIGHT))),
            lane_notes,
            lane_cursor: [0; LANES],
            holding: Default::default(),
            last_judgment: None,
        };
        engine.reset();
        engine
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    pub fn window(&self) -> JudgeWindow {
        self.window
    }

    pub fn last_judgment(&self) -> Option<Feedback> {
        self.last_judgment
    }

    /// Note indices currently held down in `column`.
    pub fn holding(&self, column: usize) -> &[usize] {
        self.holding.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every note back to `Pending` and every counter to zero.
    pub fn reset(&mut self) {
        for note in &mut self.notes {
            note.state = NoteState::Pending;
        }
        self.score = ScoreState::new(self.score.max_possible_score());
        self.lane_cursor = [0; LANES];
        for lane in &mut self.holding {
            lane.clear();
        }
        self.last_judgment = None;
    }

    /// Press in `column` at logical time `now`: judges the closest pending head within the miss window.
    pub fn check_hit(&mut self, column: usize, now: Millis) -> Option<JudgmentResult> {
        let lane = self.lane_notes.get(column)?;
        let miss = self.window.miss;

        let mut target: Option<(usize, Millis)> = None;
        for &idx in &lane[self.lane_cursor[column]..] {
            let note = &self.notes[idx];
            if note.time.saturating_sub(now) > miss {
                // later heads are only further away
                break;
            }
            if note.state != NoteState::Pending {
                continue;
            }
            let diff = note.time.saturating_sub(now).saturating_abs();
            if diff <= miss && target.map_or(true, |(_, best)| diff < best) {
                target = Some((idx, diff));
            }
        }

        let (idx, diff) = target?;
        let label = self.classify_head(diff);
        let note = &mut self.notes[idx];
        let delta = now.saturating_sub(note.time);
        match note.kind {
            NoteKind::Tap => note.state = NoteState::Hit,
            NoteKind::Hold => {
                note.state = NoteState::Holding;
                self.holding[column].push(idx);
            }
        }
        self.advance_cursor(column);
        Some(self.settle(idx, label, delta, now))
    }

    /// Release in `column` at logical time `now`: judges the tail of the oldest held note.
    pub fn check_release(&mut self, column: usize, now: Millis) -> Option<JudgmentResult> {
        let held = self.holding.get_mut(column)?;
        if held.is_empty() {
            return None;
        }
        let idx = held.remove(0);

        let note = &mut self.notes[idx];
        let delta = now.saturating_sub(note.end_time);
        let label = if now < note.end_time.saturating_sub(self.window.miss) {
            note.state = NoteState::Missed;
            JudgmentLabel::MissEarlyRelease
        } else {
            note.state = NoteState::Completed;
            classify_tail(self.window, delta.saturating_abs())
        };
        Some(self.settle(idx, label, delta, now))
    }

    /// Timeouts at logical time `now`: unanswered heads and overheld tails become misses.
    pub fn check_misses(&mut self, now: Millis) -> Vec<JudgmentResult> {
        let miss = self.window.miss;
        let mut expired: Vec<(usize, JudgmentLabel, Millis)> = Vec::new();

        for lane in 0..LANES {
            for &idx in &self.lane_notes[lane][self.lane_cursor[lane]..] {
                let note = &self.notes[idx];
                if note.state != NoteState::Pending {
                    continue;
                }
                if now > note.time.saturating_add(miss) {
                    expired.push((idx, JudgmentLabel::Miss, now.saturating_sub(note.time)));
                } else {
                    break;
                }
            }

            self.holding[lane].retain(|&idx| {
                let note = &self.notes[idx];
                if now > note.end_time.saturating_add(miss) {
                    expired.push((idx, JudgmentLabel::MissOverhold, now.saturating_sub(note.end_time)));
                    false
                } else {
                    true
                }
            });
        }

        expired.sort_by_key(|&(idx, _, _)| idx);
        let mut results = Vec::with_capacity(expired.len());
        for (idx, label, delta) in expired {
            self.notes[idx].state = NoteState::Missed;
            results.push(self.settle(idx, label, delta, now));
        }
        for lane in 0..LANES {
            self.advance_cursor(lane);
        }
        results
    }

    fn classify_head(&self, diff: Millis) -> JudgmentLabel {
        let w = self.window;
        if diff <= w.perfect {
            JudgmentLabel::Perfect
        } else if diff <= w.great {
            JudgmentLabel::Great
        } else if diff <= w.good {
            JudgmentLabel::Good
        } else {
            JudgmentLabel::Bad
        }
    }

    fn settle(&mut self, idx: usize, label: JudgmentLabel, delta: Millis, now: Millis) -> JudgmentResult {
        self.score.record(label);
        self.last_judgment = Some(Feedback { label, at: now });
        let result = JudgmentResult {
            note_index: idx,
            column: self.notes[idx].column,
            label,
            weight: label.weight(),
            delta,
        };
        log::debug!("note {idx} -> {:?} (delta {delta} ms)", label);
        result
    }

    fn advance_cursor(&mut self, column: usize) {
        let lane = &self.lane_notes[column];
        let mut cursor = self.lane_cursor[column];
        while cursor < lane.len() && self.notes[lane[cursor]].state != NoteState::Pending {
            cursor += 1;
        }
        self.lane_cursor[column] = cursor;
    }
}

/// Tail judgment has two tiers and never drops below Good once past the early-release guard.
fn classify_tail(window: JudgeWindow, diff: Millis) -> JudgmentLabel {
    if diff <= window.perfect {
        JudgmentLabel::Perfect
    } else if diff <= window.good {
        JudgmentLabel::Great
    } else {
        JudgmentLabel::Good
    }
}

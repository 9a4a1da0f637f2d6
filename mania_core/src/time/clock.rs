use super::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPhase {
    Stopped,
    Countdown,
    Playing,
}

/// One frozen reading. Every decision made for a tick or input event uses the same sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    pub logical_time: Millis,
    pub phase: ClockPhase,
    /// The playing phase began with this sample; the transport should start now.
    pub entered_playing: bool,
}

/// Two-phase logical clock.
///
/// During the countdown logical time runs from `-(pre_game_delay + audio_offset)`
/// up to `-audio_offset`; the playing phase is rebased at the exact instant the
/// countdown ends, so logical time is continuous across the switch.
#[derive(Debug, Clone)]
pub struct Clock {
    phase: ClockPhase,
    phase_start: Millis,
    pre_game_delay: Millis,
    audio_offset: Millis,
    frozen: Millis,
}

impl Clock {
    pub fn new(pre_game_delay: Millis, audio_offset: Millis) -> Self {
        Self {
            phase: ClockPhase::Stopped,
            phase_start: 0,
            pre_game_delay: pre_game_delay.max(0),
            audio_offset,
            frozen: 0,
        }
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn start_countdown(&mut self, now: Millis) {
        self.phase = ClockPhase::Countdown;
        self.phase_start = now;
        self.frozen = self.countdown_time(now);
    }

    /// Stops advancing. The last frozen reading stays readable.
    pub fn stop(&mut self) {
        self.phase = ClockPhase::Stopped;
    }

    pub fn reset(&mut self) {
        self.phase = ClockPhase::Stopped;
        self.phase_start = 0;
        self.frozen = 0;
    }

    /// Advances the phase if the countdown has elapsed and freezes logical time at `now`.
    pub fn sample(&mut self, now: Millis) -> ClockSample {
        let mut entered_playing = false;
        if self.phase == ClockPhase::Countdown && now - self.phase_start >= self.pre_game_delay {
            self.phase = ClockPhase::Playing;
            self.phase_start += self.pre_game_delay;
            entered_playing = true;
        }

        match self.phase {
            ClockPhase::Stopped => {}
            ClockPhase::Countdown => self.frozen = self.countdown_time(now),
            ClockPhase::Playing => self.frozen = self.playing_time(now),
        }

        ClockSample {
            logical_time: self.frozen,
            phase: self.phase,
            entered_playing,
        }
    }

    /// Logical time captured by the last [`sample`](Self::sample).
    pub fn logical_time(&self) -> Millis {
        self.frozen
    }

    /// Unfrozen logical time at `now` for smooth rendering. Does not advance the phase.
    pub fn peek(&self, now: Millis) -> Millis {
        match self.phase {
            ClockPhase::Stopped => self.frozen,
            ClockPhase::Countdown if now - self.phase_start < self.pre_game_delay => {
                self.countdown_time(now)
            }
            ClockPhase::Countdown => now - (self.phase_start + self.pre_game_delay) - self.audio_offset,
            ClockPhase::Playing => self.playing_time(now),
        }
    }

    fn countdown_time(&self, now: Millis) -> Millis {
        (now - self.phase_start) - self.pre_game_delay - self.audio_offset
    }

    fn playing_time(&self, now: Millis) -> Millis {
        (now - self.phase_start) - self.audio_offset
    }
}

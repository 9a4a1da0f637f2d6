mod events;

use std::path::PathBuf;

use crossbeam_channel::{unbounded, Receiver, Sender};
use mania_data::{Record, RecordJudgment};

pub use events::{Phase, SessionEvent};

use crate::audio::{PlaybackState, TransportHandle};
use crate::chart::{Chart, ChartMeta, LoadedChart, LANES};
use crate::config::{GameConfig, MissingAudioPolicy};
use crate::error::SessionError;
use crate::gameplay::{Feedback, JudgmentEngine, JudgmentResult, Stats};
use crate::input::events::InputEvent;
use crate::input::InputQueue;
use crate::time::{Clock, Millis};

/// Logical time past the chart duration after which the session ends.
pub const END_GRACE_MS: Millis = 1000;

/// A transport stop report only ends the session past this logical time.
pub const STOP_GUARD_MS: Millis = 1000;

/// One play of one chart: clock, note timeline, score and config, driven by an external scheduler.
///
/// All mutation happens inside [`tick`](Self::tick) or an input handler. Each call
/// samples the clock exactly once and makes every decision against that sample.
pub struct Session {
    config: GameConfig,
    transport: TransportHandle,
    events: Sender<SessionEvent>,
    clock: Clock,
    engine: JudgmentEngine,
    meta: ChartMeta,
    phase: Phase,
    audio: Option<PathBuf>,
    audio_dir: Option<PathBuf>,
    estimated_duration: Millis,
    duration: Millis,
    progress: Millis,
    pressed: [bool; LANES],
    record: Option<Record>,
}

impl Session {
    pub fn new(
        config: GameConfig,
        transport: TransportHandle,
    ) -> Result<(Self, Receiver<SessionEvent>), SessionError> {
        config.validate()?;
        let (tx, rx) = unbounded();
        let session = Self {
            clock: Clock::new(config.pre_game_delay, config.audio_offset),
            engine: JudgmentEngine::new(Vec::new(), config.judge_window),
            config,
            transport,
            events: tx,
            meta: ChartMeta::default(),
            phase: Phase::Idle,
            audio: None,
            audio_dir: None,
            estimated_duration: 0,
            duration: 0,
            progress: 0,
            pressed: [false; LANES],
            record: None,
        };
        Ok((session, rx))
    }

    /// Loads a chart read from disk, resolving its audio file next to it.
    pub fn load_chart(&mut self, loaded: LoadedChart, now: Millis) -> Result<(), SessionError> {
        let audio = loaded.audio_path();
        self.audio_dir = Some(loaded.base_dir);
        self.install(loaded.chart, audio);
        self.begin(now)
    }

    /// Discards the current play, installs `chart` and starts its countdown at `now`.
    ///
    /// With no audio and a `Refuse` policy the chart stays loaded but the session stays idle.
    pub fn load(&mut self, chart: Chart, audio: Option<PathBuf>, now: Millis) -> Result<(), SessionError> {
        self.audio_dir = None;
        self.install(chart, audio);
        self.begin(now)
    }

    /// Plays the loaded chart again from the start of the countdown.
    pub fn restart(&mut self, now: Millis) -> Result<(), SessionError> {
        self.reset();
        self.begin(now)
    }

    /// Cancels the current play. Every note returns to `Pending`, every counter to zero,
    /// and no record is produced.
    pub fn reset(&mut self) {
        if self.audio.is_some() {
            self.transport.stop();
        }
        self.clock.reset();
        self.engine.reset();
        self.progress = 0;
        self.pressed = [false; LANES];
        self.record = None;
        self.set_phase(Phase::Idle);

        self.emit(SessionEvent::StatsChanged(self.engine.score().stats()));
        self.emit(SessionEvent::ProgressChanged { current: 0, total: 1 });
    }

    /// Swaps the config. Only allowed while no play is running.
    pub fn set_config(&mut self, config: GameConfig) -> Result<(), SessionError> {
        if self.is_running() {
            return Err(SessionError::ConfigLocked(self.phase));
        }
        config.validate()?;
        self.engine = JudgmentEngine::new(self.engine.notes().to_vec(), config.judge_window);
        self.clock = Clock::new(config.pre_game_delay, config.audio_offset);
        self.config = config;
        Ok(())
    }

    /// One scheduler step at wall time `now`.
    pub fn tick(&mut self, now: Millis) {
        if !self.is_running() {
            return;
        }

        if let Some(reported) = self.transport.poll_duration_change() {
            self.duration = self.estimated_duration.max(reported);
            log::debug!("transport reported duration {reported} ms, using {} ms", self.duration);
            self.emit_song_loaded();
        }

        let t = self.sample_clock(now);

        let results = self.engine.check_misses(t);
        if !results.is_empty() {
            for result in results {
                self.emit(SessionEvent::Judged(result));
            }
            self.emit_stats();
        }

        if self.phase != Phase::Playing {
            return;
        }

        self.progress = t.clamp(0, self.duration);
        self.emit(SessionEvent::ProgressChanged {
            current: self.progress,
            total: self.duration,
        });

        let past_end = t > self.duration.saturating_add(END_GRACE_MS);
        let transport_stopped = self.audio.is_some()
            && self.transport.playback_state() == PlaybackState::Stopped
            && t > STOP_GUARD_MS;
        if past_end || transport_stopped {
            self.finish(t);
        }
    }

    pub fn on_press(&mut self, column: usize, now: Millis) -> Option<JudgmentResult> {
        *self.pressed.get_mut(column)? = true;
        if !self.is_running() {
            return None;
        }
        let t = self.sample_clock(now);
        let result = self.engine.check_hit(column, t)?;
        self.emit(SessionEvent::Judged(result));
        self.emit_stats();
        Some(result)
    }

    pub fn on_release(&mut self, column: usize, now: Millis) -> Option<JudgmentResult> {
        *self.pressed.get_mut(column)? = false;
        if !self.is_running() {
            return None;
        }
        let t = self.sample_clock(now);
        let result = self.engine.check_release(column, t)?;
        self.emit(SessionEvent::Judged(result));
        self.emit_stats();
        Some(result)
    }

    /// Routes a key event through the key mapping. Repeated presses of a held key are ignored.
    pub fn handle_input(&mut self, event: InputEvent) -> Option<JudgmentResult> {
        let column = self.config.column_for_key(event.key)?;
        match (event.pressed, self.pressed[column]) {
            (true, false) => self.on_press(column, event.timestamp),
            (false, true) => self.on_release(column, event.timestamp),
            _ => None,
        }
    }

    /// Handles every queued event stamped at or before `now`, oldest first.
    pub fn drain_input(&mut self, queue: &mut InputQueue, now: Millis) -> Vec<JudgmentResult> {
        queue
            .drain_until(now)
            .into_iter()
            .filter_map(|event| self.handle_input(event))
            .collect()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Countdown | Phase::Playing)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn meta(&self) -> &ChartMeta {
        &self.meta
    }

    pub fn engine(&self) -> &JudgmentEngine {
        &self.engine
    }

    pub fn stats(&self) -> Stats {
        self.engine.score().stats()
    }

    pub fn last_judgment(&self) -> Option<Feedback> {
        self.engine.last_judgment()
    }

    /// Logical time frozen by the last tick or input event.
    pub fn logical_time(&self) -> Millis {
        self.clock.logical_time()
    }

    /// Unfrozen logical time for rendering between ticks.
    pub fn visual_time(&self, now: Millis) -> Millis {
        self.clock.peek(now)
    }

    pub fn duration(&self) -> Millis {
        self.duration
    }

    /// `(current, total)` as last reported to observers.
    pub fn progress(&self) -> (Millis, Millis) {
        (self.progress, self.duration)
    }

    pub fn pressed_columns(&self) -> [bool; LANES] {
        self.pressed
    }

    pub fn audio_source(&self) -> Option<&PathBuf> {
        self.audio.as_ref()
    }

    /// How far the transport position is ahead of the clock, while audio is playing.
    pub fn audio_drift(&self) -> Option<Millis> {
        if self.phase != Phase::Playing
            || self.audio.is_none()
            || self.transport.playback_state() != PlaybackState::Playing
        {
            return None;
        }
        let elapsed = self.clock.logical_time() + self.config.audio_offset;
        Some(self.transport.position() - elapsed)
    }

    /// Final record of the last completed play.
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    fn install(&mut self, chart: Chart, audio: Option<PathBuf>) {
        self.reset();
        self.estimated_duration = chart.estimated_duration();
        self.duration = self.estimated_duration;
        self.engine = JudgmentEngine::new(chart.notes, self.config.judge_window);
        self.meta = chart.meta;
        self.audio = audio;

        match &self.audio {
            Some(path) => self.transport.set_source(path.clone()),
            None => log::warn!("no audio resolved for {:?}", self.meta.title),
        }
    }

    fn begin(&mut self, now: Millis) -> Result<(), SessionError> {
        if self.audio.is_none() && self.config.missing_audio == MissingAudioPolicy::Refuse {
            return Err(SessionError::AudioUnavailable {
                title: self.meta.title.clone(),
                dir: self.audio_dir.clone(),
            });
        }

        self.clock = Clock::new(self.config.pre_game_delay, self.config.audio_offset);
        self.clock.start_countdown(now);
        self.set_phase(Phase::Countdown);
        log::info!(
            "loaded {:?} by {:?} [{}]: {} notes, countdown {} ms",
            self.meta.title,
            self.meta.artist,
            self.meta.version,
            self.engine.notes().len(),
            self.config.pre_game_delay
        );
        self.emit_song_loaded();
        Ok(())
    }

    /// Samples the clock once and starts playback if the countdown just ended.
    fn sample_clock(&mut self, now: Millis) -> Millis {
        let sample = self.clock.sample(now);
        if sample.entered_playing {
            if self.audio.is_some() {
                self.transport.play();
            }
            log::info!("countdown over, playing {:?}", self.meta.title);
            self.set_phase(Phase::Playing);
        }
        sample.logical_time
    }

    fn finish(&mut self, t: Millis) {
        self.clock.stop();
        if self.audio.is_some() {
            self.transport.stop();
        }

        let score = self.engine.score();
        let window = self.config.judge_window;
        let stats = score.stats();
        let record = Record {
            hash: self.meta.identity(),
            score: score.score(),
            acc: score.accuracy_percent(),
            combo: score.max_combo(),
            grade: score.grade(),
            perfect: stats.perfect,
            great: stats.great,
            good: stats.good,
            miss: stats.miss,
            date: chrono::Local::now().naive_local(),
            judgment: RecordJudgment {
                perfect: window.perfect,
                miss: window.miss,
            },
        };
        log::info!(
            "session ended at {t} ms: {} {} ({:.2}%)",
            record.grade,
            record.score,
            record.acc
        );

        self.emit(SessionEvent::SessionEnded(record.clone()));
        self.record = Some(record);
        self.set_phase(Phase::Ended);
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit(SessionEvent::PhaseChanged(phase));
        }
    }

    fn emit_stats(&self) {
        self.emit(SessionEvent::StatsChanged(self.engine.score().stats()));
    }

    fn emit_song_loaded(&self) {
        self.emit(SessionEvent::SongLoaded {
            title: self.meta.title.clone(),
            artist: self.meta.artist.clone(),
            duration: self.duration,
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

use std::cell::Cell;
use std::thread;
use std::time::Duration;

use anyhow::bail;
use mania_core::audio::transport;
use mania_core::chart::LoadedChart;
use mania_core::config::{GameConfig, MissingAudioPolicy};
use mania_core::input::events::InputEvent;
use mania_core::input::InputQueue;
use mania_core::session::{Phase, Session, SessionEvent};
use mania_core::time::{Millis, MonotonicSource, TimeSource};
use mania_data::Record;

/// Wall time that moves forward one scheduler step at a time.
trait Pacer: TimeSource {
    fn wait(&self, step: Millis);
}

/// Simulated wall time from 0; each step advances it instantly.
struct SteppedSource {
    now: Cell<Millis>,
}

impl TimeSource for SteppedSource {
    fn now(&self) -> Millis {
        self.now.get()
    }
}

impl Pacer for SteppedSource {
    fn wait(&self, step: Millis) {
        self.now.set(self.now.get() + step);
    }
}

impl Pacer for MonotonicSource {
    fn wait(&self, step: Millis) {
        thread::sleep(Duration::from_millis(step.max(0) as u64));
    }
}

/// Plays `loaded` with no audio, pressing every head and releasing every tail on time.
///
/// By default wall time is simulated in steps of `tick_ms`, so the run is deterministic
/// and instant. With `realtime` the session is driven by the monotonic clock instead.
pub fn run(loaded: LoadedChart, config: GameConfig, tick_ms: Millis, realtime: bool) -> anyhow::Result<Record> {
    if realtime {
        play(loaded, config, tick_ms, &MonotonicSource::new())
    } else {
        play(loaded, config, tick_ms, &SteppedSource { now: Cell::new(0) })
    }
}

fn play(loaded: LoadedChart, mut config: GameConfig, tick_ms: Millis, pacer: &impl Pacer) -> anyhow::Result<Record> {
    config.missing_audio = MissingAudioPolicy::Silent;
    let start = pacer.now();
    let shift = start + config.pre_game_delay + config.audio_offset;

    let mut queue = InputQueue::new();
    for note in &loaded.chart.notes {
        let Some(&key) = config.key_mapping.get(note.column) else {
            continue;
        };
        queue.push(InputEvent::press(note.time.saturating_add(shift), key));
        queue.push(InputEvent::release(note.end_time.saturating_add(shift), key));
    }

    let (handle, _endpoint) = transport();
    let (mut session, events) = Session::new(config, handle)?;
    session.load(loaded.chart, None, start)?;

    while session.is_running() {
        pacer.wait(tick_ms);
        let now = pacer.now();
        session.drain_input(&mut queue, now);
        session.tick(now);

        for event in events.try_iter() {
            if let SessionEvent::Judged(result) = event {
                log::debug!(
                    "{now:>8} ms  lane {} note {:>4}  {}",
                    result.column,
                    result.note_index,
                    result.label.text()
                );
            }
        }
    }

    match (session.phase(), session.record()) {
        (Phase::Ended, Some(record)) => Ok(record.clone()),
        (phase, _) => bail!("session stopped in {phase:?} without a record"),
    }
}

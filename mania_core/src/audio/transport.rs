//! Contract with the external audio engine.
//!
//! The session holds a [`TransportHandle`]; the engine owns the matching
//! [`TransportEndpoint`], receives commands from it and reports position,
//! playback state and duration on its own schedule.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF64;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::time::Millis;

const DURATION_UNKNOWN: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    fn to_u8(self) -> u8 {
        match self {
            PlaybackState::Stopped => 0,
            PlaybackState::Playing => 1,
            PlaybackState::Paused => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            _ => PlaybackState::Stopped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    SetSource(PathBuf),
    Play,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    DurationChanged(Millis),
}

struct TransportStatus {
    position_ms: AtomicF64,
    state: AtomicU8,
    duration_ms: AtomicI64,
    source: Mutex<Option<PathBuf>>,
}

/// Session side of the transport.
#[derive(Clone)]
pub struct TransportHandle {
    commands: Sender<TransportCommand>,
    events: Receiver<TransportEvent>,
    status: Arc<TransportStatus>,
}

/// Engine side of the transport.
pub struct TransportEndpoint {
    commands: Receiver<TransportCommand>,
    events: Sender<TransportEvent>,
    status: Arc<TransportStatus>,
}

pub fn transport() -> (TransportHandle, TransportEndpoint) {
    let (command_tx, command_rx) = unbounded();
    let (event_tx, event_rx) = unbounded();
    let status = Arc::new(TransportStatus {
        position_ms: AtomicF64::new(0.0),
        state: AtomicU8::new(PlaybackState::Stopped.to_u8()),
        duration_ms: AtomicI64::new(DURATION_UNKNOWN),
        source: Mutex::new(None),
    });
    (
        TransportHandle {
            commands: command_tx,
            events: event_rx,
            status: status.clone(),
        },
        TransportEndpoint {
            commands: command_rx,
            events: event_tx,
            status,
        },
    )
}

impl TransportHandle {
    /// Sends are fire-and-forget; with no engine attached they are dropped.
    pub fn set_source(&self, path: PathBuf) {
        *self.status.source.lock() = Some(path.clone());
        self.status.duration_ms.store(DURATION_UNKNOWN, Ordering::Release);
        let _ = self.commands.send(TransportCommand::SetSource(path));
    }

    pub fn play(&self) {
        let _ = self.commands.send(TransportCommand::Play);
    }

    pub fn stop(&self) {
        let _ = self.commands.send(TransportCommand::Stop);
    }

    pub fn source(&self) -> Option<PathBuf> {
        self.status.source.lock().clone()
    }

    pub fn position(&self) -> Millis {
        self.status.position_ms.load(Ordering::Acquire).round() as Millis
    }

    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.status.state.load(Ordering::Acquire))
    }

    /// Duration last reported by the engine, if any.
    pub fn duration(&self) -> Option<Millis> {
        let d = self.status.duration_ms.load(Ordering::Acquire);
        (d >= 0).then_some(d)
    }

    /// Drains pending notifications and returns the newest duration among them.
    pub fn poll_duration_change(&self) -> Option<Millis> {
        self.events
            .try_iter()
            .map(|TransportEvent::DurationChanged(ms)| ms)
            .last()
    }
}

impl TransportEndpoint {
    pub fn next_command(&self) -> Option<TransportCommand> {
        self.commands.try_recv().ok()
    }

    pub fn report_position(&self, ms: f64) {
        self.status.position_ms.store(ms, Ordering::Release);
    }

    pub fn report_state(&self, state: PlaybackState) {
        self.status.state.store(state.to_u8(), Ordering::Release);
    }

    pub fn report_duration(&self, ms: Millis) {
        self.status.duration_ms.store(ms, Ordering::Release);
        let _ = self.events.send(TransportEvent::DurationChanged(ms));
    }
}

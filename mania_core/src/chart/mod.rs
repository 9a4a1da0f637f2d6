mod parser;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::time::Millis;

pub use parser::parse_chart;

/// Number of lanes on the playfield.
pub const LANES: usize = 4;

/// Weight of the best tier; the per-event ceiling used for normalization.
pub const MAX_WEIGHT: u32 = 300;

/// Extra time granted after the last note before the transport reports a real duration.
pub const DURATION_TAIL_MS: Millis = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteKind {
    Tap,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NoteState {
    #[default]
    Pending,
    /// Tap head consumed. Final for taps.
    Hit,
    /// Hold head consumed, tail not judged yet.
    Holding,
    Completed,
    Missed,
}

impl NoteState {
    /// No further input can judge a note in this state.
    pub fn is_settled(self) -> bool {
        matches!(self, NoteState::Hit | NoteState::Completed | NoteState::Missed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Lane, 0..LANES.
    pub column: usize,
    pub time: Millis,
    /// Equal to `time` for taps.
    pub end_time: Millis,
    pub kind: NoteKind,
    pub state: NoteState,
}

impl Note {
    pub fn tap(column: usize, time: Millis) -> Self {
        Self {
            column,
            time,
            end_time: time,
            kind: NoteKind::Tap,
            state: NoteState::Pending,
        }
    }

    pub fn hold(column: usize, time: Millis, end_time: Millis) -> Self {
        Self {
            column,
            time,
            end_time: end_time.max(time),
            kind: NoteKind::Hold,
            state: NoteState::Pending,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.kind == NoteKind::Hold
    }

    /// Head plus tail for holds, head only for taps.
    pub fn judgable_events(&self) -> u32 {
        match self.kind {
            NoteKind::Tap => 1,
            NoteKind::Hold => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartMeta {
    pub title: String,
    pub artist: String,
    pub version: String,
    pub audio_filename: Option<String>,
}

impl Default for ChartMeta {
    fn default() -> Self {
        Self {
            title: "Unknown Title".to_string(),
            artist: "Unknown Artist".to_string(),
            version: String::new(),
            audio_filename: None,
        }
    }
}

impl ChartMeta {
    /// Identity string used to group records of this chart.
    pub fn identity(&self) -> String {
        mania_data::chart_hash(&self.artist, &self.title, &self.version)
    }
}

/// Parsed chart: metadata plus a timeline sorted by head time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chart {
    pub meta: ChartMeta,
    pub notes: Vec<Note>,
}

impl Chart {
    pub fn new(meta: ChartMeta, mut notes: Vec<Note>) -> Self {
        // stable: equal heads keep input order
        notes.sort_by_key(|n| n.time);
        Self { meta, notes }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn judgable_events(&self) -> u64 {
        self.notes.iter().map(|n| u64::from(n.judgable_events())).sum()
    }

    /// Never below 1 so score normalization cannot divide by zero.
    pub fn max_possible_score(&self) -> u64 {
        self.judgable_events()
            .saturating_mul(u64::from(MAX_WEIGHT))
            .max(1)
    }

    pub fn tap_count(&self) -> usize {
        self.notes.iter().filter(|n| n.kind == NoteKind::Tap).count()
    }

    pub fn hold_count(&self) -> usize {
        self.notes.iter().filter(|n| n.kind == NoteKind::Hold).count()
    }

    pub fn last_end_time(&self) -> Millis {
        self.notes.iter().map(|n| n.end_time).max().unwrap_or(0)
    }

    /// Duration assumed until the audio transport reports the real one.
    pub fn estimated_duration(&self) -> Millis {
        self.last_end_time().saturating_add(DURATION_TAIL_MS)
    }
}

/// A chart together with the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedChart {
    pub chart: Chart,
    pub base_dir: PathBuf,
}

impl LoadedChart {
    pub fn audio_path(&self) -> Option<PathBuf> {
        resolve_audio(&self.base_dir, self.chart.meta.audio_filename.as_deref())
    }
}

pub fn read_chart_file(path: impl AsRef<Path>) -> anyhow::Result<LoadedChart> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("failed to read chart: {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let chart = parse_chart(&text);
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    log::debug!(
        "read chart {} ({} notes, {} judgable events)",
        path.display(),
        chart.notes.len(),
        chart.judgable_events()
    );
    Ok(LoadedChart { chart, base_dir })
}

/// Like [`read_chart_file`], but an unreadable source yields an empty chart.
pub fn load_chart_or_empty(path: impl AsRef<Path>) -> LoadedChart {
    let path = path.as_ref();
    match read_chart_file(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            log::warn!("{e:#}; continuing with an empty chart");
            LoadedChart {
                chart: Chart::default(),
                base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            }
        }
    }
}

const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "ogg", "wav"];

/// The declared audio file if it exists, else the first audio file (by name) in `base_dir`.
pub fn resolve_audio(base_dir: &Path, declared: Option<&str>) -> Option<PathBuf> {
    if let Some(name) = declared.filter(|n| !n.is_empty()) {
        let path = base_dir.join(name);
        if path.is_file() {
            return Some(path);
        }
        log::warn!("audio file {} not found, searching {}", path.display(), base_dir.display());
    }

    let entries = match fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("cannot read directory {}: {e}", base_dir.display());
            return None;
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_audio_extension(path))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

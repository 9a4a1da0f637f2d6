use super::{Chart, ChartMeta, Note, LANES};
use crate::time::Millis;

const HIT_OBJECTS_MARKER: &str = "[HitObjects]";
const HOLD_FLAG: i64 = 128;
const PLAYFIELD_WIDTH: f64 = 512.0;
/// Hit objects timed beyond this many ms from zero are dropped as malformed.
const MAX_NOTE_TIME: Millis = i32::MAX as Millis;

/// Parses chart text into metadata and a sorted note timeline.
///
/// Never fails: lines that cannot be read as hit objects are skipped, and text
/// without a `[HitObjects]` section yields an empty timeline.
pub fn parse_chart(src: &str) -> Chart {
    let mut meta = ChartMeta::default();
    let mut notes = Vec::new();
    let mut in_hit_objects = false;

    for (i, raw_line) in src.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = raw_line.trim_start_matches('\u{feff}').trim();

        if !in_hit_objects {
            if trimmed == HIT_OBJECTS_MARKER {
                in_hit_objects = true;
                continue;
            }
            parse_meta_line(&mut meta, trimmed);
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }
        match parse_hit_object(trimmed) {
            Some(note) => notes.push(note),
            None => log::debug!("skipping malformed hit object (line {line_no}): {trimmed}"),
        }
    }

    Chart::new(meta, notes)
}

fn parse_meta_line(meta: &mut ChartMeta, line: &str) {
    let Some((key, value)) = line.split_once(':') else {
        return;
    };
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Unicode variants follow the plain ones in practice; last one read wins.
    match key {
        "Title" | "TitleUnicode" => meta.title = value.to_string(),
        "Artist" | "ArtistUnicode" => meta.artist = value.to_string(),
        "Version" => meta.version = value.to_string(),
        "AudioFilename" => meta.audio_filename = Some(value.to_string()),
        _ => {}
    }
}

/// `x,y,time,type,hitSound[,endTime:extras]`
fn parse_hit_object(line: &str) -> Option<Note> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }

    let x: f64 = parts[0].parse().ok()?;
    let time = parse_millis(parts[2]).filter(|t| in_range(*t))?;
    let kind_bits = parts.get(3).and_then(|s| s.parse::<i64>().ok()).unwrap_or(0);
    let column = column_for_x(x);

    if kind_bits & HOLD_FLAG == 0 {
        return Some(Note::tap(column, time));
    }

    let end_time = match parts.get(5).and_then(|extra| extra.split(':').next()) {
        Some(field) => parse_millis(field).map_or(Some(time), |end| in_range(end).then_some(end))?,
        None => time,
    };
    Some(Note::hold(column, time, end_time))
}

fn in_range(t: Millis) -> bool {
    t.abs() <= MAX_NOTE_TIME
}

fn parse_millis(s: &str) -> Option<Millis> {
    let s = s.trim();
    s.parse::<Millis>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.floor() as Millis))
}

fn column_for_x(x: f64) -> usize {
    let lane = (x * LANES as f64 / PLAYFIELD_WIDTH).floor();
    lane.clamp(0.0, (LANES - 1) as f64) as usize
}

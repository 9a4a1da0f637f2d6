use std::fs;
use std::path::PathBuf;

use crossbeam_channel::Receiver;
use mania_core::audio::{transport, PlaybackState, TransportCommand, TransportEndpoint};
use mania_core::chart::{parse_chart, read_chart_file, Chart, ChartMeta, Note, NoteState};
use mania_core::config::{GameConfig, JudgeWindow, KeyCode, MissingAudioPolicy};
use mania_core::gameplay::JudgmentLabel;
use mania_core::input::events::InputEvent;
use mania_core::input::InputQueue;
use mania_core::session::{Phase, Session, SessionEvent};
use mania_core::{Grade, SessionError};

const DELAY: i64 = 2000;

fn config() -> GameConfig {
    GameConfig {
        pre_game_delay: DELAY,
        ..GameConfig::default()
    }
}

fn chart(notes: Vec<Note>) -> Chart {
    let meta = ChartMeta {
        title: "Song".to_string(),
        artist: "Band".to_string(),
        version: "Hard".to_string(),
        audio_filename: None,
    };
    Chart::new(meta, notes)
}

/// Session with silent audio, loaded at wall time 0. Logical time equals `now - DELAY`.
fn silent_session(notes: Vec<Note>) -> (Session, Receiver<SessionEvent>) {
    let (handle, _endpoint) = transport();
    let (mut session, rx) = Session::new(config(), handle).unwrap();
    session.load(chart(notes), None, 0).unwrap();
    (session, rx)
}

fn audio_session(notes: Vec<Note>) -> (Session, Receiver<SessionEvent>, TransportEndpoint) {
    let (handle, endpoint) = transport();
    let (mut session, rx) = Session::new(config(), handle).unwrap();
    session.load(chart(notes), Some(PathBuf::from("song.ogg")), 0).unwrap();
    (session, rx, endpoint)
}

fn wall(logical: i64) -> i64 {
    logical + DELAY
}

fn drain(rx: &Receiver<SessionEvent>) -> Vec<SessionEvent> {
    rx.try_iter().collect()
}

#[test]
fn countdown_then_playing() {
    let (mut session, rx) = silent_session(vec![Note::tap(0, 1000)]);
    assert_eq!(session.phase(), Phase::Countdown);

    let events = drain(&rx);
    assert!(events.contains(&SessionEvent::PhaseChanged(Phase::Countdown)));
    assert!(events.contains(&SessionEvent::SongLoaded {
        title: "Song".to_string(),
        artist: "Band".to_string(),
        duration: 4000,
    }));

    session.tick(500);
    assert_eq!(session.logical_time(), -1500);
    assert_eq!(session.phase(), Phase::Countdown);

    session.tick(2004);
    assert_eq!(session.phase(), Phase::Playing);
    assert_eq!(session.logical_time(), 4);
    assert!(drain(&rx).contains(&SessionEvent::PhaseChanged(Phase::Playing)));
}

#[test]
fn perfect_tap_scores_the_whole_chart() {
    let (mut session, rx) = silent_session(vec![Note::tap(0, 1000)]);
    session.tick(wall(0));
    drain(&rx);

    let result = session.on_press(0, wall(1005)).unwrap();
    assert_eq!(result.label, JudgmentLabel::Perfect);
    assert_eq!(result.weight, 300);

    let stats = session.stats();
    assert_eq!(stats.combo, 1);
    assert_eq!(stats.score, 1_000_000);

    let events = drain(&rx);
    assert!(events.contains(&SessionEvent::Judged(result)));
    assert!(events.contains(&SessionEvent::StatsChanged(stats)));
}

#[test]
fn late_press_is_ignored_and_note_times_out() {
    let (mut session, rx) = silent_session(vec![Note::tap(0, 1000)]);
    session.tick(wall(0));

    assert!(session.on_press(0, wall(1151)).is_none());
    session.on_release(0, wall(1152));
    assert_eq!(session.engine().notes()[0].state, NoteState::Pending);

    session.tick(wall(1150));
    assert_eq!(session.engine().notes()[0].state, NoteState::Pending);

    drain(&rx);
    session.tick(wall(1151));
    assert_eq!(session.engine().notes()[0].state, NoteState::Missed);
    assert_eq!(session.stats().miss, 1);

    let events = drain(&rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Judged(r) if r.label == JudgmentLabel::Miss && r.note_index == 0
    )));
    assert!(events.iter().any(|e| matches!(e, SessionEvent::StatsChanged(s) if s.miss == 1)));
}

#[test]
fn boundary_press_is_bad() {
    let (mut session, _rx) = silent_session(vec![Note::tap(0, 1000)]);
    session.tick(wall(0));
    let result = session.on_press(0, wall(1150)).unwrap();
    assert_eq!(result.label, JudgmentLabel::Bad);
    assert_eq!(session.stats().combo, 0);
}

#[test]
fn hold_press_and_release() {
    let (mut session, _rx) = silent_session(vec![Note::hold(1, 1000, 2000)]);
    session.tick(wall(0));

    session.on_press(1, wall(1005)).unwrap();
    assert_eq!(session.engine().notes()[0].state, NoteState::Holding);
    session.tick(wall(1500));
    assert_eq!(session.engine().notes()[0].state, NoteState::Holding);

    let tail = session.on_release(1, wall(1990)).unwrap();
    assert_eq!(tail.label, JudgmentLabel::Perfect);
    assert_eq!(session.engine().notes()[0].state, NoteState::Completed);
    assert_eq!(session.stats().score, 1_000_000);
}

#[test]
fn early_release_breaks_combo() {
    let (mut session, _rx) = silent_session(vec![Note::hold(1, 1000, 2000)]);
    session.tick(wall(0));

    session.on_press(1, wall(1005)).unwrap();
    let tail = session.on_release(1, wall(1700)).unwrap();
    assert_eq!(tail.label, JudgmentLabel::MissEarlyRelease);
    assert_eq!(session.engine().notes()[0].state, NoteState::Missed);
    assert_eq!(session.stats().combo, 0);
}

#[test]
fn empty_chart_is_valid_and_trivial() {
    let (mut session, rx) = silent_session(Vec::new());
    assert_eq!(session.stats().accuracy, 100.0);
    assert_eq!(session.duration(), 3000);

    session.tick(wall(0));
    session.tick(wall(2000));
    assert_eq!(session.stats().score, 0);
    assert_eq!(session.stats().accuracy, 100.0);

    session.tick(wall(4001));
    assert_eq!(session.phase(), Phase::Ended);
    let record = session.record().unwrap();
    assert_eq!(record.score, 0);
    assert_eq!(record.acc, 100.0);
    assert_eq!(record.grade, Grade::C);
    assert!(drain(&rx).iter().any(|e| matches!(e, SessionEvent::SessionEnded(_))));
}

#[test]
fn session_ends_after_duration_and_emits_record() {
    let (mut session, rx) = silent_session(vec![Note::tap(0, 1000), Note::hold(3, 1200, 1800)]);
    session.tick(wall(0));
    session.on_press(0, wall(1000)).unwrap();
    session.on_press(3, wall(1220)).unwrap();
    session.on_release(3, wall(1800)).unwrap();

    // estimated duration: 1800 + 3000
    assert_eq!(session.duration(), 4800);

    session.tick(wall(5800));
    assert_eq!(session.phase(), Phase::Playing);
    assert_eq!(session.progress(), (4800, 4800));

    drain(&rx);
    session.tick(wall(5801));
    assert_eq!(session.phase(), Phase::Ended);

    let record = session.record().unwrap().clone();
    assert_eq!(record.hash, "BandSongHard");
    assert_eq!(record.score, 1_000_000);
    assert_eq!(record.combo, 3);
    assert_eq!(record.perfect, 3);
    assert_eq!(record.miss, 0);
    assert_eq!(record.grade, Grade::S);
    assert_eq!(record.judgment.perfect, 40);
    assert_eq!(record.judgment.miss, 150);

    let events = drain(&rx);
    let ended = events.iter().position(|e| e == &SessionEvent::SessionEnded(record.clone()));
    let phase = events.iter().position(|e| e == &SessionEvent::PhaseChanged(Phase::Ended));
    assert!(ended.unwrap() < phase.unwrap());

    // ended sessions ignore ticks and input
    session.tick(wall(9000));
    assert!(session.on_press(0, wall(9000)).is_none());
    assert!(drain(&rx).is_empty());
}

#[test]
fn progress_is_clamped_to_duration() {
    let (mut session, rx) = silent_session(vec![Note::tap(0, 1000)]);
    drain(&rx);
    session.tick(wall(-1000));
    // no progress during the countdown
    assert!(!drain(&rx).iter().any(|e| matches!(e, SessionEvent::ProgressChanged { .. })));

    session.tick(wall(-50));
    session.tick(wall(10));
    assert_eq!(session.progress(), (10, 4000));

    session.tick(wall(4500));
    assert_eq!(session.progress(), (4000, 4000));
    assert!(drain(&rx).contains(&SessionEvent::ProgressChanged {
        current: 4000,
        total: 4000
    }));
}

#[test]
fn transport_receives_source_play_and_stop() {
    let (mut session, _rx, endpoint) = audio_session(vec![Note::tap(0, 1000)]);
    assert_eq!(
        endpoint.next_command(),
        Some(TransportCommand::SetSource(PathBuf::from("song.ogg")))
    );
    assert_eq!(endpoint.next_command(), None);

    session.tick(wall(-10));
    assert_eq!(endpoint.next_command(), None);

    session.tick(wall(0));
    assert_eq!(endpoint.next_command(), Some(TransportCommand::Play));
    assert_eq!(session.audio_source(), Some(&PathBuf::from("song.ogg")));
}

#[test]
fn stop_report_is_ignored_right_after_start() {
    let (mut session, _rx, endpoint) = audio_session(vec![Note::tap(0, 1000)]);
    session.tick(wall(0));
    // the engine has not confirmed playback yet
    session.tick(wall(500));
    assert_eq!(session.phase(), Phase::Playing);

    endpoint.report_state(PlaybackState::Playing);
    session.tick(wall(1000));
    endpoint.report_state(PlaybackState::Stopped);
    session.tick(wall(1000));
    assert_eq!(session.phase(), Phase::Playing);

    session.tick(wall(1001));
    assert_eq!(session.phase(), Phase::Ended);
}

#[test]
fn stop_report_ends_session_and_stops_transport() {
    let (mut session, _rx, endpoint) = audio_session(vec![Note::tap(0, 1000)]);
    while endpoint.next_command().is_some() {}

    session.tick(wall(0));
    endpoint.report_state(PlaybackState::Playing);
    session.tick(wall(2000));
    endpoint.report_state(PlaybackState::Stopped);
    session.tick(wall(2016));

    assert_eq!(session.phase(), Phase::Ended);
    assert_eq!(session.record().unwrap().miss, 1);
    let commands: Vec<TransportCommand> = std::iter::from_fn(|| endpoint.next_command()).collect();
    assert_eq!(commands, vec![TransportCommand::Play, TransportCommand::Stop]);
}

#[test]
fn reported_duration_only_extends_the_estimate() {
    let (mut session, rx, endpoint) = audio_session(vec![Note::tap(0, 1000)]);
    assert_eq!(session.duration(), 4000);

    endpoint.report_duration(2500);
    session.tick(wall(0));
    assert_eq!(session.duration(), 4000);

    drain(&rx);
    endpoint.report_duration(90_000);
    session.tick(wall(10));
    assert_eq!(session.duration(), 90_000);
    assert!(drain(&rx).contains(&SessionEvent::SongLoaded {
        title: "Song".to_string(),
        artist: "Band".to_string(),
        duration: 90_000,
    }));
}

#[test]
fn audio_drift_compares_transport_position() {
    let (mut session, _rx, endpoint) = audio_session(vec![Note::tap(0, 1000)]);
    assert_eq!(session.audio_drift(), None);

    session.tick(wall(500));
    assert_eq!(session.audio_drift(), None);

    endpoint.report_state(PlaybackState::Playing);
    endpoint.report_position(520.0);
    assert_eq!(session.audio_drift(), Some(20));
}

#[test]
fn refuse_policy_leaves_session_idle() {
    let (handle, _endpoint) = transport();
    let config = GameConfig {
        missing_audio: MissingAudioPolicy::Refuse,
        ..config()
    };
    let (mut session, _rx) = Session::new(config, handle).unwrap();

    let err = session.load(chart(vec![Note::tap(0, 1000)]), None, 0).unwrap_err();
    assert!(matches!(err, SessionError::AudioUnavailable { ref title, .. } if title == "Song"));
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.engine().notes().len(), 1);

    session.tick(wall(1000));
    assert!(session.on_press(0, wall(1000)).is_none());
    assert_eq!(session.engine().notes()[0].state, NoteState::Pending);
    assert!(session.restart(0).is_err());
}

#[test]
fn reset_clears_everything_without_a_record() {
    let (mut session, rx) = silent_session(vec![Note::tap(0, 1000), Note::hold(1, 1000, 3000)]);
    session.tick(wall(0));
    session.on_press(0, wall(1000)).unwrap();
    session.on_press(1, wall(1000)).unwrap();
    drain(&rx);

    session.reset();
    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.engine().notes().iter().all(|n| n.state == NoteState::Pending));
    assert_eq!(session.pressed_columns(), [false; 4]);
    assert!(session.record().is_none());

    let stats = session.stats();
    assert_eq!((stats.perfect, stats.combo, stats.max_combo, stats.score), (0, 0, 0, 0));
    assert_eq!(stats.accuracy, 100.0);

    let events = drain(&rx);
    assert!(events.contains(&SessionEvent::StatsChanged(stats)));
    assert!(events.contains(&SessionEvent::ProgressChanged { current: 0, total: 1 }));
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::SessionEnded(_))));

    // idle sessions do not time notes out
    session.tick(wall(60_000));
    assert!(session.engine().notes().iter().all(|n| n.state == NoteState::Pending));
}

#[test]
fn restart_plays_the_chart_again() {
    let (mut session, _rx) = silent_session(vec![Note::tap(0, 1000)]);
    session.tick(wall(0));
    session.on_press(0, wall(1000)).unwrap();

    session.restart(100_000).unwrap();
    assert_eq!(session.phase(), Phase::Countdown);
    assert_eq!(session.stats().perfect, 0);

    session.tick(100_000 + DELAY);
    let result = session.on_press(0, 100_000 + DELAY + 1000).unwrap();
    assert_eq!(result.label, JudgmentLabel::Perfect);
}

#[test]
fn key_events_map_to_columns_and_ignore_repeats() {
    let (mut session, _rx) = silent_session(vec![Note::tap(2, 1000), Note::tap(2, 1100)]);
    session.tick(wall(0));
    let key_j = KeyCode(74);

    let first = session.handle_input(InputEvent::press(wall(1000), key_j)).unwrap();
    assert_eq!(first.note_index, 0);
    assert_eq!(session.pressed_columns(), [false, false, true, false]);

    // auto-repeat while held
    assert!(session.handle_input(InputEvent::press(wall(1100), key_j)).is_none());
    assert_eq!(session.engine().notes()[1].state, NoteState::Pending);

    assert!(session.handle_input(InputEvent::release(wall(1050), key_j)).is_none());
    let second = session.handle_input(InputEvent::press(wall(1100), key_j)).unwrap();
    assert_eq!(second.note_index, 1);

    // unmapped key
    assert!(session.handle_input(InputEvent::press(wall(1100), KeyCode(32))).is_none());
}

#[test]
fn queued_input_is_judged_at_its_own_timestamp() {
    let (mut session, _rx) = silent_session(vec![Note::tap(0, 1000), Note::tap(1, 1030)]);
    let mut queue = InputQueue::new();
    session.tick(wall(0));

    queue.push(InputEvent::press(wall(998), KeyCode(68)));
    queue.push(InputEvent::press(wall(1100), KeyCode(70)));

    let results = session.drain_input(&mut queue, wall(1004));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].delta, -2);
    assert_eq!(queue.len(), 1);

    let results = session.drain_input(&mut queue, wall(1100));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].label, JudgmentLabel::Great);
}

#[test]
fn logical_time_is_frozen_per_tick() {
    let (mut session, _rx) = silent_session(vec![Note::tap(0, 1000)]);
    session.tick(wall(700));
    assert_eq!(session.logical_time(), 700);
    assert_eq!(session.logical_time(), 700);
    assert_eq!(session.visual_time(wall(716)), 716);
    assert_eq!(session.logical_time(), 700);
}

#[test]
fn press_during_countdown_can_hit_an_early_note() {
    let (mut session, _rx) = silent_session(vec![Note::tap(0, 50)]);
    session.tick(wall(-500));
    let result = session.on_press(0, wall(-60)).unwrap();
    assert_eq!(result.label, JudgmentLabel::Good);
    assert_eq!(session.phase(), Phase::Countdown);
}

#[test]
fn audio_offset_delays_logical_time() {
    let (handle, _endpoint) = transport();
    let config = GameConfig {
        audio_offset: 30,
        ..config()
    };
    let (mut session, _rx) = Session::new(config, handle).unwrap();
    session.load(chart(vec![Note::tap(0, 1000)]), None, 0).unwrap();

    session.tick(DELAY);
    assert_eq!(session.logical_time(), -30);
    let result = session.on_press(0, DELAY + 1030).unwrap();
    assert_eq!(result.delta, 0);
}

#[test]
fn config_is_locked_while_running() {
    let (mut session, _rx) = silent_session(vec![Note::tap(0, 1000)]);
    let wide = GameConfig {
        judge_window: JudgeWindow::new(50, 100, 150, 200).unwrap(),
        ..config()
    };
    assert!(matches!(
        session.set_config(wide.clone()),
        Err(SessionError::ConfigLocked(Phase::Countdown))
    ));

    session.reset();
    session.set_config(wide).unwrap();
    assert_eq!(session.engine().window().miss, 200);

    let mut broken = config();
    broken.judge_window.great = 10;
    assert!(matches!(session.set_config(broken), Err(SessionError::Config(_))));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let (handle, _endpoint) = transport();
    let mut config = config();
    config.pre_game_delay = -1;
    assert!(Session::new(config, handle).is_err());
}

#[test]
fn load_chart_from_disk_resolves_audio() {
    let dir = tempfile::tempdir().unwrap();
    let chart_path = dir.path().join("map.osu");
    fs::write(
        &chart_path,
        "AudioFilename: missing.mp3\nTitle:Disk\nArtist:Someone\n[HitObjects]\n64,192,1000,1,0\n",
    )
    .unwrap();
    fs::write(dir.path().join("track.ogg"), b"").unwrap();

    let (handle, endpoint) = transport();
    let (mut session, _rx) = Session::new(config(), handle).unwrap();
    session.load_chart(read_chart_file(&chart_path).unwrap(), 0).unwrap();

    assert_eq!(session.meta().title, "Disk");
    assert_eq!(
        endpoint.next_command(),
        Some(TransportCommand::SetSource(dir.path().join("track.ogg")))
    );
}

#[test]
fn refused_disk_chart_reports_directory() {
    let dir = tempfile::tempdir().unwrap();
    let chart_path = dir.path().join("map.osu");
    fs::write(&chart_path, "Title:Mute\n[HitObjects]\n64,192,1000,1,0\n").unwrap();

    let (handle, _endpoint) = transport();
    let config = GameConfig {
        missing_audio: MissingAudioPolicy::Refuse,
        ..config()
    };
    let (mut session, _rx) = Session::new(config, handle).unwrap();
    let err = session.load_chart(read_chart_file(&chart_path).unwrap(), 0).unwrap_err();
    assert_eq!(
        err,
        SessionError::AudioUnavailable {
            title: "Mute".to_string(),
            dir: Some(dir.path().to_path_buf()),
        }
    );
}

#[test]
fn out_of_range_hit_objects_never_reach_the_session() {
    let chart = parse_chart("[HitObjects]\n64,192,9223372036854775807,1,0\n64,192,-9223372036854775800,1,0\n");
    assert!(chart.is_empty());

    let (handle, _endpoint) = transport();
    let (mut session, _rx) = Session::new(config(), handle).unwrap();
    session.load(chart, None, 0).unwrap();
    assert_eq!(session.duration(), 3000);

    session.tick(wall(0));
    assert!(session.on_press(0, wall(5000)).is_none());
}

#[test]
fn extreme_hand_built_times_keep_the_session_total() {
    let (mut session, _rx) = silent_session(vec![Note::tap(0, i64::MIN + 10), Note::tap(1, i64::MAX)]);
    assert_eq!(session.duration(), i64::MAX);

    session.tick(wall(0));
    assert!(session.on_press(0, wall(5000)).is_none());
    session.tick(wall(5000));
    assert_eq!(session.engine().notes()[0].state, NoteState::Missed);
    assert_eq!(session.phase(), Phase::Playing);
}

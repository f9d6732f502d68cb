use std::time::Duration;

use polystep::{Preset, ScaleKind, SequencerEvent, Session, SessionConfig, Step, TrackId, VoiceType};

fn headless(seed: u64) -> Session {
    Session::new(SessionConfig {
        seed: Some(seed),
        master_reverb: 0.0,
        master_delay: 0.0,
        ..SessionConfig::default()
    })
}

fn fill(session: &Session, id: TrackId) {
    session.update_track(id, |t| {
        for i in 0..t.step_count() {
            t.set_step(i, Step::on(0.9, i as i32));
        }
    });
}

#[test]
fn test_kick_and_hihat_scenario() {
    let mut s = headless(1);
    let kick = s.add_track(VoiceType::Kick, Some(4)).unwrap();
    let hat = s.add_track(VoiceType::HiHat, Some(6)).unwrap();
    fill(&s, kick);
    fill(&s, hat);

    for tick in 0..24 {
        assert!(s.advance(tick));
    }
    let steps: Vec<_> = s
        .poll_events()
        .into_iter()
        .filter(|e| matches!(e, SequencerEvent::StepChanged { .. }))
        .collect();
    assert_eq!(
        steps,
        vec![
            SequencerEvent::StepChanged { track: kick, step: 0 },
            SequencerEvent::StepChanged { track: hat, step: 0 },
        ]
    );
    let current = s.current_steps();
    assert_eq!(current[&kick], 0);
    assert_eq!(current[&hat], 0);
}

#[test]
fn test_mute_suppresses_notifications() {
    let mut s = headless(2);
    let id = s.add_track(VoiceType::Lead, Some(4)).unwrap();
    fill(&s, id);
    s.set_muted(id, true);
    for tick in 0..200 {
        s.advance(tick);
    }
    assert!(!s
        .poll_events()
        .iter()
        .any(|e| matches!(e, SequencerEvent::StepChanged { .. })));
}

#[test]
fn test_shrinking_track_while_stepping() {
    let mut s = headless(3);
    let id = s.add_track(VoiceType::Bass, Some(16)).unwrap();
    for tick in 0..(12 * 24 + 1) {
        s.advance(tick);
    }
    assert_eq!(s.current_steps()[&id], 12);
    s.set_step_count(id, 8);
    assert_eq!(s.current_steps()[&id], 0);
    assert_eq!(s.track(id).unwrap().step_count(), 8);
}

#[test]
fn test_stale_ids_are_noops() {
    let mut s = headless(4);
    let id = s.add_track(VoiceType::Snare, None).unwrap();
    assert!(s.remove_track(id));
    assert!(!s.toggle_step(id, 0));
    assert!(!s.randomize_track(id));
    assert!(!s.evolve_track(id));
    assert!(!s.set_muted(id, true));
    assert!(s.track(id).is_none());
}

#[test]
fn test_clock_thread_fires_steps() {
    let mut s = headless(5);
    let id = s.add_track(VoiceType::HiHat, Some(2)).unwrap();
    fill(&s, id);
    s.set_bpm(300.0);
    s.start().unwrap();
    std::thread::sleep(Duration::from_millis(150));
    s.stop();

    let events = s.poll_events();
    assert_eq!(events.first(), Some(&SequencerEvent::Started));
    assert_eq!(events.last(), Some(&SequencerEvent::Stopped));
    assert!(events
        .iter()
        .any(|e| matches!(e, SequencerEvent::StepChanged { track, .. } if *track == id)));
    assert!(s.global_beat() > 0);
}

#[test]
fn test_preset_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("presets").join("groove.json");

    let mut a = headless(6);
    a.set_bpm(133.0);
    a.set_scale(ScaleKind::Phrygian);
    for vt in [VoiceType::Kick, VoiceType::Acid, VoiceType::Pad] {
        a.add_track(vt, None);
    }
    a.randomize_everything();
    a.save_preset("groove", &path).unwrap();

    let mut b = headless(7);
    b.add_track(VoiceType::Lead, None);
    b.load_preset_file(&path).unwrap();

    assert_eq!(b.bpm(), 133.0);
    assert_eq!(b.scale(), ScaleKind::Phrygian);
    let ta = a.tracks();
    let tb = b.tracks();
    assert_eq!(ta.len(), tb.len());
    for (x, y) in ta.iter().zip(tb.iter()) {
        assert_eq!(x.voice_type, y.voice_type);
        assert_eq!(x.steps, y.steps);
        assert_eq!(y.current_step_index, 0);
    }
}

#[test]
fn test_load_preset_resumes_playback() {
    let mut s = headless(8);
    s.add_track(VoiceType::Kick, None);
    let preset: Preset = s.to_preset("live");
    s.start().unwrap();
    s.load_preset(preset).unwrap();
    assert!(s.is_playing());
    s.stop();

    let preset = s.to_preset("stopped");
    s.load_preset(preset).unwrap();
    assert!(!s.is_playing());
}

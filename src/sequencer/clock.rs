//! Pure tick arithmetic. Nothing here owns a thread or a clock source, so a
//! fixed tick sequence over a frozen track snapshot always yields the same
//! fires.

use std::time::Duration;

use crate::pattern::{midi_to_freq, Scale, Track, TrackId};

/// Sub-step resolution used for swing quantization.
pub const TICKS_PER_STEP: u64 = 24;
/// Steps per quarter note (each step is a sixteenth).
pub const STEPS_PER_BEAT: u64 = 4;

/// Wall-clock length of one tick at `bpm`.
pub fn tick_interval(bpm: f32) -> Duration {
    let steps_per_second = (bpm.max(1.0) as f64 / 60.0) * STEPS_PER_BEAT as f64;
    Duration::from_secs_f64(1.0 / (steps_per_second * TICKS_PER_STEP as f64))
}

/// Tick delay applied to odd steps.
pub fn swing_offset(swing: f32) -> u64 {
    (TICKS_PER_STEP as f32 * swing.clamp(0.0, 1.0) * 0.33).floor() as u64
}

/// Step index a track of `step_count` steps fires at `global_tick`, if any.
pub fn fires_at(global_tick: u64, step_count: usize, swing: f32) -> Option<usize> {
    if step_count == 0 {
        return None;
    }
    let cycle_length = step_count as u64 * TICKS_PER_STEP;
    let tick_in_cycle = global_tick % cycle_length;
    let step_index = tick_in_cycle / TICKS_PER_STEP;
    let offset = if step_index % 2 == 1 { swing_offset(swing) } else { 0 };
    (tick_in_cycle % TICKS_PER_STEP == offset).then_some(step_index as usize)
}

/// Whether the opaque global beat counter advances on this tick.
pub fn is_beat_tick(global_tick: u64) -> bool {
    global_tick % TICKS_PER_STEP == 0
}

/// Ticks between automatic evolution passes.
pub fn evolution_period(interval_beats: u32) -> u64 {
    interval_beats.max(1) as u64 * STEPS_PER_BEAT * TICKS_PER_STEP
}

/// MIDI note a step sounds. Percussive voices ignore the scale degree.
pub fn resolve_midi(track: &Track, note_degree: i32, scale: &Scale, root_note: i32) -> i32 {
    let base = root_note + track.pitch_offset;
    if track.voice_type.is_percussive() {
        base
    } else {
        scale.degree_to_midi(note_degree, base)
    }
}

/// Global values a tick reads.
#[derive(Debug, Clone, Copy)]
pub struct TickParams<'a> {
    pub scale: &'a Scale,
    pub root_note: i32,
    pub swing: f32,
}

/// A note resolved for a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub midi: i32,
    pub frequency: f32,
    pub velocity: f32,
    pub param_mod: f32,
}

/// One track reaching a step on a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepFire {
    /// Position of the track in the slice passed to [`process_tick`].
    pub index: usize,
    pub track: TrackId,
    pub step_index: usize,
    /// `None` when the step is inactive.
    pub note: Option<NoteEvent>,
}

/// Advance every track for `global_tick`, appending fires to `out`.
///
/// Muted tracks are skipped entirely. Unmuted tracks report their new step
/// whether or not it is active.
pub fn process_tick(global_tick: u64, tracks: &mut [Track], params: &TickParams<'_>, out: &mut Vec<StepFire>) {
    for (index, track) in tracks.iter_mut().enumerate() {
        let Some(step_index) = fires_at(global_tick, track.step_count(), params.swing) else {
            continue;
        };
        if track.muted {
            continue;
        }
        track.current_step_index = step_index;

        let note = track.step(step_index).filter(|s| s.active).map(|step| {
            let midi = resolve_midi(track, step.note_degree, params.scale, params.root_note);
            NoteEvent {
                midi,
                frequency: midi_to_freq(midi),
                velocity: step.velocity,
                param_mod: step.param_mod,
            }
        });

        out.push(StepFire {
            index,
            track: track.id,
            step_index,
            note,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth::VoiceType;
    use crate::pattern::{ScaleKind, Step};

    fn full_track(id: u32, voice_type: VoiceType, steps: usize) -> Track {
        let mut t = Track::new(TrackId(id), voice_type, Some(steps));
        for i in 0..steps {
            t.set_step(i, Step::on(0.9, i as i32));
        }
        t
    }

    fn run(tracks: &mut [Track], ticks: std::ops::Range<u64>, swing: f32) -> Vec<(u64, StepFire)> {
        let scale = ScaleKind::Minor.scale();
        let params = TickParams { scale: &scale, root_note: 48, swing };
        let mut out = Vec::new();
        let mut all = Vec::new();
        for tick in ticks {
            out.clear();
            process_tick(tick, tracks, &params, &mut out);
            all.extend(out.iter().map(|f| (tick, *f)));
        }
        all
    }

    #[test]
    fn test_tick_interval() {
        let at_120 = tick_interval(120.0).as_secs_f64();
        assert!((at_120 - 1.0 / 192.0).abs() < 1e-9);
        let at_240 = tick_interval(240.0).as_secs_f64();
        assert!((at_120 / at_240 - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_swing_offset() {
        assert_eq!(swing_offset(0.0), 0);
        assert_eq!(swing_offset(0.5), 3); // floor(3.96)
        assert_eq!(swing_offset(1.0), 7); // floor(7.92)
        assert_eq!(swing_offset(5.0), 7);
    }

    #[test]
    fn test_fires_at_with_swing() {
        assert_eq!(fires_at(0, 4, 0.5), Some(0));
        assert_eq!(fires_at(24, 4, 0.5), None);
        assert_eq!(fires_at(27, 4, 0.5), Some(1));
        assert_eq!(fires_at(48, 4, 0.5), Some(2));
        assert_eq!(fires_at(96, 4, 0.5), Some(0));
        assert_eq!(fires_at(5, 4, 0.0), None);
    }

    #[test]
    fn test_kick_and_hihat_first_step() {
        let mut tracks = vec![
            full_track(1, VoiceType::Kick, 4),
            full_track(2, VoiceType::HiHat, 6),
        ];
        let fires = run(&mut tracks, 0..24, 0.0);
        assert_eq!(fires.len(), 2);
        for (tick, fire) in &fires {
            assert_eq!(*tick, 0);
            assert_eq!(fire.step_index, 0);
            assert!(fire.note.is_some());
        }
    }

    #[test]
    fn test_polyrhythm_realigns_on_lcm() {
        let mut tracks = vec![
            full_track(1, VoiceType::Kick, 4),
            full_track(2, VoiceType::Bass, 7),
        ];
        let lcm = 28 * TICKS_PER_STEP;
        let fires = run(&mut tracks, 0..lcm + 1, 0.0);
        let kicks = fires.iter().filter(|(_, f)| f.track == TrackId(1)).count();
        let bass = fires.iter().filter(|(_, f)| f.track == TrackId(2)).count();
        assert_eq!(kicks, 29);
        assert_eq!(bass, 29);
        let at_lcm: Vec<_> = fires.iter().filter(|(t, _)| *t == lcm).collect();
        assert_eq!(at_lcm.len(), 2);
        assert!(at_lcm.iter().all(|(_, f)| f.step_index == 0));
    }

    #[test]
    fn test_muted_track_skipped() {
        let mut tracks = vec![full_track(1, VoiceType::Lead, 4)];
        tracks[0].muted = true;
        tracks[0].current_step_index = 3;
        assert!(run(&mut tracks, 0..200, 0.0).is_empty());
        assert_eq!(tracks[0].current_step_index, 3);
    }

    #[test]
    fn test_inactive_step_still_reported() {
        let mut tracks = vec![Track::new(TrackId(1), VoiceType::Pad, Some(4))];
        let fires = run(&mut tracks, 0..96, 0.0);
        assert_eq!(fires.len(), 4);
        assert!(fires.iter().all(|(_, f)| f.note.is_none()));
        assert_eq!(tracks[0].current_step_index, 3);
    }

    #[test]
    fn test_pitch_resolution() {
        let scale = ScaleKind::Minor.scale();
        let mut kick = Track::new(TrackId(1), VoiceType::Kick, Some(4));
        kick.pitch_offset = -12;
        assert_eq!(resolve_midi(&kick, 5, &scale, 48), 36);

        let mut lead = Track::new(TrackId(2), VoiceType::Lead, Some(4));
        lead.pitch_offset = 12;
        // minor degree 2 is a minor third
        assert_eq!(resolve_midi(&lead, 2, &scale, 48), 63);
        assert_eq!(resolve_midi(&lead, 9, &scale, 48), 75);
    }

    #[test]
    fn test_deterministic_fire_sequence() {
        let build = || {
            vec![
                full_track(1, VoiceType::Kick, 4),
                full_track(2, VoiceType::Lead, 5),
                full_track(3, VoiceType::Acid, 11),
            ]
        };
        let mut a = build();
        let mut b = build();
        let fa = run(&mut a, 0..2000, 0.4);
        let fb = run(&mut b, 0..2000, 0.4);
        assert_eq!(fa, fb);
        assert!(!fa.is_empty());
    }

    #[test]
    fn test_beat_and_evolution_period() {
        assert!(is_beat_tick(0));
        assert!(is_beat_tick(48));
        assert!(!is_beat_tick(47));
        assert_eq!(evolution_period(4), 384);
        assert_eq!(evolution_period(0), 96);
    }
}

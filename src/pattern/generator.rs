//! Pattern generation and evolution.
//!
//! Every operation reads `density` / `evolution_rate` from the track itself and
//! leaves at least one active step behind. Randomness comes from the caller's
//! RNG so a seeded `StdRng` reproduces a result exactly.

use rand::Rng;

use super::scale::Scale;
use super::track::{clamp_unit, Track};
use crate::audio::synth::{VoiceFamily, VoiceType};

// ──────────────────────────────────────────────
// Core operations
// ──────────────────────────────────────────────

/// Fill every step independently, active with probability `track.density`.
pub fn randomize<R: Rng + ?Sized>(track: &mut Track, scale: &Scale, rng: &mut R) {
    let degrees = degree_span(scale, 2);
    let density = clamp_unit(track.density);
    for step in track.steps.iter_mut() {
        step.active = rng.gen::<f32>() < density;
        step.velocity = rng.gen_range(0.4..0.85);
        step.note_degree = rng.gen_range(0..degrees);
        step.param_mod = rng.gen_range(-0.3..0.3);
    }
    ensure_active(track, rng);
}

/// Maximally even distribution of `pulses` onsets over `step_count` steps.
///
/// Step `i` is a pulse iff `(i * k) % n < k` with `k = min(pulses, n)`.
/// Degenerate input yields an all-false pattern of length `max(n, 1)`.
pub fn euclidean(step_count: usize, pulses: usize) -> Vec<bool> {
    if step_count == 0 || pulses == 0 {
        return vec![false; step_count.max(1)];
    }
    let k = pulses.min(step_count);
    (0..step_count).map(|i| (i * k) % step_count < k).collect()
}

/// Set `active` from a Euclidean pattern; every step gets a fresh degree.
pub fn apply_euclidean<R: Rng + ?Sized>(
    track: &mut Track,
    pulses: usize,
    scale: &Scale,
    rng: &mut R,
) {
    let pattern = euclidean(track.step_count(), pulses);
    let degrees = degree_span(scale, 2);
    for (step, &on) in track.steps.iter_mut().zip(pattern.iter()) {
        step.active = on;
        if on {
            step.velocity = rng.gen_range(0.6..=1.0);
        }
        step.note_degree = rng.gen_range(0..degrees);
    }
    ensure_active(track, rng);
}

/// Gradual stochastic mutation scaled by `track.evolution_rate`.
pub fn evolve<R: Rng + ?Sized>(track: &mut Track, scale: &Scale, rng: &mut R) {
    let p = clamp_unit(track.evolution_rate) * 0.3;
    let max_degree = (scale.len() * 3) as i32;

    for step in track.steps.iter_mut() {
        if rng.gen::<f32>() < p {
            step.active = !step.active;
        }
        if step.active && rng.gen::<f32>() < p {
            step.velocity = (step.velocity + rng.gen_range(-0.15..=0.15)).clamp(0.1, 1.0);
        }
        if rng.gen::<f32>() < p * 0.5 {
            step.note_degree = (step.note_degree + rng.gen_range(-2..=2)).clamp(0, max_degree);
        }
        if rng.gen::<f32>() < p * 0.3 {
            step.param_mod = (step.param_mod + rng.gen_range(-0.2..=0.2)).clamp(-1.0, 1.0);
        }
    }
    ensure_active(track, rng);
}

/// Style-aware pattern for the track's voice archetype.
pub fn generate_smart<R: Rng + ?Sized>(track: &mut Track, scale: &Scale, rng: &mut R) {
    match track.voice_type {
        VoiceType::Kick => smart_kick(track, rng),
        VoiceType::Snare => smart_snare(track, rng),
        VoiceType::HiHat => smart_hihat(track, rng),
        VoiceType::Bass => smart_walk(track, scale, rng, WalkStyle::BASS),
        VoiceType::Lead => smart_walk(track, scale, rng, WalkStyle::LEAD),
        VoiceType::Acid => smart_walk(track, scale, rng, WalkStyle::ACID),
        VoiceType::Pad => smart_pad(track, scale, rng),
        VoiceType::Perc => smart_perc(track, scale, rng),
    }
    ensure_active(track, rng);
    tracing::debug!(
        track = %track.id,
        voice = track.voice_type.name(),
        active = track.active_count(),
        "generated smart pattern"
    );
}

/// Redraw filter, envelope, sends and volume within the archetype family's ranges.
pub fn randomize_parameters<R: Rng + ?Sized>(track: &mut Track, rng: &mut R) {
    let r = FamilyRanges::for_family(track.voice_type.family());
    track.filter_cutoff = rng.gen_range(r.cutoff.0..=r.cutoff.1);
    track.filter_resonance = rng.gen_range(r.resonance.0..=r.resonance.1);
    track.attack = rng.gen_range(r.attack.0..=r.attack.1);
    track.decay = rng.gen_range(r.decay.0..=r.decay.1);
    track.sustain = rng.gen_range(r.sustain.0..=r.sustain.1);
    track.release = rng.gen_range(r.release.0..=r.release.1);
    track.reverb_send = rng.gen_range(r.reverb.0..=r.reverb.1);
    track.delay_send = rng.gen_range(0.0..=0.5);
    track.volume = rng.gen_range(0.5..=0.9);
}

// ──────────────────────────────────────────────
// Batch variants
// ──────────────────────────────────────────────

pub fn randomize_all<R: Rng + ?Sized>(tracks: &mut [Track], scale: &Scale, rng: &mut R) {
    for track in tracks.iter_mut() {
        randomize(track, scale, rng);
    }
}

pub fn evolve_all<R: Rng + ?Sized>(tracks: &mut [Track], scale: &Scale, rng: &mut R) {
    for track in tracks.iter_mut() {
        evolve(track, scale, rng);
    }
}

pub fn randomize_everything<R: Rng + ?Sized>(tracks: &mut [Track], scale: &Scale, rng: &mut R) {
    for track in tracks.iter_mut() {
        randomize_parameters(track, rng);
        generate_smart(track, scale, rng);
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn degree_span(scale: &Scale, octaves: usize) -> i32 {
    (scale.len().max(1) * octaves) as i32
}

/// Force one step on when a pass left the pattern silent.
fn ensure_active<R: Rng + ?Sized>(track: &mut Track, rng: &mut R) {
    if track.steps.is_empty() || track.has_active_step() {
        return;
    }
    let idx = rng.gen_range(0..track.steps.len());
    let step = &mut track.steps[idx];
    step.active = true;
    step.velocity = step.velocity.max(0.6);
}

// 16-step kick templates; shorter or longer tracks wrap onto them.
const KICK_POOL: [&[usize]; 5] = [
    &[0, 4, 8, 12],
    &[0, 4, 8, 10, 12],
    &[0, 3, 8, 11],
    &[0, 6, 8, 14],
    &[0, 4, 7, 8, 12, 15],
];

fn smart_kick<R: Rng + ?Sized>(track: &mut Track, rng: &mut R) {
    let template = KICK_POOL[rng.gen_range(0..KICK_POOL.len())];
    for (i, step) in track.steps.iter_mut().enumerate() {
        step.active = template.contains(&(i % 16));
        step.velocity = if i % 16 == 0 {
            1.0
        } else {
            rng.gen_range(0.75..0.95)
        };
        step.note_degree = 0;
        step.param_mod = 0.0;
    }
}

fn smart_snare<R: Rng + ?Sized>(track: &mut Track, rng: &mut R) {
    let density = clamp_unit(track.density);
    for (i, step) in track.steps.iter_mut().enumerate() {
        let backbeat = i % 8 == 4;
        let prob = if backbeat {
            0.9
        } else if i % 2 == 1 {
            density * 0.3
        } else {
            density * 0.1
        };
        step.active = rng.gen::<f32>() < prob;
        step.velocity = if backbeat {
            rng.gen_range(0.85..=1.0)
        } else {
            rng.gen_range(0.3..0.55) // ghost notes
        };
        step.note_degree = 0;
        step.param_mod = rng.gen_range(-0.2..0.2);
    }
}

fn smart_hihat<R: Rng + ?Sized>(track: &mut Track, rng: &mut R) {
    let prob = (0.5 + clamp_unit(track.density) * 0.5).min(0.95);
    for (i, step) in track.steps.iter_mut().enumerate() {
        step.active = rng.gen::<f32>() < prob;
        step.velocity = if i % 2 == 0 {
            rng.gen_range(0.75..0.95)
        } else {
            rng.gen_range(0.4..0.6)
        };
        step.note_degree = 0;
        step.param_mod = rng.gen_range(-0.5..0.5);
    }
}

#[derive(Clone, Copy)]
struct WalkStyle {
    start_octave: usize,
    // Highest reachable degree, in scale lengths.
    span: f32,
    accent_prob: f32,
}

impl WalkStyle {
    const BASS: WalkStyle = WalkStyle { start_octave: 0, span: 1.0, accent_prob: 0.0 };
    const LEAD: WalkStyle = WalkStyle { start_octave: 1, span: 2.0, accent_prob: 0.0 };
    const ACID: WalkStyle = WalkStyle { start_octave: 0, span: 1.5, accent_prob: 0.3 };
}

/// Running pitch walk: mostly stepwise, sometimes a leap, clamped to the style's range.
fn smart_walk<R: Rng + ?Sized>(track: &mut Track, scale: &Scale, rng: &mut R, style: WalkStyle) {
    let len = scale.len().max(1) as i32;
    let top = (len as f32 * style.span).round() as i32;
    let density = clamp_unit(track.density);
    let mut degree = (style.start_octave as i32 * len).min(top);

    for (i, step) in track.steps.iter_mut().enumerate() {
        let r = rng.gen::<f32>();
        let delta = if r < 0.7 {
            rng.gen_range(-1..=1)
        } else if r < 0.9 {
            if rng.gen_bool(0.5) { 2 } else { -2 }
        } else {
            let leap = rng.gen_range(3..=len.max(3));
            if rng.gen_bool(0.5) { leap } else { -leap }
        };
        degree = (degree + delta).clamp(0, top);

        step.active = (i == 0 && style.start_octave == 0) || rng.gen::<f32>() < density;
        step.note_degree = degree;
        if rng.gen::<f32>() < style.accent_prob {
            step.velocity = rng.gen_range(0.9..=1.0);
            step.param_mod = rng.gen_range(0.4..0.8);
        } else {
            step.velocity = rng.gen_range(0.6..0.85);
            step.param_mod = rng.gen_range(-0.3..0.3);
        }
    }
}

fn smart_pad<R: Rng + ?Sized>(track: &mut Track, scale: &Scale, rng: &mut R) {
    let len = scale.len().max(1) as i32;
    // Root, third and fifth of the scale.
    let chord = [0, 2.min(len - 1), 4.min(len - 1)];
    for (i, step) in track.steps.iter_mut().enumerate() {
        step.active = i == 0 || rng.gen::<f32>() < 0.2;
        step.velocity = rng.gen_range(0.5..0.7);
        let octave = if rng.gen_bool(0.3) { len } else { 0 };
        step.note_degree = chord[rng.gen_range(0..chord.len())] + octave;
        step.param_mod = rng.gen_range(-0.2..0.2);
    }
}

fn smart_perc<R: Rng + ?Sized>(track: &mut Track, scale: &Scale, rng: &mut R) {
    let n = track.step_count();
    let pulses = rng.gen_range(2..=(n * 2 / 3).max(2));
    apply_euclidean(track, pulses, scale, rng);
    track.shift(rng.gen_range(0..n as i32));
    for step in track.steps.iter_mut() {
        step.param_mod = rng.gen_range(-0.5..0.5);
    }
}

struct FamilyRanges {
    cutoff: (f32, f32),
    resonance: (f32, f32),
    attack: (f32, f32),
    decay: (f32, f32),
    sustain: (f32, f32),
    release: (f32, f32),
    reverb: (f32, f32),
}

impl FamilyRanges {
    fn for_family(family: VoiceFamily) -> Self {
        match family {
            VoiceFamily::Percussive => Self {
                cutoff: (0.5, 1.0),
                resonance: (0.0, 0.4),
                attack: (0.0, 0.02),
                decay: (0.05, 0.4),
                sustain: (0.0, 0.2),
                release: (0.02, 0.2),
                reverb: (0.0, 0.4),
            },
            VoiceFamily::BassLike => Self {
                cutoff: (0.15, 0.6),
                resonance: (0.1, 0.85),
                attack: (0.0, 0.05),
                decay: (0.1, 0.5),
                sustain: (0.3, 0.8),
                release: (0.05, 0.3),
                reverb: (0.0, 0.2),
            },
            VoiceFamily::Lead => Self {
                cutoff: (0.4, 0.9),
                resonance: (0.05, 0.6),
                attack: (0.0, 0.15),
                decay: (0.1, 0.6),
                sustain: (0.3, 0.9),
                release: (0.1, 0.5),
                reverb: (0.1, 0.5),
            },
            VoiceFamily::Pad => Self {
                cutoff: (0.3, 0.8),
                resonance: (0.0, 0.4),
                attack: (0.3, 1.0),
                decay: (0.3, 1.0),
                sustain: (0.5, 1.0),
                release: (0.4, 1.0),
                reverb: (0.3, 0.9),
            },
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::audio::synth::VoiceType;

pub const MIN_STEPS: usize = 2;
pub const MAX_STEPS: usize = 32;

/// Stable identifier of a track within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// One slot of a track's pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub active: bool,
    pub velocity: f32,    // 0.0 to 1.0
    pub note_degree: i32, // scale degree, >= 0
    pub param_mod: f32,   // -1.0 to 1.0, nudges the filter and some generators
}

impl Default for Step {
    fn default() -> Self {
        Self {
            active: false,
            velocity: 0.8,
            note_degree: 0,
            param_mod: 0.0,
        }
    }
}

impl Step {
    pub fn on(velocity: f32, note_degree: i32) -> Self {
        Self {
            active: true,
            velocity,
            note_degree,
            param_mod: 0.0,
        }
    }

    fn sanitize(&mut self) {
        self.velocity = clamp_unit(self.velocity);
        self.note_degree = self.note_degree.max(0);
        self.param_mod = clamp_finite(self.param_mod, -1.0, 1.0);
    }
}

/// An independently cycling pattern lane bound to one voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    // Reassigned whenever a track is (re)created inside a session.
    #[serde(skip)]
    pub id: TrackId,
    pub voice_type: VoiceType,
    pub steps: Vec<Step>,
    pub muted: bool,
    pub volume: f32,
    pub pan: f32, // -1.0 (left) to 1.0 (right)
    pub filter_cutoff: f32,
    pub filter_resonance: f32,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub reverb_send: f32,
    pub delay_send: f32,
    pub pitch_offset: i32, // semitones
    pub evolution_rate: f32,
    pub density: f32,
    #[serde(skip)]
    pub current_step_index: usize,
}

impl Track {
    pub fn new(id: TrackId, voice_type: VoiceType, step_count: Option<usize>) -> Self {
        let count = step_count
            .unwrap_or_else(|| voice_type.default_step_count())
            .clamp(MIN_STEPS, MAX_STEPS);

        // (cutoff, resonance, attack, decay, sustain, release, reverb, delay, density)
        let (cutoff, res, a, d, s, r, rev, dly, density) = match voice_type {
            VoiceType::Kick => (0.55, 0.1, 0.0, 0.25, 0.0, 0.1, 0.05, 0.0, 0.3),
            VoiceType::Snare => (0.7, 0.2, 0.0, 0.15, 0.0, 0.1, 0.2, 0.05, 0.25),
            VoiceType::HiHat => (0.9, 0.1, 0.0, 0.1, 0.0, 0.05, 0.1, 0.1, 0.6),
            VoiceType::Bass => (0.35, 0.3, 0.01, 0.3, 0.6, 0.1, 0.0, 0.0, 0.5),
            VoiceType::Lead => (0.6, 0.25, 0.02, 0.3, 0.5, 0.25, 0.25, 0.3, 0.45),
            VoiceType::Pad => (0.45, 0.15, 0.6, 0.5, 0.7, 0.7, 0.6, 0.2, 0.2),
            VoiceType::Perc => (0.75, 0.2, 0.0, 0.12, 0.0, 0.08, 0.15, 0.2, 0.4),
            VoiceType::Acid => (0.3, 0.75, 0.0, 0.25, 0.4, 0.08, 0.05, 0.2, 0.55),
        };

        Self {
            id,
            voice_type,
            steps: vec![Step::default(); count],
            muted: false,
            volume: 0.7,
            pan: 0.0,
            filter_cutoff: cutoff,
            filter_resonance: res,
            attack: a,
            decay: d,
            sustain: s,
            release: r,
            reverb_send: rev,
            delay_send: dly,
            pitch_offset: voice_type.default_pitch_offset(),
            evolution_rate: 0.3,
            density,
            current_step_index: 0,
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Resize the pattern, keeping existing steps in place.
    pub fn set_step_count(&mut self, count: usize) {
        let count = count.clamp(MIN_STEPS, MAX_STEPS);
        self.steps.resize(count, Step::default());
        if self.current_step_index >= count {
            self.current_step_index = 0;
        }
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn set_step(&mut self, index: usize, step: Step) {
        if let Some(s) = self.steps.get_mut(index) {
            *s = step;
            s.sanitize();
        }
    }

    pub fn toggle_step(&mut self, index: usize) {
        if let Some(s) = self.steps.get_mut(index) {
            s.active = !s.active;
        }
    }

    pub fn clear(&mut self) {
        for s in &mut self.steps {
            s.active = false;
        }
    }

    /// Rotate the pattern; positive `by` moves steps later in the cycle.
    pub fn shift(&mut self, by: i32) {
        let len = self.steps.len() as i32;
        if len == 0 {
            return;
        }
        let k = by.rem_euclid(len) as usize;
        self.steps.rotate_right(k);
    }

    pub fn active_count(&self) -> usize {
        self.steps.iter().filter(|s| s.active).count()
    }

    pub fn has_active_step(&self) -> bool {
        self.steps.iter().any(|s| s.active)
    }

    /// Clamp every field into its documented range. Used after edits and on
    /// preset load.
    pub fn sanitize(&mut self) {
        if self.steps.len() < MIN_STEPS || self.steps.len() > MAX_STEPS {
            let len = self.steps.len();
            self.set_step_count(len);
        }
        for s in &mut self.steps {
            s.sanitize();
        }
        if self.current_step_index >= self.steps.len() {
            self.current_step_index = 0;
        }
        self.volume = clamp_unit(self.volume);
        self.pan = clamp_finite(self.pan, -1.0, 1.0);
        self.filter_cutoff = clamp_unit(self.filter_cutoff);
        self.filter_resonance = clamp_unit(self.filter_resonance);
        self.attack = clamp_unit(self.attack);
        self.decay = clamp_unit(self.decay);
        self.sustain = clamp_unit(self.sustain);
        self.release = clamp_unit(self.release);
        self.reverb_send = clamp_unit(self.reverb_send);
        self.delay_send = clamp_unit(self.delay_send);
        self.pitch_offset = self.pitch_offset.clamp(-48, 48);
        self.evolution_rate = clamp_unit(self.evolution_rate);
        self.density = clamp_unit(self.density);
    }
}

pub(crate) fn clamp_unit(v: f32) -> f32 {
    clamp_finite(v, 0.0, 1.0)
}

// NaN collapses to the lower bound.
pub(crate) fn clamp_finite(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() {
        lo
    } else {
        v.clamp(lo, hi)
    }
}

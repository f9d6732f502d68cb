use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::envelope::{Adsr, Envelope, Stage};
use crate::atomic::AtomicF32;

/// Sound archetype of a track's voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceType {
    Kick,
    Snare,
    HiHat,
    Bass,
    Lead,
    Pad,
    Perc,
    Acid,
}

/// Parameter families used when drawing random sound settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceFamily {
    Percussive,
    BassLike,
    Lead,
    Pad,
}

impl VoiceType {
    pub const ALL: [VoiceType; 8] = [
        VoiceType::Kick,
        VoiceType::Snare,
        VoiceType::HiHat,
        VoiceType::Bass,
        VoiceType::Lead,
        VoiceType::Pad,
        VoiceType::Perc,
        VoiceType::Acid,
    ];

    /// Percussive voices never hold Sustain and ignore the scale.
    pub fn is_percussive(self) -> bool {
        matches!(
            self,
            VoiceType::Kick | VoiceType::Snare | VoiceType::HiHat | VoiceType::Perc
        )
    }

    pub fn family(self) -> VoiceFamily {
        match self {
            VoiceType::Kick | VoiceType::Snare | VoiceType::HiHat | VoiceType::Perc => {
                VoiceFamily::Percussive
            }
            VoiceType::Bass | VoiceType::Acid => VoiceFamily::BassLike,
            VoiceType::Lead => VoiceFamily::Lead,
            VoiceType::Pad => VoiceFamily::Pad,
        }
    }

    pub fn default_step_count(self) -> usize {
        match self {
            VoiceType::Kick => 16,
            VoiceType::Snare => 16,
            VoiceType::HiHat => 12,
            VoiceType::Bass => 7,
            VoiceType::Lead => 5,
            VoiceType::Pad => 8,
            VoiceType::Perc => 9,
            VoiceType::Acid => 11,
        }
    }

    pub fn default_pitch_offset(self) -> i32 {
        match self {
            VoiceType::Kick | VoiceType::Bass | VoiceType::Acid => -12,
            VoiceType::HiHat | VoiceType::Lead | VoiceType::Perc => 12,
            VoiceType::Snare | VoiceType::Pad => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VoiceType::Kick => "kick",
            VoiceType::Snare => "snare",
            VoiceType::HiHat => "hihat",
            VoiceType::Bass => "bass",
            VoiceType::Lead => "lead",
            VoiceType::Pad => "pad",
            VoiceType::Perc => "perc",
            VoiceType::Acid => "acid",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name() == name || (name == "hi_hat" && *v == VoiceType::HiHat))
    }

    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(v: u8) -> Self {
        Self::ALL.get(v as usize).copied().unwrap_or(VoiceType::Lead)
    }
}

/// Cutoff in Hz for a normalized cutoff parameter, modulated by a step's
/// `param_mod`.
pub fn filter_cutoff_hz(cutoff: f32, param_mod: f32, sample_rate: f32) -> f32 {
    let c = (cutoff + param_mod * 0.3).clamp(0.0, 1.0);
    (20.0 + c * c * c * 18000.0).min(0.45 * sample_rate)
}

/// Damping term of the filter; lower values ring more.
pub fn resonance_damping(resonance: f32) -> f32 {
    (1.0 - resonance * 0.8).max(0.15)
}

/// State shared between the control/tick threads and the rendering voice.
///
/// Every field is a plain atomic scalar; writers never block the audio thread.
#[derive(Debug)]
pub struct VoiceControl {
    voice_type: AtomicU8,
    cutoff: AtomicF32,
    resonance: AtomicF32,
    attack: AtomicF32,
    decay: AtomicF32,
    sustain: AtomicF32,
    release: AtomicF32,
    param_mod: AtomicF32,
    // Latched by `note_on`, picked up by the renderer when `note_on_seq` moves.
    frequency: AtomicF32,
    velocity: AtomicF32,
    note_on_seq: AtomicU32,
    note_off_seq: AtomicU32,
    // `note_on_seq` as it stood when the last note-off was issued.
    note_off_after: AtomicU32,
    sounding: AtomicBool,
}

impl VoiceControl {
    fn new(voice_type: VoiceType) -> Self {
        let adsr = Adsr::default();
        Self {
            voice_type: AtomicU8::new(voice_type.to_u8()),
            cutoff: AtomicF32::new(0.6),
            resonance: AtomicF32::new(0.2),
            attack: AtomicF32::new(adsr.attack),
            decay: AtomicF32::new(adsr.decay),
            sustain: AtomicF32::new(adsr.sustain),
            release: AtomicF32::new(adsr.release),
            param_mod: AtomicF32::new(0.0),
            frequency: AtomicF32::new(0.0),
            velocity: AtomicF32::new(0.0),
            note_on_seq: AtomicU32::new(0),
            note_off_seq: AtomicU32::new(0),
            note_off_after: AtomicU32::new(0),
            sounding: AtomicBool::new(false),
        }
    }

    fn adsr(&self) -> Adsr {
        Adsr {
            attack: self.attack.load(),
            decay: self.decay.load(),
            sustain: self.sustain.load(),
            release: self.release.load(),
        }
    }
}

/// Cheap, cloneable handle for driving a voice from outside the audio thread.
#[derive(Debug, Clone)]
pub struct VoiceHandle(Arc<VoiceControl>);

impl VoiceHandle {
    /// Latch a new note. The voice restarts on its next rendered sample.
    pub fn note_on(&self, frequency: f32, velocity: f32) {
        self.0.frequency.store(frequency.max(0.0));
        self.0.velocity.store(velocity.clamp(0.0, 1.0));
        self.0.note_on_seq.fetch_add(1, Ordering::Release);
    }

    /// Release whatever note was latched before this call. A later
    /// `note_on` is not affected, even if both land in the same block.
    pub fn note_off(&self) {
        let on = self.0.note_on_seq.load(Ordering::Acquire);
        self.0.note_off_after.store(on, Ordering::Relaxed);
        self.0.note_off_seq.fetch_add(1, Ordering::Release);
    }

    pub fn set_param_mod(&self, value: f32) {
        self.0.param_mod.store(value.clamp(-1.0, 1.0));
    }

    pub fn set_voice_type(&self, voice_type: VoiceType) {
        self.0.voice_type.store(voice_type.to_u8(), Ordering::Relaxed);
    }

    pub fn voice_type(&self) -> VoiceType {
        VoiceType::from_u8(self.0.voice_type.load(Ordering::Relaxed))
    }

    pub fn set_filter(&self, cutoff: f32, resonance: f32) {
        self.0.cutoff.store(cutoff.clamp(0.0, 1.0));
        self.0.resonance.store(resonance.clamp(0.0, 1.0));
    }

    pub fn set_adsr(&self, adsr: Adsr) {
        self.0.attack.store(adsr.attack.clamp(0.0, 1.0));
        self.0.decay.store(adsr.decay.clamp(0.0, 1.0));
        self.0.sustain.store(adsr.sustain.clamp(0.0, 1.0));
        self.0.release.store(adsr.release.clamp(0.0, 1.0));
    }

    pub fn adsr(&self) -> Adsr {
        self.0.adsr()
    }

    /// Whether the voice was sounding at the end of its last rendered block.
    pub fn is_sounding(&self) -> bool {
        self.0.sounding.load(Ordering::Relaxed)
    }
}

/// A monophonic synth voice owned by the audio thread.
///
/// `render` never allocates or locks; triggers from other threads arrive
/// through the shared [`VoiceControl`].
pub struct Voice {
    control: Arc<VoiceControl>,
    sample_rate: f32,
    seen_note_on: u32,
    seen_note_off: u32,
    active: bool,
    frequency: f32,
    velocity: f32,
    // Oscillator phases in [0, 1)
    phases: [f32; 4],
    // Filter memory (two integrators)
    filter_lp: f32,
    filter_bp: f32,
    envelope: Envelope,
    noise_state: u32,
    held_noise: f32,
    // Samples since the last trigger
    sample_count: u64,
}

impl Voice {
    pub fn new(voice_type: VoiceType, sample_rate: f32) -> Self {
        Self {
            control: Arc::new(VoiceControl::new(voice_type)),
            sample_rate: sample_rate.max(1.0),
            seen_note_on: 0,
            seen_note_off: 0,
            active: false,
            frequency: 0.0,
            velocity: 0.0,
            phases: [0.0; 4],
            filter_lp: 0.0,
            filter_bp: 0.0,
            envelope: Envelope::default(),
            noise_state: 12345,
            held_noise: 0.0,
            sample_count: 0,
        }
    }

    pub fn handle(&self) -> VoiceHandle {
        VoiceHandle(Arc::clone(&self.control))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stage(&self) -> Stage {
        self.envelope.stage()
    }

    pub fn level(&self) -> f32 {
        self.envelope.level()
    }

    pub fn voice_type(&self) -> VoiceType {
        VoiceType::from_u8(self.control.voice_type.load(Ordering::Relaxed))
    }

    /// Hard-restart the voice at `frequency`.
    pub fn note_on(&mut self, frequency: f32, velocity: f32) {
        self.phases = [0.0; 4];
        self.filter_lp = 0.0;
        self.filter_bp = 0.0;
        self.held_noise = 0.0;
        self.sample_count = 0;
        self.frequency = frequency.max(0.0);
        self.velocity = velocity.clamp(0.0, 1.0);
        self.envelope.trigger();
        self.active = true;
    }

    pub fn note_off(&mut self) {
        self.envelope.release();
    }

    /// Fill `out` with one mono sample per frame.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            self.poll_control();
            *sample = if self.active { self.next_sample() } else { 0.0 };
        }
        self.control.sounding.store(self.active, Ordering::Relaxed);
    }

    fn poll_control(&mut self) {
        let on = self.control.note_on_seq.load(Ordering::Acquire);
        if on != self.seen_note_on {
            self.seen_note_on = on;
            let frequency = self.control.frequency.load();
            let velocity = self.control.velocity.load();
            self.note_on(frequency, velocity);
        }
        let off = self.control.note_off_seq.load(Ordering::Acquire);
        if off != self.seen_note_off {
            let after = self.control.note_off_after.load(Ordering::Relaxed);
            let ahead = after.wrapping_sub(self.seen_note_on) as i32;
            if ahead > 0 {
                // Issued after a note-on this voice has not picked up yet.
                return;
            }
            self.seen_note_off = off;
            if ahead == 0 {
                self.note_off();
            }
        }
    }

    fn next_sample(&mut self) -> f32 {
        let voice_type = self.voice_type();
        let adsr = self.control.adsr();
        let param_mod = self.control.param_mod.load();

        let level = self
            .envelope
            .advance(&adsr, voice_type.is_percussive(), self.sample_rate);
        if self.envelope.is_idle() {
            self.active = false;
            return 0.0;
        }

        let raw = self.raw(voice_type, &adsr, param_mod);

        let cutoff = filter_cutoff_hz(self.control.cutoff.load(), param_mod, self.sample_rate);
        let q = resonance_damping(self.control.resonance.load());
        let filtered = self.svf_tick(raw, cutoff, q);

        self.sample_count += 1;
        (filtered * level * self.velocity).tanh()
    }

    // ──────────────── Helpers ────────────────

    fn time(&self) -> f32 {
        self.sample_count as f32 / self.sample_rate
    }

    /// Return the current phase of oscillator `i`, then advance it.
    #[inline]
    fn osc(&mut self, i: usize, frequency: f32) -> f32 {
        let p = self.phases[i];
        self.phases[i] += frequency / self.sample_rate;
        if self.phases[i] >= 1.0 {
            self.phases[i] -= self.phases[i].floor();
        }
        p
    }

    fn sine(&mut self, i: usize, frequency: f32) -> f32 {
        (self.osc(i, frequency) * 2.0 * PI).sin()
    }

    fn saw(&mut self, i: usize, frequency: f32) -> f32 {
        let dt = frequency / self.sample_rate;
        let p = self.osc(i, frequency);
        2.0 * p - 1.0 - Self::poly_blep(p, dt)
    }

    fn pulse(&mut self, i: usize, frequency: f32, width: f32) -> f32 {
        let dt = frequency / self.sample_rate;
        let p = self.osc(i, frequency);
        let mut s = if p < width { 1.0 } else { -1.0 };
        s += Self::poly_blep(p, dt);
        s -= Self::poly_blep((p + (1.0 - width)) % 1.0, dt);
        s
    }

    fn xorshift(&mut self) -> f32 {
        self.noise_state ^= self.noise_state << 13;
        self.noise_state ^= self.noise_state >> 17;
        self.noise_state ^= self.noise_state << 5;
        (self.noise_state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    /// PolyBLEP correction term to remove aliasing from discontinuities.
    /// `t` is the normalised phase [0,1), `dt` is phase increment per sample.
    #[inline]
    fn poly_blep(t: f32, dt: f32) -> f32 {
        if dt <= 0.0 {
            0.0
        } else if t < dt {
            let t = t / dt;
            2.0 * t - t * t - 1.0
        } else if t > 1.0 - dt {
            let t = (t - 1.0) / dt;
            t * t + 2.0 * t + 1.0
        } else {
            0.0
        }
    }

    /// Two-integrator state-variable low-pass.
    fn svf_tick(&mut self, input: f32, cutoff: f32, q: f32) -> f32 {
        // Largest coefficient that keeps both poles inside the unit circle.
        let f_max = (q * q + 4.0).sqrt() - q;
        let f = (2.0 * (PI * cutoff / self.sample_rate).sin()).min(f_max * 0.98);
        self.filter_lp += f * self.filter_bp;
        let hp = input - self.filter_lp - q * self.filter_bp;
        self.filter_bp += f * hp;
        self.filter_lp
    }

    // ──────────────── Archetypes ────────────────

    fn raw(&mut self, voice_type: VoiceType, adsr: &Adsr, param_mod: f32) -> f32 {
        match voice_type {
            VoiceType::Kick => self.kick(),
            VoiceType::Snare => self.snare(),
            VoiceType::HiHat => self.hihat(adsr.decay),
            VoiceType::Bass => self.bass(param_mod),
            VoiceType::Lead => self.lead(),
            VoiceType::Pad => self.pad(),
            VoiceType::Perc => self.perc(param_mod),
            VoiceType::Acid => self.acid(),
        }
    }

    /// Sine with a falling pitch sweep, a sub an octave down and a click.
    fn kick(&mut self) -> f32 {
        let t = self.time();
        let sweep = (-t / 0.04).exp(); // mostly settled after ~150 ms
        let f = self.frequency;
        let body = self.sine(0, f * (1.0 + 3.0 * sweep));
        let sub = self.sine(1, f * 0.5);
        let click = self.xorshift() * (-t / 0.002).exp();
        (body * 0.9 + sub * 0.5 + click * 0.4).tanh()
    }

    /// Tone at 2.5x plus noise held for two samples at a time.
    fn snare(&mut self) -> f32 {
        let t = self.time();
        if self.sample_count % 2 == 0 {
            self.held_noise = self.xorshift();
        }
        let tone = self.sine(0, self.frequency * 2.5) * (-t / 0.06).exp();
        let noise = self.held_noise * (-t / 0.12).exp();
        tone * 0.45 + noise * 0.8
    }

    /// White noise with two close metallic partials.
    fn hihat(&mut self, decay: f32) -> f32 {
        let t = self.time();
        let tau = 0.015 + decay * 0.25;
        let f = self.frequency;
        let noise = self.xorshift();
        let metal = self.sine(0, f * 14.0) + self.sine(1, f * 17.3);
        (noise * 0.7 + metal * 0.15) * (-t / tau).exp()
    }

    /// Saw + pulse on one phase, sine sub an octave down.
    fn bass(&mut self, param_mod: f32) -> f32 {
        let f = self.frequency;
        let dt = f / self.sample_rate;
        let width = 0.5 + param_mod * 0.2;
        let p = self.osc(0, f);
        let saw = 2.0 * p - 1.0 - Self::poly_blep(p, dt);
        let mut pulse = if p < width { 1.0 } else { -1.0 };
        pulse += Self::poly_blep(p, dt);
        pulse -= Self::poly_blep((p + (1.0 - width)) % 1.0, dt);
        let sub = self.sine(1, f * 0.5);
        saw * 0.45 + pulse * 0.3 + sub * 0.5
    }

    /// Three saws, centre and +/-0.5%.
    fn lead(&mut self) -> f32 {
        let f = self.frequency;
        let s = self.saw(0, f) + self.saw(1, f * 1.005) + self.saw(2, f * 0.995);
        s / 3.0
    }

    /// Three near-unison sines and a quiet third harmonic.
    fn pad(&mut self) -> f32 {
        let f = self.frequency;
        let body = self.sine(0, f) + self.sine(1, f * 1.003) + self.sine(2, f * 0.997);
        let shimmer = self.sine(3, f * 3.0);
        body / 3.0 + shimmer * 0.08
    }

    /// Two-operator FM with a modulation index that dies out over 100 ms.
    fn perc(&mut self, param_mod: f32) -> f32 {
        let t = self.time();
        let f = self.frequency;
        let mod_freq = 4.0 * f * (2.7 + param_mod * 2.0);
        let depth = 2.5 * (1.0 - t / 0.1).max(0.0);
        let modulator = self.sine(1, mod_freq);
        let p = self.osc(0, f);
        ((p + depth * modulator) * 2.0 * PI).sin()
    }

    /// Saw with a half-level pulse sub; meant to be driven into the filter.
    fn acid(&mut self) -> f32 {
        let f = self.frequency;
        let saw = self.saw(0, f);
        let sub = self.pulse(1, f * 0.5, 0.5);
        saw + sub * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn voice(voice_type: VoiceType, adsr: Adsr) -> Voice {
        let v = Voice::new(voice_type, SR);
        v.handle().set_adsr(adsr);
        v
    }

    fn render_secs(v: &mut Voice, secs: f32) -> Vec<f32> {
        let mut buf = vec![0.0; (secs * SR) as usize];
        v.render(&mut buf);
        buf
    }

    #[test]
    fn test_idle_voice_renders_silence() {
        let mut v = Voice::new(VoiceType::Lead, SR);
        let mut buf = vec![1.0f32; 256];
        v.render(&mut buf);
        assert!(buf.iter().all(|s| *s == 0.0));
        assert!(!v.is_active());
    }

    #[test]
    fn test_every_archetype_is_bounded_and_audible() {
        for vt in VoiceType::ALL {
            let mut v = voice(vt, Adsr { attack: 0.0, decay: 0.3, sustain: 0.8, release: 0.1 });
            v.handle().set_filter(0.9, 0.3);
            v.note_on(110.0, 1.0);
            let buf = render_secs(&mut v, 0.1);
            assert!(buf.iter().all(|s| s.is_finite() && s.abs() <= 1.0), "{:?}", vt);
            assert!(buf.iter().any(|s| s.abs() > 0.01), "{:?} is silent", vt);
        }
    }

    #[test]
    fn test_melodic_note_off_goes_straight_to_release() {
        let mut v = voice(VoiceType::Pad, Adsr { attack: 0.5, decay: 0.5, sustain: 0.7, release: 0.1 });
        v.note_on(220.0, 0.8);
        assert_eq!(v.stage(), Stage::Attack);
        v.note_off();
        assert_eq!(v.stage(), Stage::Release);
        let mut saw_sustain = false;
        let mut buf = [0.0f32; 64];
        for _ in 0..(SR as usize * 3 / 64) {
            v.render(&mut buf);
            saw_sustain |= v.stage() == Stage::Sustain;
        }
        assert!(!saw_sustain);
        assert_eq!(v.stage(), Stage::Idle);
        assert!(!v.is_active());
    }

    #[test]
    fn test_percussive_releases_without_note_off() {
        let mut v = voice(VoiceType::Kick, Adsr { attack: 0.0, decay: 0.1, sustain: 0.5, release: 0.05 });
        v.note_on(55.0, 1.0);
        let mut reached_release = false;
        let mut buf = [0.0f32; 32];
        for _ in 0..(SR as usize / 32) {
            v.render(&mut buf);
            reached_release |= v.stage() == Stage::Release;
        }
        assert!(reached_release);
        assert_eq!(v.stage(), Stage::Idle);
    }

    #[test]
    fn test_melodic_sustains_until_note_off() {
        let mut v = voice(VoiceType::Bass, Adsr { attack: 0.0, decay: 0.05, sustain: 0.6, release: 0.05 });
        v.note_on(55.0, 1.0);
        render_secs(&mut v, 1.0);
        assert_eq!(v.stage(), Stage::Sustain);
        assert!(v.is_active());
    }

    #[test]
    fn test_handle_trigger_is_picked_up_on_render() {
        let mut v = Voice::new(VoiceType::Lead, SR);
        let h = v.handle();
        h.note_on(440.0, 0.9);
        assert!(!v.is_active());
        let mut buf = [0.0f32; 16];
        v.render(&mut buf);
        assert!(v.is_active());
        assert!(h.is_sounding());
        h.note_off();
        v.render(&mut buf);
        assert_eq!(v.stage(), Stage::Release);
    }

    #[test]
    fn test_note_on_after_note_off_in_one_block_still_sounds() {
        let mut v = voice(VoiceType::Pad, Adsr { attack: 0.5, decay: 0.5, sustain: 0.7, release: 0.1 });
        let h = v.handle();
        h.note_off();
        h.note_on(220.0, 1.0);
        let mut buf = [0.0f32; 64];
        v.render(&mut buf);
        assert_eq!(v.stage(), Stage::Attack);
        assert!(v.is_active());
    }

    #[test]
    fn test_note_off_after_note_on_in_one_block_releases() {
        let mut v = voice(VoiceType::Pad, Adsr { attack: 0.5, decay: 0.5, sustain: 0.7, release: 0.5 });
        let h = v.handle();
        h.note_on(220.0, 1.0);
        let mut buf = [0.0f32; 64];
        v.render(&mut buf);
        h.note_on(330.0, 1.0);
        h.note_off();
        v.render(&mut buf);
        assert_eq!(v.stage(), Stage::Release);
        // A stale release must not swallow the next trigger
        h.note_on(440.0, 1.0);
        v.render(&mut buf);
        assert_eq!(v.stage(), Stage::Attack);
    }

    #[test]
    fn test_retrigger_restarts_attack() {
        let mut v = voice(VoiceType::Lead, Adsr { attack: 0.0, decay: 0.0, sustain: 1.0, release: 0.2 });
        v.note_on(220.0, 1.0);
        render_secs(&mut v, 0.05);
        assert_eq!(v.stage(), Stage::Sustain);
        v.note_on(330.0, 1.0);
        assert_eq!(v.stage(), Stage::Attack);
        assert_eq!(v.level(), 0.0);
    }

    #[test]
    fn test_filter_cutoff_mapping() {
        assert!((filter_cutoff_hz(0.0, 0.0, SR) - 20.0).abs() < 1e-3);
        assert!((filter_cutoff_hz(1.0, 0.0, SR) - 18020.0).abs() < 1e-2);
        // capped below Nyquist at low sample rates
        assert!((filter_cutoff_hz(1.0, 0.0, 22050.0) - 0.45 * 22050.0).abs() < 1e-2);
        let mid = filter_cutoff_hz(0.5, 0.0, SR);
        assert!((mid - (20.0 + 0.125 * 18000.0)).abs() < 1e-2);
        // param_mod pushes the cutoff up by 0.3 per unit
        assert!(filter_cutoff_hz(0.5, 1.0, SR) > mid);
        assert_eq!(filter_cutoff_hz(0.1, -1.0, SR), 20.0);
    }

    #[test]
    fn test_resonance_damping_floor() {
        assert_eq!(resonance_damping(0.0), 1.0);
        assert!((resonance_damping(0.5) - 0.6).abs() < 1e-6);
        assert_eq!(resonance_damping(1.0), 0.2);
        assert_eq!(resonance_damping(5.0), 0.15);
    }

    #[test]
    fn test_voice_type_names() {
        for vt in VoiceType::ALL {
            assert_eq!(VoiceType::from_name(vt.name()), Some(vt));
            assert_eq!(VoiceType::from_u8(vt.to_u8()), vt);
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::pattern::track::clamp_unit;
use crate::pattern::ScaleKind;

pub const MIN_BPM: f32 = 40.0;
pub const MAX_BPM: f32 = 300.0;
pub const MIN_ROOT_NOTE: i32 = 24;
pub const MAX_ROOT_NOTE: i32 = 72;
pub const MIN_EVOLUTION_INTERVAL: u32 = 1;
pub const MAX_EVOLUTION_INTERVAL: u32 = 16;

/// Global session parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub sample_rate: u32,
    pub bpm: f32,
    pub scale: ScaleKind,
    pub root_note: i32,
    pub swing: f32,
    /// Beats between automatic evolution passes.
    pub evolution_interval: u32,
    pub evolution_enabled: bool,
    pub master_reverb: f32,
    pub master_delay: f32,
    /// Fixed RNG seed for reproducible generation; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bpm: 120.0,
            scale: ScaleKind::Minor,
            root_note: 48,
            swing: 0.0,
            evolution_interval: 4,
            evolution_enabled: false,
            master_reverb: 0.3,
            master_delay: 0.25,
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn clamp_bpm(bpm: f32) -> f32 {
        if bpm.is_nan() {
            return 120.0;
        }
        bpm.clamp(MIN_BPM, MAX_BPM)
    }

    pub fn clamp_root_note(note: i32) -> i32 {
        note.clamp(MIN_ROOT_NOTE, MAX_ROOT_NOTE)
    }

    pub fn clamp_swing(swing: f32) -> f32 {
        clamp_unit(swing)
    }

    pub fn clamp_evolution_interval(beats: u32) -> u32 {
        beats.clamp(MIN_EVOLUTION_INTERVAL, MAX_EVOLUTION_INTERVAL)
    }

    pub fn sanitize(&mut self) {
        self.sample_rate = self.sample_rate.clamp(8000, 192_000);
        self.bpm = Self::clamp_bpm(self.bpm);
        self.root_note = Self::clamp_root_note(self.root_note);
        self.swing = Self::clamp_swing(self.swing);
        self.evolution_interval = Self::clamp_evolution_interval(self.evolution_interval);
        self.master_reverb = clamp_unit(self.master_reverb);
        self.master_delay = clamp_unit(self.master_delay);
    }

    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SessionConfig::default();
        assert_eq!(c.sample_rate, 44100);
        assert_eq!(c.bpm, 120.0);
        assert_eq!(c.scale, ScaleKind::Minor);
        assert!(!c.evolution_enabled);
    }

    #[test]
    fn test_sanitize_clamps() {
        let c = SessionConfig {
            bpm: 900.0,
            root_note: 3,
            swing: -1.0,
            evolution_interval: 0,
            master_reverb: 4.0,
            ..SessionConfig::default()
        }
        .sanitized();
        assert_eq!(c.bpm, MAX_BPM);
        assert_eq!(c.root_note, MIN_ROOT_NOTE);
        assert_eq!(c.swing, 0.0);
        assert_eq!(c.evolution_interval, 1);
        assert_eq!(c.master_reverb, 1.0);
        assert_eq!(SessionConfig::clamp_bpm(f32::NAN), 120.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: SessionConfig = serde_json::from_str(r#"{"bpm": 96.0, "scale": "dorian"}"#).unwrap();
        assert_eq!(c.bpm, 96.0);
        assert_eq!(c.scale, ScaleKind::Dorian);
        assert_eq!(c.root_note, 48);
    }
}

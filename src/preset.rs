use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::pattern::track::clamp_unit;
use crate::pattern::{ScaleKind, Track};

/// Serializable snapshot of a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    #[serde(default)]
    pub name: String,
    pub bpm: f32,
    pub scale: ScaleKind,
    pub root_note: i32,
    pub swing_amount: f32,
    pub master_reverb: f32,
    pub master_delay: f32,
    pub tracks: Vec<Track>,
}

impl Preset {
    /// Clamp every global and per-track value into range.
    pub fn sanitize(&mut self) {
        self.bpm = SessionConfig::clamp_bpm(self.bpm);
        self.root_note = SessionConfig::clamp_root_note(self.root_note);
        self.swing_amount = SessionConfig::clamp_swing(self.swing_amount);
        self.master_reverb = clamp_unit(self.master_reverb);
        self.master_delay = clamp_unit(self.master_delay);
        for track in self.tracks.iter_mut() {
            track.sanitize();
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut preset: Preset = serde_json::from_str(json)?;
        preset.sanitize();
        Ok(preset)
    }

    // Parent directories are created as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), tracks = self.tracks.len(), "saved preset");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let preset = Self::from_json(&data)?;
        tracing::info!(path = %path.display(), name = %preset.name, "loaded preset");
        Ok(preset)
    }
}

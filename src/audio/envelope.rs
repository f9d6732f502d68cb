/// Envelope stage of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Normalized ADSR settings, each 0.0 to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for Adsr {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.2,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

const RELEASE_FLOOR: f32 = 0.0001;
// ln(1 / RELEASE_FLOOR): time constants needed to fall from full scale to the floor.
const RELEASE_TIME_CONSTANTS: f32 = 9.21034;
const DECAY_TOLERANCE: f32 = 0.001;

impl Adsr {
    pub fn attack_samples(&self, sample_rate: f32) -> f32 {
        (self.attack * 0.5).max(0.001) * sample_rate
    }

    pub fn decay_samples(&self, sample_rate: f32) -> f32 {
        (self.decay * 1.0).max(0.01) * sample_rate
    }

    /// Length of the release tail; the voice is idle once it has elapsed.
    pub fn release_samples(&self, sample_rate: f32) -> f32 {
        (self.release * 2.0).max(0.01) * sample_rate
    }
}

/// Per-sample ADSR state machine.
///
/// `Idle -> Attack -> Decay -> Sustain -> Release -> Idle`. Percussive voices
/// pass straight through Sustain into Release.
#[derive(Debug, Clone, Copy, Default)]
pub struct Envelope {
    stage: Stage,
    level: f32,
    stage_samples: u32,
}

impl Envelope {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn samples_in_stage(&self) -> u32 {
        self.stage_samples
    }

    /// Hard restart from silence.
    pub fn trigger(&mut self) {
        self.level = 0.0;
        self.enter(Stage::Attack);
    }

    /// Force Release from any sounding stage.
    pub fn release(&mut self) {
        if self.stage != Stage::Idle {
            self.enter(Stage::Release);
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.stage_samples = 0;
    }

    /// Advance one sample and return the new level.
    pub fn advance(&mut self, adsr: &Adsr, percussive: bool, sample_rate: f32) -> f32 {
        self.stage_samples = self.stage_samples.saturating_add(1);
        match self.stage {
            Stage::Idle => {
                self.level = 0.0;
            }
            Stage::Attack => {
                self.level += 1.0 / adsr.attack_samples(sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.enter(Stage::Decay);
                }
            }
            Stage::Decay => {
                let target = adsr.sustain;
                self.level -= (1.0 - target) / adsr.decay_samples(sample_rate);
                if self.level <= target + DECAY_TOLERANCE {
                    self.level = target;
                    self.enter(Stage::Sustain);
                }
            }
            Stage::Sustain => {
                self.level = adsr.sustain;
                if percussive {
                    self.enter(Stage::Release);
                }
            }
            Stage::Release => {
                let length = adsr.release_samples(sample_rate);
                self.level -= self.level * (RELEASE_TIME_CONSTANTS / length).min(1.0);
                if self.level < RELEASE_FLOOR || self.stage_samples as f32 >= length.floor() {
                    self.level = 0.0;
                    self.enter(Stage::Idle);
                }
            }
        }
        self.level
    }
}

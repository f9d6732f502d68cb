pub mod effects;
pub mod engine;
pub mod envelope;
pub mod mixer;
pub mod synth;

pub use engine::AudioEngine;
pub use envelope::{Adsr, Envelope, Stage};
pub use mixer::{ChannelMix, Mixer, MixerHandle};
pub use synth::{Voice, VoiceFamily, VoiceHandle, VoiceType};

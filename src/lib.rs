//! Polyrhythmic step sequencer with a per-track software synthesizer.
//!
//! Tracks of different lengths cycle independently on a shared tick clock.
//! Each track owns one monophonic [`Voice`]; a pattern generator fills and
//! mutates the steps the clock reads.

pub mod atomic;
pub mod audio;
pub mod config;
pub mod error;
pub mod pattern;
pub mod preset;
pub mod sequencer;
pub mod session;

pub use audio::{Adsr, AudioEngine, ChannelMix, Mixer, MixerHandle, Stage, Voice, VoiceHandle, VoiceType};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use pattern::{generator, Scale, ScaleKind, Step, Track, TrackId};
pub use preset::Preset;
pub use sequencer::{SequencerEvent, TICKS_PER_STEP};
pub use session::Session;

pub mod generator;
pub mod scale;
pub mod track;

pub use scale::{midi_to_freq, Scale, ScaleKind};
pub use track::{Step, Track, TrackId, MAX_STEPS, MIN_STEPS};

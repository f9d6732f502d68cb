/// Errors surfaced to the control layer.
///
/// Nothing on the tick or render path returns these; those paths clamp instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no output device found")]
    NoOutputDevice,

    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("no default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to play output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("preset format error: {0}")]
    Preset(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn scheduler thread: {0}")]
    SchedulerSpawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

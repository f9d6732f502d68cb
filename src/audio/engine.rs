use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use parking_lot::Mutex;

use super::mixer::Mixer;
use crate::error::{Error, Result};

/// Live output stream driving a [`Mixer`] from the device callback.
pub struct AudioEngine {
    stream: Mutex<Option<cpal::Stream>>,
}

// Safety: the Stream is only touched through the Mutex and is never moved
// after construction; the audio callback owns everything it renders.
unsafe impl Send for AudioEngine {}
unsafe impl Sync for AudioEngine {}

impl AudioEngine {
    /// Open the default output device at the mixer's sample rate and start
    /// pulling audio from it.
    pub fn start(mut mixer: Mixer) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;

        let supported = device.default_output_config()?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(Error::UnsupportedSampleFormat(format!(
                "{:?}",
                supported.sample_format()
            )));
        }

        let sample_rate = mixer.sample_rate() as u32;
        let channels = supported.channels() as usize;
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            channels,
            "opening audio output"
        );

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                mixer.render_interleaved(data, channels);
            },
            |err| tracing::error!(%err, "audio stream error"),
            None,
        )?;
        stream.play()?;

        Ok(Self {
            stream: Mutex::new(Some(stream)),
        })
    }

    /// Stop and drop the device stream.
    pub fn close(&self) {
        if let Some(stream) = self.stream.lock().take() {
            let _ = stream.pause();
            tracing::info!("audio output closed");
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.close();
    }
}

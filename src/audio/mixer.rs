use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::f32::consts::FRAC_PI_4;

use super::effects::SendBuses;
use super::synth::Voice;
use crate::pattern::TrackId;

/// Hard cap so attaching a voice never reallocates on the audio thread.
pub const MAX_CHANNELS: usize = 64;
/// Frames rendered per inner block.
const BLOCK: usize = 256;

/// Per-track values the host mixer applies to a voice's mono output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMix {
    pub volume: f32,
    pub pan: f32,
    pub reverb_send: f32,
    pub delay_send: f32,
}

impl Default for ChannelMix {
    fn default() -> Self {
        Self {
            volume: 0.7,
            pan: 0.0,
            reverb_send: 0.0,
            delay_send: 0.0,
        }
    }
}

impl ChannelMix {
    /// Equal-power gains for (left, right).
    fn pan_gains(&self) -> (f32, f32) {
        let angle = (self.pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
        (angle.cos(), angle.sin())
    }
}

/// Messages sent from the control thread to the audio thread
pub enum MixerCommand {
    Attach {
        id: TrackId,
        voice: Box<Voice>,
        mix: ChannelMix,
    },
    Detach(TrackId),
    SetMix(TrackId, ChannelMix),
    SetMaster {
        reverb_mix: f32,
        delay_mix: f32,
    },
    SetDelay {
        secs: f32,
        feedback: f32,
    },
    SetMasterVolume(f32),
}

/// Control-side end of the mixer.
#[derive(Clone)]
pub struct MixerHandle {
    tx: Sender<MixerCommand>,
    retired_rx: Receiver<Box<Voice>>,
}

impl MixerHandle {
    fn send(&self, cmd: MixerCommand) -> bool {
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("mixer command queue full, dropping command");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn attach(&self, id: TrackId, voice: Voice, mix: ChannelMix) -> bool {
        self.send(MixerCommand::Attach {
            id,
            voice: Box::new(voice),
            mix,
        })
    }

    pub fn detach(&self, id: TrackId) -> bool {
        self.send(MixerCommand::Detach(id))
    }

    pub fn set_mix(&self, id: TrackId, mix: ChannelMix) -> bool {
        self.send(MixerCommand::SetMix(id, mix))
    }

    pub fn set_master(&self, reverb_mix: f32, delay_mix: f32) -> bool {
        self.send(MixerCommand::SetMaster {
            reverb_mix,
            delay_mix,
        })
    }

    pub fn set_delay(&self, secs: f32, feedback: f32) -> bool {
        self.send(MixerCommand::SetDelay { secs, feedback })
    }

    pub fn set_master_volume(&self, volume: f32) -> bool {
        self.send(MixerCommand::SetMasterVolume(volume))
    }

    /// Free voices the audio thread has let go of. Returns how many.
    pub fn collect_retired(&self) -> usize {
        self.retired_rx.try_iter().count()
    }
}

struct Channel {
    id: TrackId,
    voice: Box<Voice>,
    mix: ChannelMix,
}

/// Audio-side end: owns every attached voice and sums them to stereo.
pub struct Mixer {
    rx: Receiver<MixerCommand>,
    retired_tx: Sender<Box<Voice>>,
    channels: Vec<Channel>,
    buses: SendBuses,
    master_volume: f32,
    sample_rate: f32,
    scratch: Vec<f32>,
    dry_l: Vec<f32>,
    dry_r: Vec<f32>,
    rev_l: Vec<f32>,
    rev_r: Vec<f32>,
    dly_l: Vec<f32>,
    dly_r: Vec<f32>,
}

/// Create a connected (handle, mixer) pair.
pub fn channel(sample_rate: f32) -> (MixerHandle, Mixer) {
    let (tx, rx) = bounded(4096);
    let (retired_tx, retired_rx) = bounded(MAX_CHANNELS * 4);
    let handle = MixerHandle { tx, retired_rx };
    let mixer = Mixer {
        rx,
        retired_tx,
        channels: Vec::with_capacity(MAX_CHANNELS),
        buses: SendBuses::new(sample_rate),
        master_volume: 0.8,
        sample_rate,
        scratch: vec![0.0; BLOCK],
        dry_l: vec![0.0; BLOCK],
        dry_r: vec![0.0; BLOCK],
        rev_l: vec![0.0; BLOCK],
        rev_r: vec![0.0; BLOCK],
        dly_l: vec![0.0; BLOCK],
        dly_r: vec![0.0; BLOCK],
    };
    (handle, mixer)
}

impl Mixer {
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn retire(&self, voice: Box<Voice>) {
        // If the control side is gone or backed up the box drops here; that
        // only happens during teardown.
        let _ = self.retired_tx.try_send(voice);
    }

    pub fn process_commands(&mut self) {
        while let Ok(cmd) = self.rx.try_recv() {
            match cmd {
                MixerCommand::Attach { id, voice, mix } => {
                    if let Some(pos) = self.channels.iter().position(|c| c.id == id) {
                        let old = std::mem::replace(&mut self.channels[pos].voice, voice);
                        self.channels[pos].mix = mix;
                        self.retire(old);
                    } else if self.channels.len() < MAX_CHANNELS {
                        self.channels.push(Channel { id, voice, mix });
                    } else {
                        self.retire(voice);
                    }
                }
                MixerCommand::Detach(id) => {
                    if let Some(pos) = self.channels.iter().position(|c| c.id == id) {
                        let channel = self.channels.swap_remove(pos);
                        self.retire(channel.voice);
                    }
                }
                MixerCommand::SetMix(id, mix) => {
                    if let Some(c) = self.channels.iter_mut().find(|c| c.id == id) {
                        c.mix = mix;
                    }
                }
                MixerCommand::SetMaster {
                    reverb_mix,
                    delay_mix,
                } => {
                    self.buses.set_reverb_mix(reverb_mix);
                    self.buses.set_delay_mix(delay_mix);
                }
                MixerCommand::SetDelay { secs, feedback } => {
                    self.buses.set_delay_time(secs);
                    self.buses.set_delay_feedback(feedback);
                }
                MixerCommand::SetMasterVolume(v) => self.master_volume = v.clamp(0.0, 1.0),
            }
        }
    }

    /// Drain pending commands, then fill an interleaved output buffer.
    /// Channels beyond the first two receive the mono sum.
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        self.process_commands();
        let channels = channels.max(1);
        let total_frames = data.len() / channels;
        let mut done = 0;

        while done < total_frames {
            let n = (total_frames - done).min(BLOCK);
            self.render_block(n);

            for i in 0..n {
                let (wet_l, wet_r) = self
                    .buses
                    .process((self.rev_l[i], self.rev_r[i]), (self.dly_l[i], self.dly_r[i]));
                let l = ((self.dry_l[i] + wet_l) * self.master_volume).clamp(-1.0, 1.0);
                let r = ((self.dry_r[i] + wet_r) * self.master_volume).clamp(-1.0, 1.0);

                let frame = &mut data[(done + i) * channels..(done + i + 1) * channels];
                match frame.len() {
                    1 => frame[0] = (l + r) * 0.5,
                    _ => {
                        frame[0] = l;
                        frame[1] = r;
                        for extra in frame[2..].iter_mut() {
                            *extra = (l + r) * 0.5;
                        }
                    }
                }
            }
            done += n;
        }
    }

    fn render_block(&mut self, n: usize) {
        for buf in [
            &mut self.dry_l,
            &mut self.dry_r,
            &mut self.rev_l,
            &mut self.rev_r,
            &mut self.dly_l,
            &mut self.dly_r,
        ] {
            buf[..n].iter_mut().for_each(|s| *s = 0.0);
        }

        for c in self.channels.iter_mut() {
            c.voice.render(&mut self.scratch[..n]);
            if !c.voice.is_active() && self.scratch[..n].iter().all(|s| *s == 0.0) {
                continue;
            }
            let (gl, gr) = c.mix.pan_gains();
            let vol = c.mix.volume.clamp(0.0, 1.0);
            for i in 0..n {
                let l = self.scratch[i] * vol * gl;
                let r = self.scratch[i] * vol * gr;
                self.dry_l[i] += l;
                self.dry_r[i] += r;
                self.rev_l[i] += l * c.mix.reverb_send;
                self.rev_r[i] += r * c.mix.reverb_send;
                self.dly_l[i] += l * c.mix.delay_send;
                self.dly_r[i] += r * c.mix.delay_send;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth::VoiceType;

    const SR: f32 = 44100.0;

    fn dry_mixer() -> (MixerHandle, Mixer) {
        let (h, m) = channel(SR);
        h.set_master(0.0, 0.0);
        (h, m)
    }

    #[test]
    fn test_attach_and_detach_round_trip() {
        let (h, mut m) = dry_mixer();
        let v = Voice::new(VoiceType::Lead, SR);
        assert!(h.attach(TrackId(1), v, ChannelMix::default()));
        m.process_commands();
        assert_eq!(m.channel_count(), 1);

        h.detach(TrackId(1));
        h.detach(TrackId(99)); // unknown id is ignored
        m.process_commands();
        assert_eq!(m.channel_count(), 0);
        assert_eq!(h.collect_retired(), 1);
    }

    #[test]
    fn test_render_silence_without_notes() {
        let (h, mut m) = dry_mixer();
        h.attach(TrackId(1), Voice::new(VoiceType::Pad, SR), ChannelMix::default());
        let mut data = vec![0.5f32; 1024];
        m.render_interleaved(&mut data, 2);
        assert!(data.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_hard_pan_left() {
        let (h, mut m) = dry_mixer();
        let v = Voice::new(VoiceType::Lead, SR);
        let voice = v.handle();
        h.attach(
            TrackId(1),
            v,
            ChannelMix { volume: 1.0, pan: -1.0, ..ChannelMix::default() },
        );
        voice.note_on(220.0, 1.0);
        let mut data = vec![0.0f32; 2 * 2048];
        m.render_interleaved(&mut data, 2);
        let left: f32 = data.iter().step_by(2).map(|s| s.abs()).sum();
        let right: f32 = data.iter().skip(1).step_by(2).map(|s| s.abs()).sum();
        assert!(left > 1.0);
        assert!(right < 1e-3);
    }

    #[test]
    fn test_mono_output_sums_channels() {
        let (h, mut m) = dry_mixer();
        let v = Voice::new(VoiceType::Bass, SR);
        let voice = v.handle();
        h.attach(TrackId(1), v, ChannelMix::default());
        voice.note_on(110.0, 1.0);
        let mut data = vec![0.0f32; 600];
        m.render_interleaved(&mut data, 1);
        assert!(data.iter().any(|s| s.abs() > 0.0));
        assert!(data.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_reattach_replaces_voice() {
        let (h, mut m) = dry_mixer();
        h.attach(TrackId(3), Voice::new(VoiceType::Kick, SR), ChannelMix::default());
        h.attach(TrackId(3), Voice::new(VoiceType::Snare, SR), ChannelMix::default());
        m.process_commands();
        assert_eq!(m.channel_count(), 1);
        assert_eq!(h.collect_retired(), 1);
    }
}

//! The control surface: track CRUD, transport, global parameters,
//! pattern generation and presets.

use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::path::Path;

use crate::audio::mixer::{self, ChannelMix, Mixer, MixerHandle, MAX_CHANNELS};
use crate::audio::{Adsr, AudioEngine, Voice, VoiceHandle, VoiceType};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::pattern::track::clamp_unit;
use crate::pattern::{generator, Scale, ScaleKind, Track, TrackId};
use crate::preset::Preset;
use crate::sequencer::{Sequencer, SequencerEvent, SharedState};

/// A running sequencer plus the voices it drives.
///
/// Works headless: until [`Session::start_audio`] moves it onto a device, the
/// audio-side [`Mixer`] waits in the session and can be taken for offline
/// rendering with [`Session::take_mixer`].
pub struct Session {
    sequencer: Sequencer,
    mixer: MixerHandle,
    offline: Option<Mixer>,
    engine: Option<AudioEngine>,
    sample_rate: f32,
    master_reverb: f32,
    master_delay: f32,
    next_id: u32,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let config = config.sanitized();
        let sample_rate = config.sample_rate as f32;
        let (handle, mixer) = mixer::channel(sample_rate);
        handle.set_master(config.master_reverb, config.master_delay);

        tracing::debug!(
            bpm = config.bpm,
            scale = config.scale.name(),
            root = config.root_note,
            sample_rate = config.sample_rate,
            "session created"
        );

        Self {
            sequencer: Sequencer::new(SharedState::new(&config)),
            mixer: handle,
            offline: Some(mixer),
            engine: None,
            sample_rate,
            master_reverb: config.master_reverb,
            master_delay: config.master_delay,
            next_id: 1,
        }
    }

    /// Current global parameters as a config value.
    pub fn config(&self) -> SessionConfig {
        let state = self.sequencer.lock();
        SessionConfig {
            sample_rate: self.sample_rate as u32,
            bpm: state.bpm,
            scale: state.scale,
            root_note: state.root_note,
            swing: state.swing,
            evolution_interval: state.evolution_interval,
            evolution_enabled: state.evolution_enabled,
            master_reverb: self.master_reverb,
            master_delay: self.master_delay,
            seed: None,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    // ──────────────────────────────────────────────
    // Audio host
    // ──────────────────────────────────────────────

    /// Open the default output device and hand it the mixer.
    ///
    /// On failure the error is logged and returned; the transport is left
    /// untouched and nothing is retried.
    pub fn start_audio(&mut self) -> Result<()> {
        if self.engine.is_some() {
            return Ok(());
        }
        let Some(mixer) = self.offline.take() else {
            tracing::warn!("mixer already taken for offline rendering, audio output not started");
            return Ok(());
        };
        match AudioEngine::start(mixer) {
            Ok(engine) => {
                self.engine = Some(engine);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to start audio output");
                Err(e)
            }
        }
    }

    pub fn has_audio(&self) -> bool {
        self.engine.is_some()
    }

    /// Take the audio-side mixer to render without a device.
    pub fn take_mixer(&mut self) -> Option<Mixer> {
        self.offline.take()
    }

    /// Free voices the audio side has detached.
    pub fn collect_garbage(&self) -> usize {
        self.mixer.collect_retired()
    }

    // ──────────────────────────────────────────────
    // Tracks
    // ──────────────────────────────────────────────

    /// Create a track and its voice. `None` once the mixer is full.
    pub fn add_track(&mut self, voice_type: VoiceType, step_count: Option<usize>) -> Option<TrackId> {
        if self.sequencer.lock().len() >= MAX_CHANNELS {
            tracing::warn!(max = MAX_CHANNELS, "track limit reached");
            return None;
        }
        let track = Track::new(TrackId::default(), voice_type, step_count);
        let id = self.install(track);
        tracing::debug!(track = %id, voice = voice_type.name(), "added track");
        Some(id)
    }

    pub fn remove_track(&mut self, id: TrackId) -> bool {
        let removed = self.sequencer.lock().remove(id);
        match removed {
            Some((_, voice)) => {
                voice.note_off();
                self.mixer.detach(id);
                self.collect_garbage();
                tracing::debug!(track = %id, "removed track");
                true
            }
            None => false,
        }
    }

    /// Tear down every track and recreate voices for `tracks`.
    pub fn replace_tracks(&mut self, tracks: Vec<Track>) -> Vec<TrackId> {
        let old = self.sequencer.lock().clear();
        for (track, voice) in old {
            voice.note_off();
            self.mixer.detach(track.id);
        }
        self.collect_garbage();

        if tracks.len() > MAX_CHANNELS {
            tracing::warn!(given = tracks.len(), max = MAX_CHANNELS, "dropping tracks over the limit");
        }
        tracks
            .into_iter()
            .take(MAX_CHANNELS)
            .map(|mut track| {
                track.sanitize();
                self.install(track)
            })
            .collect()
    }

    fn install(&mut self, mut track: Track) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        track.id = id;
        track.current_step_index = 0;

        let voice = Voice::new(track.voice_type, self.sample_rate);
        let handle = voice.handle();
        sync_voice(&track, &handle);
        self.mixer.attach(id, voice, channel_mix(&track));
        self.sequencer.lock().insert(track, handle);
        id
    }

    pub fn track(&self, id: TrackId) -> Option<Track> {
        self.sequencer.lock().track(id).cloned()
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.sequencer.lock().tracks().to_vec()
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        self.sequencer.lock().tracks().iter().map(|t| t.id).collect()
    }

    pub fn track_count(&self) -> usize {
        self.sequencer.lock().len()
    }

    /// Whether the track's voice was audible at the end of its last block.
    pub fn is_sounding(&self, id: TrackId) -> bool {
        self.sequencer
            .lock()
            .voice(id)
            .is_some_and(|voice| voice.is_sounding())
    }

    /// Apply `edit` to a track, clamp the result and push it to the voice and
    /// the mixer. Unknown ids are ignored.
    pub fn update_track(&self, id: TrackId, edit: impl FnOnce(&mut Track)) -> bool {
        let mix = {
            let mut state = self.sequencer.lock();
            let Some((track, voice)) = state.entry_mut(id) else {
                return false;
            };
            edit(track);
            track.sanitize();
            sync_voice(track, voice);
            channel_mix(track)
        };
        self.mixer.set_mix(id, mix);
        true
    }

    pub fn set_muted(&self, id: TrackId, muted: bool) -> bool {
        self.update_track(id, |t| t.muted = muted)
    }

    pub fn set_step_count(&self, id: TrackId, count: usize) -> bool {
        self.update_track(id, |t| t.set_step_count(count))
    }

    pub fn toggle_step(&self, id: TrackId, index: usize) -> bool {
        self.update_track(id, |t| t.toggle_step(index))
    }

    // ──────────────────────────────────────────────
    // Transport
    // ──────────────────────────────────────────────

    pub fn start(&mut self) -> Result<()> {
        self.sequencer.start()
    }

    pub fn stop(&mut self) {
        self.sequencer.stop();
    }

    /// Flip the transport; returns whether it is now playing.
    pub fn toggle(&mut self) -> Result<bool> {
        if self.is_playing() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.is_playing())
    }

    pub fn reset(&mut self) {
        self.sequencer.reset();
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_playing()
    }

    pub fn current_steps(&self) -> BTreeMap<TrackId, usize> {
        self.sequencer
            .lock()
            .tracks()
            .iter()
            .map(|t| (t.id, t.current_step_index))
            .collect()
    }

    pub fn global_beat(&self) -> u64 {
        self.sequencer.global_beat()
    }

    /// Run one clock tick by hand while stopped.
    pub fn advance(&mut self, tick: u64) -> bool {
        self.sequencer.advance(tick)
    }

    pub fn poll_events(&self) -> Vec<SequencerEvent> {
        self.sequencer.poll_events()
    }

    // ──────────────────────────────────────────────
    // Global parameters
    // ──────────────────────────────────────────────

    pub fn bpm(&self) -> f32 {
        self.sequencer.lock().bpm
    }

    /// Takes effect on the clock's next tick.
    pub fn set_bpm(&self, bpm: f32) {
        let bpm = SessionConfig::clamp_bpm(bpm);
        self.sequencer.lock().bpm = bpm;
        tracing::debug!(bpm, "tempo changed");
    }

    pub fn scale(&self) -> ScaleKind {
        self.sequencer.lock().scale
    }

    pub fn set_scale(&self, scale: ScaleKind) {
        self.sequencer.lock().scale = scale;
        tracing::debug!(scale = scale.name(), "scale changed");
    }

    pub fn root_note(&self) -> i32 {
        self.sequencer.lock().root_note
    }

    pub fn set_root_note(&self, note: i32) {
        self.sequencer.lock().root_note = SessionConfig::clamp_root_note(note);
    }

    pub fn swing(&self) -> f32 {
        self.sequencer.lock().swing
    }

    pub fn set_swing(&self, swing: f32) {
        self.sequencer.lock().swing = SessionConfig::clamp_swing(swing);
    }

    pub fn evolution_enabled(&self) -> bool {
        self.sequencer.lock().evolution_enabled
    }

    pub fn set_evolution_enabled(&self, enabled: bool) {
        self.sequencer.lock().evolution_enabled = enabled;
        tracing::debug!(enabled, "auto-evolution toggled");
    }

    pub fn set_evolution_interval(&self, beats: u32) {
        self.sequencer.lock().evolution_interval = SessionConfig::clamp_evolution_interval(beats);
    }

    pub fn set_master_reverb(&mut self, mix: f32) {
        self.master_reverb = clamp_unit(mix);
        self.mixer.set_master(self.master_reverb, self.master_delay);
    }

    pub fn set_master_delay(&mut self, mix: f32) {
        self.master_delay = clamp_unit(mix);
        self.mixer.set_master(self.master_reverb, self.master_delay);
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.mixer.set_master_volume(clamp_unit(volume));
    }

    /// Delay time follows the tempo: a dotted eighth.
    pub fn sync_delay_to_tempo(&self) {
        let beat = 60.0 / self.bpm();
        self.mixer.set_delay(beat * 0.75, 0.35);
    }

    // ──────────────────────────────────────────────
    // Pattern generation
    // ──────────────────────────────────────────────

    pub fn randomize_track(&self, id: TrackId) -> bool {
        self.generate(id, |t, s, rng| generator::randomize(t, s, rng))
    }

    pub fn apply_euclidean(&self, id: TrackId, pulses: usize) -> bool {
        self.generate(id, |t, s, rng| generator::apply_euclidean(t, pulses, s, rng))
    }

    pub fn evolve_track(&self, id: TrackId) -> bool {
        self.generate(id, |t, s, rng| generator::evolve(t, s, rng))
    }

    pub fn generate_smart(&self, id: TrackId) -> bool {
        self.generate(id, |t, s, rng| generator::generate_smart(t, s, rng))
    }

    pub fn randomize_parameters(&self, id: TrackId) -> bool {
        let done = self.generate(id, |t, _, rng| generator::randomize_parameters(t, rng));
        if done {
            self.resync_all();
        }
        done
    }

    pub fn randomize_all(&self) {
        self.sequencer
            .lock()
            .with_all(|tracks, s, rng| generator::randomize_all(tracks, s, rng));
        tracing::debug!("randomized all tracks");
    }

    pub fn evolve_all(&self) {
        self.sequencer
            .lock()
            .with_all(|tracks, s, rng| generator::evolve_all(tracks, s, rng));
        tracing::debug!("evolved all tracks");
    }

    pub fn randomize_everything(&self) {
        self.sequencer
            .lock()
            .with_all(|tracks, s, rng| generator::randomize_everything(tracks, s, rng));
        self.resync_all();
        tracing::debug!("randomized patterns and sounds");
    }

    fn generate(
        &self,
        id: TrackId,
        f: impl FnOnce(&mut Track, &Scale, &mut StdRng),
    ) -> bool {
        self.sequencer.lock().with_track(id, f).is_some()
    }

    fn resync_all(&self) {
        let mixes: Vec<(TrackId, ChannelMix)> = {
            let state = self.sequencer.lock();
            state
                .tracks()
                .iter()
                .zip(state.voices())
                .map(|(track, voice)| {
                    sync_voice(track, voice);
                    (track.id, channel_mix(track))
                })
                .collect()
        };
        for (id, mix) in mixes {
            self.mixer.set_mix(id, mix);
        }
    }

    // ──────────────────────────────────────────────
    // Presets
    // ──────────────────────────────────────────────

    pub fn to_preset(&self, name: &str) -> Preset {
        let state = self.sequencer.lock();
        Preset {
            name: name.to_string(),
            bpm: state.bpm,
            scale: state.scale,
            root_note: state.root_note,
            swing_amount: state.swing,
            master_reverb: self.master_reverb,
            master_delay: self.master_delay,
            tracks: state.tracks().to_vec(),
        }
    }

    /// Replace the whole session with `preset`, resuming playback if it was
    /// running before.
    pub fn load_preset(&mut self, mut preset: Preset) -> Result<()> {
        preset.sanitize();
        let was_playing = self.is_playing();
        self.stop();

        {
            let mut state = self.sequencer.lock();
            state.bpm = preset.bpm;
            state.scale = preset.scale;
            state.root_note = preset.root_note;
            state.swing = preset.swing_amount;
        }
        self.master_reverb = preset.master_reverb;
        self.master_delay = preset.master_delay;
        self.mixer.set_master(self.master_reverb, self.master_delay);

        let count = preset.tracks.len();
        self.replace_tracks(preset.tracks);
        tracing::info!(name = %preset.name, tracks = count, "preset applied");

        if was_playing {
            self.start()?;
        }
        Ok(())
    }

    pub fn save_preset(&self, name: &str, path: &Path) -> Result<()> {
        self.to_preset(name).save(path)
    }

    pub fn load_preset_file(&mut self, path: &Path) -> Result<()> {
        let preset = Preset::load(path)?;
        self.load_preset(preset)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.sequencer.stop();
        if let Some(engine) = self.engine.take() {
            engine.close();
        }
    }
}

fn adsr_of(track: &Track) -> Adsr {
    Adsr {
        attack: track.attack,
        decay: track.decay,
        sustain: track.sustain,
        release: track.release,
    }
}

fn channel_mix(track: &Track) -> ChannelMix {
    ChannelMix {
        volume: track.volume,
        pan: track.pan,
        reverb_send: track.reverb_send,
        delay_send: track.delay_send,
    }
}

fn sync_voice(track: &Track, voice: &VoiceHandle) {
    voice.set_voice_type(track.voice_type);
    voice.set_filter(track.filter_cutoff, track.filter_resonance);
    voice.set_adsr(adsr_of(track));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headless() -> Session {
        Session::new(SessionConfig {
            seed: Some(9),
            ..SessionConfig::default()
        })
    }

    #[test]
    fn test_add_and_remove_tracks() {
        let mut s = headless();
        let a = s.add_track(VoiceType::Kick, None).unwrap();
        let b = s.add_track(VoiceType::Bass, Some(40)).unwrap();
        assert_ne!(a, b);
        assert_eq!(s.track(b).unwrap().step_count(), 32);
        assert!(s.remove_track(a));
        assert!(!s.remove_track(a));
        assert_eq!(s.track_ids(), vec![b]);
    }

    #[test]
    fn test_update_track_clamps_and_ignores_unknown() {
        let mut s = headless();
        let id = s.add_track(VoiceType::Lead, Some(5)).unwrap();
        assert!(s.update_track(id, |t| {
            t.volume = 4.0;
            t.pan = -3.0;
        }));
        let t = s.track(id).unwrap();
        assert_eq!(t.volume, 1.0);
        assert_eq!(t.pan, -1.0);
        assert!(!s.update_track(TrackId(999), |t| t.muted = true));
    }

    #[test]
    fn test_update_track_resyncs_voice() {
        let mut s = headless();
        let id = s.add_track(VoiceType::Lead, None).unwrap();
        s.update_track(id, |t| {
            t.voice_type = VoiceType::Acid;
            t.attack = 0.3;
            t.release = 2.0;
        });
        let state = s.sequencer.lock();
        let voice = state.voice(id).unwrap();
        assert_eq!(voice.voice_type(), VoiceType::Acid);
        let track = state.track(id).unwrap();
        assert_eq!(voice.adsr(), adsr_of(track));
        assert_eq!(voice.adsr().release, 1.0);
    }

    #[test]
    fn test_global_setters_clamp() {
        let s = headless();
        s.set_bpm(20.0);
        assert_eq!(s.bpm(), 40.0);
        s.set_root_note(100);
        assert_eq!(s.root_note(), 72);
        s.set_swing(2.0);
        assert_eq!(s.swing(), 1.0);
        s.set_evolution_interval(99);
        assert_eq!(s.config().evolution_interval, 16);
    }

    #[test]
    fn test_generators_keep_a_step_active() {
        let mut s = headless();
        let ids: Vec<_> = VoiceType::ALL
            .iter()
            .filter_map(|vt| s.add_track(*vt, None))
            .collect();
        s.randomize_everything();
        s.evolve_all();
        assert!(s.apply_euclidean(ids[0], 0));
        assert!(!s.generate_smart(TrackId(0)));
        assert!(s.tracks().iter().all(|t| t.has_active_step()));
    }

    #[test]
    fn test_toggle_transport() {
        let mut s = headless();
        s.add_track(VoiceType::HiHat, Some(2));
        assert!(s.toggle().unwrap());
        assert!(!s.toggle().unwrap());
        assert!(!s.is_playing());
    }
}

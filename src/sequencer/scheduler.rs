use parking_lot::{Mutex, MutexGuard};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::clock::{self, StepFire, TickParams};
use super::{EventBus, SequencerEvent};
use crate::audio::synth::VoiceHandle;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::pattern::{generator, Scale, ScaleKind, Track, TrackId};

// Sleep until this close to the target, then spin.
const SPIN_MARGIN: Duration = Duration::from_millis(1);
// Beyond this the clock gives up catching up and restarts from now.
const MAX_LAG: Duration = Duration::from_millis(50);

/// Everything the clock thread reads, guarded by one mutex.
///
/// Tracks and their voice handles are stored side by side; every structural
/// change goes through methods that keep the two in lockstep.
pub struct SharedState {
    tracks: Vec<Track>,
    voices: Vec<VoiceHandle>,
    pub bpm: f32,
    pub scale: ScaleKind,
    pub root_note: i32,
    pub swing: f32,
    pub evolution_enabled: bool,
    pub evolution_interval: u32,
    pub rng: StdRng,
}

impl SharedState {
    pub fn new(config: &SessionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            tracks: Vec::new(),
            voices: Vec::new(),
            bpm: SessionConfig::clamp_bpm(config.bpm),
            scale: config.scale,
            root_note: SessionConfig::clamp_root_note(config.root_note),
            swing: SessionConfig::clamp_swing(config.swing),
            evolution_enabled: config.evolution_enabled,
            evolution_interval: SessionConfig::clamp_evolution_interval(config.evolution_interval),
            rng,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn voices(&self) -> &[VoiceHandle] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn position(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.position(id).map(|i| &self.tracks[i])
    }

    pub fn voice(&self, id: TrackId) -> Option<&VoiceHandle> {
        self.position(id).map(|i| &self.voices[i])
    }

    pub fn entry_mut(&mut self, id: TrackId) -> Option<(&mut Track, &VoiceHandle)> {
        let i = self.position(id)?;
        Some((&mut self.tracks[i], &self.voices[i]))
    }

    pub fn insert(&mut self, track: Track, voice: VoiceHandle) {
        self.tracks.push(track);
        self.voices.push(voice);
    }

    pub fn remove(&mut self, id: TrackId) -> Option<(Track, VoiceHandle)> {
        let i = self.position(id)?;
        Some((self.tracks.remove(i), self.voices.remove(i)))
    }

    pub fn clear(&mut self) -> Vec<(Track, VoiceHandle)> {
        self.tracks.drain(..).zip(self.voices.drain(..)).collect()
    }

    /// Run `f` over every track with the current scale and the shared RNG.
    pub fn with_all<T>(&mut self, f: impl FnOnce(&mut [Track], &Scale, &mut StdRng) -> T) -> T {
        let scale = self.scale.scale();
        f(&mut self.tracks, &scale, &mut self.rng)
    }

    /// Run `f` over one track. `None` for an unknown id.
    pub fn with_track<T>(
        &mut self,
        id: TrackId,
        f: impl FnOnce(&mut Track, &Scale, &mut StdRng) -> T,
    ) -> Option<T> {
        let i = self.position(id)?;
        let scale = self.scale.scale();
        Some(f(&mut self.tracks[i], &scale, &mut self.rng))
    }

    /// One clock tick: fire steps, publish the heartbeat, maybe evolve.
    fn run_tick(&mut self, tick: u64, fires: &mut Vec<StepFire>, beat: &AtomicU64, events: &EventBus) {
        fires.clear();
        let scale = self.scale.scale();
        let params = TickParams {
            scale: &scale,
            root_note: self.root_note,
            swing: self.swing,
        };
        clock::process_tick(tick, &mut self.tracks, &params, fires);

        for fire in fires.iter() {
            if let Some(note) = fire.note {
                let voice = &self.voices[fire.index];
                voice.set_param_mod(note.param_mod);
                voice.note_on(note.frequency, note.velocity);
                tracing::trace!(track = %fire.track, step = fire.step_index, midi = note.midi, "note on");
            }
            events.emit(SequencerEvent::StepChanged {
                track: fire.track,
                step: fire.step_index,
            });
        }

        if clock::is_beat_tick(tick) {
            let n = beat.fetch_add(1, Ordering::Relaxed);
            events.emit(SequencerEvent::Beat(n));
        }

        if self.evolution_enabled
            && tick > 0
            && tick % clock::evolution_period(self.evolution_interval) == 0
        {
            generator::evolve_all(&mut self.tracks, &scale, &mut self.rng);
            tracing::debug!(tick, tracks = self.tracks.len(), "auto-evolved patterns");
            events.emit(SequencerEvent::Evolved { tick });
        }
    }
}

/// Transport: owns the clock thread and the registry it reads.
pub struct Sequencer {
    state: Arc<Mutex<SharedState>>,
    playing: Arc<AtomicBool>,
    beat: Arc<AtomicU64>,
    events: EventBus,
    worker: Option<JoinHandle<()>>,
    // Scratch for ticks driven by hand.
    fires: Vec<StepFire>,
}

impl Sequencer {
    pub fn new(state: SharedState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            playing: Arc::new(AtomicBool::new(false)),
            beat: Arc::new(AtomicU64::new(0)),
            events: EventBus::new(),
            worker: None,
            fires: Vec::with_capacity(32),
        }
    }

    /// Lock the registry. The clock thread takes the same lock once per tick.
    pub fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn global_beat(&self) -> u64 {
        self.beat.load(Ordering::Relaxed)
    }

    pub fn poll_events(&self) -> Vec<SequencerEvent> {
        self.events.drain()
    }

    /// Start the clock from tick 0. No-op while already playing.
    pub fn start(&mut self) -> Result<()> {
        if self.is_playing() {
            return Ok(());
        }
        if let Some(stale) = self.worker.take() {
            let _ = stale.join();
        }

        let bpm = {
            let mut state = self.state.lock();
            for track in state.tracks_mut() {
                track.current_step_index = 0;
            }
            state.bpm
        };

        self.playing.store(true, Ordering::Release);
        let state = Arc::clone(&self.state);
        let playing = Arc::clone(&self.playing);
        let beat = Arc::clone(&self.beat);
        let events = self.events.clone();

        // Announce before the first tick can publish anything.
        self.events.emit(SequencerEvent::Started);

        let spawned = thread::Builder::new()
            .name("polystep-clock".into())
            .spawn(move || run_clock(state, playing, beat, events));
        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                self.playing.store(false, Ordering::Release);
                self.events.emit(SequencerEvent::Stopped);
                tracing::error!(error = %e, "failed to spawn clock thread");
                return Err(Error::SchedulerSpawn(e));
            }
        }

        tracing::info!(bpm, "transport started");
        Ok(())
    }

    /// Halt the clock and release every voice. Safe from any state; once
    /// this returns no further tick fires.
    pub fn stop(&mut self) {
        let was_playing = self.playing.swap(false, Ordering::AcqRel);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("clock thread panicked");
            }
        }

        for voice in self.state.lock().voices() {
            voice.note_off();
        }

        if was_playing {
            tracing::info!("transport stopped");
            self.events.emit(SequencerEvent::Stopped);
        }
    }

    /// Stop and zero every counter.
    pub fn reset(&mut self) {
        self.stop();
        self.beat.store(0, Ordering::Relaxed);
        for track in self.state.lock().tracks_mut() {
            track.current_step_index = 0;
        }
    }

    /// Drive one tick synchronously. Refused while the clock thread runs.
    pub fn advance(&mut self, tick: u64) -> bool {
        if self.is_playing() {
            return false;
        }
        let mut state = self.state.lock();
        state.run_tick(tick, &mut self.fires, &self.beat, &self.events);
        true
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.playing.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_clock(
    state: Arc<Mutex<SharedState>>,
    playing: Arc<AtomicBool>,
    beat: Arc<AtomicU64>,
    events: EventBus,
) {
    let mut fires = Vec::with_capacity(32);
    let mut cursor = ClockCursor::new(Instant::now());

    loop {
        wait_until(cursor.next, &playing);
        if !playing.load(Ordering::Acquire) {
            break;
        }

        cursor.fire(&mut state.lock(), &mut fires, &beat, &events);
        cursor.resync(Instant::now());
    }
    tracing::debug!(tick = cursor.tick, "clock thread exiting");
}

/// Position of the running clock: the next tick to fire and its deadline.
struct ClockCursor {
    tick: u64,
    next: Instant,
}

impl ClockCursor {
    fn new(start: Instant) -> Self {
        Self { tick: 0, next: start }
    }

    /// Fire the due tick and schedule the following one. The tempo is read
    /// after the tick, so a change lands on the next interval; deadlines
    /// already reached keep their timing.
    fn fire(
        &mut self,
        state: &mut SharedState,
        fires: &mut Vec<StepFire>,
        beat: &AtomicU64,
        events: &EventBus,
    ) -> Duration {
        state.run_tick(self.tick, fires, beat, events);
        let interval = clock::tick_interval(state.bpm);
        self.tick += 1;
        self.next += interval;
        interval
    }

    fn resync(&mut self, now: Instant) {
        if now > self.next + MAX_LAG {
            tracing::debug!(tick = self.tick, "clock fell behind, resyncing");
            self.next = now;
        }
    }
}

/// Coarse sleep, then spin for the last stretch.
fn wait_until(target: Instant, playing: &AtomicBool) {
    loop {
        if !playing.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= target {
            return;
        }
        let remaining = target - now;
        if remaining > SPIN_MARGIN {
            thread::sleep(remaining - SPIN_MARGIN);
        } else {
            std::hint::spin_loop();
        }
    }
}

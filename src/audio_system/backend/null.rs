//! Silent backend
//!
//! Creates handles without touching audio hardware and records every command
//! in a shared ledger. Used on headless machines and by the test suite, which
//! inspects the ledger through a [`NullProbe`].

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::{AudioBackend, SoundHandle};
use crate::audio_system::source::SoundKind;
use crate::audio_system::volume::clamp_volume;
use crate::error::{AudioError, AudioResult};

/// Last known state of one silent handle.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleProbe {
    pub path: PathBuf,
    pub kind: SoundKind,
    pub playing: bool,
    pub paused: bool,
    /// Loop count passed to the most recent play
    pub loops: i32,
    pub play_count: u32,
    pub gain: f32,
    pub muted: bool,
}

impl HandleProbe {
    fn new(path: &Path, kind: SoundKind) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            playing: false,
            paused: false,
            loops: 0,
            play_count: 0,
            gain: 1.0,
            muted: false,
        }
    }
}

#[derive(Debug)]
struct Ledger {
    next_id: u64,
    live: BTreeMap<u64, HandleProbe>,
    destroyed: Vec<PathBuf>,
    output_gain: f32,
    initialize_calls: u32,
    shutdown_calls: u32,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            next_id: 1,
            live: BTreeMap::new(),
            destroyed: Vec::new(),
            output_gain: 1.0,
            initialize_calls: 0,
            shutdown_calls: 0,
        }
    }
}

type SharedLedger = Arc<Mutex<Ledger>>;

/// Handle that only writes to the ledger
pub struct NullHandle {
    id: u64,
    ledger: SharedLedger,
}

impl NullHandle {
    fn update<F: FnOnce(&mut HandleProbe)>(&self, f: F) {
        if let Some(probe) = self.ledger.lock().live.get_mut(&self.id) {
            f(probe);
        }
    }
}

impl SoundHandle for NullHandle {
    fn play(&mut self, loops: i32) -> AudioResult<()> {
        self.update(|probe| {
            probe.playing = true;
            probe.paused = false;
            probe.loops = loops;
            probe.play_count += 1;
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.update(|probe| {
            probe.playing = false;
            probe.paused = false;
        });
    }

    fn pause(&mut self) {
        self.update(|probe| {
            if probe.playing {
                probe.playing = false;
                probe.paused = true;
            }
        });
    }

    fn resume(&mut self) {
        self.update(|probe| {
            if probe.paused {
                probe.paused = false;
                probe.playing = true;
            }
        });
    }

    fn set_volume(&mut self, gain: f32) {
        self.update(|probe| probe.gain = clamp_volume(gain));
    }

    fn set_muted(&mut self, muted: bool) {
        self.update(|probe| probe.muted = muted);
    }

    fn is_finished(&self) -> bool {
        self.ledger
            .lock()
            .live
            .get(&self.id)
            .map(|probe| !probe.playing && !probe.paused)
            .unwrap_or(true)
    }
}

impl Drop for NullHandle {
    fn drop(&mut self) {
        let mut ledger = self.ledger.lock();
        if let Some(probe) = ledger.live.remove(&self.id) {
            ledger.destroyed.push(probe.path);
        }
    }
}

/// Read access to a [`NullBackend`] ledger after the backend has been moved
/// into a manager.
#[derive(Clone)]
pub struct NullProbe {
    ledger: SharedLedger,
}

impl NullProbe {
    /// State of the first live handle created for `path`
    pub fn handle_for(&self, path: impl AsRef<Path>) -> Option<HandleProbe> {
        let path = path.as_ref();
        self.ledger
            .lock()
            .live
            .values()
            .find(|probe| probe.path == path)
            .cloned()
    }

    pub fn live_handles(&self) -> usize {
        self.ledger.lock().live.len()
    }

    /// Paths of destroyed handles, in destruction order
    pub fn destroyed(&self) -> Vec<PathBuf> {
        self.ledger.lock().destroyed.clone()
    }

    pub fn output_gain(&self) -> f32 {
        self.ledger.lock().output_gain
    }

    pub fn initialize_calls(&self) -> u32 {
        self.ledger.lock().initialize_calls
    }

    pub fn shutdown_calls(&self) -> u32 {
        self.ledger.lock().shutdown_calls
    }

    /// Simulate every live handle for `path` running out of data
    pub fn finish(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        for probe in self.ledger.lock().live.values_mut() {
            if probe.path == path {
                probe.playing = false;
                probe.paused = false;
            }
        }
    }
}

/// Headless backend.
#[derive(Default)]
pub struct NullBackend {
    ledger: SharedLedger,
    initialized: bool,
    fail_initialize: bool,
    missing: HashSet<PathBuf>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `initialize` call fail
    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Reject handle creation for `path` as if the file did not exist
    pub fn with_missing(mut self, path: impl Into<PathBuf>) -> Self {
        self.missing.insert(path.into());
        self
    }

    pub fn probe(&self) -> NullProbe {
        NullProbe {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl AudioBackend for NullBackend {
    type Handle = NullHandle;

    fn name(&self) -> &'static str {
        "null"
    }

    fn initialize(&mut self) -> AudioResult<()> {
        self.ledger.lock().initialize_calls += 1;
        if self.fail_initialize {
            return Err(AudioError::NoDevice);
        }
        self.initialized = true;
        info!("Silent audio backend initialized");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn shutdown(&mut self) {
        if self.initialized {
            self.ledger.lock().shutdown_calls += 1;
            self.initialized = false;
        }
    }

    fn create_handle(&self, path: &Path, kind: SoundKind) -> AudioResult<NullHandle> {
        if !self.initialized {
            return Err(AudioError::NotStarted);
        }
        if self.missing.contains(path) {
            return Err(AudioError::LoadFailed {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            });
        }

        let mut ledger = self.ledger.lock();
        let id = ledger.next_id;
        ledger.next_id += 1;
        ledger.live.insert(id, HandleProbe::new(path, kind));
        debug!("Created silent {} handle for {}", kind, path.display());

        Ok(NullHandle {
            id,
            ledger: Arc::clone(&self.ledger),
        })
    }

    fn set_output_gain(&self, gain: f32) {
        self.ledger.lock().output_gain = clamp_volume(gain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> NullBackend {
        let mut backend = NullBackend::new();
        backend.initialize().unwrap();
        backend
    }

    #[test]
    fn test_handle_commands_are_recorded() {
        let backend = started();
        let probe = backend.probe();
        let mut handle = backend
            .create_handle(Path::new("bgm.ogg"), SoundKind::Music)
            .unwrap();

        handle.play(-1).unwrap();
        handle.set_volume(0.4);
        handle.set_muted(true);

        let state = probe.handle_for("bgm.ogg").unwrap();
        assert!(state.playing);
        assert_eq!(state.loops, -1);
        assert_eq!(state.gain, 0.4);
        assert!(state.muted);
        assert_eq!(state.kind, SoundKind::Music);
    }

    #[test]
    fn test_pause_resume_only_from_matching_state() {
        let backend = started();
        let probe = backend.probe();
        let mut handle = backend
            .create_handle(Path::new("click.wav"), SoundKind::Effect)
            .unwrap();

        handle.resume();
        assert!(!probe.handle_for("click.wav").unwrap().playing);

        handle.play(0).unwrap();
        handle.pause();
        assert!(probe.handle_for("click.wav").unwrap().paused);
        assert!(!handle.is_finished());

        handle.resume();
        assert!(probe.handle_for("click.wav").unwrap().playing);
    }

    #[test]
    fn test_drop_records_destruction() {
        let backend = started();
        let probe = backend.probe();
        let handle = backend
            .create_handle(Path::new("click.wav"), SoundKind::Effect)
            .unwrap();
        assert_eq!(probe.live_handles(), 1);

        backend.destroy_handle(handle);
        assert_eq!(probe.live_handles(), 0);
        assert_eq!(probe.destroyed(), vec![PathBuf::from("click.wav")]);
    }

    #[test]
    fn test_scripted_failures() {
        let mut backend = NullBackend::new().failing_initialize();
        assert!(backend.initialize().is_err());
        assert!(!backend.is_initialized());

        let backend = NullBackend::new().with_missing("gone.ogg");
        let mut backend = backend;
        backend.initialize().unwrap();
        let result = backend.create_handle(Path::new("gone.ogg"), SoundKind::Music);
        assert!(matches!(result, Err(AudioError::LoadFailed { .. })));
    }

    #[test]
    fn test_finish_marks_handle_done() {
        let backend = started();
        let probe = backend.probe();
        let mut handle = backend
            .create_handle(Path::new("click.wav"), SoundKind::Effect)
            .unwrap();
        handle.play(0).unwrap();
        assert!(!handle.is_finished());

        probe.finish("click.wav");
        assert!(handle.is_finished());
    }
}

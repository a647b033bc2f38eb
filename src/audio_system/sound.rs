//! A single playable sound
//!
//! Owns its backend handle, its three volume tiers and its play state. Every
//! volume or mute change is pushed to the handle immediately.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::backend::SoundHandle;
use super::source::{loops_forever, SoundKind};
use super::state::PlayState;
use super::volume::VolumeComposition;

pub struct Sound<H: SoundHandle> {
    kind: SoundKind,
    path: PathBuf,
    handle: Option<H>,
    volume: VolumeComposition,
    muted: bool,
    looping: bool,
    state: PlayState,
    channel: Option<u8>,
}

impl<H: SoundHandle> Sound<H> {
    /// Wrap a backend handle. A sound without a handle accepts every call and
    /// does nothing.
    pub fn new(kind: SoundKind, path: &Path, handle: Option<H>, volume: VolumeComposition) -> Self {
        let mut sound = Self {
            kind,
            path: path.to_path_buf(),
            handle,
            volume,
            muted: false,
            looping: false,
            state: PlayState::Stopped,
            channel: None,
        };
        sound.push_volume();
        sound
    }

    pub fn kind(&self) -> SoundKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Start from the beginning, playing `loops` extra times
    pub fn play(&mut self, loops: i32) {
        let Some(handle) = self.handle.as_mut() else {
            debug!("No handle for {}, play ignored", self.path.display());
            return;
        };
        match handle.play(loops) {
            Ok(()) => {
                self.state = PlayState::Playing;
                self.looping = loops_forever(loops);
            }
            Err(e) => warn!("Failed to play {} {}: {}", self.kind, self.path.display(), e),
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.stop();
            self.state = PlayState::Stopped;
            self.looping = false;
        }
    }

    pub fn pause(&mut self) {
        if !self.state.is_playing() {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.pause();
            self.state = PlayState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if !self.state.is_paused() {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.resume();
            self.state = PlayState::Playing;
        }
    }

    /// Move a play-once sound whose handle ran dry back to Stopped.
    /// Returns true when the state changed.
    pub fn refresh(&mut self) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        match &self.handle {
            Some(handle) if handle.is_finished() => {
                self.state = PlayState::Stopped;
                self.looping = false;
                true
            }
            _ => false,
        }
    }

    pub fn base_volume(&self) -> f32 {
        self.volume.base()
    }

    pub fn channel_volume(&self) -> f32 {
        self.volume.channel()
    }

    pub fn master_volume(&self) -> f32 {
        self.volume.master()
    }

    pub fn effective_volume(&self) -> f32 {
        self.volume.effective()
    }

    pub fn set_complete_volume(&mut self, base: f32, channel: f32, master: f32) {
        self.adjust_volume(|volume| *volume = VolumeComposition::new(base, channel, master));
    }

    pub fn set_base_volume(&mut self, volume: f32) {
        self.adjust_volume(|tiers| tiers.set_base(volume));
    }

    pub fn set_channel_volume(&mut self, volume: f32) {
        self.adjust_volume(|tiers| tiers.set_channel(volume));
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.adjust_volume(|tiers| tiers.set_master(volume));
    }

    pub fn increase_volume(&mut self, delta: f32) {
        self.adjust_volume(|tiers| tiers.increase_base(delta));
    }

    pub fn decrease_volume(&mut self, delta: f32) {
        self.adjust_volume(|tiers| tiers.decrease_base(delta));
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Muting leaves every volume tier untouched
    pub fn set_muted(&mut self, muted: bool) {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_muted(muted);
            self.muted = muted;
        }
    }

    /// Channel this sound belongs to, if any
    pub fn channel(&self) -> Option<u8> {
        self.channel
    }

    pub fn set_channel(&mut self, channel: u8) {
        self.channel = Some(channel);
    }

    pub fn unset_channel(&mut self) {
        self.channel = None;
    }

    /// Detach the backend handle so the caller can hand it back for release
    pub fn take_handle(&mut self) -> Option<H> {
        self.state = PlayState::Stopped;
        self.looping = false;
        self.handle.take()
    }

    /// Change the tiers and push the new gain; without a handle nothing changes
    fn adjust_volume<F: FnOnce(&mut VolumeComposition)>(&mut self, f: F) {
        if self.handle.is_none() {
            return;
        }
        f(&mut self.volume);
        self.push_volume();
    }

    fn push_volume(&mut self) {
        let gain = self.volume.effective();
        if let Some(handle) = self.handle.as_mut() {
            handle.set_volume(gain);
        }
    }
}

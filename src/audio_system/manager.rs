//! Audio manager
//!
//! Owns the backend, every loaded sound, the channel table and the background
//! queue. Callers address sounds by logical name; lookups that miss are
//! logged and turn into no-ops, so nothing here returns an error.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::backend::{default_backend, AudioBackend, DefaultBackend};
use super::catalog::{Catalog, SoundArena, SoundId};
use super::channel::Channel;
use super::queue::BackgroundQueue;
use super::sound::Sound;
use super::source::{SoundKind, LOOP_FOREVER};
use super::state::ChannelState;
use super::volume::{clamp_volume, VolumeComposition};
use crate::config::AudioConfig;

/// Manager shared between threads; one lock guards catalogs, channels and
/// queue.
pub type SharedAudioManager<B = DefaultBackend> = Arc<Mutex<AudioManager<B>>>;

/// Catalog plus category-wide mute flag for music or effects
#[derive(Debug)]
struct Category {
    catalog: Catalog,
    muted: bool,
}

impl Category {
    fn new(muted: bool) -> Self {
        Self {
            catalog: Catalog::default(),
            muted,
        }
    }
}

fn channel_entry<'a>(
    channels: &'a mut BTreeMap<u8, Channel>,
    presets: &BTreeMap<u8, f32>,
    index: u8,
) -> &'a mut Channel {
    channels.entry(index).or_insert_with(|| {
        let volume = presets.get(&index).copied().unwrap_or(1.0);
        debug!(channel = index, volume, "Created channel");
        Channel::new(index, volume)
    })
}

pub struct AudioManager<B: AudioBackend = DefaultBackend> {
    backend: B,
    started: bool,
    sounds: SoundArena<B::Handle>,
    music: Category,
    effects: Category,
    current_music: Option<SoundId>,
    channels: BTreeMap<u8, Channel>,
    channel_presets: BTreeMap<u8, f32>,
    max_channels: u8,
    queue: BackgroundQueue,
    volume: f32,
    output_gain: f32,
}

impl AudioManager {
    /// Manager over the backend selected for this build
    pub fn with_default_backend(config: &AudioConfig) -> Self {
        Self::new(default_backend(config), config)
    }
}

impl<B: AudioBackend> AudioManager<B> {
    pub fn new(backend: B, config: &AudioConfig) -> Self {
        Self {
            backend,
            started: false,
            sounds: SoundArena::default(),
            music: Category::new(config.music_muted),
            effects: Category::new(config.effects_muted),
            current_music: None,
            channels: BTreeMap::new(),
            channel_presets: config.channel_volumes.clone(),
            max_channels: config.max_channels,
            queue: BackgroundQueue::default(),
            volume: clamp_volume(config.master_volume),
            output_gain: clamp_volume(config.output_gain),
        }
    }

    /// Wrap the manager for use from several threads
    pub fn into_shared(self) -> SharedAudioManager<B> {
        Arc::new(Mutex::new(self))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Bring the backend up. A second call while started does nothing; a
    /// failed start leaves the manager unstarted and can be retried.
    pub fn start(&mut self) {
        if self.started {
            debug!("Audio manager already started");
            return;
        }

        info!(backend = self.backend.name(), "Starting audio engine");
        match self.backend.initialize() {
            Ok(()) => {
                self.started = true;
                self.backend.set_output_gain(self.output_gain);
                info!(backend = self.backend.name(), "Audio engine started");
            }
            Err(e) => {
                error!(backend = self.backend.name(), "Could not start audio engine: {}", e);
            }
        }
    }

    /// Stop and delete every sound, then release the backend
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.stop_all_sounds();
        self.delete_all_sounds();
        self.backend.shutdown();
        self.started = false;
        info!("Stopped audio engine");
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Per-frame tick: play-once sounds that ran out go back to Stopped
    pub fn update(&mut self) {
        if !self.started {
            return;
        }
        for (id, sound) in self.sounds.iter_mut() {
            if sound.refresh() {
                debug!(sound = %id, "{} finished: {}", sound.kind(), sound.path().display());
            }
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    pub fn load_music(&mut self, path: impl AsRef<Path>, name: &str, channel: u8) {
        self.load(SoundKind::Music, path.as_ref(), name, 1.0, channel);
    }

    pub fn load_music_with_volume(
        &mut self,
        path: impl AsRef<Path>,
        name: &str,
        volume: f32,
        channel: u8,
    ) {
        self.load(SoundKind::Music, path.as_ref(), name, volume, channel);
    }

    pub fn load_effect(&mut self, path: impl AsRef<Path>, name: &str, channel: u8) {
        self.load(SoundKind::Effect, path.as_ref(), name, 1.0, channel);
    }

    pub fn load_effect_with_volume(
        &mut self,
        path: impl AsRef<Path>,
        name: &str,
        volume: f32,
        channel: u8,
    ) {
        self.load(SoundKind::Effect, path.as_ref(), name, volume, channel);
    }

    /// Forget a music name; the track itself goes once no alias is left
    pub fn unload_music(&mut self, name: &str) {
        self.unload(SoundKind::Music, name);
    }

    pub fn unload_effect(&mut self, name: &str) {
        self.unload(SoundKind::Effect, name);
    }

    pub fn is_music_loaded(&self, name: &str) -> bool {
        self.music.catalog.contains_name(name)
    }

    pub fn is_effect_loaded(&self, name: &str) -> bool {
        self.effects.catalog.contains_name(name)
    }

    /// Distinct sounds held, aliases counted once
    pub fn loaded_sound_count(&self) -> usize {
        self.sounds.len()
    }

    fn load(&mut self, kind: SoundKind, path: &Path, name: &str, volume: f32, channel: u8) {
        let category = self.category(kind);
        if category.catalog.contains_name(name) {
            warn!(sound = name, "The {} '{}' is already loaded", kind, name);
            return;
        }
        if let Some(id) = category.catalog.id_for_path(path) {
            warn!(
                sound = name,
                path = %path.display(),
                "{} path already loaded, aliasing the existing sound", kind
            );
            self.category_mut(kind).catalog.alias(name, id);
            return;
        }
        if !self.started {
            error!(sound = name, "Cannot load {} before the audio engine is started", kind);
            return;
        }

        let handle = match self.backend.create_handle(path, kind) {
            Ok(handle) => handle,
            Err(e) => {
                error!(sound = name, path = %path.display(), "Failed to load {}: {}", kind, e);
                return;
            }
        };

        let channel = self.member_channel(channel, "load");
        let channel_volume = channel
            .map(|index| self.channel_volume_or_default(index))
            .unwrap_or(1.0);

        let mut sound = Sound::new(
            kind,
            path,
            Some(handle),
            VolumeComposition::new(volume, channel_volume, self.volume),
        );
        sound.set_muted(self.category(kind).muted);

        let id = self.sounds.insert(sound);
        self.category_mut(kind).catalog.insert(name, path, id);
        if let Some(index) = channel {
            channel_entry(&mut self.channels, &self.channel_presets, index)
                .add_sound(id, &mut self.sounds);
        }

        info!(sound = name, path = %path.display(), channel = channel.unwrap_or(0), "Loaded {}", kind);
    }

    fn unload(&mut self, kind: SoundKind, name: &str) {
        let Some(id) = self.category(kind).catalog.id(name) else {
            warn!(sound = name, "Cannot unload {} '{}': not loaded", kind, name);
            return;
        };
        let Some(path) = self.sounds.get(id).map(|sound| sound.path().to_path_buf()) else {
            return;
        };

        match self.category_mut(kind).catalog.remove(name, &path) {
            Some((_, true)) => debug!(sound = name, "Removed {} alias", kind),
            Some((id, false)) => {
                self.destroy(id);
                info!(sound = name, path = %path.display(), "Unloaded {}", kind);
            }
            None => {}
        }
    }

    /// Release one sound and every reference to it
    fn destroy(&mut self, id: SoundId) {
        let Some(mut sound) = self.sounds.remove(id) else {
            return;
        };
        if let Some(index) = sound.channel() {
            if let Some(channel) = self.channels.get_mut(&index) {
                channel.forget(id);
            }
        }
        self.queue.remove(id);
        if self.current_music == Some(id) {
            self.current_music = None;
        }
        if let Some(handle) = sound.take_handle() {
            self.backend.destroy_handle(handle);
        }
    }

    // ------------------------------------------------------------------
    // Playback by name
    // ------------------------------------------------------------------

    /// Play a loaded track, stopping whichever track played before
    pub fn play_music(&mut self, name: &str, loops: i32) {
        self.play(SoundKind::Music, name, None, loops);
    }

    pub fn play_music_with_volume(&mut self, name: &str, volume: f32, loops: i32) {
        self.play(SoundKind::Music, name, Some(volume), loops);
    }

    /// Load from `path` on first use, then play
    pub fn play_music_from(&mut self, path: impl AsRef<Path>, name: &str, channel: u8, loops: i32) {
        if !self.is_music_loaded(name) {
            self.load_music(path, name, channel);
        }
        self.play_music(name, loops);
    }

    pub fn play_music_from_with_volume(
        &mut self,
        path: impl AsRef<Path>,
        name: &str,
        volume: f32,
        channel: u8,
        loops: i32,
    ) {
        if !self.is_music_loaded(name) {
            self.load_music(path, name, channel);
        }
        self.play_music_with_volume(name, volume, loops);
    }

    pub fn play_effect(&mut self, name: &str, loops: i32) {
        self.play(SoundKind::Effect, name, None, loops);
    }

    pub fn play_effect_with_volume(&mut self, name: &str, volume: f32, loops: i32) {
        self.play(SoundKind::Effect, name, Some(volume), loops);
    }

    pub fn play_effect_from(
        &mut self,
        path: impl AsRef<Path>,
        name: &str,
        channel: u8,
        loops: i32,
    ) {
        if !self.is_effect_loaded(name) {
            self.load_effect(path, name, channel);
        }
        self.play_effect(name, loops);
    }

    pub fn play_effect_from_with_volume(
        &mut self,
        path: impl AsRef<Path>,
        name: &str,
        volume: f32,
        channel: u8,
        loops: i32,
    ) {
        if !self.is_effect_loaded(name) {
            self.load_effect(path, name, channel);
        }
        self.play_effect_with_volume(name, volume, loops);
    }

    fn play(&mut self, kind: SoundKind, name: &str, volume: Option<f32>, loops: i32) {
        let Some(id) = self.category(kind).catalog.id(name) else {
            warn!(sound = name, "Couldn't find {} '{}'", kind, name);
            if kind == SoundKind::Music {
                self.current_music = None;
            }
            return;
        };

        if kind == SoundKind::Music {
            if let Some(previous) = self.current_music.replace(id) {
                if let Some(sound) = self.sounds.get_mut(previous) {
                    sound.stop();
                }
            }
        }

        let muted = self.category(kind).muted;
        if let Some(sound) = self.sounds.get_mut(id) {
            sound.set_muted(muted);
            if let Some(volume) = volume {
                sound.set_base_volume(volume);
            }
            sound.play(loops);
        }
    }

    pub fn pause_music(&mut self, name: &str) {
        self.with_sound(SoundKind::Music, name, "pause", |sound| sound.pause());
    }

    /// Resume a paused track, re-applying the music mute flag
    pub fn resume_music(&mut self, name: &str) {
        let muted = self.music.muted;
        self.with_sound(SoundKind::Music, name, "resume", |sound| {
            sound.set_muted(muted);
            sound.resume();
        });
    }

    pub fn stop_music(&mut self, name: &str) {
        self.with_sound(SoundKind::Music, name, "stop", |sound| sound.stop());
    }

    pub fn is_music_playing(&self, name: &str) -> bool {
        self.query(SoundKind::Music, name, "is playing", |sound| sound.is_playing())
            .unwrap_or(false)
    }

    pub fn is_music_paused(&self, name: &str) -> bool {
        self.query(SoundKind::Music, name, "is paused", |sound| sound.is_paused())
            .unwrap_or(false)
    }

    pub fn is_music_stopped(&self, name: &str) -> bool {
        self.query(SoundKind::Music, name, "is stopped", |sound| sound.is_stopped())
            .unwrap_or(false)
    }

    pub fn is_music_looping(&self, name: &str) -> bool {
        self.query(SoundKind::Music, name, "is looping", |sound| sound.is_looping())
            .unwrap_or(false)
    }

    pub fn pause_effect(&mut self, name: &str) {
        self.with_sound(SoundKind::Effect, name, "pause", |sound| sound.pause());
    }

    pub fn resume_effect(&mut self, name: &str) {
        let muted = self.effects.muted;
        self.with_sound(SoundKind::Effect, name, "resume", |sound| {
            sound.set_muted(muted);
            sound.resume();
        });
    }

    pub fn stop_effect(&mut self, name: &str) {
        self.with_sound(SoundKind::Effect, name, "stop", |sound| sound.stop());
    }

    pub fn is_effect_playing(&self, name: &str) -> bool {
        self.query(SoundKind::Effect, name, "is playing", |sound| sound.is_playing())
            .unwrap_or(false)
    }

    pub fn is_effect_paused(&self, name: &str) -> bool {
        self.query(SoundKind::Effect, name, "is paused", |sound| sound.is_paused())
            .unwrap_or(false)
    }

    pub fn is_effect_stopped(&self, name: &str) -> bool {
        self.query(SoundKind::Effect, name, "is stopped", |sound| sound.is_stopped())
            .unwrap_or(false)
    }

    pub fn is_effect_looping(&self, name: &str) -> bool {
        self.query(SoundKind::Effect, name, "is looping", |sound| sound.is_looping())
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Background queue
    // ------------------------------------------------------------------

    pub fn add_to_background_queue(&mut self, name: &str) {
        let Some(id) = self.music.catalog.id(name) else {
            warn!(sound = name, "Couldn't find background song '{}'", name);
            return;
        };
        let muted = self.music.muted;
        if let Some(sound) = self.sounds.get_mut(id) {
            sound.set_muted(muted);
        }
        self.queue.push(id);
    }

    /// Rewind to the first entry and loop it until told otherwise
    pub fn play_background_queue(&mut self) {
        self.queue.rewind();
        match self.queue.current() {
            Some(id) => self.play_queued(id),
            None => warn!("No song in background queue"),
        }
    }

    /// Stop the current entry and loop the next one. Past the last entry
    /// this does nothing.
    pub fn play_next_song_in_queue(&mut self) {
        if self.queue.is_empty() || self.queue.is_exhausted() {
            return;
        }
        let previous = self.queue.current();
        match self.queue.advance() {
            Some(id) => {
                if let Some(sound) = previous.and_then(|prev| self.sounds.get_mut(prev)) {
                    sound.stop();
                }
                self.play_queued(id);
            }
            None => debug!("Reached the end of the background queue"),
        }
    }

    pub fn pause_background_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        match self.queue.current().and_then(|id| self.sounds.get_mut(id)) {
            Some(sound) => sound.pause(),
            None => warn!("No current song in background queue"),
        }
    }

    pub fn resume_background_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        let muted = self.music.muted;
        match self.queue.current().and_then(|id| self.sounds.get_mut(id)) {
            Some(sound) => {
                sound.set_muted(muted);
                sound.resume();
            }
            None => warn!("No current song in background queue"),
        }
    }

    /// Stop the current entry and rewind to the start. Past the last entry
    /// this only warns, like pause and resume.
    pub fn stop_background_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        match self.queue.current().and_then(|id| self.sounds.get_mut(id)) {
            Some(sound) => {
                sound.stop();
                self.queue.rewind();
            }
            None => warn!("No current song in background queue"),
        }
    }

    /// Empty the queue without touching playback
    pub fn clear_background_queue(&mut self) {
        self.queue.clear();
    }

    pub fn background_queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Position of the queue cursor; equals the length once past the end
    pub fn background_queue_position(&self) -> usize {
        self.queue.cursor()
    }

    fn play_queued(&mut self, id: SoundId) {
        if let Some(previous) = self.current_music.replace(id) {
            if previous != id {
                if let Some(sound) = self.sounds.get_mut(previous) {
                    sound.stop();
                }
            }
        }
        let muted = self.music.muted;
        if let Some(sound) = self.sounds.get_mut(id) {
            sound.set_muted(muted);
            sound.play(LOOP_FOREVER);
        }
    }

    // ------------------------------------------------------------------
    // Per-sound volume and mute
    // ------------------------------------------------------------------

    pub fn set_music_volume(&mut self, name: &str, volume: f32) {
        self.with_sound(SoundKind::Music, name, "set volume", |sound| {
            sound.set_base_volume(volume)
        });
    }

    /// Base volume of a track, 0.0 when unknown
    pub fn get_music_volume(&self, name: &str) -> f32 {
        self.query(SoundKind::Music, name, "get volume", |sound| sound.base_volume())
            .unwrap_or(0.0)
    }

    pub fn increase_music_volume(&mut self, name: &str, delta: f32) {
        self.with_sound(SoundKind::Music, name, "increase volume", |sound| {
            sound.increase_volume(delta)
        });
    }

    pub fn decrease_music_volume(&mut self, name: &str, delta: f32) {
        self.with_sound(SoundKind::Music, name, "decrease volume", |sound| {
            sound.decrease_volume(delta)
        });
    }

    /// Gain actually sent to the backend for a track
    pub fn music_effective_volume(&self, name: &str) -> f32 {
        self.query(SoundKind::Music, name, "effective volume", |sound| {
            sound.effective_volume()
        })
        .unwrap_or(0.0)
    }

    pub fn set_effect_volume(&mut self, name: &str, volume: f32) {
        self.with_sound(SoundKind::Effect, name, "set volume", |sound| {
            sound.set_base_volume(volume)
        });
    }

    pub fn get_effect_volume(&self, name: &str) -> f32 {
        self.query(SoundKind::Effect, name, "get volume", |sound| sound.base_volume())
            .unwrap_or(0.0)
    }

    pub fn increase_effect_volume(&mut self, name: &str, delta: f32) {
        self.with_sound(SoundKind::Effect, name, "increase volume", |sound| {
            sound.increase_volume(delta)
        });
    }

    pub fn decrease_effect_volume(&mut self, name: &str, delta: f32) {
        self.with_sound(SoundKind::Effect, name, "decrease volume", |sound| {
            sound.decrease_volume(delta)
        });
    }

    pub fn effect_effective_volume(&self, name: &str) -> f32 {
        self.query(SoundKind::Effect, name, "effective volume", |sound| {
            sound.effective_volume()
        })
        .unwrap_or(0.0)
    }

    pub fn mute_all_music(&mut self, mute: bool) {
        self.mute_all(SoundKind::Music, mute);
    }

    pub fn is_all_music_muted(&self) -> bool {
        self.music.muted
    }

    /// Mute or unmute one track. Unmuting while all music is muted lifts the
    /// global flag and unmutes every track first.
    pub fn set_music_muted(&mut self, name: &str, muted: bool) {
        self.set_sound_muted(SoundKind::Music, name, muted);
    }

    pub fn is_music_muted(&self, name: &str) -> bool {
        self.query(SoundKind::Music, name, "is muted", |sound| sound.is_muted())
            .unwrap_or(false)
    }

    /// Flip a track's mute flag and return the new value
    pub fn toggle_music_muted(&mut self, name: &str) -> bool {
        self.toggle_sound_muted(SoundKind::Music, name)
    }

    pub fn mute_all_effects(&mut self, mute: bool) {
        self.mute_all(SoundKind::Effect, mute);
    }

    pub fn is_all_effects_muted(&self) -> bool {
        self.effects.muted
    }

    pub fn set_effect_muted(&mut self, name: &str, muted: bool) {
        self.set_sound_muted(SoundKind::Effect, name, muted);
    }

    pub fn is_effect_muted(&self, name: &str) -> bool {
        self.query(SoundKind::Effect, name, "is muted", |sound| sound.is_muted())
            .unwrap_or(false)
    }

    pub fn toggle_effect_muted(&mut self, name: &str) -> bool {
        self.toggle_sound_muted(SoundKind::Effect, name)
    }

    fn mute_all(&mut self, kind: SoundKind, mute: bool) {
        let category = self.category_mut(kind);
        category.muted = mute;
        let ids = category.catalog.ids();
        for id in ids {
            if let Some(sound) = self.sounds.get_mut(id) {
                sound.set_muted(mute);
            }
        }
        debug!(muted = mute, "Muted all {}", kind);
    }

    fn set_sound_muted(&mut self, kind: SoundKind, name: &str, muted: bool) {
        if self.lookup(kind, name, "set muted").is_none() {
            return;
        }
        if self.category(kind).muted && !muted {
            self.mute_all(kind, false);
        }
        self.with_sound(kind, name, "set muted", |sound| sound.set_muted(muted));
    }

    fn toggle_sound_muted(&mut self, kind: SoundKind, name: &str) -> bool {
        let Some(muted) = self.query(kind, name, "toggle muted", |sound| sound.is_muted()) else {
            return false;
        };
        self.set_sound_muted(kind, name, !muted);
        !muted
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    pub fn set_music_channel(&mut self, name: &str, channel: u8) {
        self.set_sound_channel(SoundKind::Music, name, channel);
    }

    pub fn unset_music_channel(&mut self, name: &str) {
        self.unset_sound_channel(SoundKind::Music, name);
    }

    pub fn set_effect_channel(&mut self, name: &str, channel: u8) {
        self.set_sound_channel(SoundKind::Effect, name, channel);
    }

    pub fn unset_effect_channel(&mut self, name: &str) {
        self.unset_sound_channel(SoundKind::Effect, name);
    }

    /// Channel a track belongs to, 0 for none
    pub fn get_music_channel(&self, name: &str) -> u8 {
        self.query(SoundKind::Music, name, "get channel", |sound| sound.channel())
            .flatten()
            .unwrap_or(0)
    }

    pub fn get_effect_channel(&self, name: &str) -> u8 {
        self.query(SoundKind::Effect, name, "get channel", |sound| sound.channel())
            .flatten()
            .unwrap_or(0)
    }

    pub fn set_channel_volume(&mut self, channel: u8, volume: f32) {
        if self.checked_channel(channel, "set channel volume") {
            channel_entry(&mut self.channels, &self.channel_presets, channel)
                .set_volume(volume, &mut self.sounds);
        }
    }

    pub fn get_channel_volume(&self, channel: u8) -> f32 {
        if !self.checked_channel(channel, "get channel volume") {
            return 0.0;
        }
        self.channel_volume_or_default(channel)
    }

    pub fn increase_channel_volume(&mut self, channel: u8, delta: f32) {
        if self.checked_channel(channel, "increase channel volume") {
            channel_entry(&mut self.channels, &self.channel_presets, channel)
                .increase_volume(delta, &mut self.sounds);
        }
    }

    pub fn decrease_channel_volume(&mut self, channel: u8, delta: f32) {
        if self.checked_channel(channel, "decrease channel volume") {
            channel_entry(&mut self.channels, &self.channel_presets, channel)
                .decrease_volume(delta, &mut self.sounds);
        }
    }

    pub fn set_channel_muted(&mut self, channel: u8, muted: bool) {
        if self.checked_channel(channel, "set channel muted") {
            channel_entry(&mut self.channels, &self.channel_presets, channel)
                .set_muted(muted, &mut self.sounds);
        }
    }

    pub fn is_channel_muted(&self, channel: u8) -> bool {
        self.checked_channel(channel, "is channel muted")
            && self
                .channels
                .get(&channel)
                .map(Channel::is_muted)
                .unwrap_or(false)
    }

    /// Flip a channel's mute flag and return the new value
    pub fn toggle_channel_muted(&mut self, channel: u8) -> bool {
        if !self.checked_channel(channel, "toggle channel muted") {
            return false;
        }
        let chnl = channel_entry(&mut self.channels, &self.channel_presets, channel);
        let muted = !chnl.is_muted();
        chnl.set_muted(muted, &mut self.sounds);
        muted
    }

    pub fn play_channel(&mut self, channel: u8, loops: i32) {
        if self.checked_channel(channel, "play channel") {
            channel_entry(&mut self.channels, &self.channel_presets, channel)
                .play(loops, &mut self.sounds);
        }
    }

    pub fn pause_channel(&mut self, channel: u8) {
        if self.checked_channel(channel, "pause channel") {
            channel_entry(&mut self.channels, &self.channel_presets, channel)
                .pause(&mut self.sounds);
        }
    }

    pub fn resume_channel(&mut self, channel: u8) {
        if self.checked_channel(channel, "resume channel") {
            channel_entry(&mut self.channels, &self.channel_presets, channel)
                .resume(&mut self.sounds);
        }
    }

    pub fn stop_channel(&mut self, channel: u8) {
        if self.checked_channel(channel, "stop channel") {
            channel_entry(&mut self.channels, &self.channel_presets, channel)
                .stop(&mut self.sounds);
        }
    }

    pub fn is_channel_playing(&self, channel: u8) -> bool {
        self.channel_state(channel, "is channel playing") == Some(ChannelState::Playing)
    }

    pub fn is_channel_paused(&self, channel: u8) -> bool {
        self.channel_state(channel, "is channel paused") == Some(ChannelState::Paused)
    }

    pub fn is_channel_stopped(&self, channel: u8) -> bool {
        self.channel_state(channel, "is channel stopped") == Some(ChannelState::Stopped)
    }

    fn channel_state(&self, channel: u8, op: &str) -> Option<ChannelState> {
        if !self.checked_channel(channel, op) {
            return None;
        }
        Some(
            self.channels
                .get(&channel)
                .map(Channel::state)
                .unwrap_or_default(),
        )
    }

    fn set_sound_channel(&mut self, kind: SoundKind, name: &str, channel: u8) {
        if channel == 0 {
            self.unset_sound_channel(kind, name);
            return;
        }
        let Some(id) = self.lookup(kind, name, "set channel") else {
            return;
        };
        if !self.checked_channel(channel, "set channel") {
            return;
        }

        let current = self.sounds.get(id).and_then(|sound| sound.channel());
        if let Some(old) = current.filter(|old| *old != channel) {
            if let Some(old_channel) = self.channels.get_mut(&old) {
                old_channel.remove_sound(id, &mut self.sounds);
            }
        }
        channel_entry(&mut self.channels, &self.channel_presets, channel)
            .add_sound(id, &mut self.sounds);
    }

    fn unset_sound_channel(&mut self, kind: SoundKind, name: &str) {
        let Some(id) = self.lookup(kind, name, "unset channel") else {
            return;
        };
        let Some(index) = self.sounds.get(id).and_then(|sound| sound.channel()) else {
            debug!(sound = name, "{} '{}' has no channel", kind, name);
            return;
        };
        if let Some(channel) = self.channels.get_mut(&index) {
            channel.remove_sound(id, &mut self.sounds);
        }
    }

    /// Validate a channel index for a channel operation. 0 is "no channel"
    /// and is rejected like any out-of-range index.
    fn checked_channel(&self, channel: u8, op: &str) -> bool {
        if channel == 0 || channel > self.max_channels {
            error!(channel, max = self.max_channels, "{}: couldn't find channel {}", op, channel);
            return false;
        }
        true
    }

    /// Channel to join on load; 0 means none and out-of-range falls back to none
    fn member_channel(&self, channel: u8, op: &str) -> Option<u8> {
        if channel == 0 {
            None
        } else if self.checked_channel(channel, op) {
            Some(channel)
        } else {
            None
        }
    }

    fn channel_volume_or_default(&self, channel: u8) -> f32 {
        self.channels
            .get(&channel)
            .map(Channel::volume)
            .or_else(|| self.channel_presets.get(&channel).map(|v| clamp_volume(*v)))
            .unwrap_or(1.0)
    }

    // ------------------------------------------------------------------
    // Bulk and master
    // ------------------------------------------------------------------

    pub fn stop_all_sounds(&mut self) {
        for (_, sound) in self.sounds.iter_mut() {
            sound.stop();
        }
    }

    pub fn pause_all_sounds(&mut self) {
        for (_, sound) in self.sounds.iter_mut() {
            sound.pause();
        }
    }

    pub fn resume_all_sounds(&mut self) {
        for (_, sound) in self.sounds.iter_mut() {
            sound.resume();
        }
    }

    /// Destroy every sound. Channels survive, empty.
    pub fn delete_all_sounds(&mut self) {
        for channel in self.channels.values_mut() {
            channel.release_members(&mut self.sounds);
        }
        self.queue.clear();
        self.music.catalog.clear();
        self.effects.catalog.clear();
        self.current_music = None;

        let count = self.sounds.len();
        for (_, mut sound) in self.sounds.drain() {
            if let Some(handle) = sound.take_handle() {
                self.backend.destroy_handle(handle);
            }
        }
        if count > 0 {
            debug!(count, "Deleted all sounds");
        }
    }

    /// Master volume for every sound
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
        let master = self.volume;
        for (_, sound) in self.sounds.iter_mut() {
            sound.set_master_volume(master);
        }
    }

    pub fn get_volume(&self) -> f32 {
        self.volume
    }

    pub fn increase_volume(&mut self, delta: f32) {
        self.set_volume(self.volume + delta);
    }

    pub fn decrease_volume(&mut self, delta: f32) {
        self.set_volume(self.volume - delta);
    }

    /// Device level gain, applied by the backend on top of every sound
    pub fn set_output_gain(&mut self, gain: f32) {
        self.output_gain = clamp_volume(gain);
        if self.started {
            self.backend.set_output_gain(self.output_gain);
        }
    }

    pub fn output_gain(&self) -> f32 {
        self.output_gain
    }

    // ------------------------------------------------------------------
    // Lookup helpers
    // ------------------------------------------------------------------

    fn category(&self, kind: SoundKind) -> &Category {
        match kind {
            SoundKind::Music => &self.music,
            SoundKind::Effect => &self.effects,
        }
    }

    fn category_mut(&mut self, kind: SoundKind) -> &mut Category {
        match kind {
            SoundKind::Music => &mut self.music,
            SoundKind::Effect => &mut self.effects,
        }
    }

    fn lookup(&self, kind: SoundKind, name: &str, op: &str) -> Option<SoundId> {
        let id = self.category(kind).catalog.id(name);
        if id.is_none() {
            error!(sound = name, "{} {}: couldn't find '{}'", kind, op, name);
        }
        id
    }

    fn with_sound<F>(&mut self, kind: SoundKind, name: &str, op: &str, f: F)
    where
        F: FnOnce(&mut Sound<B::Handle>),
    {
        if let Some(sound) = self
            .lookup(kind, name, op)
            .and_then(|id| self.sounds.get_mut(id))
        {
            f(sound);
        }
    }

    fn query<R, F>(&self, kind: SoundKind, name: &str, op: &str, f: F) -> Option<R>
    where
        F: FnOnce(&Sound<B::Handle>) -> R,
    {
        self.lookup(kind, name, op)
            .and_then(|id| self.sounds.get(id))
            .map(f)
    }
}

impl<B: AudioBackend> Drop for AudioManager<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::backend::{NullBackend, NullProbe};

    fn manager() -> (AudioManager<NullBackend>, NullProbe) {
        let backend = NullBackend::new();
        let probe = backend.probe();
        let mut manager = AudioManager::new(backend, &AudioConfig::default());
        manager.start();
        (manager, probe)
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut manager, probe) = manager();
        assert!(manager.is_started());
        manager.start();
        assert_eq!(probe.initialize_calls(), 1);
    }

    #[test]
    fn test_failed_start_leaves_manager_unstarted() {
        let backend = NullBackend::new().failing_initialize();
        let probe = backend.probe();
        let mut manager = AudioManager::new(backend, &AudioConfig::default());

        manager.start();
        assert!(!manager.is_started());

        manager.load_music("a.ogg", "bgm", 0);
        manager.play_music("bgm", 0);
        assert!(!manager.is_music_loaded("bgm"));
        assert!(!manager.is_music_playing("bgm"));
        assert_eq!(probe.live_handles(), 0);
    }

    #[test]
    fn test_stop_releases_everything_once() {
        let (mut manager, probe) = manager();
        manager.load_music("a.ogg", "bgm", 0);
        manager.load_effect("x.wav", "click", 1);
        manager.play_music("bgm", LOOP_FOREVER);

        manager.stop();
        manager.stop();

        assert!(!manager.is_started());
        assert_eq!(probe.live_handles(), 0);
        assert_eq!(probe.destroyed().len(), 2);
        assert_eq!(probe.shutdown_calls(), 1);
        assert!(!manager.is_music_loaded("bgm"));
    }

    #[test]
    fn test_drop_stops_manager() {
        let (mut manager, probe) = manager();
        manager.load_music("a.ogg", "bgm", 0);
        drop(manager);
        assert_eq!(probe.live_handles(), 0);
        assert_eq!(probe.shutdown_calls(), 1);
    }

    #[test]
    fn test_load_and_play_music() {
        let (mut manager, probe) = manager();
        manager.load_music("a.ogg", "bgm", 0);
        manager.play_music("bgm", 0);

        assert!(manager.is_music_playing("bgm"));
        assert!(probe.handle_for("a.ogg").unwrap().playing);
    }

    #[test]
    fn test_same_path_aliases_one_resource() {
        let (mut manager, probe) = manager();
        manager.load_music("a.ogg", "bgm", 0);
        manager.load_music("a.ogg", "theme", 0);

        assert!(manager.is_music_loaded("bgm"));
        assert!(manager.is_music_loaded("theme"));
        assert_eq!(manager.loaded_sound_count(), 1);
        assert_eq!(probe.live_handles(), 1);

        manager.play_music("theme", 0);
        assert!(manager.is_music_playing("bgm"));
    }

    #[test]
    fn test_effect_path_aliases_within_effects() {
        let (mut manager, _probe) = manager();
        manager.load_effect("x.wav", "click", 0);
        manager.load_effect("x.wav", "tap", 0);

        assert!(manager.is_effect_loaded("tap"));
        assert!(!manager.is_music_loaded("tap"));
        assert_eq!(manager.loaded_sound_count(), 1);
    }

    #[test]
    fn test_duplicate_name_keeps_first() {
        let (mut manager, probe) = manager();
        manager.load_music("a.ogg", "bgm", 0);
        manager.load_music("b.ogg", "bgm", 0);

        assert_eq!(manager.loaded_sound_count(), 1);
        assert!(probe.handle_for("b.ogg").is_none());
        manager.play_music("bgm", 0);
        assert!(probe.handle_for("a.ogg").unwrap().playing);
    }

    #[test]
    fn test_failed_handle_creation_loads_nothing() {
        let backend = NullBackend::new().with_missing("gone.ogg");
        let mut manager = AudioManager::new(backend, &AudioConfig::default());
        manager.start();

        manager.load_music("gone.ogg", "bgm", 0);
        assert!(!manager.is_music_loaded("bgm"));
        manager.play_music("bgm", 0);
        assert!(!manager.is_music_playing("bgm"));
    }

    #[test]
    fn test_playing_music_stops_previous_track() {
        let (mut manager, _probe) = manager();
        manager.load_music("a.ogg", "one", 0);
        manager.load_music("b.ogg", "two", 0);

        manager.play_music("one", LOOP_FOREVER);
        manager.play_music("two", LOOP_FOREVER);

        assert!(manager.is_music_stopped("one"));
        assert!(manager.is_music_playing("two"));
        assert!(manager.is_music_looping("two"));
    }

    #[test]
    fn test_effects_play_alongside_each_other() {
        let (mut manager, _probe) = manager();
        manager.load_effect("x.wav", "click", 0);
        manager.load_effect("y.wav", "boom", 0);
        manager.play_effect("click", 0);
        manager.play_effect("boom", 0);
        assert!(manager.is_effect_playing("click"));
        assert!(manager.is_effect_playing("boom"));
    }

    #[test]
    fn test_play_from_loads_on_demand() {
        let (mut manager, _probe) = manager();
        manager.play_effect_from_with_volume("x.wav", "click", 0.4, 2, 0);

        assert!(manager.is_effect_playing("click"));
        assert!((manager.get_effect_volume("click") - 0.4).abs() < 1e-6);
        assert_eq!(manager.get_effect_channel("click"), 2);
    }

    #[test]
    fn test_effect_volume_clamps() {
        let (mut manager, _probe) = manager();
        manager.load_effect("x.wav", "click", 0);
        manager.set_effect_volume("click", 0.5);
        manager.increase_effect_volume("click", 0.3);
        assert!((manager.get_effect_volume("click") - 0.8).abs() < 1e-6);

        manager.increase_effect_volume("click", 0.5);
        assert_eq!(manager.get_effect_volume("click"), 1.0);

        manager.decrease_effect_volume("click", 2.0);
        assert_eq!(manager.get_effect_volume("click"), 0.0);
    }

    #[test]
    fn test_unknown_names_are_no_ops() {
        let (mut manager, _probe) = manager();
        manager.play_music("nope", 0);
        manager.pause_effect("nope");
        manager.set_music_volume("nope", 0.5);
        assert!(!manager.is_music_playing("nope"));
        assert_eq!(manager.get_music_volume("nope"), 0.0);
        assert!(!manager.toggle_effect_muted("nope"));
        assert_eq!(manager.get_music_channel("nope"), 0);
    }

    #[test]
    fn test_master_volume_reaches_every_sound() {
        let (mut manager, probe) = manager();
        manager.load_music("a.ogg", "bgm", 0);
        manager.load_effect("x.wav", "click", 0);

        manager.set_volume(0.5);
        manager.decrease_volume(0.25);
        assert!((manager.get_volume() - 0.25).abs() < 1e-6);
        assert!((probe.handle_for("a.ogg").unwrap().gain - 0.25).abs() < 1e-6);
        assert!((manager.effect_effective_volume("click") - 0.25).abs() < 1e-6);

        manager.increase_volume(3.0);
        assert_eq!(manager.get_volume(), 1.0);
    }

    #[test]
    fn test_loaded_sound_takes_current_master_volume() {
        let (mut manager, _probe) = manager();
        manager.set_volume(0.5);
        manager.load_music_with_volume("a.ogg", "bgm", 0.5, 0);
        assert!((manager.music_effective_volume("bgm") - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_mute_all_and_back() {
        let (mut manager, _probe) = manager();
        manager.load_music("a.ogg", "one", 0);
        manager.load_music("b.ogg", "two", 0);

        manager.mute_all_music(true);
        assert!(manager.is_all_music_muted());
        assert!(manager.is_music_muted("one") && manager.is_music_muted("two"));

        manager.mute_all_music(false);
        assert!(!manager.is_music_muted("one") && !manager.is_music_muted("two"));
    }

    #[test]
    fn test_global_unmute_overrides_individual_mute() {
        let (mut manager, probe) = manager();
        manager.load_music("a.ogg", "one", 0);
        manager.load_music("b.ogg", "two", 0);
        manager.load_effect("x.wav", "click", 0);

        manager.set_music_muted("one", true);
        manager.set_effect_muted("click", true);
        assert!(manager.is_music_muted("one") && !manager.is_music_muted("two"));

        manager.mute_all_music(true);
        manager.mute_all_effects(true);
        manager.mute_all_music(false);
        manager.mute_all_effects(false);

        assert!(!manager.is_music_muted("one"));
        assert!(!manager.is_music_muted("two"));
        assert!(!manager.is_effect_muted("click"));
        assert!(!probe.handle_for("a.ogg").unwrap().muted);
        assert!(!probe.handle_for("x.wav").unwrap().muted);
    }

    #[test]
    fn test_unmuting_one_track_lifts_global_mute() {
        let (mut manager, _probe) = manager();
        manager.load_music("a.ogg", "one", 0);
        manager.load_music("b.ogg", "two", 0);
        manager.mute_all_music(true);

        manager.set_music_muted("one", false);
        assert!(!manager.is_all_music_muted());
        assert!(!manager.is_music_muted("two"));
    }

    #[test]
    fn test_play_inherits_category_mute() {
        let (mut manager, probe) = manager();
        manager.load_effect("x.wav", "click", 0);
        manager.mute_all_effects(true);
        manager.play_effect("click", 0);
        assert!(probe.handle_for("x.wav").unwrap().muted);
        assert!(manager.is_effect_muted("click"));
    }

    #[test]
    fn test_toggle_uses_own_catalog() {
        let (mut manager, _probe) = manager();
        manager.load_music("a.ogg", "bgm", 0);
        assert!(manager.toggle_music_muted("bgm"));
        assert!(manager.is_music_muted("bgm"));
        assert!(!manager.toggle_music_muted("bgm"));
        assert!(!manager.toggle_effect_muted("bgm"));
    }

    #[test]
    fn test_channel_volume_flows_to_members() {
        let (mut manager, _probe) = manager();
        manager.load_effect("x.wav", "click", 3);
        manager.set_channel_volume(3, 0.5);

        assert_eq!(manager.get_channel_volume(3), 0.5);
        assert!((manager.effect_effective_volume("click") - 0.5).abs() < 1e-6);

        manager.increase_channel_volume(3, 0.25);
        assert!((manager.get_channel_volume(3) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_channel_queries_default_for_unused_channel() {
        let (manager, _probe) = manager();
        assert_eq!(manager.get_channel_volume(5), 1.0);
        assert!(manager.is_channel_playing(5));
        assert!(!manager.is_channel_paused(5));
        assert!(!manager.is_channel_muted(5));
    }

    #[test]
    fn test_invalid_channels_are_rejected() {
        let (mut manager, _probe) = manager();
        manager.set_channel_volume(0, 0.5);
        manager.set_channel_volume(200, 0.5);
        assert_eq!(manager.get_channel_volume(0), 0.0);
        assert_eq!(manager.get_channel_volume(200), 0.0);
        assert!(!manager.is_channel_playing(200));

        manager.load_effect("x.wav", "click", 200);
        assert!(manager.is_effect_loaded("click"));
        assert_eq!(manager.get_effect_channel("click"), 0);
    }

    #[test]
    fn test_channel_presets_from_config() {
        let mut config = AudioConfig::default();
        config.channel_volumes.insert(2, 0.4);
        let mut manager = AudioManager::new(NullBackend::new(), &config);
        manager.start();

        assert!((manager.get_channel_volume(2) - 0.4).abs() < 1e-6);
        manager.load_effect("x.wav", "click", 2);
        assert!((manager.effect_effective_volume("click") - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_sound_joining_paused_channel_is_paused() {
        let (mut manager, _probe) = manager();
        manager.load_effect("x.wav", "a", 1);
        manager.load_effect("y.wav", "b", 0);
        manager.pause_channel(1);

        manager.play_effect("b", LOOP_FOREVER);
        manager.set_effect_channel("b", 1);

        assert!(manager.is_effect_paused("b"));
        assert!(manager.is_channel_paused(1));
    }

    #[test]
    fn test_moving_between_channels() {
        let (mut manager, _probe) = manager();
        manager.set_channel_volume(1, 0.5);
        manager.set_channel_volume(2, 0.25);
        manager.load_music("a.ogg", "bgm", 1);

        manager.set_music_channel("bgm", 2);
        assert_eq!(manager.get_music_channel("bgm"), 2);
        assert!((manager.music_effective_volume("bgm") - 0.25).abs() < 1e-6);

        manager.unset_music_channel("bgm");
        assert_eq!(manager.get_music_channel("bgm"), 0);
        assert_eq!(manager.music_effective_volume("bgm"), 1.0);
    }

    #[test]
    fn test_channel_group_control() {
        let (mut manager, _probe) = manager();
        manager.load_effect("x.wav", "a", 4);
        manager.load_effect("y.wav", "b", 4);

        manager.play_channel(4, 0);
        assert!(manager.is_effect_playing("a") && manager.is_effect_playing("b"));

        assert!(manager.toggle_channel_muted(4));
        assert!(manager.is_effect_muted("a"));

        manager.stop_channel(4);
        assert!(manager.is_channel_stopped(4));
        assert!(manager.is_effect_stopped("b"));
    }

    #[test]
    fn test_background_queue_walk() {
        let (mut manager, _probe) = manager();
        manager.load_music("1.ogg", "bgm1", 0);
        manager.load_music("2.ogg", "bgm2", 0);
        manager.add_to_background_queue("bgm1");
        manager.add_to_background_queue("bgm2");

        manager.play_background_queue();
        assert!(manager.is_music_playing("bgm1"));
        assert!(manager.is_music_looping("bgm1"));

        manager.play_next_song_in_queue();
        assert!(manager.is_music_stopped("bgm1"));
        assert!(manager.is_music_playing("bgm2"));

        manager.stop_background_queue();
        assert!(manager.is_music_stopped("bgm2"));
        assert_eq!(manager.background_queue_position(), 0);
    }

    #[test]
    fn test_queue_controls_past_the_end_do_nothing() {
        let (mut manager, _probe) = manager();
        manager.load_music("1.ogg", "bgm1", 0);
        manager.load_music("2.ogg", "bgm2", 0);
        manager.add_to_background_queue("bgm1");
        manager.add_to_background_queue("bgm2");
        manager.play_background_queue();

        manager.play_next_song_in_queue();
        manager.play_next_song_in_queue();
        manager.play_next_song_in_queue();
        assert!(manager.is_music_playing("bgm2"));
        assert_eq!(manager.background_queue_position(), 2);

        manager.pause_background_queue();
        assert!(manager.is_music_playing("bgm2"));
        manager.stop_background_queue();
        assert!(manager.is_music_playing("bgm2"));
        assert_eq!(manager.background_queue_position(), 2);

        manager.play_background_queue();
        assert_eq!(manager.background_queue_position(), 0);
        assert!(manager.is_music_playing("bgm1"));
        assert!(manager.is_music_stopped("bgm2"));
    }

    #[test]
    fn test_background_queue_pause_resume() {
        let (mut manager, _probe) = manager();
        manager.load_music("1.ogg", "bgm1", 0);
        manager.add_to_background_queue("bgm1");
        manager.play_background_queue();

        manager.pause_background_queue();
        assert!(manager.is_music_paused("bgm1"));
        manager.resume_background_queue();
        assert!(manager.is_music_playing("bgm1"));
    }

    #[test]
    fn test_empty_queue_is_safe() {
        let (mut manager, _probe) = manager();
        manager.play_background_queue();
        manager.play_next_song_in_queue();
        manager.pause_background_queue();
        manager.resume_background_queue();
        manager.stop_background_queue();
        assert_eq!(manager.background_queue_len(), 0);
    }

    #[test]
    fn test_unload_waits_for_last_alias() {
        let (mut manager, probe) = manager();
        manager.load_music("a.ogg", "bgm", 1);
        manager.load_music("a.ogg", "theme", 0);
        manager.add_to_background_queue("bgm");

        manager.unload_music("bgm");
        assert_eq!(probe.live_handles(), 1);
        assert!(manager.is_music_loaded("theme"));

        manager.unload_music("theme");
        assert_eq!(probe.live_handles(), 0);
        assert_eq!(manager.background_queue_len(), 0);

        manager.load_music("a.ogg", "again", 0);
        assert!(manager.is_music_loaded("again"));
    }

    #[test]
    fn test_bulk_operations() {
        let (mut manager, _probe) = manager();
        manager.load_music("a.ogg", "bgm", 0);
        manager.load_effect("x.wav", "click", 0);
        manager.play_music("bgm", LOOP_FOREVER);
        manager.play_effect("click", LOOP_FOREVER);

        manager.pause_all_sounds();
        assert!(manager.is_music_paused("bgm") && manager.is_effect_paused("click"));

        manager.resume_all_sounds();
        assert!(manager.is_music_playing("bgm") && manager.is_effect_playing("click"));

        manager.stop_all_sounds();
        assert!(manager.is_music_stopped("bgm") && manager.is_effect_stopped("click"));

        manager.delete_all_sounds();
        assert_eq!(manager.loaded_sound_count(), 0);
        assert!(manager.is_started());
    }

    #[test]
    fn test_update_reconciles_finished_clips() {
        let (mut manager, probe) = manager();
        manager.load_effect("x.wav", "click", 0);
        manager.play_effect("click", 0);

        probe.finish("x.wav");
        assert!(manager.is_effect_playing("click"));
        manager.update();
        assert!(manager.is_effect_stopped("click"));
    }

    #[test]
    fn test_output_gain_reaches_backend() {
        let mut config = AudioConfig::default();
        config.output_gain = 0.7;
        let backend = NullBackend::new();
        let probe = backend.probe();
        let mut manager = AudioManager::new(backend, &config);
        manager.start();
        assert!((probe.output_gain() - 0.7).abs() < 1e-6);

        manager.set_output_gain(1.5);
        assert_eq!(probe.output_gain(), 1.0);
    }

    #[test]
    fn test_shared_manager() {
        let (manager, _probe) = manager();
        let shared = manager.into_shared();
        let worker = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                shared.lock().load_effect("x.wav", "click", 0);
            })
        };
        worker.join().unwrap();
        assert!(shared.lock().is_effect_loaded("click"));
    }
}

//! Logical channels
//!
//! A channel groups sounds under a shared volume, mute flag and play state.
//! Members are referenced by id; the sounds themselves stay in the arena.

use tracing::warn;

use super::backend::SoundHandle;
use super::catalog::{SoundArena, SoundId};
use super::sound::Sound;
use super::state::ChannelState;
use super::volume::clamp_volume;

#[derive(Debug)]
pub struct Channel {
    index: u8,
    volume: f32,
    muted: bool,
    state: ChannelState,
    members: Vec<SoundId>,
}

impl Channel {
    pub fn new(index: u8, volume: f32) -> Self {
        Self {
            index,
            volume: clamp_volume(volume),
            muted: false,
            state: ChannelState::Playing,
            members: Vec::new(),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn members(&self) -> &[SoundId] {
        &self.members
    }

    pub fn contains(&self, id: SoundId) -> bool {
        self.members.contains(&id)
    }

    /// Add a member, forcing the channel state onto it. Returns false for a
    /// duplicate.
    pub fn add_sound<H: SoundHandle>(&mut self, id: SoundId, sounds: &mut SoundArena<H>) -> bool {
        if self.contains(id) {
            warn!(channel = self.index, sound = %id, "Trying to add a sound twice to a channel");
            return false;
        }
        let Some(sound) = sounds.get_mut(id) else {
            return false;
        };

        sound.set_channel_volume(self.volume);
        sound.set_channel(self.index);
        match self.state {
            ChannelState::Paused => sound.pause(),
            ChannelState::Stopped => sound.stop(),
            ChannelState::Playing => {}
        }
        self.members.push(id);
        true
    }

    /// Remove a member and give it back its neutral channel tier
    pub fn remove_sound<H: SoundHandle>(
        &mut self,
        id: SoundId,
        sounds: &mut SoundArena<H>,
    ) -> bool {
        let Some(position) = self.members.iter().position(|member| *member == id) else {
            warn!(channel = self.index, sound = %id, "Sound not found in channel");
            return false;
        };
        self.members.remove(position);
        if let Some(sound) = sounds.get_mut(id) {
            sound.set_channel_volume(1.0);
            sound.unset_channel();
        }
        true
    }

    /// Drop a member that no longer exists in the arena
    pub fn forget(&mut self, id: SoundId) {
        self.members.retain(|member| *member != id);
    }

    pub fn set_volume<H: SoundHandle>(&mut self, volume: f32, sounds: &mut SoundArena<H>) {
        self.volume = clamp_volume(volume);
        let volume = self.volume;
        self.for_each(sounds, |sound| sound.set_channel_volume(volume));
    }

    pub fn increase_volume<H: SoundHandle>(&mut self, delta: f32, sounds: &mut SoundArena<H>) {
        self.set_volume(self.volume + delta, sounds);
    }

    pub fn decrease_volume<H: SoundHandle>(&mut self, delta: f32, sounds: &mut SoundArena<H>) {
        self.set_volume(self.volume - delta, sounds);
    }

    pub fn set_muted<H: SoundHandle>(&mut self, muted: bool, sounds: &mut SoundArena<H>) {
        self.muted = muted;
        self.for_each(sounds, |sound| sound.set_muted(muted));
    }

    pub fn play<H: SoundHandle>(&mut self, loops: i32, sounds: &mut SoundArena<H>) {
        self.for_each(sounds, |sound| sound.play(loops));
        self.state = ChannelState::Playing;
    }

    pub fn pause<H: SoundHandle>(&mut self, sounds: &mut SoundArena<H>) {
        self.for_each(sounds, |sound| sound.pause());
        self.state = ChannelState::Paused;
    }

    pub fn resume<H: SoundHandle>(&mut self, sounds: &mut SoundArena<H>) {
        self.for_each(sounds, |sound| sound.resume());
        self.state = ChannelState::Playing;
    }

    pub fn stop<H: SoundHandle>(&mut self, sounds: &mut SoundArena<H>) {
        self.for_each(sounds, |sound| sound.stop());
        self.state = ChannelState::Stopped;
    }

    /// Detach every member, resetting their channel tier
    pub fn release_members<H: SoundHandle>(&mut self, sounds: &mut SoundArena<H>) {
        self.for_each(sounds, |sound| {
            sound.set_channel_volume(1.0);
            sound.unset_channel();
        });
        self.members.clear();
    }

    fn for_each<H, F>(&self, sounds: &mut SoundArena<H>, mut f: F)
    where
        H: SoundHandle,
        F: FnMut(&mut Sound<H>),
    {
        for id in &self.members {
            if let Some(sound) = sounds.get_mut(*id) {
                f(sound);
            }
        }
    }
}

//! Audio system module
//!
//! Loads, plays and mixes music tracks and effect clips, groups them into
//! logical channels and runs a background music queue.
//!
//! ## Architecture
//!
//! ```text
//! AudioManager
//!   ├── SoundArena ── Sound (state, volume tiers, backend handle)
//!   ├── Catalog (music)    name → id, path → name
//!   ├── Catalog (effects)  name → id, path → name
//!   ├── Channel 1..=N      shared volume / mute / play state
//!   ├── BackgroundQueue    ids + cursor
//!   └── AudioBackend       mixer | hardware | null
//! ```
//!
//! Effective gain of a sound = base × channel × master.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use star_audio::audio_system::{AudioManager, LOOP_FOREVER};
//! use star_audio::config::AudioConfig;
//!
//! let config = AudioConfig::load()?;
//! let mut audio = AudioManager::with_default_backend(&config);
//! audio.start();
//!
//! audio.load_music("music/title.ogg", "title", 0);
//! audio.load_effect("sfx/click.wav", "click", 1);
//!
//! audio.play_music("title", LOOP_FOREVER);
//! audio.play_effect("click", 0);
//! audio.set_channel_volume(1, 0.5);
//! ```

pub mod backend;
pub mod catalog;
pub mod channel;
pub mod manager;
pub mod queue;
pub mod sound;
pub mod source;
pub mod state;
pub mod volume;

// Re-export commonly used types
pub use backend::{
    default_backend, AudioBackend, DefaultBackend, HardwareBackend, MixerBackend, NullBackend,
    SoundHandle,
};
pub use catalog::SoundId;
pub use channel::Channel;
pub use manager::{AudioManager, SharedAudioManager};
pub use sound::Sound;
pub use source::{SoundKind, LOOP_FOREVER};
pub use state::{ChannelState, PlayState};
pub use volume::{clamp_volume, VolumeComposition};

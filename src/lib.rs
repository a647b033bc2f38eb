//! star-audio: the audio subsystem of a real-time engine
//!
//! Music tracks and effect clips are loaded under logical names, grouped into
//! channels and mixed through one of several interchangeable backends. See
//! [`audio_system`] for the architecture.

pub mod assets;
pub mod audio_system;
pub mod config;
pub mod error;
pub mod logging;

pub use audio_system::{AudioManager, SharedAudioManager, SoundKind, LOOP_FOREVER};
pub use config::AudioConfig;
pub use error::{AudioError, AudioResult, ConfigError};

//! Platform-facing audio backends
//!
//! ```text
//! AudioManager ──> AudioBackend ──creates──> SoundHandle (one per Sound)
//!                     ├── MixerBackend      buffered rodio mixer, 16 mix slots
//!                     ├── HardwareBackend   staged engine/output-mix acquisition
//!                     └── NullBackend       silent, records commands
//! ```
//!
//! The backend is chosen at build time through [`DefaultBackend`]; the manager
//! and channels are generic over it.

pub mod cpal_api;
pub mod hardware;
pub mod mixer;
pub mod null;

use std::io::{Read, Seek};
use std::path::Path;

use rodio::{Decoder, Sink};

use crate::audio_system::source::{loops_forever, SoundKind};
use crate::config::AudioConfig;
use crate::error::{AudioError, AudioResult};

pub use cpal_api::CpalApi;
pub use hardware::{HardwareBackend, HardwareHandle, InitStage, NativeAudioApi};
pub use mixer::{MixerBackend, MixerHandle};
pub use null::{HandleProbe, NullBackend, NullHandle, NullProbe};

/// A native playable resource, exclusively owned by one sound.
///
/// Dropping the handle releases the native resource.
pub trait SoundHandle {
    /// Start from the beginning. `loops` extra repetitions; negative loops forever.
    fn play(&mut self, loops: i32) -> AudioResult<()>;

    fn stop(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    /// Push the effective gain (0.0-1.0)
    fn set_volume(&mut self, gain: f32);

    /// Silence output without touching the stored gain
    fn set_muted(&mut self, muted: bool);

    /// True once nothing is queued for playback anymore
    fn is_finished(&self) -> bool;
}

pub trait AudioBackend {
    type Handle: SoundHandle;

    fn name(&self) -> &'static str;

    /// Acquire native resources. On error nothing stays acquired.
    fn initialize(&mut self) -> AudioResult<()>;

    fn is_initialized(&self) -> bool;

    /// Release native resources. Safe to call when not initialized.
    fn shutdown(&mut self);

    fn create_handle(&self, path: &Path, kind: SoundKind) -> AudioResult<Self::Handle>;

    fn destroy_handle(&self, mut handle: Self::Handle) {
        handle.stop();
        drop(handle);
    }

    /// Device level gain applied on top of every handle
    fn set_output_gain(&self, gain: f32);
}

#[cfg(not(feature = "hardware-interface"))]
pub type DefaultBackend = MixerBackend;

#[cfg(feature = "hardware-interface")]
pub type DefaultBackend = HardwareBackend<CpalApi>;

/// Build the backend selected for this platform
#[cfg(not(feature = "hardware-interface"))]
pub fn default_backend(config: &AudioConfig) -> DefaultBackend {
    MixerBackend::new(config)
}

/// Build the backend selected for this platform
#[cfg(feature = "hardware-interface")]
pub fn default_backend(config: &AudioConfig) -> DefaultBackend {
    HardwareBackend::new(CpalApi, config)
}

fn decode_error(err: rodio::decoder::DecoderError) -> AudioError {
    AudioError::DecodeFailed(err.to_string())
}

/// Check that a reader holds something rodio can decode
pub(crate) fn verify_decodable<R>(reader: R) -> AudioResult<()>
where
    R: Read + Seek + Send + Sync + 'static,
{
    Decoder::new(reader).map(|_| ()).map_err(decode_error)
}

/// Queue `loops + 1` decoders on a sink, or one looping decoder for negative loops
pub(crate) fn append_decoded<R, F>(sink: &Sink, mut open: F, loops: i32) -> AudioResult<()>
where
    R: Read + Seek + Send + Sync + 'static,
    F: FnMut() -> AudioResult<R>,
{
    if loops_forever(loops) {
        let decoder = Decoder::new_looped(open()?).map_err(decode_error)?;
        sink.append(decoder);
    } else {
        for _ in 0..=loops {
            let decoder = Decoder::new(open()?).map_err(decode_error)?;
            sink.append(decoder);
        }
    }
    Ok(())
}

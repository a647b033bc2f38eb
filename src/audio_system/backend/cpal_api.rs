//! Engine/output-mix object model over cpal and rodio
//!
//! | stage               | cpal / rodio object                              |
//! |---------------------|--------------------------------------------------|
//! | engine              | `cpal::Host`                                     |
//! | realize engine      | default output `Device`                          |
//! | engine interface    | device plus its default stream config            |
//! | output mix          | `dynamic_mixer` controller and mixer source      |
//! | realize output mix  | `OutputStream` playing the mixer                 |
//! | mix volume          | atomic gain polled by the mixer every 10ms       |
//!
//! Players are idle sinks whose queue output is added to the mixer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::cpal::{self, SupportedStreamConfig};
use rodio::dynamic_mixer::{self, DynamicMixer, DynamicMixerController};
use rodio::source::Zero;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use tracing::debug;

use super::hardware::NativeAudioApi;
use super::{append_decoded, SoundHandle};
use crate::assets::SharedBytes;
use crate::audio_system::volume::clamp_volume;
use crate::error::{AudioResult, NativeError, ResultCode};

const MIX_VOLUME_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Default, Clone, Copy)]
pub struct CpalApi;

pub struct CpalEngine {
    host: cpal::Host,
    device: Option<cpal::Device>,
}

pub struct CpalEngineInterface {
    device: cpal::Device,
    config: SupportedStreamConfig,
}

pub struct CpalOutputMix {
    device: cpal::Device,
    config: SupportedStreamConfig,
    controller: Arc<DynamicMixerController<f32>>,
    mixer: Option<DynamicMixer<f32>>,
    gain: Arc<AtomicU32>,
    output: Option<(OutputStream, OutputStreamHandle)>,
}

pub struct CpalMixVolume {
    gain: Arc<AtomicU32>,
}

pub struct CpalPlayer {
    controller: Arc<DynamicMixerController<f32>>,
    data: SharedBytes,
    sink: Option<Sink>,
    volume: f32,
    muted: bool,
}

impl CpalPlayer {
    fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    fn apply_gain(&self) {
        if let Some(sink) = &self.sink {
            sink.set_volume(self.gain());
        }
    }
}

impl SoundHandle for CpalPlayer {
    fn play(&mut self, loops: i32) -> AudioResult<()> {
        // A fresh queue per play; the old one ends once its sink is dropped.
        let (sink, queue) = Sink::new_idle();
        sink.set_volume(self.gain());
        let data = self.data.clone();
        append_decoded(&sink, || Ok(data.cursor()), loops)?;
        self.controller.add(queue);
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn set_volume(&mut self, gain: f32) {
        self.volume = clamp_volume(gain);
        self.apply_gain();
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply_gain();
    }

    fn is_finished(&self) -> bool {
        self.sink.as_ref().map(Sink::empty).unwrap_or(true)
    }
}

fn resource_error(detail: impl ToString) -> NativeError {
    NativeError::new(ResultCode::ResourceError, detail.to_string())
}

impl NativeAudioApi for CpalApi {
    type Engine = CpalEngine;
    type EngineInterface = CpalEngineInterface;
    type OutputMix = CpalOutputMix;
    type MixVolume = CpalMixVolume;
    type Player = CpalPlayer;

    fn create_engine(&self) -> Result<CpalEngine, NativeError> {
        let host = cpal::host_from_id(cpal::default_host().id())
            .map_err(|e| NativeError::new(ResultCode::FeatureUnsupported, e.to_string()))?;
        debug!(host = ?host.id(), "Audio host created");
        Ok(CpalEngine { host, device: None })
    }

    fn realize_engine(&self, engine: &mut CpalEngine) -> Result<(), NativeError> {
        let device = engine
            .host
            .default_output_device()
            .ok_or_else(|| resource_error("no default output device"))?;
        debug!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            "Output device selected"
        );
        engine.device = Some(device);
        Ok(())
    }

    fn engine_interface(&self, engine: &CpalEngine) -> Result<CpalEngineInterface, NativeError> {
        let device = engine.device.clone().ok_or_else(|| {
            NativeError::new(ResultCode::PreconditionsViolated, "engine not realized")
        })?;
        let config = device.default_output_config().map_err(resource_error)?;
        Ok(CpalEngineInterface { device, config })
    }

    fn create_output_mix(
        &self,
        engine: &CpalEngineInterface,
    ) -> Result<CpalOutputMix, NativeError> {
        let channels = engine.config.channels();
        let rate = engine.config.sample_rate().0;
        let (controller, mixer) = dynamic_mixer::mixer::<f32>(channels, rate);
        // The mixer ends when it runs out of inputs; silence keeps it open.
        controller.add(Zero::<f32>::new(channels, rate));

        Ok(CpalOutputMix {
            device: engine.device.clone(),
            config: engine.config.clone(),
            controller,
            mixer: Some(mixer),
            gain: Arc::new(AtomicU32::new(1.0f32.to_bits())),
            output: None,
        })
    }

    fn realize_output_mix(&self, mix: &mut CpalOutputMix) -> Result<(), NativeError> {
        let mixer = mix.mixer.take().ok_or_else(|| {
            NativeError::new(ResultCode::PreconditionsViolated, "output mix already realized")
        })?;
        let (stream, handle) = OutputStream::try_from_device_config(&mix.device, mix.config.clone())
            .map_err(resource_error)?;

        let gain = Arc::clone(&mix.gain);
        let source = mixer
            .amplify(1.0)
            .periodic_access(MIX_VOLUME_POLL, move |amp| {
                amp.set_factor(f32::from_bits(gain.load(Ordering::Relaxed)));
            });
        handle.play_raw(source).map_err(resource_error)?;

        mix.output = Some((stream, handle));
        Ok(())
    }

    fn mix_volume_interface(&self, mix: &CpalOutputMix) -> Result<CpalMixVolume, NativeError> {
        Ok(CpalMixVolume {
            gain: Arc::clone(&mix.gain),
        })
    }

    fn set_mix_volume(&self, volume: &CpalMixVolume, gain: f32) {
        volume
            .gain
            .store(clamp_volume(gain).to_bits(), Ordering::Relaxed);
    }

    fn create_player(
        &self,
        _engine: &CpalEngineInterface,
        mix: &CpalOutputMix,
        data: SharedBytes,
    ) -> Result<CpalPlayer, NativeError> {
        if mix.output.is_none() {
            return Err(NativeError::new(
                ResultCode::PreconditionsViolated,
                "output mix not realized",
            ));
        }
        super::verify_decodable(data.cursor())
            .map_err(|e| NativeError::new(ResultCode::ContentUnsupported, e.to_string()))?;

        Ok(CpalPlayer {
            controller: Arc::clone(&mix.controller),
            data,
            sink: None,
            volume: 1.0,
            muted: false,
        })
    }

    fn destroy_output_mix(&self, mix: CpalOutputMix) {
        drop(mix);
    }

    fn destroy_engine(&self, engine: CpalEngine) {
        drop(engine);
    }
}

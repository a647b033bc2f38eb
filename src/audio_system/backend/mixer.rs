//! Buffered software mixer backend
//!
//! Opens the default output device once with a fixed configuration (rate,
//! channel count and buffer size) and keeps a fixed pool of mix slots. Effect clips are decoded from memory and borrow
//! a slot while they play; music streams from the asset store on a voice of
//! its own. Mix slots have nothing to do with logical channels.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rodio::cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rodio::cpal::{
    self, BufferSize, FromSample, Sample, SampleFormat, SampleRate, SizedSample, StreamConfig,
    SupportedBufferSize, SupportedStreamConfig,
};
use rodio::dynamic_mixer::{self, DynamicMixer, DynamicMixerController};
use rodio::Sink;
use tracing::{debug, info, warn};

use super::{append_decoded, verify_decodable, AudioBackend, SoundHandle};
use crate::assets::{AssetStore, SharedBytes};
use crate::audio_system::source::SoundKind;
use crate::audio_system::volume::clamp_volume;
use crate::config::{AudioConfig, MixerSettings};
use crate::error::{AudioError, AudioResult};

/// One voice on the output stream.
struct MixSlot {
    sink: Sink,
    /// Handle currently holding the slot
    owner: Option<u64>,
    /// Gain requested by the owner, before output gain
    gain: f32,
}

impl MixSlot {
    fn new(sink: Sink, owner: Option<u64>, gain: f32) -> Self {
        Self { sink, owner, gain }
    }

    /// Free, or held by a clip that already ran out
    fn is_available(&self) -> bool {
        self.owner.is_none() || self.sink.empty()
    }

    fn apply_gain(&self, output_gain: f32) {
        self.sink.set_volume(self.gain * output_gain);
    }
}

/// Fixed pool of effect slots plus the streamed music voices.
pub(crate) struct SlotPool {
    controller: Arc<DynamicMixerController<f32>>,
    slots: Vec<Mutex<MixSlot>>,
    streams: Mutex<HashMap<u64, MixSlot>>,
    output_gain: Mutex<f32>,
    next_owner: AtomicU64,
}

impl SlotPool {
    fn new(controller: Arc<DynamicMixerController<f32>>, capacity: usize) -> Self {
        let mut pool = Self {
            controller,
            slots: Vec::with_capacity(capacity),
            streams: Mutex::new(HashMap::new()),
            output_gain: Mutex::new(1.0),
            next_owner: AtomicU64::new(1),
        };
        for _ in 0..capacity {
            let sink = pool.new_sink();
            pool.slots.push(Mutex::new(MixSlot::new(sink, None, 1.0)));
        }

        debug!("Allocated {} mix slots", pool.slots.len());
        pool
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn next_owner(&self) -> u64 {
        self.next_owner.fetch_add(1, Ordering::Relaxed)
    }

    /// An idle sink whose queue feeds the mixer
    fn new_sink(&self) -> Sink {
        let (sink, queue) = Sink::new_idle();
        self.controller.add(queue);
        sink
    }

    fn output_gain(&self) -> f32 {
        *self.output_gain.lock()
    }

    fn set_output_gain(&self, gain: f32) {
        *self.output_gain.lock() = gain;
        for slot in &self.slots {
            let state = slot.lock();
            if state.owner.is_some() {
                state.apply_gain(gain);
            }
        }
        for voice in self.streams.lock().values() {
            voice.apply_gain(gain);
        }
    }

    /// Claim a free or finished slot for `owner`
    fn acquire(&self, owner: u64) -> Option<usize> {
        for (idx, slot) in self.slots.iter().enumerate() {
            let mut state = slot.lock();
            if state.is_available() {
                state.sink.stop();
                state.owner = Some(owner);
                return Some(idx);
            }
        }
        None
    }

    /// Run `f` on a slot, provided `owner` still holds it
    fn with_slot<F, R>(&self, idx: usize, owner: u64, f: F) -> Option<R>
    where
        F: FnOnce(&mut MixSlot) -> R,
    {
        let slot = self.slots.get(idx)?;
        let mut state = slot.lock();
        if state.owner == Some(owner) {
            Some(f(&mut state))
        } else {
            None
        }
    }

    fn release(&self, idx: usize, owner: u64) {
        self.with_slot(idx, owner, |state| {
            state.sink.stop();
            state.owner = None;
            state.gain = 1.0;
        });
    }

    fn start_stream(&self, owner: u64, voice: MixSlot) {
        self.streams.lock().insert(owner, voice);
    }

    fn with_stream<F, R>(&self, owner: u64, f: F) -> Option<R>
    where
        F: FnOnce(&mut MixSlot) -> R,
    {
        self.streams.lock().get_mut(&owner).map(f)
    }

    fn end_stream(&self, owner: u64) {
        if let Some(voice) = self.streams.lock().remove(&owner) {
            voice.sink.stop();
        }
    }

    /// Slots currently producing sound
    fn busy_slots(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| {
                let state = slot.lock();
                state.owner.is_some() && !state.sink.empty()
            })
            .count()
    }

    fn stop_all(&self) {
        for slot in &self.slots {
            let mut state = slot.lock();
            state.sink.stop();
            state.owner = None;
        }
        for (_, voice) in self.streams.lock().drain() {
            voice.sink.stop();
        }
    }
}

enum ClipData {
    Streamed { path: PathBuf, assets: AssetStore },
    Buffered(SharedBytes),
}

enum Voice {
    Slot(usize),
    Stream,
}

/// Sound handle on the buffered mixer.
pub struct MixerHandle {
    pool: Arc<SlotPool>,
    owner: u64,
    clip: ClipData,
    voice: Option<Voice>,
    volume: f32,
    muted: bool,
}

impl MixerHandle {
    fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    fn release_voice(&mut self) {
        match self.voice.take() {
            Some(Voice::Slot(idx)) => self.pool.release(idx, self.owner),
            Some(Voice::Stream) => self.pool.end_stream(self.owner),
            None => {}
        }
    }

    fn with_voice<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut MixSlot) -> R,
    {
        match self.voice {
            Some(Voice::Slot(idx)) => self.pool.with_slot(idx, self.owner, f),
            Some(Voice::Stream) => self.pool.with_stream(self.owner, f),
            None => None,
        }
    }

    fn fill(&self, sink: &Sink, loops: i32) -> AudioResult<()> {
        match &self.clip {
            ClipData::Streamed { path, assets } => append_decoded(sink, || assets.open(path), loops),
            ClipData::Buffered(data) => append_decoded(sink, || Ok(data.cursor()), loops),
        }
    }

    fn push_gain(&self) {
        let gain = self.gain();
        let output_gain = self.pool.output_gain();
        self.with_voice(|voice| {
            voice.gain = gain;
            voice.apply_gain(output_gain);
        });
    }
}

impl SoundHandle for MixerHandle {
    fn play(&mut self, loops: i32) -> AudioResult<()> {
        self.release_voice();

        let gain = self.gain();
        let sink = self.pool.new_sink();
        sink.set_volume(gain * self.pool.output_gain());

        if matches!(self.clip, ClipData::Streamed { .. }) {
            self.fill(&sink, loops)?;
            self.pool
                .start_stream(self.owner, MixSlot::new(sink, Some(self.owner), gain));
            self.voice = Some(Voice::Stream);
            return Ok(());
        }

        let idx = self.pool.acquire(self.owner).ok_or(AudioError::NoFreeSlot {
            max: self.pool.capacity(),
        })?;
        if let Err(e) = self.fill(&sink, loops) {
            self.pool.release(idx, self.owner);
            return Err(e);
        }
        self.pool.with_slot(idx, self.owner, |slot| {
            slot.gain = gain;
            slot.sink = sink;
        });
        self.voice = Some(Voice::Slot(idx));
        Ok(())
    }

    fn stop(&mut self) {
        self.release_voice();
    }

    fn pause(&mut self) {
        self.with_voice(|voice| voice.sink.pause());
    }

    fn resume(&mut self) {
        self.with_voice(|voice| voice.sink.play());
    }

    fn set_volume(&mut self, gain: f32) {
        self.volume = clamp_volume(gain);
        self.push_gain();
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.push_gain();
    }

    fn is_finished(&self) -> bool {
        self.with_voice(|voice| voice.sink.empty()).unwrap_or(true)
    }
}

impl Drop for MixerHandle {
    fn drop(&mut self) {
        self.release_voice();
    }
}

struct MixerOutput {
    /// Pulls from the pool's mixer; dropping it closes the device
    _stream: cpal::Stream,
    pool: Arc<SlotPool>,
}

/// Buffered mixer backend over rodio.
pub struct MixerBackend {
    settings: MixerSettings,
    assets: AssetStore,
    output: Option<MixerOutput>,
}

impl MixerBackend {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            settings: config.mixer.clone(),
            assets: AssetStore::new(config.asset_root.clone()),
            output: None,
        }
    }

    pub fn settings(&self) -> &MixerSettings {
        &self.settings
    }

    /// Mix slots currently producing sound
    pub fn busy_slots(&self) -> usize {
        self.output
            .as_ref()
            .map(|output| output.pool.busy_slots())
            .unwrap_or(0)
    }

    fn open_output(&self) -> AudioResult<MixerOutput> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let supported = select_stream_config(&device, &self.settings)?;
        let config = stream_config(&supported, self.settings.buffer_size);

        let (controller, mixer) =
            dynamic_mixer::mixer::<f32>(config.channels, config.sample_rate.0);
        let stream = build_stream(&device, &config, supported.sample_format(), mixer)?;
        stream
            .play()
            .map_err(|e| AudioError::StreamInitFailed(e.to_string()))?;
        let pool = SlotPool::new(controller, self.settings.mix_slots);

        info!(
            rate = config.sample_rate.0,
            channels = config.channels,
            format = ?supported.sample_format(),
            buffer = ?config.buffer_size,
            slots = pool.capacity(),
            "Mixer output opened"
        );

        Ok(MixerOutput {
            _stream: stream,
            pool: Arc::new(pool),
        })
    }
}

/// Stream configuration with the requested buffer size, clamped to what the
/// device reports
fn stream_config(supported: &SupportedStreamConfig, buffer_size: u32) -> StreamConfig {
    let frames = match supported.buffer_size() {
        SupportedBufferSize::Range { min, max } => {
            let clamped = buffer_size.max(*min).min(*max);
            if clamped != buffer_size {
                warn!(
                    requested = buffer_size,
                    min, max, "Requested buffer size out of device range, clamped to {}", clamped
                );
            }
            clamped
        }
        SupportedBufferSize::Unknown => buffer_size,
    };

    let mut config = supported.config();
    config.buffer_size = BufferSize::Fixed(frames);
    config
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    mixer: DynamicMixer<f32>,
) -> AudioResult<cpal::Stream> {
    let stream = match format {
        SampleFormat::F32 => output_stream::<f32>(device, config, mixer),
        SampleFormat::F64 => output_stream::<f64>(device, config, mixer),
        SampleFormat::I16 => output_stream::<i16>(device, config, mixer),
        SampleFormat::I32 => output_stream::<i32>(device, config, mixer),
        SampleFormat::U16 => output_stream::<u16>(device, config, mixer),
        other => {
            return Err(AudioError::StreamInitFailed(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    };
    stream.map_err(|e| AudioError::StreamInitFailed(e.to_string()))
}

fn output_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut mixer: DynamicMixer<f32>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    device.build_output_stream::<T, _, _>(
        config,
        move |data: &mut [T], _| {
            for sample in data.iter_mut() {
                *sample = mixer
                    .next()
                    .map(T::from_sample)
                    .unwrap_or(<T as Sample>::EQUILIBRIUM);
            }
        },
        |err| warn!("Mixer output stream error: {}", err),
        None,
    )
}

/// Pick a device configuration matching the requested rate and channel count,
/// falling back to the device default
fn select_stream_config(
    device: &cpal::Device,
    settings: &MixerSettings,
) -> AudioResult<SupportedStreamConfig> {
    let wanted = SampleRate(settings.sample_rate);
    let matching = device.supported_output_configs().ok().and_then(|mut ranges| {
        ranges.find(|range| {
            range.channels() == settings.output_channels
                && range.min_sample_rate() <= wanted
                && wanted <= range.max_sample_rate()
        })
    });

    match matching {
        Some(range) => Ok(range.with_sample_rate(wanted)),
        None => {
            warn!(
                rate = settings.sample_rate,
                channels = settings.output_channels,
                "Requested mixer format unsupported, using device default"
            );
            device
                .default_output_config()
                .map_err(|e| AudioError::StreamInitFailed(e.to_string()))
        }
    }
}

impl AudioBackend for MixerBackend {
    type Handle = MixerHandle;

    fn name(&self) -> &'static str {
        "mixer"
    }

    fn initialize(&mut self) -> AudioResult<()> {
        if self.output.is_some() {
            return Ok(());
        }
        self.output = Some(self.open_output()?);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.output.is_some()
    }

    fn shutdown(&mut self) {
        if let Some(output) = self.output.take() {
            output.pool.stop_all();
            info!("Mixer output closed");
        }
    }

    fn create_handle(&self, path: &Path, kind: SoundKind) -> AudioResult<MixerHandle> {
        let output = self.output.as_ref().ok_or(AudioError::NotStarted)?;

        let clip = if kind.is_streamed() {
            verify_decodable(self.assets.open(path)?)?;
            ClipData::Streamed {
                path: path.to_path_buf(),
                assets: self.assets.clone(),
            }
        } else {
            let data = self.assets.read(path)?;
            verify_decodable(data.cursor())?;
            ClipData::Buffered(data)
        };

        debug!("Created {} handle for {}", kind, path.display());

        Ok(MixerHandle {
            pool: Arc::clone(&output.pool),
            owner: output.pool.next_owner(),
            clip,
            voice: None,
            volume: 1.0,
            muted: false,
        })
    }

    fn set_output_gain(&self, gain: f32) {
        if let Some(output) = &self.output {
            output.pool.set_output_gain(clamp_volume(gain));
        }
    }
}

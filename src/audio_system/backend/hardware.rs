//! Hardware-interface backend
//!
//! Native audio interfaces of this family hand out objects that must be
//! created, realized and queried for interfaces in a fixed order:
//!
//! 1. create the engine object
//! 2. realize it
//! 3. fetch the engine interface
//! 4. create the output mix from the engine
//! 5. realize the output mix
//! 6. fetch the output mix volume interface (optional)
//!
//! [`EngineState`] holds whatever has been acquired so far and releases it in
//! reverse order when dropped, so an early return out of any stage unwinds
//! exactly the stages before it. After a successful start the state is shared
//! by every handle, which keeps the engine alive until the last sound is gone.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{AudioBackend, SoundHandle};
use crate::assets::{AssetStore, SharedBytes};
use crate::audio_system::source::SoundKind;
use crate::audio_system::volume::clamp_volume;
use crate::config::AudioConfig;
use crate::error::{AudioError, AudioResult, NativeError};

/// Acquisition stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitStage {
    CreateEngine,
    RealizeEngine,
    EngineInterface,
    CreateOutputMix,
    RealizeOutputMix,
    OutputMixVolume,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InitStage::CreateEngine => "create engine",
            InitStage::RealizeEngine => "realize engine",
            InitStage::EngineInterface => "engine interface",
            InitStage::CreateOutputMix => "create output mix",
            InitStage::RealizeOutputMix => "realize output mix",
            InitStage::OutputMixVolume => "output mix volume",
        };
        f.write_str(text)
    }
}

/// The object/interface API of a native audio system.
pub trait NativeAudioApi {
    type Engine;
    type EngineInterface;
    type OutputMix;
    type MixVolume;
    type Player: SoundHandle;

    fn create_engine(&self) -> Result<Self::Engine, NativeError>;

    fn realize_engine(&self, engine: &mut Self::Engine) -> Result<(), NativeError>;

    fn engine_interface(&self, engine: &Self::Engine) -> Result<Self::EngineInterface, NativeError>;

    fn create_output_mix(
        &self,
        engine: &Self::EngineInterface,
    ) -> Result<Self::OutputMix, NativeError>;

    fn realize_output_mix(&self, mix: &mut Self::OutputMix) -> Result<(), NativeError>;

    fn mix_volume_interface(&self, mix: &Self::OutputMix) -> Result<Self::MixVolume, NativeError>;

    fn set_mix_volume(&self, volume: &Self::MixVolume, gain: f32);

    fn create_player(
        &self,
        engine: &Self::EngineInterface,
        mix: &Self::OutputMix,
        data: SharedBytes,
    ) -> Result<Self::Player, NativeError>;

    fn destroy_output_mix(&self, mix: Self::OutputMix);

    fn destroy_engine(&self, engine: Self::Engine);
}

/// Engine resources acquired so far.
pub struct EngineState<A: NativeAudioApi> {
    api: Arc<A>,
    engine: Option<A::Engine>,
    interface: Option<A::EngineInterface>,
    output_mix: Option<A::OutputMix>,
    mix_volume: Option<A::MixVolume>,
}

fn failed_at(stage: InitStage) -> impl FnOnce(NativeError) -> AudioError {
    move |source| {
        error!(%stage, error = %source, "Audio engine stage failed");
        AudioError::BackendInit { stage, source }
    }
}

impl<A: NativeAudioApi> EngineState<A> {
    fn acquire(api: &Arc<A>) -> AudioResult<Self> {
        let mut state = Self {
            api: Arc::clone(api),
            engine: None,
            interface: None,
            output_mix: None,
            mix_volume: None,
        };

        let engine = state
            .engine
            .insert(api.create_engine().map_err(failed_at(InitStage::CreateEngine))?);
        api.realize_engine(engine)
            .map_err(failed_at(InitStage::RealizeEngine))?;
        let interface = state
            .interface
            .insert(api.engine_interface(engine).map_err(failed_at(InitStage::EngineInterface))?);

        let mix = state.output_mix.insert(
            api.create_output_mix(interface)
                .map_err(failed_at(InitStage::CreateOutputMix))?,
        );
        api.realize_output_mix(mix)
            .map_err(failed_at(InitStage::RealizeOutputMix))?;

        match api.mix_volume_interface(mix) {
            Ok(volume) => state.mix_volume = Some(volume),
            Err(e) => warn!(
                stage = %InitStage::OutputMixVolume,
                error = %e,
                "Output mix has no volume interface"
            ),
        }

        Ok(state)
    }
}

impl<A: NativeAudioApi> Drop for EngineState<A> {
    fn drop(&mut self) {
        self.mix_volume = None;
        if let Some(mix) = self.output_mix.take() {
            debug!("Destroying output mix");
            self.api.destroy_output_mix(mix);
        }
        self.interface = None;
        if let Some(engine) = self.engine.take() {
            debug!("Destroying audio engine");
            self.api.destroy_engine(engine);
        }
    }
}

/// Player object plus a share of the engine it was created from.
pub struct HardwareHandle<A: NativeAudioApi> {
    player: A::Player,
    _engine: Arc<EngineState<A>>,
}

impl<A: NativeAudioApi> SoundHandle for HardwareHandle<A> {
    fn play(&mut self, loops: i32) -> AudioResult<()> {
        self.player.play(loops)
    }

    fn stop(&mut self) {
        self.player.stop();
    }

    fn pause(&mut self) {
        self.player.pause();
    }

    fn resume(&mut self) {
        self.player.resume();
    }

    fn set_volume(&mut self, gain: f32) {
        self.player.set_volume(gain);
    }

    fn set_muted(&mut self, muted: bool) {
        self.player.set_muted(muted);
    }

    fn is_finished(&self) -> bool {
        self.player.is_finished()
    }
}

pub struct HardwareBackend<A: NativeAudioApi> {
    api: Arc<A>,
    assets: AssetStore,
    engine: Option<Arc<EngineState<A>>>,
}

impl<A: NativeAudioApi> HardwareBackend<A> {
    pub fn new(api: A, config: &AudioConfig) -> Self {
        Self {
            api: Arc::new(api),
            assets: AssetStore::new(config.asset_root.clone()),
            engine: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Whether the output mix exposed a volume interface
    pub fn has_mix_volume(&self) -> bool {
        self.engine
            .as_ref()
            .map(|engine| engine.mix_volume.is_some())
            .unwrap_or(false)
    }
}

impl<A: NativeAudioApi> AudioBackend for HardwareBackend<A> {
    type Handle = HardwareHandle<A>;

    fn name(&self) -> &'static str {
        "hardware"
    }

    fn initialize(&mut self) -> AudioResult<()> {
        if self.engine.is_some() {
            return Ok(());
        }
        let state = EngineState::acquire(&self.api)?;
        self.engine = Some(Arc::new(state));
        info!("Audio engine realized");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    fn shutdown(&mut self) {
        if let Some(engine) = self.engine.take() {
            let live_handles = Arc::strong_count(&engine) - 1;
            if live_handles > 0 {
                warn!(
                    live_handles,
                    "Shutting down with live sounds, engine release deferred"
                );
            }
            drop(engine);
            info!("Audio engine shut down");
        }
    }

    fn create_handle(&self, path: &Path, kind: SoundKind) -> AudioResult<Self::Handle> {
        let engine = self.engine.as_ref().ok_or(AudioError::NotStarted)?;
        let (Some(interface), Some(mix)) = (engine.interface.as_ref(), engine.output_mix.as_ref())
        else {
            return Err(AudioError::NotStarted);
        };

        let data = self.assets.read(path)?;
        let player = self
            .api
            .create_player(interface, mix, data)
            .map_err(AudioError::PlayerCreationFailed)?;

        debug!("Created {} player for {}", kind, path.display());

        Ok(HardwareHandle {
            player,
            _engine: Arc::clone(engine),
        })
    }

    fn set_output_gain(&self, gain: f32) {
        let Some(engine) = &self.engine else {
            return;
        };
        match &engine.mix_volume {
            Some(volume) => self.api.set_mix_volume(volume, clamp_volume(gain)),
            None => debug!("No output mix volume interface, output gain ignored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultCode;
    use parking_lot::Mutex;
    use std::io::Write;

    /// Native API whose stages succeed until `fail_at`.
    #[derive(Default)]
    struct ScriptedApi {
        fail_at: Option<InitStage>,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedApi {
        fn failing_at(stage: InitStage) -> Self {
            Self {
                fail_at: Some(stage),
                ..Self::default()
            }
        }

        fn step(&self, stage: InitStage, event: &str) -> Result<(), NativeError> {
            if self.fail_at == Some(stage) {
                self.events.lock().push(format!("fail {event}"));
                return Err(NativeError::new(ResultCode::ResourceError, event));
            }
            self.events.lock().push(event.to_string());
            Ok(())
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    struct ScriptedPlayer {
        events: Arc<Mutex<Vec<String>>>,
        playing: bool,
    }

    impl SoundHandle for ScriptedPlayer {
        fn play(&mut self, loops: i32) -> AudioResult<()> {
            self.events.lock().push(format!("play {loops}"));
            self.playing = true;
            Ok(())
        }
        fn stop(&mut self) {
            self.playing = false;
        }
        fn pause(&mut self) {}
        fn resume(&mut self) {}
        fn set_volume(&mut self, _gain: f32) {}
        fn set_muted(&mut self, _muted: bool) {}
        fn is_finished(&self) -> bool {
            !self.playing
        }
    }

    impl Drop for ScriptedPlayer {
        fn drop(&mut self) {
            self.events.lock().push("destroy player".to_string());
        }
    }

    impl NativeAudioApi for ScriptedApi {
        type Engine = ();
        type EngineInterface = ();
        type OutputMix = ();
        type MixVolume = ();
        type Player = ScriptedPlayer;

        fn create_engine(&self) -> Result<(), NativeError> {
            self.step(InitStage::CreateEngine, "create engine")
        }
        fn realize_engine(&self, _engine: &mut ()) -> Result<(), NativeError> {
            self.step(InitStage::RealizeEngine, "realize engine")
        }
        fn engine_interface(&self, _engine: &()) -> Result<(), NativeError> {
            self.step(InitStage::EngineInterface, "engine interface")
        }
        fn create_output_mix(&self, _engine: &()) -> Result<(), NativeError> {
            self.step(InitStage::CreateOutputMix, "create output mix")
        }
        fn realize_output_mix(&self, _mix: &mut ()) -> Result<(), NativeError> {
            self.step(InitStage::RealizeOutputMix, "realize output mix")
        }
        fn mix_volume_interface(&self, _mix: &()) -> Result<(), NativeError> {
            self.step(InitStage::OutputMixVolume, "mix volume")
        }
        fn set_mix_volume(&self, _volume: &(), gain: f32) {
            self.events.lock().push(format!("mix volume {gain}"));
        }
        fn create_player(
            &self,
            _engine: &(),
            _mix: &(),
            _data: SharedBytes,
        ) -> Result<ScriptedPlayer, NativeError> {
            self.events.lock().push("create player".to_string());
            Ok(ScriptedPlayer {
                events: Arc::clone(&self.events),
                playing: false,
            })
        }
        fn destroy_output_mix(&self, _mix: ()) {
            self.events.lock().push("destroy output mix".to_string());
        }
        fn destroy_engine(&self, _engine: ()) {
            self.events.lock().push("destroy engine".to_string());
        }
    }

    fn released(events: &[String]) -> Vec<&str> {
        events
            .iter()
            .map(String::as_str)
            .filter(|e| e.starts_with("destroy"))
            .collect()
    }

    #[test]
    fn test_full_acquisition_succeeds() {
        let mut backend = HardwareBackend::new(ScriptedApi::default(), &AudioConfig::default());
        backend.initialize().unwrap();

        assert!(backend.is_initialized());
        assert!(backend.has_mix_volume());
        assert_eq!(
            backend.api().events(),
            vec![
                "create engine",
                "realize engine",
                "engine interface",
                "create output mix",
                "realize output mix",
                "mix volume",
            ]
        );
    }

    #[test]
    fn test_each_stage_failure_releases_earlier_stages_in_reverse() {
        let cases = [
            (InitStage::CreateEngine, vec![]),
            (InitStage::RealizeEngine, vec!["destroy engine"]),
            (InitStage::EngineInterface, vec!["destroy engine"]),
            (InitStage::CreateOutputMix, vec!["destroy engine"]),
            (
                InitStage::RealizeOutputMix,
                vec!["destroy output mix", "destroy engine"],
            ),
        ];

        for (stage, expected) in cases {
            let mut backend =
                HardwareBackend::new(ScriptedApi::failing_at(stage), &AudioConfig::default());
            let err = backend.initialize().unwrap_err();

            assert!(
                matches!(err, AudioError::BackendInit { stage: s, .. } if s == stage),
                "unexpected error for {stage}: {err}"
            );
            assert!(!backend.is_initialized());
            let events = backend.api().events();
            assert_eq!(released(&events), expected, "stage {stage}");
        }
    }

    #[test]
    fn test_missing_volume_interface_is_not_fatal() {
        let mut backend = HardwareBackend::new(
            ScriptedApi::failing_at(InitStage::OutputMixVolume),
            &AudioConfig::default(),
        );
        backend.initialize().unwrap();

        assert!(backend.is_initialized());
        assert!(!backend.has_mix_volume());
        backend.set_output_gain(0.5);
        assert!(released(&backend.api().events()).is_empty());
    }

    #[test]
    fn test_output_gain_goes_through_volume_interface() {
        let mut backend = HardwareBackend::new(ScriptedApi::default(), &AudioConfig::default());
        backend.initialize().unwrap();
        backend.set_output_gain(2.0);
        assert!(backend.api().events().contains(&"mix volume 1".to_string()));
    }

    #[test]
    fn test_engine_outlives_shutdown_until_last_handle_drops() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("loop.ogg")).unwrap();
        file.write_all(b"not really ogg").unwrap();

        let api = ScriptedApi::default();
        let events = Arc::clone(&api.events);
        let mut backend = HardwareBackend::new(api, &AudioConfig::default());
        backend.initialize().unwrap();

        let mut handle = backend
            .create_handle(&dir.path().join("loop.ogg"), SoundKind::Music)
            .unwrap();
        handle.play(-1).unwrap();

        backend.shutdown();
        assert!(!backend.is_initialized());
        assert!(released(&events.lock()).is_empty());

        backend.destroy_handle(handle);
        let events = events.lock().clone();
        assert_eq!(
            released(&events),
            vec!["destroy player", "destroy output mix", "destroy engine"]
        );
    }

    #[test]
    fn test_create_handle_requires_initialize() {
        let backend = HardwareBackend::new(ScriptedApi::default(), &AudioConfig::default());
        let result = backend.create_handle(Path::new("a.ogg"), SoundKind::Music);
        assert!(matches!(result, Err(AudioError::NotStarted)));
    }

    #[test]
    fn test_initialize_twice_acquires_once() {
        let mut backend = HardwareBackend::new(ScriptedApi::default(), &AudioConfig::default());
        backend.initialize().unwrap();
        backend.initialize().unwrap();
        let creates = backend
            .api()
            .events()
            .iter()
            .filter(|e| *e == "create engine")
            .count();
        assert_eq!(creates, 1);
    }
}

use std::path::PathBuf;

use thiserror::Error;

use crate::audio_system::backend::hardware::InitStage;

/// Errors raised by backends and the asset store.
///
/// The manager never lets these cross its public API: every failure is logged
/// at the point of detection and the operation degrades to a no-op.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio backend not started")]
    NotStarted,

    #[error("No audio output device available")]
    NoDevice,

    #[error("Failed to initialize audio output stream: {0}")]
    StreamInitFailed(String),

    #[error("Audio backend initialization failed at stage '{stage}'")]
    BackendInit {
        stage: InitStage,
        #[source]
        source: NativeError,
    },

    #[error("Failed to load audio file: {path}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),

    #[error("Failed to create native player: {0}")]
    PlayerCreationFailed(#[source] NativeError),

    #[error("No free mix slot available (max: {max})")]
    NoFreeSlot { max: usize },
}

/// Result type for backend and asset operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Result codes reported by a native audio interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    PreconditionsViolated,
    ParameterInvalid,
    MemoryFailure,
    ResourceError,
    IoError,
    FeatureUnsupported,
    ContentUnsupported,
    Internal,
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ResultCode::PreconditionsViolated => "preconditions violated",
            ResultCode::ParameterInvalid => "parameter invalid",
            ResultCode::MemoryFailure => "memory failure",
            ResultCode::ResourceError => "resource error",
            ResultCode::IoError => "io error",
            ResultCode::FeatureUnsupported => "feature unsupported",
            ResultCode::ContentUnsupported => "content unsupported",
            ResultCode::Internal => "internal error",
        };
        f.write_str(text)
    }
}

/// A failed call into a native audio interface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {detail}")]
pub struct NativeError {
    pub code: ResultCode,
    pub detail: String,
}

impl NativeError {
    pub fn new(code: ResultCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine the platform config directory")]
    NoConfigDir,
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;

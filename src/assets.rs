//! Asset store collaborator
//!
//! Resolves sound paths and hands backends either an in-memory copy of a clip
//! or a buffered stream for music.

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AudioError, AudioResult};

/// Immutable audio bytes shared between a handle and its decoders.
#[derive(Debug, Clone)]
pub struct SharedBytes(Arc<[u8]>);

impl SharedBytes {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A fresh seekable reader over the shared data
    pub fn cursor(&self) -> Cursor<SharedBytes> {
        Cursor::new(self.clone())
    }
}

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SharedBytes {
    fn from(data: Vec<u8>) -> Self {
        Self(data.into())
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    root: Option<PathBuf>,
}

impl AssetStore {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Resolve a sound path against the asset root; absolute paths pass through
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Read a whole clip into memory
    pub fn read(&self, path: &Path) -> AudioResult<SharedBytes> {
        let resolved = self.resolve(path);
        let data = std::fs::read(&resolved).map_err(|source| AudioError::LoadFailed {
            path: resolved.clone(),
            source,
        })?;
        tracing::debug!("Read clip {} ({} bytes)", resolved.display(), data.len());
        Ok(data.into())
    }

    /// Open a buffered stream for playback straight from disk
    pub fn open(&self, path: &Path) -> AudioResult<BufReader<File>> {
        let resolved = self.resolve(path);
        let file = File::open(&resolved).map_err(|source| AudioError::LoadFailed {
            path: resolved,
            source,
        })?;
        Ok(BufReader::new(file))
    }
}

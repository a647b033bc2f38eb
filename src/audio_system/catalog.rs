//! Sound storage and name lookup
//!
//! Sounds live in one arena keyed by [`SoundId`]. Catalogs, channels and the
//! background queue only ever hold ids, so aliasing a sound under a second
//! name never duplicates its backend resource.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use super::backend::SoundHandle;
use super::sound::Sound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoundId(u32);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct SoundArena<H: SoundHandle> {
    sounds: BTreeMap<SoundId, Sound<H>>,
    next_id: u32,
}

impl<H: SoundHandle> Default for SoundArena<H> {
    fn default() -> Self {
        Self {
            sounds: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<H: SoundHandle> SoundArena<H> {
    pub fn insert(&mut self, sound: Sound<H>) -> SoundId {
        let id = SoundId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.sounds.insert(id, sound);
        id
    }

    pub fn get(&self, id: SoundId) -> Option<&Sound<H>> {
        self.sounds.get(&id)
    }

    pub fn get_mut(&mut self, id: SoundId) -> Option<&mut Sound<H>> {
        self.sounds.get_mut(&id)
    }

    pub fn remove(&mut self, id: SoundId) -> Option<Sound<H>> {
        self.sounds.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SoundId, &mut Sound<H>)> {
        self.sounds.iter_mut().map(|(id, sound)| (*id, sound))
    }

    /// Remove every sound, in id order
    pub fn drain(&mut self) -> Vec<(SoundId, Sound<H>)> {
        std::mem::take(&mut self.sounds).into_iter().collect()
    }
}

/// Name and path index for one sound category.
///
/// Several names may point at one id (aliases); the path map records the name
/// a path was first loaded under and is repointed when that name goes away.
#[derive(Debug, Default)]
pub struct Catalog {
    by_name: HashMap<String, SoundId>,
    by_path: HashMap<PathBuf, String>,
}

impl Catalog {
    pub fn id(&self, name: &str) -> Option<SoundId> {
        self.by_name.get(name).copied()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Id of the sound already loaded from `path`
    pub fn id_for_path(&self, path: &Path) -> Option<SoundId> {
        self.by_path
            .get(path)
            .and_then(|name| self.by_name.get(name))
            .copied()
    }

    pub fn insert(&mut self, name: &str, path: &Path, id: SoundId) {
        self.by_name.insert(name.to_string(), id);
        self.by_path.insert(path.to_path_buf(), name.to_string());
    }

    pub fn alias(&mut self, name: &str, id: SoundId) {
        self.by_name.insert(name.to_string(), id);
    }

    /// Drop `name`, keeping the path entry pointed at a remaining alias.
    /// Returns the id and whether any other name still refers to it.
    pub fn remove(&mut self, name: &str, path: &Path) -> Option<(SoundId, bool)> {
        let id = self.by_name.remove(name)?;
        let survivor = self
            .by_name
            .iter()
            .filter(|(_, other)| **other == id)
            .map(|(alias, _)| alias.clone())
            .min();

        if self.by_path.get(path).map(String::as_str) == Some(name) {
            match &survivor {
                Some(alias) => {
                    self.by_path.insert(path.to_path_buf(), alias.clone());
                }
                None => {
                    self.by_path.remove(path);
                }
            }
        }

        Some((id, survivor.is_some()))
    }

    /// Every distinct id, sorted
    pub fn ids(&self) -> Vec<SoundId> {
        let mut ids: Vec<SoundId> = self.by_name.values().copied().collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
        self.by_path.clear();
    }
}

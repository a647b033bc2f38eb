//! Background music queue
//!
//! An ordered list of music ids with an index cursor. The cursor never wraps;
//! once it moves past the last entry it stays there until rewound.

use super::catalog::SoundId;

#[derive(Debug, Default)]
pub struct BackgroundQueue {
    entries: Vec<SoundId>,
    cursor: usize,
}

impl BackgroundQueue {
    pub fn push(&mut self, id: SoundId) {
        self.entries.push(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Entry under the cursor, `None` once past the end
    pub fn current(&self) -> Option<SoundId> {
        self.entries.get(self.cursor).copied()
    }

    /// Move to the next entry. The cursor stops one past the last entry.
    pub fn advance(&mut self) -> Option<SoundId> {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
        self.current()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.entries.len()
    }

    /// Drop every occurrence of `id`, keeping the cursor on the same entry
    /// (or on the one that slid into its place)
    pub fn remove(&mut self, id: SoundId) {
        let before_cursor = self.entries[..self.cursor.min(self.entries.len())]
            .iter()
            .filter(|entry| **entry == id)
            .count();
        self.entries.retain(|entry| *entry != id);
        self.cursor = (self.cursor - before_cursor).min(self.entries.len());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

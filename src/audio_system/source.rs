//! Sound categories
//!
//! Music tracks and effect clips share every operation; they differ in how a
//! backend holds their data and in which catalog they live.

use std::fmt;

/// Loop count meaning "repeat until stopped"
pub const LOOP_FOREVER: i32 = -1;

/// Sound categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundKind {
    /// Long, usually looping background track
    Music,

    /// Short fire-and-forget clip
    Effect,
}

impl fmt::Display for SoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundKind::Music => write!(f, "music"),
            SoundKind::Effect => write!(f, "effect"),
        }
    }
}

impl SoundKind {
    /// Whether the backend should stream this kind from disk rather than
    /// keep the decoded data in memory
    pub fn is_streamed(&self) -> bool {
        match self {
            SoundKind::Music => true,
            SoundKind::Effect => false,
        }
    }
}

/// Whether a loop count requests indefinite repetition
pub fn loops_forever(loops: i32) -> bool {
    loops < 0
}

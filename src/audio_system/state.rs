//! Playback state machines for sounds and channels

/// State of a single sound
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PlayState {
    /// Not playing; the next play starts from the beginning
    #[default]
    Stopped,

    /// Actively producing output
    Playing,

    /// Holding its position until resumed
    Paused,
}

impl PlayState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, PlayState::Stopped)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlayState::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlayState::Paused)
    }

    /// Get a human-readable description of the state
    pub fn description(&self) -> &'static str {
        match self {
            PlayState::Stopped => "Stopped",
            PlayState::Playing => "Playing",
            PlayState::Paused => "Paused",
        }
    }
}

/// Group state of a logical channel, forced onto members as they join
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ChannelState {
    #[default]
    Playing,
    Paused,
    Stopped,
}

impl ChannelState {
    pub fn description(&self) -> &'static str {
        match self {
            ChannelState::Playing => "Playing",
            ChannelState::Paused => "Paused",
            ChannelState::Stopped => "Stopped",
        }
    }
}

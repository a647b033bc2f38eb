//! Three-tier volume composition
//!
//! Every sound carries a base, a channel and a master tier. The gain pushed to
//! the backend is the product of the three.

/// Clamp a volume into [0.0, 1.0]. NaN collapses to silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeComposition {
    base: f32,
    channel: f32,
    master: f32,
}

impl VolumeComposition {
    pub fn new(base: f32, channel: f32, master: f32) -> Self {
        Self {
            base: clamp_volume(base),
            channel: clamp_volume(channel),
            master: clamp_volume(master),
        }
    }

    pub fn base(&self) -> f32 {
        self.base
    }

    pub fn channel(&self) -> f32 {
        self.channel
    }

    pub fn master(&self) -> f32 {
        self.master
    }

    pub fn set_base(&mut self, volume: f32) {
        self.base = clamp_volume(volume);
    }

    pub fn set_channel(&mut self, volume: f32) {
        self.channel = clamp_volume(volume);
    }

    pub fn set_master(&mut self, volume: f32) {
        self.master = clamp_volume(volume);
    }

    pub fn increase_base(&mut self, delta: f32) {
        self.set_base(self.base + delta);
    }

    pub fn decrease_base(&mut self, delta: f32) {
        self.set_base(self.base - delta);
    }

    /// Gain actually heard: base × channel × master
    pub fn effective(&self) -> f32 {
        self.base * self.channel * self.master
    }
}

impl Default for VolumeComposition {
    fn default() -> Self {
        Self {
            base: 1.0,
            channel: 1.0,
            master: 1.0,
        }
    }
}

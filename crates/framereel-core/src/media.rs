//! Frame geometry shared between loaders, transforms and sinks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of a decoded frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
}

impl FrameShape {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size in bytes of one packed RGB24 frame of this shape.
    pub fn rgb24_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Round both dimensions up to the next even number.
    ///
    /// Chroma-subsampled pixel formats (yuv420p) reject odd sizes.
    pub fn even(&self) -> Self {
        Self {
            width: self.width + (self.width & 1),
            height: self.height + (self.height & 1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

//! Requested and achieved context capabilities

use serde::{Deserialize, Serialize};

/// Capabilities requested for a rendering context
///
/// After format selection the depth and stencil sizes are replaced with the
/// chosen format's values, and the antialiasing level with whatever level the
/// fallback ladder settled on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Depth buffer bits
    pub depth_bits: u32,
    /// Stencil buffer bits
    pub stencil_bits: u32,
    /// Multisampling level (samples per pixel), 0 disables antialiasing
    pub antialiasing_level: u32,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            depth_bits: 24,
            stencil_bits: 8,
            antialiasing_level: 0,
        }
    }
}

impl ContextSettings {
    /// Create settings from explicit values
    pub const fn new(depth_bits: u32, stencil_bits: u32, antialiasing_level: u32) -> Self {
        Self {
            depth_bits,
            stencil_bits,
            antialiasing_level,
        }
    }

    /// Settings requesting no depth, stencil or antialiasing
    pub const fn minimal() -> Self {
        Self::new(0, 0, 0)
    }

    /// Builder: set depth bits
    pub fn with_depth_bits(mut self, bits: u32) -> Self {
        self.depth_bits = bits;
        self
    }

    /// Builder: set stencil bits
    pub fn with_stencil_bits(mut self, bits: u32) -> Self {
        self.stencil_bits = bits;
        self
    }

    /// Builder: set antialiasing level
    pub fn with_antialiasing(mut self, level: u32) -> Self {
        self.antialiasing_level = level;
        self
    }
}

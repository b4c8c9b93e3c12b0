//! Pixel format descriptions

/// Depth and visual of a target surface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceFormat {
    /// Colour depth of the surface in bits
    pub depth: u32,
    /// Native visual / format identifier
    pub format_id: u64,
}

impl SurfaceFormat {
    /// Create a new surface format
    pub const fn new(depth: u32, format_id: u64) -> Self {
        Self { depth, format_id }
    }
}

/// A pixel format offered by the driver
///
/// Enumerated fresh for every context creation and dropped once a format
/// has been chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CandidateFormat {
    /// Native visual / format identifier
    pub format_id: u64,
    /// Colour depth of the visual this format renders to
    pub visual_depth: u32,
    /// Sum of the red, green, blue and alpha channel sizes
    pub color_bits: u32,
    /// Depth buffer size
    pub depth_bits: u32,
    /// Stencil buffer size
    pub stencil_bits: u32,
    /// Whether the format has multisample buffers
    pub has_antialiasing: bool,
    /// Samples per pixel reported by the driver
    pub sample_count: u32,
    /// Supports RGBA rendering
    pub rgba: bool,
    /// Has a back buffer
    pub double_buffered: bool,
}

impl CandidateFormat {
    /// Samples per pixel actually available, zero without sample buffers
    pub fn effective_samples(&self) -> u32 {
        if self.has_antialiasing {
            self.sample_count
        } else {
            0
        }
    }

    /// Whether this format renders to surfaces of `surface`'s depth and visual
    pub fn matches_surface(&self, surface: &SurfaceFormat) -> bool {
        self.visual_depth == surface.depth && self.format_id == surface.format_id
    }
}

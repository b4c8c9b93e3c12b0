//! GLX visual attributes

use lumen_platform::CandidateFormat;
use std::os::raw::c_int;

// glXGetConfig attributes (glx.h, GLX_ARB_multisample)
pub(crate) const GLX_RGBA: c_int = 4;
pub(crate) const GLX_DOUBLEBUFFER: c_int = 5;
pub(crate) const GLX_RED_SIZE: c_int = 8;
pub(crate) const GLX_GREEN_SIZE: c_int = 9;
pub(crate) const GLX_BLUE_SIZE: c_int = 10;
pub(crate) const GLX_ALPHA_SIZE: c_int = 11;
pub(crate) const GLX_DEPTH_SIZE: c_int = 12;
pub(crate) const GLX_STENCIL_SIZE: c_int = 13;
pub(crate) const GLX_SAMPLE_BUFFERS_ARB: c_int = 100_000;
pub(crate) const GLX_SAMPLES_ARB: c_int = 100_001;

/// Raw `glXGetConfig` values of one visual
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisualAttributes {
    pub rgba: c_int,
    pub double_buffer: c_int,
    pub red: c_int,
    pub green: c_int,
    pub blue: c_int,
    pub alpha: c_int,
    pub depth: c_int,
    pub stencil: c_int,
    pub sample_buffers: c_int,
    pub samples: c_int,
}

fn bits(value: c_int) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl VisualAttributes {
    /// Describe the visual `visual_id` of depth `visual_depth` as a candidate
    pub fn to_candidate(&self, visual_id: u64, visual_depth: u32) -> CandidateFormat {
        CandidateFormat {
            format_id: visual_id,
            visual_depth,
            color_bits: bits(self.red) + bits(self.green) + bits(self.blue) + bits(self.alpha),
            depth_bits: bits(self.depth),
            stencil_bits: bits(self.stencil),
            has_antialiasing: self.sample_buffers != 0,
            sample_count: bits(self.samples),
            rgba: self.rgba != 0,
            double_buffered: self.double_buffer != 0,
        }
    }
}

//! Lumen Platform Seam
//!
//! The boundary between Lumen's context negotiation and a native GL
//! windowing system. Everything behind [`GlPlatform`] is treated as an
//! external collaborator: the display connection, surfaces, the driver's
//! pixel formats and the native context calls.
//!
//! Implementations:
//! - `lumen_platform_x11`: GLX on an Xlib connection
//! - `lumen_core::headless`: in-memory platform used by tests

pub mod error;
pub mod format;

pub use error::{PlatformError, Result};
pub use format::{CandidateFormat, SurfaceFormat};

use std::fmt;
use std::num::{NonZeroU64, NonZeroUsize};

/// Opaque handle to a native rendering context
///
/// For GLX this is the address of the `GLXContext` record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextHandle(NonZeroUsize);

impl ContextHandle {
    /// Wrap a raw native value, `None` for a null handle
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// The raw native value
    pub fn as_raw(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identifier of a native drawable (an X window id for GLX)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(NonZeroU64);

impl SurfaceId {
    /// Wrap a raw drawable id, `None` for the null drawable
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw drawable id
    pub fn as_raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Optional swap-interval capability (`glXSwapIntervalSGI` and friends)
pub trait SwapControl: Send + Sync {
    /// Set the number of vertical retraces between buffer swaps
    fn set_swap_interval(&self, interval: u32);
}

/// Native GL windowing system
///
/// All calls are synchronous and made on the invoking thread. Binding calls
/// (`make_current`, `release_current`) affect only the calling thread.
pub trait GlPlatform: Send + Sync {
    /// Bits per pixel of the default screen
    fn default_bits_per_pixel(&self) -> u32;

    /// Depth and visual of an existing surface
    fn surface_format(&self, surface: SurfaceId) -> Result<SurfaceFormat>;

    /// Create a hidden 1x1 surface at the default depth and visual
    fn create_hidden_surface(&self) -> Result<SurfaceId>;

    /// Destroy a surface created by [`GlPlatform::create_hidden_surface`]
    fn destroy_surface(&self, surface: SurfaceId);

    /// List the pixel formats offered for surfaces of the given format
    ///
    /// Implementations may pre-filter by depth and visual; callers filter again.
    fn enumerate_formats(&self, surface: &SurfaceFormat) -> Result<Vec<CandidateFormat>>;

    /// Create a native context for `format`, sharing objects with `share_with`
    fn create_context(
        &self,
        format: &CandidateFormat,
        share_with: Option<ContextHandle>,
    ) -> Result<ContextHandle>;

    /// Destroy a native context. It must not be current on any thread.
    fn destroy_context(&self, context: ContextHandle);

    /// Attach a colour resource compatible with `format` to `surface`
    fn bind_color_resource(&self, surface: SurfaceId, format: &CandidateFormat) -> Result<()>;

    /// Bind `context` to `surface` on the calling thread
    fn make_current(&self, surface: SurfaceId, context: ContextHandle) -> Result<()>;

    /// Unbind whatever context is current on the calling thread
    fn release_current(&self) -> Result<()>;

    /// Present the back buffer of `surface`
    fn swap_buffers(&self, surface: SurfaceId);

    /// The swap-interval capability, if the driver exposes one
    fn swap_control(&self) -> Option<&dyn SwapControl>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handles_are_rejected() {
        assert_eq!(ContextHandle::from_raw(0), None);
        assert_eq!(SurfaceId::from_raw(0), None);
    }

    #[test]
    fn test_handles_keep_raw_value() {
        let context = ContextHandle::from_raw(0xdead_beef).unwrap();
        assert_eq!(context.as_raw(), 0xdead_beef);
        assert_eq!(context.to_string(), "0xdeadbeef");

        let surface = SurfaceId::from_raw(0x0420_0001).unwrap();
        assert_eq!(surface.as_raw(), 0x0420_0001);
    }
}

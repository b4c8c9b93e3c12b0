//! Frame presentation and vertical sync

use lumen_platform::{GlPlatform, SurfaceId};

/// Presents frames and toggles swap pacing for a context's surface
pub struct SwapController<'a> {
    platform: &'a dyn GlPlatform,
}

impl<'a> SwapController<'a> {
    /// Create a controller for `platform`
    pub fn new(platform: &'a dyn GlPlatform) -> Self {
        Self { platform }
    }

    /// Swap the back buffer of `surface` to the screen
    ///
    /// Hidden placeholder surfaces and disabled contexts (`None`) are skipped.
    pub fn display(&self, surface: Option<SurfaceId>, hidden: bool) {
        match surface {
            Some(surface) if !hidden => self.platform.swap_buffers(surface),
            _ => {}
        }
    }

    /// Enable or disable vertical sync, if the driver allows it
    ///
    /// Returns whether the swap interval was actually changed.
    pub fn set_vertical_sync(&self, enabled: bool) -> bool {
        match self.platform.swap_control() {
            Some(control) => {
                control.set_swap_interval(u32::from(enabled));
                true
            }
            None => {
                tracing::debug!("Swap interval control unavailable; vertical sync unchanged");
                false
            }
        }
    }
}

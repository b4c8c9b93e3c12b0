//! Shared display resource
//!
//! [`GlDisplay`] owns the native platform (the display connection). Open the
//! platform once per connection, wrap it in a `GlDisplay`, and hand clones to
//! every context; each context keeps its clone alive, so the connection
//! outlives all contexts created on it. Current-context bookkeeping is
//! process-wide and shared by every display.
//!
//! ```ignore
//! let platform = XlibPlatform::open(None)?;
//! let display = GlDisplay::new(Arc::new(platform));
//! let context = RenderingContext::new_offscreen(&display, None);
//! ```

use crate::tracker::CurrentContextTracker;
use lumen_platform::GlPlatform;
use std::fmt;
use std::sync::Arc;

struct DisplayInner {
    platform: Arc<dyn GlPlatform>,
}

/// Shared handle to a native GL display
#[derive(Clone)]
pub struct GlDisplay {
    inner: Arc<DisplayInner>,
}

impl GlDisplay {
    /// Wrap an opened platform
    pub fn new(platform: Arc<dyn GlPlatform>) -> Self {
        Self {
            inner: Arc::new(DisplayInner { platform }),
        }
    }

    /// The native platform
    pub fn platform(&self) -> &dyn GlPlatform {
        self.inner.platform.as_ref()
    }

    /// Current-context bookkeeping, shared with every other display
    pub fn tracker(&self) -> &'static CurrentContextTracker {
        CurrentContextTracker::global()
    }

    /// Whether the calling thread has any context bound
    pub fn is_any_context_active(&self) -> bool {
        self.tracker().is_any_active()
    }

    /// Whether both handles refer to the same display
    pub fn same_display(&self, other: &GlDisplay) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for GlDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlDisplay")
            .field("default_bits_per_pixel", &self.platform().default_bits_per_pixel())
            .finish_non_exhaustive()
    }
}

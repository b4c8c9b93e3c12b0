//! Surfaces from `raw-window-handle` windows

use lumen_platform::{PlatformError, Result, SurfaceId};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};

/// Extract the X window id of a raw window handle
///
/// Returns `Ok(None)` for a null Xlib window; non-X11 handles are an error.
pub fn surface_from_raw_window_handle(handle: RawWindowHandle) -> Result<Option<SurfaceId>> {
    match handle {
        RawWindowHandle::Xlib(handle) => Ok(SurfaceId::from_raw(u64::from(handle.window))),
        RawWindowHandle::Xcb(handle) => Ok(SurfaceId::from_raw(u64::from(handle.window.get()))),
        other => Err(PlatformError::Unsupported(format!(
            "{other:?} is not an X11 window"
        ))),
    }
}

/// Extract the X window id of any window exposing a window handle
pub fn surface_of(window: &impl HasWindowHandle) -> Result<Option<SurfaceId>> {
    let handle = window
        .window_handle()
        .map_err(|err| PlatformError::Query(format!("window handle unavailable: {err}")))?;
    surface_from_raw_window_handle(handle.as_raw())
}

//! Lumen X11 Platform
//!
//! GLX contexts on an Xlib display connection. `libX11` and `libGL` are
//! loaded at runtime, so the crate builds on machines without X11 headers.

pub mod colormap;
pub mod display;
pub mod visual;
pub mod window_handle;

pub use display::XlibPlatform;
pub use visual::VisualAttributes;
pub use window_handle::{surface_from_raw_window_handle, surface_of};

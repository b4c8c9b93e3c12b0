//! Lumen Core
//!
//! Negotiates OpenGL rendering contexts against a native windowing system:
//!
//! - **Format selection**: match requested depth/stencil/antialiasing against
//!   the driver's pixel formats, lowering antialiasing when nothing fits
//! - **Context lifecycle**: create contexts for a window or a private hidden
//!   surface, optionally sharing objects with a peer
//! - **Activation**: idempotent per-thread make-current bookkeeping
//! - **Presentation**: buffer swaps and best-effort vertical sync
//!
//! The native layer is injected through [`lumen_platform::GlPlatform`]; the
//! [`headless`] platform runs everything in memory.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lumen_core::headless::HeadlessPlatform;
//! use lumen_core::{ContextSettings, GlDisplay, RenderingContext, SurfaceFormat};
//!
//! let platform = Arc::new(HeadlessPlatform::new(SurfaceFormat::new(24, 0x21), 24));
//! let window = platform.add_window(SurfaceFormat::new(24, 0x21));
//! let display = GlDisplay::new(platform);
//!
//! let context = RenderingContext::new_windowed(
//!     &display,
//!     None,
//!     window,
//!     32,
//!     ContextSettings::new(24, 8, 4),
//! );
//!
//! // No multisampled format on this screen: antialiasing was turned off
//! assert_eq!(context.settings().antialiasing_level, 0);
//!
//! context.set_active(true).unwrap();
//! context.display();
//! assert!(display.is_any_context_active());
//! ```

pub mod context;
pub mod display;
pub mod error;
pub mod headless;
pub mod selector;
pub mod settings;
pub mod swap;
pub mod tracker;

pub use context::RenderingContext;
pub use display::GlDisplay;
pub use error::{ContextError, Result};
pub use selector::{select_format, Selection, VisualSelector};
pub use settings::ContextSettings;
pub use swap::SwapController;
pub use tracker::{Binding, CurrentContextTracker};

pub use lumen_platform::{
    CandidateFormat, ContextHandle, GlPlatform, PlatformError, SurfaceFormat, SurfaceId,
};

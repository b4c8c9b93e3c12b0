//! Rendering context lifecycle
//!
//! A [`RenderingContext`] owns one native GL context, created eagerly for the
//! best pixel format of its surface. The surface is either an application
//! window or a private 1x1 hidden surface the context creates and owns.
//!
//! Construction failures do not abort: the front-end constructors return a
//! *disabled* context (no native handle) that renders nothing, while the
//! `try_*` constructors report the error instead.
//!
//! Teardown order on drop:
//! 1. Unbind from the calling thread if current here
//! 2. Destroy the native context
//! 3. Destroy the owned hidden surface, if any

use crate::display::GlDisplay;
use crate::error::{ContextError, Result};
use crate::selector::VisualSelector;
use crate::settings::ContextSettings;
use crate::swap::SwapController;
use crate::tracker::Binding;
use lumen_platform::{CandidateFormat, ContextHandle, SurfaceId};

/// An OpenGL rendering context bound to one surface
pub struct RenderingContext {
    display: GlDisplay,
    context: Option<ContextHandle>,
    surface: Option<SurfaceId>,
    owns_surface: bool,
    settings: ContextSettings,
    format: Option<CandidateFormat>,
    creation_error: Option<ContextError>,
}

impl RenderingContext {
    fn unbuilt(
        display: &GlDisplay,
        surface: Option<SurfaceId>,
        owns_surface: bool,
        settings: ContextSettings,
    ) -> Self {
        Self {
            display: display.clone(),
            context: None,
            surface,
            owns_surface,
            settings,
            format: None,
            creation_error: None,
        }
    }

    /// Create an offscreen context on a private hidden surface
    ///
    /// Negotiates with the screen's bits per pixel and no depth, stencil or
    /// antialiasing. When `shared` is given, the two contexts share objects
    /// and the new one is made current on the calling thread.
    pub fn try_new_offscreen(
        display: &GlDisplay,
        shared: Option<&RenderingContext>,
    ) -> Result<Self> {
        let mut context = Self::offscreen_shell(display)?;
        context.build(shared, display.platform().default_bits_per_pixel())?;
        Ok(context)
    }

    /// Like [`RenderingContext::try_new_offscreen`], returning a disabled
    /// context on failure
    pub fn new_offscreen(display: &GlDisplay, shared: Option<&RenderingContext>) -> Self {
        match Self::offscreen_shell(display) {
            Ok(mut context) => {
                let bits_per_pixel = display.platform().default_bits_per_pixel();
                context.build_or_disable(shared, bits_per_pixel);
                context
            }
            Err(err) => {
                tracing::error!(
                    "Failed to create a hidden surface for an offscreen context: {err}"
                );
                let mut context = Self::unbuilt(display, None, false, ContextSettings::minimal());
                context.creation_error = Some(err);
                context
            }
        }
    }

    fn offscreen_shell(display: &GlDisplay) -> Result<Self> {
        let surface = display
            .platform()
            .create_hidden_surface()
            .map_err(|err| ContextError::NativeCreation(err.to_string()))?;
        Ok(Self::unbuilt(
            display,
            Some(surface),
            true,
            ContextSettings::minimal(),
        ))
    }

    /// Create a context rendering to an application window
    ///
    /// `settings` is the request; [`RenderingContext::settings`] reports what
    /// the chosen format actually provides.
    pub fn try_new_windowed(
        display: &GlDisplay,
        shared: Option<&RenderingContext>,
        surface: SurfaceId,
        bits_per_pixel: u32,
        settings: ContextSettings,
    ) -> Result<Self> {
        let mut context = Self::unbuilt(display, Some(surface), false, settings);
        context.build(shared, bits_per_pixel)?;
        Ok(context)
    }

    /// Like [`RenderingContext::try_new_windowed`], returning a disabled
    /// context on failure
    pub fn new_windowed(
        display: &GlDisplay,
        shared: Option<&RenderingContext>,
        surface: SurfaceId,
        bits_per_pixel: u32,
        settings: ContextSettings,
    ) -> Self {
        let mut context = Self::unbuilt(display, Some(surface), false, settings);
        context.build_or_disable(shared, bits_per_pixel);
        context
    }

    fn build_or_disable(&mut self, shared: Option<&RenderingContext>, bits_per_pixel: u32) {
        if let Err(err) = self.build(shared, bits_per_pixel) {
            tracing::error!("Failed to create an OpenGL context, the context is disabled: {err}");
            self.creation_error = Some(err);
        }
    }

    fn build(&mut self, shared: Option<&RenderingContext>, bits_per_pixel: u32) -> Result<()> {
        let surface = self
            .surface
            .ok_or_else(|| ContextError::NativeCreation("no target surface".to_string()))?;

        if let Some(peer) = shared {
            if !peer.display.same_display(&self.display) {
                return Err(ContextError::NativeCreation(
                    "shared context belongs to a different display".to_string(),
                ));
            }
        }

        let platform = self.display.platform();
        let surface_format = platform
            .surface_format(surface)
            .map_err(|err| ContextError::Enumeration(err.to_string()))?;

        let selection =
            VisualSelector::new(platform).select(&surface_format, bits_per_pixel, self.settings)?;
        self.settings = selection.settings;

        let share_with = shared.and_then(RenderingContext::native_handle);
        let context = platform
            .create_context(&selection.format, share_with)
            .map_err(|err| ContextError::NativeCreation(err.to_string()))?;

        if let Err(err) = platform.bind_color_resource(surface, &selection.format) {
            platform.destroy_context(context);
            return Err(ContextError::NativeCreation(err.to_string()));
        }

        tracing::debug!(
            context = %context,
            surface = %surface,
            shared = ?share_with,
            "Created OpenGL context"
        );
        self.context = Some(context);
        self.format = Some(selection.format);

        if shared.is_some() {
            if let Err(err) = self.set_active(true) {
                tracing::warn!("Failed to activate a newly created shared context: {err}");
            }
        }

        Ok(())
    }

    fn binding(&self) -> Option<Binding> {
        self.context
            .zip(self.surface)
            .map(|(context, surface)| Binding { context, surface })
    }

    /// Activate or deactivate this context on the calling thread
    ///
    /// Both directions are idempotent. Activating a disabled context fails.
    pub fn set_active(&self, active: bool) -> Result<()> {
        self.display
            .tracker()
            .set_active(self.display.platform(), self.binding(), active)
    }

    /// Whether this context is current on the calling thread
    pub fn is_active(&self) -> bool {
        let platform = self.display.platform();
        self.context
            .is_some_and(|context| self.display.tracker().is_current(platform, context))
    }

    /// Present the rendered frame
    ///
    /// Does nothing for disabled contexts and hidden surfaces.
    pub fn display(&self) {
        let surface = self.context.and(self.surface);
        SwapController::new(self.display.platform()).display(surface, self.owns_surface);
    }

    /// Enable or disable vertical sync, best effort
    pub fn set_vertical_sync(&self, enabled: bool) {
        if self.context.is_some() {
            SwapController::new(self.display.platform()).set_vertical_sync(enabled);
        }
    }

    /// Settings actually provided by the chosen format
    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    /// The chosen pixel format, `None` for a disabled context
    pub fn format(&self) -> Option<&CandidateFormat> {
        self.format.as_ref()
    }

    /// Native context handle, `None` for a disabled context
    pub fn native_handle(&self) -> Option<ContextHandle> {
        self.context
    }

    /// The surface this context renders to
    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    /// Whether the surface is a private hidden surface owned by this context
    pub fn owns_surface(&self) -> bool {
        self.owns_surface
    }

    /// Whether construction succeeded
    pub fn is_enabled(&self) -> bool {
        self.context.is_some()
    }

    /// Why construction failed, for disabled contexts
    pub fn creation_error(&self) -> Option<&ContextError> {
        self.creation_error.as_ref()
    }

    /// The display this context was created on
    pub fn gl_display(&self) -> &GlDisplay {
        &self.display
    }
}

impl Drop for RenderingContext {
    fn drop(&mut self) {
        let platform = self.display.platform();
        let tracker = self.display.tracker();

        if let Some(context) = self.context.take() {
            if let Err(err) = tracker.deactivate(platform, Some(context)) {
                tracing::warn!(
                    "Failed to deactivate OpenGL context {context} before destroying it: {err}"
                );
            }
            let stale = tracker.forget(platform, context);
            if stale > 0 {
                tracing::warn!(
                    "OpenGL context {context} destroyed while current on {stale} other thread(s)"
                );
            }
            platform.destroy_context(context);
            tracing::debug!(context = %context, "Destroyed OpenGL context");
        }

        if self.owns_surface {
            if let Some(surface) = self.surface.take() {
                platform.destroy_surface(surface);
            }
        }
    }
}

impl std::fmt::Debug for RenderingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingContext")
            .field("context", &self.context)
            .field("surface", &self.surface)
            .field("owns_surface", &self.owns_surface)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

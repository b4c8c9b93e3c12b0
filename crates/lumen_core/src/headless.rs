//! Headless in-memory GL platform
//!
//! Behaves like a GLX driver without touching one: it hands out context and
//! surface handles, keeps a native "current context" per OS thread, and
//! records every call so tests can assert on counts and ordering.

use lumen_platform::{
    CandidateFormat, ContextHandle, GlPlatform, PlatformError, Result, SurfaceFormat, SurfaceId,
    SwapControl,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// A native call observed by [`HeadlessPlatform`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeCall {
    /// Formats were enumerated for a surface
    EnumerateFormats(SurfaceFormat),
    /// A hidden surface was created
    CreateSurface(SurfaceId),
    /// A hidden surface was destroyed
    DestroySurface(SurfaceId),
    /// A context was created
    CreateContext {
        /// The new context
        context: ContextHandle,
        /// Format it was created for
        format_id: u64,
        /// Context it shares objects with
        share_with: Option<ContextHandle>,
    },
    /// A context was destroyed
    DestroyContext(ContextHandle),
    /// A colour resource was attached to a surface
    BindColorResource {
        /// Target surface
        surface: SurfaceId,
        /// Format the resource was created for
        format_id: u64,
    },
    /// A context was made current
    MakeCurrent {
        /// Target surface
        surface: SurfaceId,
        /// Context made current
        context: ContextHandle,
    },
    /// The calling thread's context was released
    ReleaseCurrent,
    /// Buffers were swapped
    SwapBuffers(SurfaceId),
    /// The swap interval was changed
    SetSwapInterval(u32),
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_id: u64,
    formats: Vec<CandidateFormat>,
    surfaces: FxHashMap<SurfaceId, SurfaceFormat>,
    hidden: FxHashSet<SurfaceId>,
    contexts: FxHashSet<ContextHandle>,
    current: FxHashMap<ThreadId, ContextHandle>,
    color_resources: FxHashMap<SurfaceId, u64>,
    swap_interval: Option<u32>,
    destroyed_while_current: usize,
    fail_enumeration: bool,
    refuse_creation: bool,
    fail_bindings: bool,
    calls: Vec<NativeCall>,
}

impl HeadlessState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        // Keep ids recognisable in logs, like X resource ids
        0x0400_0000 + self.next_id
    }
}

type SharedState = Arc<Mutex<HeadlessState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, HeadlessState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Swap-interval capability of [`HeadlessPlatform`]
#[derive(Debug)]
pub struct HeadlessSwapControl {
    state: SharedState,
}

impl SwapControl for HeadlessSwapControl {
    fn set_swap_interval(&self, interval: u32) {
        let mut state = lock(&self.state);
        state.swap_interval = Some(interval);
        state.calls.push(NativeCall::SetSwapInterval(interval));
    }
}

/// In-memory [`GlPlatform`] for tests and headless runs
#[derive(Debug)]
pub struct HeadlessPlatform {
    default_format: SurfaceFormat,
    bits_per_pixel: u32,
    state: SharedState,
    swap_control: Option<HeadlessSwapControl>,
}

/// Build a double-buffered RGBA format for `surface`
pub fn rgba_format(
    surface: SurfaceFormat,
    color_bits: u32,
    depth_bits: u32,
    stencil_bits: u32,
    samples: u32,
) -> CandidateFormat {
    CandidateFormat {
        format_id: surface.format_id,
        visual_depth: surface.depth,
        color_bits,
        depth_bits,
        stencil_bits,
        has_antialiasing: samples > 0,
        sample_count: samples,
        rgba: true,
        double_buffered: true,
    }
}

impl HeadlessPlatform {
    /// Create a platform whose default screen has `default_format`
    ///
    /// The platform starts with a single 32-bit colour, 24/8, non-multisampled
    /// format for the default visual and a swap-interval capability.
    pub fn new(default_format: SurfaceFormat, bits_per_pixel: u32) -> Self {
        let state = Arc::new(Mutex::new(HeadlessState {
            formats: vec![rgba_format(default_format, 32, 24, 8, 0)],
            ..Default::default()
        }));
        Self {
            default_format,
            bits_per_pixel,
            swap_control: Some(HeadlessSwapControl {
                state: Arc::clone(&state),
            }),
            state,
        }
    }

    /// Builder: replace the offered formats
    pub fn with_formats(self, formats: Vec<CandidateFormat>) -> Self {
        self.set_formats(formats);
        self
    }

    /// Builder: remove the swap-interval capability
    pub fn without_swap_control(mut self) -> Self {
        self.swap_control = None;
        self
    }

    fn state(&self) -> MutexGuard<'_, HeadlessState> {
        lock(&self.state)
    }

    /// Replace the offered formats
    pub fn set_formats(&self, formats: Vec<CandidateFormat>) {
        self.state().formats = formats;
    }

    /// Make format enumeration fail
    pub fn fail_enumeration(&self, fail: bool) {
        self.state().fail_enumeration = fail;
    }

    /// Make context creation fail
    pub fn refuse_context_creation(&self, refuse: bool) {
        self.state().refuse_creation = refuse;
    }

    /// Make `make_current` and `release_current` fail
    pub fn fail_bindings(&self, fail: bool) {
        self.state().fail_bindings = fail;
    }

    /// Register an application window with the given format
    pub fn add_window(&self, format: SurfaceFormat) -> SurfaceId {
        let mut state = self.state();
        let id = state.next_id();
        let surface =
            SurfaceId::from_raw(id).unwrap_or_else(|| unreachable!("ids start above zero"));
        state.surfaces.insert(surface, format);
        surface
    }

    /// Create a context directly, bypassing format selection
    pub fn spawn_context(&self) -> ContextHandle {
        let mut state = self.state();
        let id = state.next_id();
        let context = ContextHandle::from_raw(id as usize)
            .unwrap_or_else(|| unreachable!("ids start above zero"));
        state.contexts.insert(context);
        context
    }

    /// Every call observed so far
    pub fn calls(&self) -> Vec<NativeCall> {
        self.state().calls.clone()
    }

    /// Number of observed calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Forget the observed calls
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Number of contexts not yet destroyed
    pub fn live_contexts(&self) -> usize {
        self.state().contexts.len()
    }

    /// Number of hidden surfaces not yet destroyed
    pub fn live_hidden_surfaces(&self) -> usize {
        self.state().hidden.len()
    }

    /// Native context current on the calling thread
    pub fn current_context(&self) -> Option<ContextHandle> {
        self.state().current.get(&thread::current().id()).copied()
    }

    /// Format id of the colour resource attached to `surface`
    pub fn color_resource(&self, surface: SurfaceId) -> Option<u64> {
        self.state().color_resources.get(&surface).copied()
    }

    /// Last swap interval set
    pub fn swap_interval(&self) -> Option<u32> {
        self.state().swap_interval
    }

    /// Contexts destroyed while some thread still had them current
    pub fn destroyed_while_current(&self) -> usize {
        self.state().destroyed_while_current
    }
}

impl GlPlatform for HeadlessPlatform {
    fn default_bits_per_pixel(&self) -> u32 {
        self.bits_per_pixel
    }

    fn surface_format(&self, surface: SurfaceId) -> Result<SurfaceFormat> {
        self.state()
            .surfaces
            .get(&surface)
            .copied()
            .ok_or_else(|| PlatformError::Query(format!("unknown surface {surface}")))
    }

    fn create_hidden_surface(&self) -> Result<SurfaceId> {
        let mut state = self.state();
        let id = state.next_id();
        let surface = SurfaceId::from_raw(id)
            .ok_or_else(|| PlatformError::Creation("surface id exhausted".to_string()))?;
        state.surfaces.insert(surface, self.default_format);
        state.hidden.insert(surface);
        state.calls.push(NativeCall::CreateSurface(surface));
        Ok(surface)
    }

    fn destroy_surface(&self, surface: SurfaceId) {
        let mut state = self.state();
        state.surfaces.remove(&surface);
        state.hidden.remove(&surface);
        state.color_resources.remove(&surface);
        state.calls.push(NativeCall::DestroySurface(surface));
    }

    fn enumerate_formats(&self, surface: &SurfaceFormat) -> Result<Vec<CandidateFormat>> {
        let mut state = self.state();
        state.calls.push(NativeCall::EnumerateFormats(*surface));
        if state.fail_enumeration {
            return Err(PlatformError::Query("visual query failed".to_string()));
        }
        Ok(state.formats.clone())
    }

    fn create_context(
        &self,
        format: &CandidateFormat,
        share_with: Option<ContextHandle>,
    ) -> Result<ContextHandle> {
        let mut state = self.state();
        if state.refuse_creation {
            return Err(PlatformError::Creation("context creation refused".to_string()));
        }
        if let Some(peer) = share_with {
            if !state.contexts.contains(&peer) {
                return Err(PlatformError::Creation(format!("unknown share context {peer}")));
            }
        }

        let id = state.next_id();
        let context = ContextHandle::from_raw(id as usize)
            .ok_or_else(|| PlatformError::Creation("context id exhausted".to_string()))?;
        state.contexts.insert(context);
        state.calls.push(NativeCall::CreateContext {
            context,
            format_id: format.format_id,
            share_with,
        });
        Ok(context)
    }

    fn destroy_context(&self, context: ContextHandle) {
        let mut state = self.state();
        if state.current.values().any(|current| *current == context) {
            state.destroyed_while_current += 1;
        }
        state.contexts.remove(&context);
        state.calls.push(NativeCall::DestroyContext(context));
    }

    fn bind_color_resource(&self, surface: SurfaceId, format: &CandidateFormat) -> Result<()> {
        let mut state = self.state();
        if !state.surfaces.contains_key(&surface) {
            return Err(PlatformError::Creation(format!("unknown surface {surface}")));
        }
        state.color_resources.insert(surface, format.format_id);
        state.calls.push(NativeCall::BindColorResource {
            surface,
            format_id: format.format_id,
        });
        Ok(())
    }

    fn make_current(&self, surface: SurfaceId, context: ContextHandle) -> Result<()> {
        let mut state = self.state();
        let thread = thread::current().id();
        if state.fail_bindings {
            return Err(PlatformError::Binding("make current failed".to_string()));
        }
        if !state.contexts.contains(&context) || !state.surfaces.contains_key(&surface) {
            return Err(PlatformError::Binding(format!(
                "bad context {context} or surface {surface}"
            )));
        }
        let elsewhere = state
            .current
            .iter()
            .any(|(owner, current)| *owner != thread && *current == context);
        if elsewhere {
            return Err(PlatformError::Binding(format!(
                "context {context} is current on another thread"
            )));
        }

        state.current.insert(thread, context);
        state.calls.push(NativeCall::MakeCurrent { surface, context });
        Ok(())
    }

    fn release_current(&self) -> Result<()> {
        let mut state = self.state();
        if state.fail_bindings {
            return Err(PlatformError::Binding("release failed".to_string()));
        }
        state.current.remove(&thread::current().id());
        state.calls.push(NativeCall::ReleaseCurrent);
        Ok(())
    }

    fn swap_buffers(&self, surface: SurfaceId) {
        self.state().calls.push(NativeCall::SwapBuffers(surface));
    }

    fn swap_control(&self) -> Option<&dyn SwapControl> {
        self.swap_control.as_ref().map(|control| control as &dyn SwapControl)
    }
}

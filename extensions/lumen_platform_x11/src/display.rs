//! Xlib display connection implementing [`GlPlatform`] with GLX 1.x

use crate::colormap::ColormapRegistry;
use crate::visual::{self, VisualAttributes};
use lumen_platform::{
    CandidateFormat, ContextHandle, GlPlatform, PlatformError, Result, SurfaceFormat, SurfaceId,
    SwapControl,
};
use std::ffi::{CStr, CString};
use std::os::raw::{c_int, c_long, c_uchar, c_ulong};
use std::ptr;
use std::sync::atomic::{AtomicU8, Ordering};
use x11_dl::glx::{self, Glx};
use x11_dl::xlib::{self, Xlib};

/// Code of the last X protocol error, 0 when none is pending
static LAST_X_ERROR: AtomicU8 = AtomicU8::new(0);

unsafe extern "C" fn record_x_error(
    _display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    if !event.is_null() {
        // SAFETY: Xlib hands the handler a valid event for the duration of the call
        let code = unsafe { (*event).error_code };
        LAST_X_ERROR.store(code, Ordering::Relaxed);
    }
    0
}

type SwapIntervalSgi = unsafe extern "C" fn(c_int) -> c_int;

/// `GLX_SGI_swap_control`, applies to the context current on the calling thread
struct SgiSwapControl {
    swap_interval: SwapIntervalSgi,
}

impl SwapControl for SgiSwapControl {
    fn set_swap_interval(&self, interval: u32) {
        let interval = c_int::try_from(interval).unwrap_or(c_int::MAX);
        // SAFETY: the pointer was resolved through glXGetProcAddress for this name
        let status = unsafe { (self.swap_interval)(interval) };
        if status != 0 {
            tracing::debug!("glXSwapIntervalSGI({interval}) returned {status}");
        }
    }
}

/// A display connection with GLX
pub struct XlibPlatform {
    xlib: Xlib,
    glx: Glx,
    display: *mut xlib::Display,
    screen: c_int,
    name: String,
    swap_control: Option<SgiSwapControl>,
    /// Colormaps of foreign windows live until the connection closes
    colormaps: ColormapRegistry,
}

// SAFETY: XInitThreads runs before the connection is opened, which makes Xlib
// calls on the shared display pointer safe from any thread. GLX binding state
// is per thread on the driver side.
unsafe impl Send for XlibPlatform {}
unsafe impl Sync for XlibPlatform {}

impl XlibPlatform {
    /// Open a display connection
    ///
    /// `name` defaults to `$DISPLAY`, then `:0`.
    pub fn open(name: Option<&str>) -> Result<Self> {
        let xlib = Xlib::open().map_err(|err| PlatformError::InitFailed(format!("libX11: {err}")))?;
        let glx = Glx::open().map_err(|err| PlatformError::InitFailed(format!("libGL: {err}")))?;

        let name = match name {
            Some(name) => name.to_owned(),
            None => std::env::var("DISPLAY").unwrap_or_else(|_| ":0".into()),
        };
        let c_name = CString::new(name.clone())
            .map_err(|_| PlatformError::InitFailed(format!("invalid display name {name:?}")))?;

        // SAFETY: plain Xlib calls on a connection owned by this function
        let (display, screen) = unsafe {
            (xlib.XInitThreads)();
            let display = (xlib.XOpenDisplay)(c_name.as_ptr());
            if display.is_null() {
                return Err(PlatformError::InitFailed(format!("cannot open display {name}")));
            }
            (xlib.XSetErrorHandler)(Some(record_x_error));
            (display, (xlib.XDefaultScreen)(display))
        };

        let mut platform = Self {
            xlib,
            glx,
            display,
            screen,
            name,
            swap_control: None,
            colormaps: ColormapRegistry::default(),
        };

        let (mut error_base, mut event_base) = (0, 0);
        // SAFETY: display is open
        let has_glx = unsafe {
            (platform.glx.glXQueryExtension)(display, &mut error_base, &mut event_base)
        };
        if has_glx == 0 {
            // Drop closes the connection
            return Err(PlatformError::Unsupported(format!(
                "display {} has no GLX extension",
                platform.name
            )));
        }

        platform.swap_control = platform.load_swap_control();
        tracing::info!(
            "Opened display {} (screen {}, swap control: {})",
            platform.name,
            screen,
            platform.swap_control.is_some()
        );
        Ok(platform)
    }

    /// Name of the display this connection was opened on
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw Xlib connection
    pub fn raw_display(&self) -> *mut xlib::Display {
        self.display
    }

    /// Screen number used for every query
    pub fn screen(&self) -> i32 {
        self.screen
    }

    fn has_glx_extension(&self, extension: &str) -> bool {
        // SAFETY: the returned string is owned by the GLX client library
        let extensions = unsafe {
            let raw = (self.glx.glXQueryExtensionsString)(self.display, self.screen);
            if raw.is_null() {
                return false;
            }
            CStr::from_ptr(raw).to_string_lossy().into_owned()
        };
        extensions.split_whitespace().any(|name| name == extension)
    }

    fn load_swap_control(&self) -> Option<SgiSwapControl> {
        if !self.has_glx_extension("GLX_SGI_swap_control") {
            return None;
        }
        let symbol = b"glXSwapIntervalSGI\0";
        // SAFETY: glXGetProcAddress accepts any NUL-terminated name
        let proc = unsafe { (self.glx.glXGetProcAddress)(symbol.as_ptr() as *const c_uchar) }?;
        // SAFETY: glXSwapIntervalSGI has the signature int (int)
        let swap_interval: SwapIntervalSgi = unsafe { std::mem::transmute(proc) };
        Some(SgiSwapControl { swap_interval })
    }

    /// Flush pending requests and take the last protocol error, if any
    fn take_x_error(&self) -> Option<u8> {
        // SAFETY: display is open for the lifetime of self
        unsafe {
            (self.xlib.XSync)(self.display, xlib::False);
        }
        match LAST_X_ERROR.swap(0, Ordering::Relaxed) {
            0 => None,
            code => Some(code),
        }
    }

    fn root_window(&self) -> xlib::Window {
        // SAFETY: display is open
        unsafe { (self.xlib.XRootWindow)(self.display, self.screen) }
    }

    /// Query the visuals matching `mask` against `template`; the caller frees
    /// the list with `XFree`.
    fn visual_infos(
        &self,
        mask: c_long,
        template: &mut xlib::XVisualInfo,
    ) -> (*mut xlib::XVisualInfo, usize) {
        let mut count: c_int = 0;
        // SAFETY: template is a valid XVisualInfo and count a valid out-pointer
        let infos = unsafe { (self.xlib.XGetVisualInfo)(self.display, mask, template, &mut count) };
        if infos.is_null() {
            return (ptr::null_mut(), 0);
        }
        (infos, usize::try_from(count).unwrap_or(0))
    }

    fn query_attributes(&self, info: &mut xlib::XVisualInfo) -> Result<VisualAttributes> {
        let visual_id = info.visualid;
        let info: *mut xlib::XVisualInfo = info;
        let get = |attribute: c_int| -> Result<c_int> {
            let mut value: c_int = 0;
            // SAFETY: info comes from XGetVisualInfo on this display
            let status =
                unsafe { (self.glx.glXGetConfig)(self.display, info, attribute, &mut value) };
            if status != 0 {
                return Err(PlatformError::Query(format!(
                    "glXGetConfig({attribute}) failed for visual {visual_id:#x} with {status}"
                )));
            }
            Ok(value)
        };

        let mut attributes = VisualAttributes {
            rgba: get(visual::GLX_RGBA)?,
            double_buffer: get(visual::GLX_DOUBLEBUFFER)?,
            red: get(visual::GLX_RED_SIZE)?,
            green: get(visual::GLX_GREEN_SIZE)?,
            blue: get(visual::GLX_BLUE_SIZE)?,
            alpha: get(visual::GLX_ALPHA_SIZE)?,
            depth: get(visual::GLX_DEPTH_SIZE)?,
            stencil: get(visual::GLX_STENCIL_SIZE)?,
            ..Default::default()
        };

        // GLX_ARB_multisample may be missing; treat its attributes as absent
        attributes.sample_buffers = get(visual::GLX_SAMPLE_BUFFERS_ARB).unwrap_or(0);
        attributes.samples = get(visual::GLX_SAMPLES_ARB).unwrap_or(0);
        Ok(attributes)
    }

    fn context_ptr(context: ContextHandle) -> glx::GLXContext {
        context.as_raw() as glx::GLXContext
    }
}

impl GlPlatform for XlibPlatform {
    fn default_bits_per_pixel(&self) -> u32 {
        // SAFETY: display is open
        let depth = unsafe { (self.xlib.XDefaultDepth)(self.display, self.screen) };
        u32::try_from(depth).unwrap_or(0)
    }

    fn surface_format(&self, surface: SurfaceId) -> Result<SurfaceFormat> {
        // SAFETY: XWindowAttributes is plain data
        let mut attributes: xlib::XWindowAttributes = unsafe { std::mem::zeroed() };
        // SAFETY: attributes is a valid out-pointer
        let status = unsafe {
            (self.xlib.XGetWindowAttributes)(
                self.display,
                surface.as_raw() as xlib::Window,
                &mut attributes,
            )
        };
        if let Some(code) = self.take_x_error() {
            return Err(PlatformError::Query(format!(
                "window {surface} is not queryable (X error {code})"
            )));
        }
        if status == 0 || attributes.visual.is_null() {
            return Err(PlatformError::Query(format!("window {surface} has no attributes")));
        }

        // SAFETY: visual was filled in by the server reply
        let visual_id = unsafe { (self.xlib.XVisualIDFromVisual)(attributes.visual) };
        Ok(SurfaceFormat::new(
            u32::try_from(attributes.depth).unwrap_or(0),
            u64::from(visual_id),
        ))
    }

    fn create_hidden_surface(&self) -> Result<SurfaceId> {
        // SAFETY: XSetWindowAttributes is plain data and is ignored with an empty mask
        let mut attributes: xlib::XSetWindowAttributes = unsafe { std::mem::zeroed() };
        // SAFETY: every argument refers to this display's default screen
        let window = unsafe {
            (self.xlib.XCreateWindow)(
                self.display,
                self.root_window(),
                0,
                0,
                1,
                1,
                0,
                (self.xlib.XDefaultDepth)(self.display, self.screen),
                xlib::InputOutput as _,
                (self.xlib.XDefaultVisual)(self.display, self.screen),
                0,
                &mut attributes,
            )
        };
        if let Some(code) = self.take_x_error() {
            return Err(PlatformError::Creation(format!("XCreateWindow failed (X error {code})")));
        }

        let surface = SurfaceId::from_raw(u64::from(window))
            .ok_or_else(|| PlatformError::Creation("XCreateWindow returned no window".into()))?;
        tracing::debug!("Created hidden surface {surface}");
        Ok(surface)
    }

    fn destroy_surface(&self, surface: SurfaceId) {
        let colormap = self.colormaps.detach(surface);
        // SAFETY: surface was created by create_hidden_surface on this display
        unsafe {
            (self.xlib.XDestroyWindow)(self.display, surface.as_raw() as xlib::Window);
            if let Some(colormap) = colormap {
                (self.xlib.XFreeColormap)(self.display, colormap);
            }
            (self.xlib.XFlush)(self.display);
        }
    }

    fn enumerate_formats(&self, surface: &SurfaceFormat) -> Result<Vec<CandidateFormat>> {
        // SAFETY: XVisualInfo is plain data
        let mut template: xlib::XVisualInfo = unsafe { std::mem::zeroed() };
        template.depth = c_int::try_from(surface.depth).unwrap_or(0);
        template.visualid = surface.format_id as xlib::VisualID;
        template.screen = self.screen;

        let mask = xlib::VisualDepthMask | xlib::VisualIDMask | xlib::VisualScreenMask;
        let (infos, count) = self.visual_infos(mask, &mut template);
        if infos.is_null() {
            return Ok(Vec::new());
        }

        // SAFETY: XGetVisualInfo returned `count` contiguous entries
        let entries = unsafe { std::slice::from_raw_parts_mut(infos, count) };
        let formats = entries
            .iter_mut()
            .map(|info| {
                let attributes = self.query_attributes(info)?;
                let depth = u32::try_from(info.depth).unwrap_or(0);
                Ok(attributes.to_candidate(u64::from(info.visualid), depth))
            })
            .collect::<Result<Vec<_>>>();

        // SAFETY: the list is not used past this point
        unsafe {
            (self.xlib.XFree)(infos.cast());
        }

        let formats = formats?;
        tracing::trace!("Visual {:#x} offers {} formats", surface.format_id, formats.len());
        Ok(formats)
    }

    fn create_context(
        &self,
        format: &CandidateFormat,
        share_with: Option<ContextHandle>,
    ) -> Result<ContextHandle> {
        // SAFETY: XVisualInfo is plain data
        let mut template: xlib::XVisualInfo = unsafe { std::mem::zeroed() };
        template.visualid = format.format_id as xlib::VisualID;
        template.screen = self.screen;

        let mask = xlib::VisualIDMask | xlib::VisualScreenMask;
        let (info, count) = self.visual_infos(mask, &mut template);
        if info.is_null() || count == 0 {
            return Err(PlatformError::Creation(format!(
                "visual {:#x} disappeared from screen {}",
                format.format_id, self.screen
            )));
        }

        let share = share_with.map_or(ptr::null_mut(), Self::context_ptr);
        // SAFETY: info is a live XVisualInfo and share is null or a context of this display
        let context = unsafe {
            let context = (self.glx.glXCreateContext)(self.display, info, share, xlib::True);
            (self.xlib.XFree)(info.cast());
            context
        };

        ContextHandle::from_raw(context as usize).ok_or_else(|| {
            PlatformError::Creation(format!(
                "glXCreateContext refused visual {:#x}",
                format.format_id
            ))
        })
    }

    fn destroy_context(&self, context: ContextHandle) {
        // SAFETY: context was created by create_context and is not current anywhere
        unsafe {
            (self.glx.glXDestroyContext)(self.display, Self::context_ptr(context));
        }
    }

    fn bind_color_resource(&self, surface: SurfaceId, format: &CandidateFormat) -> Result<()> {
        // SAFETY: XVisualInfo is plain data
        let mut template: xlib::XVisualInfo = unsafe { std::mem::zeroed() };
        template.visualid = format.format_id as xlib::VisualID;
        template.screen = self.screen;

        let mask = xlib::VisualIDMask | xlib::VisualScreenMask;
        let (info, count) = self.visual_infos(mask, &mut template);
        if info.is_null() || count == 0 {
            return Err(PlatformError::Creation(format!("unknown visual {:#x}", format.format_id)));
        }

        let window = surface.as_raw() as xlib::Window;
        // SAFETY: info is live until XFree and window belongs to this display
        unsafe {
            let colormap = (self.xlib.XCreateColormap)(
                self.display,
                self.root_window(),
                (*info).visual,
                xlib::AllocNone,
            );
            (self.xlib.XSetWindowColormap)(self.display, window, colormap);
            (self.xlib.XFree)(info.cast());
            // The window now uses the new colormap, so the replaced one is unused
            if let Some(replaced) = self.colormaps.attach(surface, colormap) {
                (self.xlib.XFreeColormap)(self.display, replaced);
            }
        }

        match self.take_x_error() {
            Some(code) => Err(PlatformError::Creation(format!(
                "cannot attach colormap to window {surface} (X error {code})"
            ))),
            None => Ok(()),
        }
    }

    fn make_current(&self, surface: SurfaceId, context: ContextHandle) -> Result<()> {
        // SAFETY: both handles belong to this display
        let status = unsafe {
            (self.glx.glXMakeCurrent)(
                self.display,
                surface.as_raw() as c_ulong,
                Self::context_ptr(context),
            )
        };
        if status == 0 {
            return Err(PlatformError::Binding(format!(
                "glXMakeCurrent({surface}, {context}) failed"
            )));
        }
        Ok(())
    }

    fn release_current(&self) -> Result<()> {
        // SAFETY: the null drawable and context unbind the calling thread
        let status = unsafe { (self.glx.glXMakeCurrent)(self.display, 0, ptr::null_mut()) };
        if status == 0 {
            return Err(PlatformError::Binding("glXMakeCurrent(None) failed".into()));
        }
        Ok(())
    }

    fn swap_buffers(&self, surface: SurfaceId) {
        // SAFETY: surface belongs to this display
        unsafe {
            (self.glx.glXSwapBuffers)(self.display, surface.as_raw() as c_ulong);
        }
    }

    fn swap_control(&self) -> Option<&dyn SwapControl> {
        self.swap_control.as_ref().map(|control| control as &dyn SwapControl)
    }
}

impl Drop for XlibPlatform {
    fn drop(&mut self) {
        // SAFETY: every context and surface holds the platform alive, so none remain
        unsafe {
            for colormap in self.colormaps.drain() {
                (self.xlib.XFreeColormap)(self.display, colormap);
            }
            (self.xlib.XCloseDisplay)(self.display);
        }
    }
}

impl std::fmt::Debug for XlibPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlibPlatform")
            .field("name", &self.name)
            .field("screen", &self.screen)
            .field("swap_control", &self.swap_control.is_some())
            .finish()
    }
}

//! Windowed probe on a winit window

use crate::config::LumenConfig;
use crate::probe::{self, ProbeReport};
use anyhow::{Context, Result};
use lumen_core::GlDisplay;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::x11::EventLoopBuilderExtX11;
use winit::window::{Window, WindowAttributes, WindowId};

struct ProbeApp<'a> {
    display: &'a GlDisplay,
    config: &'a LumenConfig,
    share: bool,
    window: Option<Window>,
    outcome: Option<Result<ProbeReport>>,
}

impl ProbeApp<'_> {
    fn probe(&mut self, event_loop: &ActiveEventLoop) -> Result<ProbeReport> {
        let attrs = WindowAttributes::default()
            .with_title("lumen")
            .with_inner_size(LogicalSize::new(320, 240))
            .with_resizable(false);
        let window = event_loop.create_window(attrs).context("Failed to create window")?;

        let surface = lumen_platform_x11::surface_of(&window)
            .context("Window is not an X11 window")?
            .context("Window has no X11 id")?;
        let window = self.window.insert(window);
        tracing::info!("Created window {surface} ({:?})", window.id());

        probe::run(self.display, Some(surface), self.config, self.share)
    }
}

impl ApplicationHandler for ProbeApp<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.outcome.is_some() {
            return;
        }
        let outcome = self.probe(event_loop);
        self.outcome = Some(outcome);
        event_loop.exit();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            event_loop.exit();
        }
    }
}

/// Open a window on the X11 backend of winit and probe it
pub fn run(display: &GlDisplay, config: &LumenConfig, share: bool) -> Result<ProbeReport> {
    let event_loop = EventLoop::builder()
        .with_x11()
        .build()
        .context("Failed to create X11 event loop")?;

    let mut app = ProbeApp {
        display,
        config,
        share,
        window: None,
        outcome: None,
    };
    event_loop.run_app(&mut app).context("Event loop failed")?;

    app.outcome
        .unwrap_or_else(|| Err(anyhow::anyhow!("Event loop exited before the window was created")))
}

//! Context negotiation probe

use crate::config::LumenConfig;
use anyhow::{Context, Result};
use lumen_core::{ContextError, ContextSettings, GlDisplay, RenderingContext, SurfaceId};
use std::fmt;

/// Outcome of a probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub requested: ContextSettings,
    pub achieved: ContextSettings,
    pub format_id: u64,
    pub surface: SurfaceId,
    pub offscreen: bool,
    /// Achieved settings of the sharing context, when one was requested
    pub shared: Option<ContextSettings>,
    pub frames_presented: u32,
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.offscreen { "offscreen" } else { "window" };
        writeln!(f, "surface      {} ({kind})", self.surface)?;
        writeln!(f, "visual       {:#x}", self.format_id)?;
        writeln!(
            f,
            "requested    depth {} / stencil {} / antialiasing {}",
            self.requested.depth_bits,
            self.requested.stencil_bits,
            self.requested.antialiasing_level
        )?;
        writeln!(
            f,
            "achieved     depth {} / stencil {} / antialiasing {}",
            self.achieved.depth_bits, self.achieved.stencil_bits, self.achieved.antialiasing_level
        )?;
        if let Some(shared) = &self.shared {
            writeln!(
                f,
                "shared       depth {} / stencil {} / antialiasing {}",
                shared.depth_bits, shared.stencil_bits, shared.antialiasing_level
            )?;
        }
        write!(f, "frames       {}", self.frames_presented)
    }
}

fn disabled(context: &RenderingContext) -> ContextError {
    context
        .creation_error()
        .cloned()
        .unwrap_or_else(|| ContextError::NativeCreation("context is disabled".into()))
}

/// Negotiate a context on `surface` (or a hidden surface), optionally create a
/// sharing peer, then present the configured number of frames.
pub fn run(
    display: &GlDisplay,
    surface: Option<SurfaceId>,
    config: &LumenConfig,
    share: bool,
) -> Result<ProbeReport> {
    let requested = config.context;
    let context = match surface {
        Some(surface) => {
            let bits_per_pixel = config
                .surface
                .bits_per_pixel
                .unwrap_or_else(|| display.platform().default_bits_per_pixel());
            tracing::info!("Negotiating {bits_per_pixel} bpp context for window {surface}");
            RenderingContext::new_windowed(display, None, surface, bits_per_pixel, requested)
        }
        None => {
            tracing::info!("Negotiating offscreen context with minimal settings");
            RenderingContext::new_offscreen(display, None)
        }
    };
    if !context.is_enabled() {
        return Err(disabled(&context)).context("Context negotiation failed");
    }

    let shared = if share {
        let peer = RenderingContext::new_offscreen(display, Some(&context));
        if !peer.is_enabled() {
            return Err(disabled(&peer)).context("Sharing context could not be created");
        }
        tracing::info!(
            "Sharing context {:?} created and active: {}",
            peer.native_handle(),
            peer.is_active()
        );
        Some(*peer.settings())
    } else {
        None
    };

    context.set_active(true).context("Failed to activate context")?;
    context.set_vertical_sync(config.surface.vertical_sync);
    for frame in 0..config.surface.frames {
        tracing::debug!("Presenting frame {frame}");
        context.display();
    }
    context.set_active(false).context("Failed to release context")?;

    Ok(ProbeReport {
        requested: if surface.is_some() { requested } else { ContextSettings::minimal() },
        achieved: *context.settings(),
        format_id: context.format().map_or(0, |format| format.format_id),
        surface: context.surface().context("Enabled context has no surface")?,
        offscreen: context.owns_surface(),
        shared,
        frames_presented: config.surface.frames,
    })
}
